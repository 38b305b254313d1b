mod analysis;
mod engine;
mod layout_file;
mod model;
mod relationship;
mod world;

pub use engine::LinkGraph;
pub use layout_file::{load_layout, save_layout};
pub use model::GraphModel;
pub use relationship::{EdgeStyle, NodeIcon, RelationshipSpec};
pub use world::{WorldPoint, WorldPositions};
