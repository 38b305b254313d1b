mod config;
mod context;
mod counting;
mod labeling;
mod options;
mod shapes;
mod transform;

pub use config::ViewConfig;
pub use context::{LinkKey, RenderContext, RenderInput, RenderRequests};
pub use labeling::{LabelCalculator, LabelInput, LabelTarget, compose_label};
pub use options::{
    BackgroundMode, LabelKind, LinkColorMode, LinkSizeMode, NodeColorMode, NodeSizeMode,
    RenderOptions,
};
pub use shapes::{Shape, ShapeId, ShapeIndex};
pub use transform::{CoordinateTransform, Extents, NodeKey};
