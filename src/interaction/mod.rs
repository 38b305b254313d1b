mod arrange;
mod controller;
mod selection;

pub use controller::{GestureState, InteractionController, ModeLatch, PointerButton};
pub use selection::Modifiers;
