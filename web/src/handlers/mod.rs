//! HTTP request handlers.

mod health;
mod model;
mod predict;

pub use health::*;
pub use model::*;
pub use predict::*;
