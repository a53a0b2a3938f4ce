//! Font loading and measurement for label rasterization.

mod font_system;

pub use font_system::{FontId, FontLoadError, FontSystem};
