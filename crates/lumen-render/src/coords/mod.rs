//! Coordinate and geometry types shared by the command model, optimizer and executor.
//!
//! Canonical CPU space:
//! - Logical pixels (DPI-aware)
//! - Origin top-left
//! - +X right, +Y down
//!
//! Geometry only becomes device pixels inside the GPU executor, where it is
//! scaled by the device-pixel ratio of the frame being drawn.

mod rect;
mod size;
mod vec2;

pub use rect::Rect;
pub use size::SizePx;
pub use vec2::Vec2;
