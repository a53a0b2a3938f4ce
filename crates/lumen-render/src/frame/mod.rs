//! Per-frame draw intent.
//!
//! Responsibilities:
//! - plain command data in logical pixels (`command`)
//! - one frame's ordered command lists plus a clip stack (`buffer`)
//! - the single-slot, latest-wins hand-off between producer and consumer (`bus`)

mod buffer;
mod bus;
mod command;

pub use buffer::FrameBuffer;
pub use bus::FrameBus;
pub use command::{ImageCommand, RoundedRectCommand};
