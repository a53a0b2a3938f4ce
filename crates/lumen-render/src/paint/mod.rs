//! Paint model shared between the command model and the executor.
//!
//! Colors are linear and premultiplied; both shaders blend with
//! `One, OneMinusSrcAlpha`.

pub mod color;

pub use color::Color;
