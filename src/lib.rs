//! A small render-device abstraction with a state-caching OpenGL backend.

pub mod config;
pub mod gfx;
pub mod logging;
