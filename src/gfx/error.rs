//! Error taxonomy for the graphics layer.
//!
//! Nothing here unwinds: helpers return these values with `?` and the public
//! device operations log them and fall back to a null handle or a no-op.

use crate::gfx::Renderer;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GfxError {
    /// The requested backend has no compiled or available implementation.
    Unavailable(Renderer),
    /// An operation was issued before startup succeeded or after shutdown.
    NotRunning,
    /// The native context or presentation surface could not be created.
    Context(String),
    InvalidDimensions { width: i32, height: i32 },
    TextureTooLarge { max: i32 },
    /// A render target description the backend cannot build.
    InvalidTarget(String),
    /// The driver rejected a shader stage; carries its log verbatim.
    ShaderCompile(String),
    /// The driver failed to link the program; carries its log verbatim.
    ShaderLink(String),
    /// A GPU object could not be allocated.
    Gpu(String),
    /// A handle that does not (or no longer) refer to a live object.
    InvalidHandle(&'static str),
    /// A size, offset or count that does not fit the GL integer range.
    OutOfRange(&'static str),
}

impl fmt::Display for GfxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(renderer) => {
                write!(f, "Renderer '{renderer}' is not available on this build")
            }
            Self::NotRunning => write!(f, "The graphics device is not running"),
            Self::Context(msg) => write!(f, "Failed to create graphics context: {msg}"),
            Self::InvalidDimensions { width, height } => {
                write!(f, "Invalid dimensions {width}x{height}")
            }
            Self::TextureTooLarge { max } => write!(f, "Exceeded Max Texture Size of {max}"),
            Self::InvalidTarget(msg) => write!(f, "Invalid target: {msg}"),
            Self::ShaderCompile(log) | Self::ShaderLink(log) => write!(f, "{log}"),
            Self::Gpu(msg) => write!(f, "GPU object allocation failed: {msg}"),
            Self::InvalidHandle(kind) => write!(f, "Invalid {kind} handle"),
            Self::OutOfRange(what) => write!(f, "{what} is out of range"),
        }
    }
}

impl std::error::Error for GfxError {}

impl From<String> for GfxError {
    fn from(msg: String) -> Self {
        Self::Gpu(msg)
    }
}
