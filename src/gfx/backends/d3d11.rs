//! Direct3D 11 backend placeholder.
//!
//! No implementation ships in this build, so selection always reports the
//! backend as unavailable and the caller must fail startup.

use crate::config::GfxConfig;
use crate::gfx::Backend;
use log::warn;

pub const AVAILABLE: bool = false;

pub fn backend(_config: &GfxConfig) -> Option<Box<dyn Backend>> {
    warn!("D3D11 renderer requested, but this build has no D3D11 implementation.");
    None
}
