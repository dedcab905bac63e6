//! Native OpenGL context creation.

use crate::config::GfxConfig;
use crate::gfx::backends::opengl::api::GlApi;
use crate::gfx::{ContextHints, GfxError, Surface};
use glutin::{
    config::{ConfigTemplateBuilder, GlConfig},
    context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version},
    display::{Display, DisplayApiPreference},
    prelude::*,
    surface::{Surface as GlutinSurface, SurfaceAttributesBuilder, SwapInterval, WindowSurface},
};
use log::{info, warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::{ffi::CStr, num::NonZeroU32};

pub trait GlContext {
    type Gl: GlApi;

    fn gl(&self) -> &Self::Gl;
    fn gl_mut(&mut self) -> &mut Self::Gl;
    fn drawable_size(&self) -> (u32, u32);
    fn resize(&mut self, width: u32, height: u32);
    fn swap_buffers(&mut self) -> Result<(), GfxError>;
}

pub struct GlutinContext {
    gl: glow::Context,
    surface: GlutinSurface<WindowSurface>,
    context: PossiblyCurrentContext,
    size: (u32, u32),
}

impl GlContext for GlutinContext {
    type Gl = glow::Context;

    fn gl(&self) -> &glow::Context {
        &self.gl
    }

    fn gl_mut(&mut self) -> &mut glow::Context {
        &mut self.gl
    }

    fn drawable_size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) else {
            warn!("Ignoring resize to zero dimensions.");
            return;
        };
        self.surface.resize(&self.context, w, h);
        self.size = (width, height);
    }

    fn swap_buffers(&mut self) -> Result<(), GfxError> {
        self.surface
            .swap_buffers(&self.context)
            .map_err(|e| GfxError::Context(e.to_string()))
    }
}

#[inline(always)]
fn ctx_err(e: impl std::fmt::Display) -> GfxError {
    GfxError::Context(e.to_string())
}

pub fn connect(
    surface: &dyn Surface,
    hints: &ContextHints,
    config: &GfxConfig,
) -> Result<GlutinContext, GfxError> {
    if config.gfx_debug {
        info!("OpenGL debug context requested.");
    }
    let display_handle = surface.display_handle().map_err(ctx_err)?.as_raw();

    #[cfg(target_os = "windows")]
    let preference = {
        info!("Using WGL for OpenGL context.");
        DisplayApiPreference::Wgl(Some(surface.window_handle().map_err(ctx_err)?.as_raw()))
    };
    #[cfg(target_os = "macos")]
    let preference = {
        info!("Using CGL for OpenGL context.");
        DisplayApiPreference::Cgl
    };
    #[cfg(all(unix, not(target_os = "macos")))]
    let preference = {
        info!("Using EGL for OpenGL context.");
        DisplayApiPreference::Egl
    };

    let display = unsafe { Display::new(display_handle, preference) }.map_err(ctx_err)?;

    let template = ConfigTemplateBuilder::new()
        .with_alpha_size(0)
        .with_depth_size(hints.depth_bits)
        .with_stencil_size(hints.stencil_bits)
        .with_single_buffering(!hints.double_buffer)
        .with_transparency(false)
        .build();

    // Most samples without exceeding the request.
    let gl_config = unsafe { display.find_configs(template) }
        .map_err(ctx_err)?
        .filter(|c| c.num_samples() <= hints.samples)
        .reduce(|best, c| {
            if c.num_samples() > best.num_samples() {
                c
            } else {
                best
            }
        })
        .ok_or_else(|| GfxError::Context("Failed to find a suitable GL config".into()))?;
    info!("GL config selected with {} samples.", gl_config.num_samples());

    let (width, height) = surface.size_in_pixels();
    let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) else {
        return Err(GfxError::InvalidDimensions {
            width: width as i32,
            height: height as i32,
        });
    };
    let raw_window_handle = surface.window_handle().map_err(ctx_err)?.as_raw();
    let surface_attributes =
        SurfaceAttributesBuilder::<WindowSurface>::new().build(raw_window_handle, w, h);
    let gl_surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes) }
        .map_err(ctx_err)?;

    // glutin has no forward-compatible switch; core profiles on CGL always are.
    let profile = if hints.core_profile {
        GlProfile::Core
    } else {
        GlProfile::Compatibility
    };
    let context_attributes = ContextAttributesBuilder::new()
        .with_debug(config.gfx_debug)
        .with_profile(profile)
        .with_context_api(ContextApi::OpenGl(Some(Version::new(
            hints.major_version,
            hints.minor_version,
        ))))
        .build(Some(raw_window_handle));
    let context = unsafe { display.create_context(&gl_config, &context_attributes) }
        .map_err(ctx_err)?
        .make_current(&gl_surface)
        .map_err(ctx_err)?;

    let interval = match NonZeroU32::new(u32::from(config.vsync)) {
        Some(n) => SwapInterval::Wait(n),
        None => SwapInterval::DontWait,
    };
    match gl_surface.set_swap_interval(&context, interval) {
        Ok(()) => info!(
            "Successfully set VSync to: {}",
            if config.vsync { "on" } else { "off" }
        ),
        Err(e) => warn!("Failed to set swap interval (VSync): {e}"),
    }

    let gl = unsafe { glow::Context::from_loader_function_cstr(|s: &CStr| display.get_proc_address(s)) };

    Ok(GlutinContext {
        gl,
        surface: gl_surface,
        context,
        size: (width, height),
    })
}
