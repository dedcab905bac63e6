//! Mirror of the GL binding and pipeline state.
//!
//! Every setter compares the requested value with the cached one, issues
//! only the calls whose inputs changed and then stores the whole value.
//! While `initializing` is set every comparison is treated as stale, so one
//! pass of setters drives a fresh context to exactly the cached defaults.

use crate::gfx::backends::opengl::api::{GlApi, GlId};
use crate::gfx::backends::opengl::convert;
use crate::gfx::{
    BlendFactor, BlendOp, BlendState, Color, ColorMask, Compare, Cull, MAX_UNIFORM_TEXTURES, Rect,
};

/// Top-left origin rectangle to GL's bottom-left origin.
#[inline(always)]
pub const fn to_backend_rect(rect: Rect, framebuffer_height: i32) -> Rect {
    Rect::new(rect.x, framebuffer_height - rect.y - rect.h, rect.w, rect.h)
}

pub struct StateCache {
    initializing: bool,
    active_unit: u32,
    units: [GlId; MAX_UNIFORM_TEXTURES],
    program: GlId,
    framebuffer: GlId,
    framebuffer_size: (i32, i32),
    vertex_array: GlId,
    has_scissor: bool,
    viewport: Rect,
    scissor: Rect,
    compare: Compare,
    cull: Cull,
    blend: BlendState,
    depth_mask: bool,
}

impl StateCache {
    pub const fn new() -> Self {
        Self {
            initializing: false,
            active_unit: 0,
            units: [0; MAX_UNIFORM_TEXTURES],
            program: 0,
            framebuffer: 0,
            framebuffer_size: (0, 0),
            vertex_array: 0,
            has_scissor: false,
            viewport: Rect::new(0, 0, 0, 0),
            scissor: Rect::new(0, 0, 0, 0),
            compare: Compare::None,
            cull: Cull::None,
            blend: BlendState {
                color_op: BlendOp::Add,
                color_src: BlendFactor::Zero,
                color_dst: BlendFactor::Zero,
                alpha_op: BlendOp::Add,
                alpha_src: BlendFactor::Zero,
                alpha_dst: BlendFactor::Zero,
                mask: ColorMask::empty(),
                color: Color::TRANSPARENT,
            },
            depth_mask: false,
        }
    }

    pub fn reset<G: GlApi + ?Sized>(&mut self, gl: &G, backbuffer: (i32, i32)) {
        *self = Self::new();
        self.initializing = true;
        self.bind_program(gl, 0);
        self.bind_framebuffer(gl, 0, backbuffer, &[glow::BACK]);
        self.bind_array(gl, 0);
        self.set_viewport(gl, None);
        self.set_scissor(gl, None);
        self.set_blend(gl, &BlendState::default());
        self.set_cull(gl, Cull::None);
        self.set_compare(gl, Compare::None);
        self.set_depth_mask(gl, false);
        self.set_active_unit(gl, 0);
        self.initializing = false;
    }

    #[inline(always)]
    pub fn framebuffer(&self) -> GlId {
        self.framebuffer
    }

    #[inline(always)]
    pub fn framebuffer_size(&self) -> (i32, i32) {
        self.framebuffer_size
    }

    #[inline(always)]
    pub fn bound_texture(&self, unit: usize) -> GlId {
        self.units.get(unit).copied().unwrap_or(0)
    }

    #[inline(always)]
    pub fn blend(&self) -> &BlendState {
        &self.blend
    }

    pub fn bind_program<G: GlApi + ?Sized>(&mut self, gl: &G, program: GlId) {
        if self.initializing || self.program != program {
            gl.use_program(program);
        }
        self.program = program;
    }

    // Draw buffers are selected only when the binding changes.
    pub fn bind_framebuffer<G: GlApi + ?Sized>(
        &mut self,
        gl: &G,
        framebuffer: GlId,
        size: (i32, i32),
        draw_buffers: &[u32],
    ) {
        self.framebuffer_size = size;
        if self.initializing || self.framebuffer != framebuffer {
            gl.bind_framebuffer(framebuffer);
            gl.draw_buffers(draw_buffers);
        }
        self.framebuffer = framebuffer;
    }

    pub fn bind_array<G: GlApi + ?Sized>(&mut self, gl: &G, vertex_array: GlId) {
        if self.initializing || self.vertex_array != vertex_array {
            gl.bind_vertex_array(vertex_array);
        }
        self.vertex_array = vertex_array;
    }

    pub fn set_active_unit<G: GlApi + ?Sized>(&mut self, gl: &G, unit: u32) {
        if self.initializing || self.active_unit != unit {
            gl.active_texture(unit);
        }
        self.active_unit = unit;
    }

    pub fn bind_texture<G: GlApi + ?Sized>(&mut self, gl: &G, unit: usize, texture: GlId) {
        let Some(slot) = self.units.get(unit).copied() else {
            return;
        };
        if self.initializing || slot != texture {
            self.set_active_unit(gl, unit as u32);
            gl.bind_texture(texture);
            self.units[unit] = texture;
        }
    }

    // Leaves `unit` active for calls that act on the current texture.
    pub fn select_texture<G: GlApi + ?Sized>(&mut self, gl: &G, unit: usize, texture: GlId) {
        self.bind_texture(gl, unit, texture);
        self.set_active_unit(gl, unit as u32);
    }

    pub fn set_viewport<G: GlApi + ?Sized>(&mut self, gl: &G, rect: Option<Rect>) {
        let (w, h) = self.framebuffer_size;
        let next = match rect {
            Some(rect) => to_backend_rect(rect, h),
            None => Rect::new(0, 0, w, h),
        };
        if self.initializing || self.viewport != next {
            gl.viewport(next.x, next.y, next.w, next.h);
        }
        self.viewport = next;
    }

    pub fn set_scissor<G: GlApi + ?Sized>(&mut self, gl: &G, rect: Option<Rect>) {
        let Some(rect) = rect else {
            if self.initializing || self.has_scissor {
                gl.disable(glow::SCISSOR_TEST);
            }
            self.has_scissor = false;
            return;
        };

        let mut next = to_backend_rect(rect, self.framebuffer_size.1);
        next.w = next.w.max(0);
        next.h = next.h.max(0);

        if self.initializing || !self.has_scissor {
            gl.enable(glow::SCISSOR_TEST);
        }
        if self.initializing || self.scissor != next {
            gl.scissor(next.x, next.y, next.w, next.h);
        }
        self.has_scissor = true;
        self.scissor = next;
    }

    pub fn set_blend<G: GlApi + ?Sized>(&mut self, gl: &G, blend: &BlendState) {
        let last = self.blend;
        let init = self.initializing;

        if init || last.color_op != blend.color_op || last.alpha_op != blend.alpha_op {
            gl.blend_equation_separate(
                convert::blend_op(blend.color_op),
                convert::blend_op(blend.alpha_op),
            );
        }

        if init
            || last.color_src != blend.color_src
            || last.color_dst != blend.color_dst
            || last.alpha_src != blend.alpha_src
            || last.alpha_dst != blend.alpha_dst
        {
            gl.blend_func_separate(
                convert::blend_factor(blend.color_src),
                convert::blend_factor(blend.color_dst),
                convert::blend_factor(blend.alpha_src),
                convert::blend_factor(blend.alpha_dst),
            );
        }

        if init || last.mask != blend.mask {
            apply_color_mask(gl, blend.mask);
        }

        if init || last.color != blend.color {
            let [r, g, b, a] = blend.color.to_f32();
            gl.blend_color(r, g, b, a);
        }

        self.blend = *blend;
    }

    pub fn set_color_mask<G: GlApi + ?Sized>(&mut self, gl: &G, mask: ColorMask) {
        if self.initializing || self.blend.mask != mask {
            apply_color_mask(gl, mask);
        }
        self.blend.mask = mask;
    }

    pub fn set_compare<G: GlApi + ?Sized>(&mut self, gl: &G, compare: Compare) {
        if self.initializing || self.compare != compare {
            match convert::compare(compare) {
                None => gl.disable(glow::DEPTH_TEST),
                Some(func) => {
                    if self.initializing || self.compare == Compare::None {
                        gl.enable(glow::DEPTH_TEST);
                    }
                    gl.depth_func(func);
                }
            }
        }
        self.compare = compare;
    }

    pub fn set_depth_mask<G: GlApi + ?Sized>(&mut self, gl: &G, depth_mask: bool) {
        if self.initializing || self.depth_mask != depth_mask {
            gl.depth_mask(depth_mask);
        }
        self.depth_mask = depth_mask;
    }

    pub fn set_cull<G: GlApi + ?Sized>(&mut self, gl: &G, cull: Cull) {
        if self.initializing || self.cull != cull {
            match convert::cull(cull) {
                None => gl.disable(glow::CULL_FACE),
                Some(face) => {
                    if self.initializing || self.cull == Cull::None {
                        gl.enable(glow::CULL_FACE);
                    }
                    gl.cull_face(face);
                }
            }
        }
        self.cull = cull;
    }

    // Deleting a bound object reverts that binding to zero in GL, and the
    // name may be handed out again, so the cache has to follow.

    pub fn forget_texture(&mut self, texture: GlId) {
        for unit in self.units.iter_mut().filter(|unit| **unit == texture) {
            *unit = 0;
        }
    }

    pub fn forget_program(&mut self, program: GlId) {
        if self.program == program {
            self.program = 0;
        }
    }

    pub fn forget_framebuffer(&mut self, framebuffer: GlId) {
        if self.framebuffer == framebuffer {
            self.framebuffer = 0;
        }
    }

    pub fn forget_array(&mut self, vertex_array: GlId) {
        if self.vertex_array == vertex_array {
            self.vertex_array = 0;
        }
    }
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new()
    }
}

#[inline(always)]
fn apply_color_mask<G: GlApi + ?Sized>(gl: &G, mask: ColorMask) {
    gl.color_mask(
        mask.contains(ColorMask::R),
        mask.contains(ColorMask::G),
        mask.contains(ColorMask::B),
        mask.contains(ColorMask::A),
    );
}
