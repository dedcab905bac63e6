//! The slice of OpenGL the device issues.
//!
//! Object names are plain `u32`s with `0` meaning "none", exactly as the
//! driver sees them. [`glow::Context`] implements the trait for real
//! contexts; the test build swaps in a recording implementation.

use crate::gfx::backends::opengl::debug;
use crate::logging::LogMode;
use glow::{HasContext, PixelPackData, PixelUnpackData};
use std::num::NonZeroU32;

pub type GlId = u32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveUniform {
    pub name: String,
    pub size: i32,
    pub utype: u32,
}

pub trait GlApi {
    fn enable(&self, cap: u32);
    fn disable(&self, cap: u32);
    fn get_parameter_i32(&self, pname: u32) -> i32;
    fn get_parameter_string(&self, pname: u32) -> String;
    fn pixel_store_i32(&self, pname: u32, value: i32);
    fn supports_debug(&self) -> bool;
    fn set_debug_callback(&mut self, mode: LogMode);

    fn use_program(&self, program: GlId);
    fn bind_framebuffer(&self, framebuffer: GlId);
    fn draw_buffers(&self, buffers: &[u32]);
    fn bind_vertex_array(&self, vertex_array: GlId);
    /// `unit` is zero-based; the implementation adds `TEXTURE0`.
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, texture: GlId);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn scissor(&self, x: i32, y: i32, width: i32, height: i32);
    fn blend_equation_separate(&self, color: u32, alpha: u32);
    fn blend_func_separate(&self, color_src: u32, color_dst: u32, alpha_src: u32, alpha_dst: u32);
    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool);
    fn blend_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn depth_func(&self, func: u32);
    fn depth_mask(&self, flag: bool);
    fn cull_face(&self, face: u32);

    fn create_texture(&self) -> Result<GlId, String>;
    fn delete_texture(&self, texture: GlId);
    fn tex_parameter_i32(&self, pname: u32, value: i32);
    fn tex_image_2d(
        &self,
        internal_format: u32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    );
    fn get_tex_image(&self, format: u32, ty: u32, pixels: &mut [u8]);

    fn create_framebuffer(&self) -> Result<GlId, String>;
    fn delete_framebuffer(&self, framebuffer: GlId);
    fn framebuffer_texture_2d(&self, attachment: u32, texture: GlId);

    fn create_shader(&self, kind: u32) -> Result<GlId, String>;
    fn shader_source(&self, shader: GlId, source: &str);
    fn compile_shader(&self, shader: GlId);
    fn get_shader_compile_status(&self, shader: GlId) -> bool;
    fn get_shader_info_log(&self, shader: GlId) -> String;
    fn delete_shader(&self, shader: GlId);
    fn create_program(&self) -> Result<GlId, String>;
    fn attach_shader(&self, program: GlId, shader: GlId);
    fn detach_shader(&self, program: GlId, shader: GlId);
    fn link_program(&self, program: GlId);
    fn get_program_link_status(&self, program: GlId) -> bool;
    fn get_program_info_log(&self, program: GlId) -> String;
    fn delete_program(&self, program: GlId);
    fn get_active_uniforms(&self, program: GlId) -> u32;
    fn get_active_uniform(&self, program: GlId, index: u32) -> Option<ActiveUniform>;
    fn get_uniform_location(&self, program: GlId, name: &str) -> Option<u32>;

    fn uniform_1_f32_slice(&self, location: u32, values: &[f32]);
    fn uniform_2_f32_slice(&self, location: u32, values: &[f32]);
    fn uniform_3_f32_slice(&self, location: u32, values: &[f32]);
    fn uniform_4_f32_slice(&self, location: u32, values: &[f32]);
    fn uniform_matrix_3x2_f32_slice(&self, location: u32, values: &[f32]);
    fn uniform_matrix_4_f32_slice(&self, location: u32, values: &[f32]);
    fn uniform_1_i32_slice(&self, location: u32, values: &[i32]);

    fn create_vertex_array(&self) -> Result<GlId, String>;
    fn delete_vertex_array(&self, vertex_array: GlId);
    fn create_buffer(&self) -> Result<GlId, String>;
    fn delete_buffer(&self, buffer: GlId);
    fn bind_buffer(&self, target: u32, buffer: GlId);
    fn buffer_data_size(&self, target: u32, size: i32, usage: u32);
    fn buffer_sub_data(&self, target: u32, offset: i32, data: &[u8]);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    fn vertex_attrib_divisor(&self, index: u32, divisor: u32);

    fn draw_elements(&self, mode: u32, count: i32, ty: u32, offset: i32);
    fn draw_elements_instanced(&self, mode: u32, count: i32, ty: u32, offset: i32, instances: i32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear_depth(&self, depth: f32);
    fn clear_stencil(&self, stencil: i32);
    fn clear(&self, mask: u32);
}

#[inline(always)]
fn texture(id: GlId) -> Option<glow::Texture> {
    NonZeroU32::new(id).map(glow::NativeTexture)
}

#[inline(always)]
fn program(id: GlId) -> Option<glow::Program> {
    NonZeroU32::new(id).map(glow::NativeProgram)
}

#[inline(always)]
fn shader(id: GlId) -> Option<glow::Shader> {
    NonZeroU32::new(id).map(glow::NativeShader)
}

#[inline(always)]
fn framebuffer(id: GlId) -> Option<glow::Framebuffer> {
    NonZeroU32::new(id).map(glow::NativeFramebuffer)
}

#[inline(always)]
fn vertex_array(id: GlId) -> Option<glow::VertexArray> {
    NonZeroU32::new(id).map(glow::NativeVertexArray)
}

#[inline(always)]
fn buffer(id: GlId) -> Option<glow::Buffer> {
    NonZeroU32::new(id).map(glow::NativeBuffer)
}

#[inline(always)]
fn location(id: u32) -> glow::UniformLocation {
    glow::NativeUniformLocation(id)
}

// Every call below requires the context to be current on the calling thread,
// which the device guarantees by owning the context it was created with.
impl GlApi for glow::Context {
    fn enable(&self, cap: u32) {
        unsafe { HasContext::enable(self, cap) }
    }

    fn disable(&self, cap: u32) {
        unsafe { HasContext::disable(self, cap) }
    }

    fn get_parameter_i32(&self, pname: u32) -> i32 {
        unsafe { HasContext::get_parameter_i32(self, pname) }
    }

    fn get_parameter_string(&self, pname: u32) -> String {
        unsafe { HasContext::get_parameter_string(self, pname) }
    }

    fn pixel_store_i32(&self, pname: u32, value: i32) {
        unsafe { HasContext::pixel_store_i32(self, pname, value) }
    }

    fn supports_debug(&self) -> bool {
        HasContext::supports_debug(self)
    }

    fn set_debug_callback(&mut self, mode: LogMode) {
        unsafe {
            HasContext::debug_message_callback(self, move |_source, ty, _id, severity, message| {
                debug::on_message(mode, ty, severity, message);
            });
        }
    }

    fn use_program(&self, id: GlId) {
        unsafe { HasContext::use_program(self, program(id)) }
    }

    fn bind_framebuffer(&self, id: GlId) {
        unsafe { HasContext::bind_framebuffer(self, glow::FRAMEBUFFER, framebuffer(id)) }
    }

    fn draw_buffers(&self, buffers: &[u32]) {
        unsafe { HasContext::draw_buffers(self, buffers) }
    }

    fn bind_vertex_array(&self, id: GlId) {
        unsafe { HasContext::bind_vertex_array(self, vertex_array(id)) }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { HasContext::active_texture(self, glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&self, id: GlId) {
        unsafe { HasContext::bind_texture(self, glow::TEXTURE_2D, texture(id)) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { HasContext::viewport(self, x, y, width, height) }
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { HasContext::scissor(self, x, y, width, height) }
    }

    fn blend_equation_separate(&self, color: u32, alpha: u32) {
        unsafe { HasContext::blend_equation_separate(self, color, alpha) }
    }

    fn blend_func_separate(&self, color_src: u32, color_dst: u32, alpha_src: u32, alpha_dst: u32) {
        unsafe { HasContext::blend_func_separate(self, color_src, color_dst, alpha_src, alpha_dst) }
    }

    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool) {
        unsafe { HasContext::color_mask(self, r, g, b, a) }
    }

    fn blend_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { HasContext::blend_color(self, r, g, b, a) }
    }

    fn depth_func(&self, func: u32) {
        unsafe { HasContext::depth_func(self, func) }
    }

    fn depth_mask(&self, flag: bool) {
        unsafe { HasContext::depth_mask(self, flag) }
    }

    fn cull_face(&self, face: u32) {
        unsafe { HasContext::cull_face(self, face) }
    }

    fn create_texture(&self) -> Result<GlId, String> {
        unsafe { HasContext::create_texture(self).map(|t| t.0.get()) }
    }

    fn delete_texture(&self, id: GlId) {
        if let Some(t) = texture(id) {
            unsafe { HasContext::delete_texture(self, t) }
        }
    }

    fn tex_parameter_i32(&self, pname: u32, value: i32) {
        unsafe { HasContext::tex_parameter_i32(self, glow::TEXTURE_2D, pname, value) }
    }

    fn tex_image_2d(
        &self,
        internal_format: u32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    ) {
        unsafe {
            HasContext::tex_image_2d(
                self,
                glow::TEXTURE_2D,
                0,
                internal_format as i32,
                width,
                height,
                0,
                format,
                ty,
                PixelUnpackData::Slice(pixels),
            );
        }
    }

    fn get_tex_image(&self, format: u32, ty: u32, pixels: &mut [u8]) {
        unsafe {
            HasContext::get_tex_image(
                self,
                glow::TEXTURE_2D,
                0,
                format,
                ty,
                PixelPackData::Slice(Some(pixels)),
            );
        }
    }

    fn create_framebuffer(&self) -> Result<GlId, String> {
        unsafe { HasContext::create_framebuffer(self).map(|f| f.0.get()) }
    }

    fn delete_framebuffer(&self, id: GlId) {
        if let Some(f) = framebuffer(id) {
            unsafe { HasContext::delete_framebuffer(self, f) }
        }
    }

    fn framebuffer_texture_2d(&self, attachment: u32, id: GlId) {
        unsafe {
            HasContext::framebuffer_texture_2d(
                self,
                glow::FRAMEBUFFER,
                attachment,
                glow::TEXTURE_2D,
                texture(id),
                0,
            );
        }
    }

    fn create_shader(&self, kind: u32) -> Result<GlId, String> {
        unsafe { HasContext::create_shader(self, kind).map(|s| s.0.get()) }
    }

    fn shader_source(&self, id: GlId, source: &str) {
        if let Some(s) = shader(id) {
            unsafe { HasContext::shader_source(self, s, source) }
        }
    }

    fn compile_shader(&self, id: GlId) {
        if let Some(s) = shader(id) {
            unsafe { HasContext::compile_shader(self, s) }
        }
    }

    fn get_shader_compile_status(&self, id: GlId) -> bool {
        shader(id).is_some_and(|s| unsafe { HasContext::get_shader_compile_status(self, s) })
    }

    fn get_shader_info_log(&self, id: GlId) -> String {
        shader(id)
            .map(|s| unsafe { HasContext::get_shader_info_log(self, s) })
            .unwrap_or_default()
    }

    fn delete_shader(&self, id: GlId) {
        if let Some(s) = shader(id) {
            unsafe { HasContext::delete_shader(self, s) }
        }
    }

    fn create_program(&self) -> Result<GlId, String> {
        unsafe { HasContext::create_program(self).map(|p| p.0.get()) }
    }

    fn attach_shader(&self, p: GlId, s: GlId) {
        if let (Some(p), Some(s)) = (program(p), shader(s)) {
            unsafe { HasContext::attach_shader(self, p, s) }
        }
    }

    fn detach_shader(&self, p: GlId, s: GlId) {
        if let (Some(p), Some(s)) = (program(p), shader(s)) {
            unsafe { HasContext::detach_shader(self, p, s) }
        }
    }

    fn link_program(&self, id: GlId) {
        if let Some(p) = program(id) {
            unsafe { HasContext::link_program(self, p) }
        }
    }

    fn get_program_link_status(&self, id: GlId) -> bool {
        program(id).is_some_and(|p| unsafe { HasContext::get_program_link_status(self, p) })
    }

    fn get_program_info_log(&self, id: GlId) -> String {
        program(id)
            .map(|p| unsafe { HasContext::get_program_info_log(self, p) })
            .unwrap_or_default()
    }

    fn delete_program(&self, id: GlId) {
        if let Some(p) = program(id) {
            unsafe { HasContext::delete_program(self, p) }
        }
    }

    fn get_active_uniforms(&self, id: GlId) -> u32 {
        program(id).map_or(0, |p| unsafe { HasContext::get_active_uniforms(self, p) })
    }

    fn get_active_uniform(&self, id: GlId, index: u32) -> Option<ActiveUniform> {
        let p = program(id)?;
        let u = unsafe { HasContext::get_active_uniform(self, p, index) }?;
        Some(ActiveUniform {
            name: u.name,
            size: u.size,
            utype: u.utype,
        })
    }

    fn get_uniform_location(&self, id: GlId, name: &str) -> Option<u32> {
        let p = program(id)?;
        unsafe { HasContext::get_uniform_location(self, p, name) }.map(|l| l.0)
    }

    fn uniform_1_f32_slice(&self, loc: u32, values: &[f32]) {
        unsafe { HasContext::uniform_1_f32_slice(self, Some(&location(loc)), values) }
    }

    fn uniform_2_f32_slice(&self, loc: u32, values: &[f32]) {
        unsafe { HasContext::uniform_2_f32_slice(self, Some(&location(loc)), values) }
    }

    fn uniform_3_f32_slice(&self, loc: u32, values: &[f32]) {
        unsafe { HasContext::uniform_3_f32_slice(self, Some(&location(loc)), values) }
    }

    fn uniform_4_f32_slice(&self, loc: u32, values: &[f32]) {
        unsafe { HasContext::uniform_4_f32_slice(self, Some(&location(loc)), values) }
    }

    fn uniform_matrix_3x2_f32_slice(&self, loc: u32, values: &[f32]) {
        unsafe {
            HasContext::uniform_matrix_3x2_f32_slice(self, Some(&location(loc)), false, values)
        }
    }

    fn uniform_matrix_4_f32_slice(&self, loc: u32, values: &[f32]) {
        unsafe { HasContext::uniform_matrix_4_f32_slice(self, Some(&location(loc)), false, values) }
    }

    fn uniform_1_i32_slice(&self, loc: u32, values: &[i32]) {
        unsafe { HasContext::uniform_1_i32_slice(self, Some(&location(loc)), values) }
    }

    fn create_vertex_array(&self) -> Result<GlId, String> {
        unsafe { HasContext::create_vertex_array(self).map(|v| v.0.get()) }
    }

    fn delete_vertex_array(&self, id: GlId) {
        if let Some(v) = vertex_array(id) {
            unsafe { HasContext::delete_vertex_array(self, v) }
        }
    }

    fn create_buffer(&self) -> Result<GlId, String> {
        unsafe { HasContext::create_buffer(self).map(|b| b.0.get()) }
    }

    fn delete_buffer(&self, id: GlId) {
        if let Some(b) = buffer(id) {
            unsafe { HasContext::delete_buffer(self, b) }
        }
    }

    fn bind_buffer(&self, target: u32, id: GlId) {
        unsafe { HasContext::bind_buffer(self, target, buffer(id)) }
    }

    fn buffer_data_size(&self, target: u32, size: i32, usage: u32) {
        unsafe { HasContext::buffer_data_size(self, target, size, usage) }
    }

    fn buffer_sub_data(&self, target: u32, offset: i32, data: &[u8]) {
        unsafe { HasContext::buffer_sub_data_u8_slice(self, target, offset, data) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { HasContext::enable_vertex_attrib_array(self, index) }
    }

    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        unsafe {
            HasContext::vertex_attrib_pointer_f32(self, index, size, ty, normalized, stride, offset)
        }
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        unsafe { HasContext::vertex_attrib_divisor(self, index, divisor) }
    }

    fn draw_elements(&self, mode: u32, count: i32, ty: u32, offset: i32) {
        unsafe { HasContext::draw_elements(self, mode, count, ty, offset) }
    }

    fn draw_elements_instanced(&self, mode: u32, count: i32, ty: u32, offset: i32, instances: i32) {
        unsafe { HasContext::draw_elements_instanced(self, mode, count, ty, offset, instances) }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { HasContext::clear_color(self, r, g, b, a) }
    }

    fn clear_depth(&self, depth: f32) {
        unsafe { HasContext::clear_depth_f32(self, depth) }
    }

    fn clear_stencil(&self, stencil: i32) {
        unsafe { HasContext::clear_stencil(self, stencil) }
    }

    fn clear(&self, mask: u32) {
        unsafe { HasContext::clear(self, mask) }
    }
}
