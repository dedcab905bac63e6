//! Recording GL used by the test suite.
//!
//! Every call is logged by name with its scalar arguments. On top of that
//! the mock keeps just enough object state to check behavior: texture
//! storage, buffer contents, per-framebuffer clear results and programs
//! whose reflected uniforms are scripted by the test.

use crate::gfx::GfxError;
use crate::gfx::backends::opengl::api::{ActiveUniform, GlApi, GlId};
use crate::gfx::backends::opengl::context::GlContext;
use crate::logging::LogMode;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Source containing this marker fails to compile.
pub const FAIL_COMPILE: &str = "#error";

#[derive(Clone, Debug, Default)]
pub struct MockTexture {
    pub width: i32,
    pub height: i32,
    pub internal_format: u32,
    pub data: Vec<u8>,
}

/// What the last clears left in a framebuffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surfaces {
    pub color: [f32; 4],
    pub depth: f32,
    pub stencil: i32,
}

impl Default for Surfaces {
    fn default() -> Self {
        Self {
            color: [0.0; 4],
            depth: 1.0,
            stencil: 0,
        }
    }
}

#[derive(Default)]
pub struct MockGl {
    calls: RefCell<Vec<(&'static str, String)>>,
    next_id: Cell<u32>,
    active_unit: Cell<u32>,
    units: RefCell<HashMap<u32, GlId>>,
    pub textures: RefCell<HashMap<GlId, MockTexture>>,
    pub buffers: RefCell<HashMap<GlId, Vec<u8>>>,
    bound_buffers: RefCell<HashMap<u32, GlId>>,
    framebuffers: RefCell<Vec<GlId>>,
    framebuffer: Cell<GlId>,
    pub surfaces: RefCell<HashMap<GlId, Surfaces>>,
    clear_values: Cell<Surfaces>,
    write_mask: Cell<[bool; 4]>,
    depth_write: Cell<bool>,
    shaders: RefCell<HashMap<GlId, String>>,
    programs: RefCell<HashMap<GlId, Vec<GlId>>>,
    /// Uniforms every linked program reports.
    pub program_uniforms: RefCell<Vec<ActiveUniform>>,
    pub fail_link: Cell<bool>,
    pub float_uniforms: RefCell<HashMap<u32, Vec<f32>>>,
    pub int_uniforms: RefCell<HashMap<u32, Vec<i32>>>,
    pub debug_mode: Cell<Option<LogMode>>,
    /// Reported as `MAX_TEXTURE_IMAGE_UNITS`.
    pub texture_units: Cell<i32>,
}

impl MockGl {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            texture_units: Cell::new(32),
            ..Self::default()
        }
    }

    fn record(&self, name: &'static str, args: String) {
        self.calls.borrow_mut().push((name, args));
    }

    fn alloc(&self) -> GlId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Drains the call log.
    pub fn take_calls(&self) -> Vec<(&'static str, String)> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    /// Drains the call log, keeping only the names.
    pub fn names(&self) -> Vec<&'static str> {
        self.take_calls().into_iter().map(|(name, _)| name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.borrow().iter().filter(|(n, _)| *n == name).count()
    }

    pub fn last_args(&self, name: &str) -> Option<String> {
        self.calls
            .borrow()
            .iter()
            .rev()
            .find(|(n, _)| *n == name)
            .map(|(_, args)| args.clone())
    }

    pub fn set_uniforms(&self, uniforms: &[(&str, i32, u32)]) {
        *self.program_uniforms.borrow_mut() = uniforms
            .iter()
            .map(|&(name, size, utype)| ActiveUniform {
                name: name.to_owned(),
                size,
                utype,
            })
            .collect();
    }

    pub fn live_textures(&self) -> usize {
        self.textures.borrow().len()
    }

    pub fn buffer_len(&self, buffer: GlId) -> usize {
        self.buffers.borrow().get(&buffer).map_or(0, Vec::len)
    }

    pub fn surface(&self, framebuffer: GlId) -> Surfaces {
        self.surfaces
            .borrow()
            .get(&framebuffer)
            .copied()
            .unwrap_or_default()
    }

    fn bound_texture(&self) -> GlId {
        let unit = self.active_unit.get();
        self.units.borrow().get(&unit).copied().unwrap_or(0)
    }
}

impl GlApi for MockGl {
    fn enable(&self, cap: u32) {
        self.record("enable", format!("{cap:#x}"));
    }

    fn disable(&self, cap: u32) {
        self.record("disable", format!("{cap:#x}"));
    }

    fn get_parameter_i32(&self, pname: u32) -> i32 {
        self.record("get_parameter_i32", format!("{pname:#x}"));
        match pname {
            glow::MAX_TEXTURE_SIZE | glow::MAX_RENDERBUFFER_SIZE => 4096,
            glow::MAX_COLOR_ATTACHMENTS => 8,
            glow::MAX_TEXTURE_IMAGE_UNITS => self.texture_units.get(),
            glow::MAX_SAMPLES => 4,
            glow::MAX_ELEMENTS_INDICES | glow::MAX_ELEMENTS_VERTICES => 65535,
            _ => 0,
        }
    }

    fn get_parameter_string(&self, pname: u32) -> String {
        self.record("get_parameter_string", format!("{pname:#x}"));
        "Mock GL".to_owned()
    }

    fn pixel_store_i32(&self, pname: u32, value: i32) {
        self.record("pixel_store_i32", format!("{pname:#x}, {value}"));
    }

    fn supports_debug(&self) -> bool {
        true
    }

    fn set_debug_callback(&mut self, mode: LogMode) {
        self.record("set_debug_callback", format!("{mode}"));
        self.debug_mode.set(Some(mode));
    }

    fn use_program(&self, program: GlId) {
        self.record("use_program", format!("{program}"));
    }

    fn bind_framebuffer(&self, framebuffer: GlId) {
        self.record("bind_framebuffer", format!("{framebuffer}"));
        self.framebuffer.set(framebuffer);
    }

    fn draw_buffers(&self, buffers: &[u32]) {
        self.record("draw_buffers", format!("{buffers:?}"));
    }

    fn bind_vertex_array(&self, vertex_array: GlId) {
        self.record("bind_vertex_array", format!("{vertex_array}"));
    }

    fn active_texture(&self, unit: u32) {
        self.record("active_texture", format!("{unit}"));
        self.active_unit.set(unit);
    }

    fn bind_texture(&self, texture: GlId) {
        self.record("bind_texture", format!("{texture}"));
        self.units
            .borrow_mut()
            .insert(self.active_unit.get(), texture);
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record("viewport", format!("{x}, {y}, {width}, {height}"));
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record("scissor", format!("{x}, {y}, {width}, {height}"));
    }

    fn blend_equation_separate(&self, color: u32, alpha: u32) {
        self.record("blend_equation_separate", format!("{color:#x}, {alpha:#x}"));
    }

    fn blend_func_separate(&self, color_src: u32, color_dst: u32, alpha_src: u32, alpha_dst: u32) {
        self.record(
            "blend_func_separate",
            format!("{color_src:#x}, {color_dst:#x}, {alpha_src:#x}, {alpha_dst:#x}"),
        );
    }

    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool) {
        self.record("color_mask", format!("{r}, {g}, {b}, {a}"));
        self.write_mask.set([r, g, b, a]);
    }

    fn blend_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record("blend_color", format!("{r}, {g}, {b}, {a}"));
    }

    fn depth_func(&self, func: u32) {
        self.record("depth_func", format!("{func:#x}"));
    }

    fn depth_mask(&self, flag: bool) {
        self.record("depth_mask", format!("{flag}"));
        self.depth_write.set(flag);
    }

    fn cull_face(&self, face: u32) {
        self.record("cull_face", format!("{face:#x}"));
    }

    fn create_texture(&self) -> Result<GlId, String> {
        let id = self.alloc();
        self.record("create_texture", format!("{id}"));
        self.textures.borrow_mut().insert(id, MockTexture::default());
        Ok(id)
    }

    fn delete_texture(&self, texture: GlId) {
        self.record("delete_texture", format!("{texture}"));
        self.textures.borrow_mut().remove(&texture);
    }

    fn tex_parameter_i32(&self, pname: u32, value: i32) {
        self.record("tex_parameter_i32", format!("{pname:#x}, {value:#x}"));
    }

    fn tex_image_2d(
        &self,
        internal_format: u32,
        width: i32,
        height: i32,
        _format: u32,
        _ty: u32,
        pixels: Option<&[u8]>,
    ) {
        self.record(
            "tex_image_2d",
            format!("{internal_format:#x}, {width}, {height}"),
        );
        let id = self.bound_texture();
        if let Some(tex) = self.textures.borrow_mut().get_mut(&id) {
            tex.width = width;
            tex.height = height;
            tex.internal_format = internal_format;
            tex.data = pixels.map(<[u8]>::to_vec).unwrap_or_default();
        }
    }

    fn get_tex_image(&self, _format: u32, _ty: u32, pixels: &mut [u8]) {
        self.record("get_tex_image", String::new());
        let id = self.bound_texture();
        if let Some(tex) = self.textures.borrow().get(&id) {
            let n = pixels.len().min(tex.data.len());
            pixels[..n].copy_from_slice(&tex.data[..n]);
        }
    }

    fn create_framebuffer(&self) -> Result<GlId, String> {
        let id = self.alloc();
        self.record("create_framebuffer", format!("{id}"));
        self.framebuffers.borrow_mut().push(id);
        Ok(id)
    }

    fn delete_framebuffer(&self, framebuffer: GlId) {
        self.record("delete_framebuffer", format!("{framebuffer}"));
        self.framebuffers.borrow_mut().retain(|f| *f != framebuffer);
    }

    fn framebuffer_texture_2d(&self, attachment: u32, texture: GlId) {
        self.record(
            "framebuffer_texture_2d",
            format!("{attachment:#x}, {texture}"),
        );
    }

    fn create_shader(&self, kind: u32) -> Result<GlId, String> {
        let id = self.alloc();
        self.record("create_shader", format!("{kind:#x}"));
        self.shaders.borrow_mut().insert(id, String::new());
        Ok(id)
    }

    fn shader_source(&self, shader: GlId, source: &str) {
        self.record("shader_source", format!("{shader}"));
        self.shaders.borrow_mut().insert(shader, source.to_owned());
    }

    fn compile_shader(&self, shader: GlId) {
        self.record("compile_shader", format!("{shader}"));
    }

    fn get_shader_compile_status(&self, shader: GlId) -> bool {
        self.shaders
            .borrow()
            .get(&shader)
            .is_some_and(|src| !src.contains(FAIL_COMPILE))
    }

    fn get_shader_info_log(&self, shader: GlId) -> String {
        if self.get_shader_compile_status(shader) {
            String::new()
        } else {
            "0:1(1): error: mock compile failure".to_owned()
        }
    }

    fn delete_shader(&self, shader: GlId) {
        self.record("delete_shader", format!("{shader}"));
        self.shaders.borrow_mut().remove(&shader);
    }

    fn create_program(&self) -> Result<GlId, String> {
        let id = self.alloc();
        self.record("create_program", format!("{id}"));
        self.programs.borrow_mut().insert(id, Vec::new());
        Ok(id)
    }

    fn attach_shader(&self, program: GlId, shader: GlId) {
        self.record("attach_shader", format!("{program}, {shader}"));
        if let Some(attached) = self.programs.borrow_mut().get_mut(&program) {
            attached.push(shader);
        }
    }

    fn detach_shader(&self, program: GlId, shader: GlId) {
        self.record("detach_shader", format!("{program}, {shader}"));
        if let Some(attached) = self.programs.borrow_mut().get_mut(&program) {
            attached.retain(|s| *s != shader);
        }
    }

    fn link_program(&self, program: GlId) {
        self.record("link_program", format!("{program}"));
    }

    fn get_program_link_status(&self, _program: GlId) -> bool {
        !self.fail_link.get()
    }

    fn get_program_info_log(&self, _program: GlId) -> String {
        if self.fail_link.get() {
            "error: mock link failure".to_owned()
        } else {
            String::new()
        }
    }

    fn delete_program(&self, program: GlId) {
        self.record("delete_program", format!("{program}"));
        self.programs.borrow_mut().remove(&program);
    }

    fn get_active_uniforms(&self, _program: GlId) -> u32 {
        self.program_uniforms.borrow().len() as u32
    }

    fn get_active_uniform(&self, _program: GlId, index: u32) -> Option<ActiveUniform> {
        self.program_uniforms.borrow().get(index as usize).cloned()
    }

    fn get_uniform_location(&self, _program: GlId, name: &str) -> Option<u32> {
        self.program_uniforms
            .borrow()
            .iter()
            .position(|u| u.name == name)
            .map(|i| i as u32)
    }

    fn uniform_1_f32_slice(&self, location: u32, values: &[f32]) {
        self.record("uniform_1_f32_slice", format!("{location}"));
        self.float_uniforms
            .borrow_mut()
            .insert(location, values.to_vec());
    }

    fn uniform_2_f32_slice(&self, location: u32, values: &[f32]) {
        self.record("uniform_2_f32_slice", format!("{location}"));
        self.float_uniforms
            .borrow_mut()
            .insert(location, values.to_vec());
    }

    fn uniform_3_f32_slice(&self, location: u32, values: &[f32]) {
        self.record("uniform_3_f32_slice", format!("{location}"));
        self.float_uniforms
            .borrow_mut()
            .insert(location, values.to_vec());
    }

    fn uniform_4_f32_slice(&self, location: u32, values: &[f32]) {
        self.record("uniform_4_f32_slice", format!("{location}"));
        self.float_uniforms
            .borrow_mut()
            .insert(location, values.to_vec());
    }

    fn uniform_matrix_3x2_f32_slice(&self, location: u32, values: &[f32]) {
        self.record("uniform_matrix_3x2_f32_slice", format!("{location}"));
        self.float_uniforms
            .borrow_mut()
            .insert(location, values.to_vec());
    }

    fn uniform_matrix_4_f32_slice(&self, location: u32, values: &[f32]) {
        self.record("uniform_matrix_4_f32_slice", format!("{location}"));
        self.float_uniforms
            .borrow_mut()
            .insert(location, values.to_vec());
    }

    fn uniform_1_i32_slice(&self, location: u32, values: &[i32]) {
        self.record("uniform_1_i32_slice", format!("{location}, {values:?}"));
        self.int_uniforms
            .borrow_mut()
            .insert(location, values.to_vec());
    }

    fn create_vertex_array(&self) -> Result<GlId, String> {
        let id = self.alloc();
        self.record("create_vertex_array", format!("{id}"));
        Ok(id)
    }

    fn delete_vertex_array(&self, vertex_array: GlId) {
        self.record("delete_vertex_array", format!("{vertex_array}"));
    }

    fn create_buffer(&self) -> Result<GlId, String> {
        let id = self.alloc();
        self.record("create_buffer", format!("{id}"));
        self.buffers.borrow_mut().insert(id, Vec::new());
        Ok(id)
    }

    fn delete_buffer(&self, buffer: GlId) {
        self.record("delete_buffer", format!("{buffer}"));
        self.buffers.borrow_mut().remove(&buffer);
    }

    fn bind_buffer(&self, target: u32, buffer: GlId) {
        self.record("bind_buffer", format!("{target:#x}, {buffer}"));
        self.bound_buffers.borrow_mut().insert(target, buffer);
    }

    fn buffer_data_size(&self, target: u32, size: i32, usage: u32) {
        self.record("buffer_data_size", format!("{target:#x}, {size}, {usage:#x}"));
        let id = self.bound_buffers.borrow().get(&target).copied().unwrap_or(0);
        if let Some(buffer) = self.buffers.borrow_mut().get_mut(&id) {
            *buffer = vec![0; size as usize];
        }
    }

    fn buffer_sub_data(&self, target: u32, offset: i32, data: &[u8]) {
        self.record("buffer_sub_data", format!("{target:#x}, {offset}, {}", data.len()));
        let id = self.bound_buffers.borrow().get(&target).copied().unwrap_or(0);
        if let Some(buffer) = self.buffers.borrow_mut().get_mut(&id) {
            let start = offset as usize;
            assert!(
                start + data.len() <= buffer.len(),
                "buffer_sub_data past the end of buffer {id}"
            );
            buffer[start..start + data.len()].copy_from_slice(data);
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record("enable_vertex_attrib_array", format!("{index}"));
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
        self.record(
            "vertex_attrib_pointer",
            format!("{index}, {size}, {ty:#x}, {normalized}, {stride}, {offset}"),
        );
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        self.record("vertex_attrib_divisor", format!("{index}, {divisor}"));
    }

    fn draw_elements(&self, mode: u32, count: i32, ty: u32, offset: i32) {
        self.record(
            "draw_elements",
            format!("{mode:#x}, {count}, {ty:#x}, {offset}"),
        );
    }

    fn draw_elements_instanced(&self, mode: u32, count: i32, ty: u32, offset: i32, instances: i32) {
        self.record(
            "draw_elements_instanced",
            format!("{mode:#x}, {count}, {ty:#x}, {offset}, {instances}"),
        );
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record("clear_color", format!("{r}, {g}, {b}, {a}"));
        let mut values = self.clear_values.get();
        values.color = [r, g, b, a];
        self.clear_values.set(values);
    }

    fn clear_depth(&self, depth: f32) {
        self.record("clear_depth", format!("{depth}"));
        let mut values = self.clear_values.get();
        values.depth = depth;
        self.clear_values.set(values);
    }

    fn clear_stencil(&self, stencil: i32) {
        self.record("clear_stencil", format!("{stencil}"));
        let mut values = self.clear_values.get();
        values.stencil = stencil;
        self.clear_values.set(values);
    }

    fn clear(&self, mask: u32) {
        self.record("clear", format!("{mask:#x}"));
        let values = self.clear_values.get();
        let framebuffer = self.framebuffer.get();
        let mut surfaces = self.surfaces.borrow_mut();
        let surface = surfaces.entry(framebuffer).or_default();
        if mask & glow::COLOR_BUFFER_BIT != 0 {
            for (channel, writable) in self.write_mask.get().into_iter().enumerate() {
                if writable {
                    surface.color[channel] = values.color[channel];
                }
            }
        }
        if mask & glow::DEPTH_BUFFER_BIT != 0 && self.depth_write.get() {
            surface.depth = values.depth;
        }
        if mask & glow::STENCIL_BUFFER_BIT != 0 {
            surface.stencil = values.stencil;
        }
    }
}

/// A context around [`MockGl`] with a fixed drawable size.
pub struct MockContext {
    pub gl: MockGl,
    pub size: (u32, u32),
    pub swaps: usize,
}

impl MockContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            gl: MockGl::new(),
            size: (width, height),
            swaps: 0,
        }
    }
}

impl GlContext for MockContext {
    type Gl = MockGl;

    fn gl(&self) -> &MockGl {
        &self.gl
    }

    fn gl_mut(&mut self) -> &mut MockGl {
        &mut self.gl
    }

    fn drawable_size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn swap_buffers(&mut self) -> Result<(), GfxError> {
        self.swaps += 1;
        Ok(())
    }
}
