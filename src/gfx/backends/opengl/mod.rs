//! OpenGL 3.3 core backend.
//!
//! [`OpenGlBackend`] is what selection hands out; [`Backend::initialize`]
//! turns it into an [`OpenGlDevice`] that owns the context, the state cache
//! and every GPU object created through it.

pub mod api;
pub mod context;
pub mod convert;
pub mod debug;
pub mod shader;
pub mod state;

#[cfg(test)]
pub(crate) mod mock;

use crate::config::GfxConfig;
use crate::gfx::{
    Backend, ClearCommand, ClearMask, ColorMask, ContextHints, DrawCommand, GfxError, IndexFormat,
    MAX_TARGET_ATTACHMENTS, MAX_UNIFORM_TEXTURES, MAX_VERTEX_FORMAT_ELEMENTS, MeshId,
    RenderDevice, Renderer, ShaderData, ShaderId, Surface, TargetId, TextureFormat, TextureId,
    TextureSampler, UniformInfo, UniformType, VertexFormat,
};
use crate::logging::LogMode;
use api::{GlApi, GlId};
use context::{GlContext, GlutinContext};
use convert::FormatTriple;
use log::{debug, error, info, warn};
use shader::{Uniform, Units};
use slotmap::SlotMap;
use smallvec::SmallVec;
use state::StateCache;
use std::fmt::Debug;

pub const AVAILABLE: bool = true;

const HINTS: ContextHints = ContextHints {
    major_version: 3,
    minor_version: 3,
    core_profile: true,
    forward_compatible: true,
    double_buffer: true,
    depth_bits: 24,
    stencil_bits: 8,
    samples: 4,
};

pub type Connector<C> = fn(&dyn Surface, &ContextHints, &GfxConfig) -> Result<C, GfxError>;

pub struct OpenGlBackend<C: GlContext = GlutinContext> {
    config: GfxConfig,
    connect: Connector<C>,
}

impl OpenGlBackend<GlutinContext> {
    pub fn new(config: GfxConfig) -> Self {
        Self::with_connector(config, context::connect)
    }
}

impl<C: GlContext> OpenGlBackend<C> {
    pub fn with_connector(config: GfxConfig, connect: Connector<C>) -> Self {
        Self { config, connect }
    }
}

impl<C: GlContext + 'static> Backend for OpenGlBackend<C> {
    fn renderer(&self) -> Renderer {
        Renderer::OpenGl
    }

    fn prepare(&mut self) -> ContextHints {
        debug!("OpenGL context hints: {HINTS:?}");
        HINTS
    }

    fn initialize(
        self: Box<Self>,
        surface: &dyn Surface,
    ) -> Result<Box<dyn RenderDevice>, GfxError> {
        info!("Initializing OpenGL backend...");
        let ctx = (self.connect)(surface, &HINTS, &self.config)?;
        Ok(Box::new(OpenGlDevice::new(ctx, &self.config)))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Limits {
    pub max_color_attachments: i32,
    pub max_element_indices: i32,
    pub max_element_vertices: i32,
    pub max_renderbuffer_size: i32,
    pub max_samples: i32,
    pub max_texture_image_units: i32,
    pub max_texture_size: i32,
}

impl Limits {
    fn query<G: GlApi + ?Sized>(gl: &G) -> Self {
        Self {
            max_color_attachments: gl.get_parameter_i32(glow::MAX_COLOR_ATTACHMENTS),
            max_element_indices: gl.get_parameter_i32(glow::MAX_ELEMENTS_INDICES),
            max_element_vertices: gl.get_parameter_i32(glow::MAX_ELEMENTS_VERTICES),
            max_renderbuffer_size: gl.get_parameter_i32(glow::MAX_RENDERBUFFER_SIZE),
            max_samples: gl.get_parameter_i32(glow::MAX_SAMPLES),
            max_texture_image_units: gl.get_parameter_i32(glow::MAX_TEXTURE_IMAGE_UNITS),
            max_texture_size: gl.get_parameter_i32(glow::MAX_TEXTURE_SIZE),
        }
    }

    pub fn texture_units(&self) -> usize {
        usize::try_from(self.max_texture_image_units)
            .unwrap_or(0)
            .min(MAX_UNIFORM_TEXTURES)
    }
}

struct Texture {
    id: GlId,
    width: i32,
    height: i32,
    format: TextureFormat,
    gl_format: FormatTriple,
    // Applied lazily at draw.
    sampler: Option<TextureSampler>,
    // Caller's handle plus one per shader unit holding it.
    ref_count: u32,
    // GL object gone; the record lives until `ref_count` hits zero.
    disposed: bool,
}

impl Texture {
    #[inline(always)]
    fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

struct Target {
    framebuffer: GlId,
    width: i32,
    height: i32,
    attachments: SmallVec<[TextureId; MAX_TARGET_ATTACHMENTS]>,
    draw_buffers: SmallVec<[u32; MAX_TARGET_ATTACHMENTS]>,
}

struct Shader {
    program: GlId,
    uniforms: Vec<Uniform>,
    units: Units,
}

#[derive(Clone, Copy, Debug, Default)]
struct Buffer {
    id: GlId,
    capacity: usize,
}

impl Buffer {
    fn ensure<G: GlApi + ?Sized>(&mut self, gl: &G) -> Result<GlId, GfxError> {
        if self.id == 0 {
            self.id = gl.create_buffer()?;
        }
        Ok(self.id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stream {
    Vertex,
    Index,
    Instance,
}

impl Stream {
    const fn target(self) -> u32 {
        match self {
            Self::Vertex | Self::Instance => glow::ARRAY_BUFFER,
            Self::Index => glow::ELEMENT_ARRAY_BUFFER,
        }
    }
}

struct Mesh {
    vertex_array: GlId,
    vertex: Buffer,
    index: Buffer,
    instance: Buffer,
    index_format: IndexFormat,
}

impl Mesh {
    fn buffer_mut(&mut self, stream: Stream) -> &mut Buffer {
        match stream {
            Stream::Vertex => &mut self.vertex,
            Stream::Index => &mut self.index,
            Stream::Instance => &mut self.instance,
        }
    }
}

pub struct OpenGlDevice<C: GlContext> {
    ctx: C,
    state: StateCache,
    limits: Limits,
    textures: SlotMap<TextureId, Texture>,
    targets: SlotMap<TargetId, Target>,
    shaders: SlotMap<ShaderId, Shader>,
    meshes: SlotMap<MeshId, Mesh>,
}

#[inline(always)]
fn backbuffer<C: GlContext>(ctx: &C) -> (i32, i32) {
    let (w, h) = ctx.drawable_size();
    (w as i32, h as i32)
}

#[inline(always)]
fn invalid(kind: &'static str, id: impl Debug) {
    error!("{}: {id:?}", GfxError::InvalidHandle(kind));
}

fn release_texture(textures: &mut SlotMap<TextureId, Texture>, id: TextureId) {
    let Some(tex) = textures.get_mut(id) else {
        return;
    };
    tex.ref_count = tex.ref_count.saturating_sub(1);
    if tex.ref_count == 0 {
        if !tex.disposed {
            error!("Texture {id:?} is being freed without deleting its GPU data");
        }
        textures.remove(id);
    }
}

fn apply_sampler<G: GlApi + ?Sized>(gl: &G, sampler: TextureSampler) {
    let filter = convert::filter(sampler.filter);
    gl.tex_parameter_i32(glow::TEXTURE_MIN_FILTER, filter);
    gl.tex_parameter_i32(glow::TEXTURE_MAG_FILTER, filter);
    gl.tex_parameter_i32(glow::TEXTURE_WRAP_S, convert::wrap(sampler.wrap_x));
    gl.tex_parameter_i32(glow::TEXTURE_WRAP_T, convert::wrap(sampler.wrap_y));
}

impl<C: GlContext> OpenGlDevice<C> {
    pub fn new(mut ctx: C, config: &GfxConfig) -> Self {
        if config.logging != LogMode::None && ctx.gl().supports_debug() {
            let gl = ctx.gl();
            gl.enable(glow::DEBUG_OUTPUT);
            gl.enable(glow::DEBUG_OUTPUT_SYNCHRONOUS);
            ctx.gl_mut().set_debug_callback(config.logging);
        }

        let gl = ctx.gl();
        let limits = Limits::query(gl);
        debug!("OpenGL limits: {limits:?}");

        gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        gl.enable(glow::BLEND);

        let mut state = StateCache::new();
        state.reset(gl, backbuffer(&ctx));

        info!(
            "OpenGL {}, {}",
            gl.get_parameter_string(glow::VERSION),
            gl.get_parameter_string(glow::RENDERER)
        );

        Self {
            ctx,
            state,
            limits,
            textures: SlotMap::with_key(),
            targets: SlotMap::with_key(),
            shaders: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
        }
    }

    #[inline(always)]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    fn check_size(&self, width: i32, height: i32) -> Result<(), GfxError> {
        if width <= 0 || height <= 0 {
            return Err(GfxError::InvalidDimensions { width, height });
        }
        let max = self.limits.max_texture_size;
        if width > max || height > max {
            return Err(GfxError::TextureTooLarge { max });
        }
        Ok(())
    }

    fn live_texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id).filter(|t| !t.disposed)
    }

    fn try_texture_create(
        &mut self,
        width: i32,
        height: i32,
        format: TextureFormat,
    ) -> Result<TextureId, GfxError> {
        self.check_size(width, height)?;

        let gl = self.ctx.gl();
        let id = gl.create_texture()?;
        let gl_format = convert::texture_format(format);
        self.state.select_texture(gl, 0, id);
        gl.tex_image_2d(
            gl_format.internal,
            width,
            height,
            gl_format.format,
            gl_format.ty,
            None,
        );

        Ok(self.textures.insert(Texture {
            id,
            width,
            height,
            format,
            gl_format,
            sampler: None,
            ref_count: 1,
            disposed: false,
        }))
    }

    fn dispose_texture(&mut self, id: TextureId) -> bool {
        let Some(tex) = self.textures.get_mut(id).filter(|t| !t.disposed) else {
            return false;
        };
        self.ctx.gl().delete_texture(tex.id);
        self.state.forget_texture(tex.id);
        tex.disposed = true;
        release_texture(&mut self.textures, id);
        true
    }

    fn try_target_create(
        &mut self,
        width: i32,
        height: i32,
        attachments: &[TextureFormat],
    ) -> Result<TargetId, GfxError> {
        if attachments.len() > MAX_TARGET_ATTACHMENTS {
            return Err(GfxError::InvalidTarget(format!(
                "{} attachments requested, at most {MAX_TARGET_ATTACHMENTS} are supported",
                attachments.len()
            )));
        }
        if attachments.iter().filter(|f| f.is_depth_stencil()).count() > 1 {
            return Err(GfxError::InvalidTarget(
                "more than one depth/stencil attachment".into(),
            ));
        }
        self.check_size(width, height)?;

        let framebuffer = self.ctx.gl().create_framebuffer()?;
        self.ctx.gl().bind_framebuffer(framebuffer);

        let mut textures: SmallVec<[TextureId; MAX_TARGET_ATTACHMENTS]> = SmallVec::new();
        let mut draw_buffers: SmallVec<[u32; MAX_TARGET_ATTACHMENTS]> = SmallVec::new();
        for &format in attachments {
            let texture = match self.try_texture_create(width, height, format) {
                Ok(texture) => texture,
                Err(err) => {
                    for texture in textures {
                        self.dispose_texture(texture);
                    }
                    let gl = self.ctx.gl();
                    gl.delete_framebuffer(framebuffer);
                    gl.bind_framebuffer(self.state.framebuffer());
                    return Err(err);
                }
            };
            let attachment = if format.is_depth_stencil() {
                glow::DEPTH_STENCIL_ATTACHMENT
            } else {
                let slot = glow::COLOR_ATTACHMENT0 + draw_buffers.len() as u32;
                draw_buffers.push(slot);
                slot
            };
            let gl_id = self.textures.get(texture).map_or(0, |t| t.id);
            self.ctx.gl().framebuffer_texture_2d(attachment, gl_id);
            textures.push(texture);
        }

        // Draw buffers belong to the framebuffer object; restore the cached
        // binding afterwards so the cache stays truthful.
        let gl = self.ctx.gl();
        gl.draw_buffers(&draw_buffers);
        gl.bind_framebuffer(self.state.framebuffer());

        Ok(self.targets.insert(Target {
            framebuffer,
            width,
            height,
            attachments: textures,
            draw_buffers,
        }))
    }

    fn bind_target(&mut self, target: Option<TargetId>) -> Result<(), GfxError> {
        let gl = self.ctx.gl();
        match target {
            None => {
                let size = backbuffer(&self.ctx);
                self.state.bind_framebuffer(gl, 0, size, &[glow::BACK]);
            }
            Some(id) => {
                let t = self
                    .targets
                    .get(id)
                    .ok_or(GfxError::InvalidHandle("target"))?;
                self.state
                    .bind_framebuffer(gl, t.framebuffer, (t.width, t.height), &t.draw_buffers);
            }
        }
        Ok(())
    }

    fn try_shader_create(&mut self, data: &ShaderData<'_>) -> Result<ShaderId, GfxError> {
        if data.vertex.is_empty() {
            return Err(GfxError::ShaderCompile("Invalid Vertex Shader".into()));
        }
        if data.fragment.is_empty() {
            return Err(GfxError::ShaderCompile("Invalid Fragment Shader".into()));
        }

        let gl = self.ctx.gl();
        let compile = |kind, src: &str, stage: &str| -> Result<GlId, GfxError> {
            let sh = gl.create_shader(kind)?;
            gl.shader_source(sh, src);
            gl.compile_shader(sh);
            let log = gl.get_shader_info_log(sh);
            if !gl.get_shader_compile_status(sh) {
                gl.delete_shader(sh);
                return Err(GfxError::ShaderCompile(format!("{stage} shader: {log}")));
            }
            if !log.is_empty() {
                info!("{stage} shader: {log}");
            }
            Ok(sh)
        };

        let vert = compile(glow::VERTEX_SHADER, data.vertex, "Vertex")?;
        let frag = match compile(glow::FRAGMENT_SHADER, data.fragment, "Fragment") {
            Ok(frag) => frag,
            Err(err) => {
                gl.delete_shader(vert);
                return Err(err);
            }
        };
        let program = match gl.create_program() {
            Ok(program) => program,
            Err(err) => {
                gl.delete_shader(vert);
                gl.delete_shader(frag);
                return Err(err.into());
            }
        };

        gl.attach_shader(program, vert);
        gl.attach_shader(program, frag);
        gl.link_program(program);
        let linked = gl.get_program_link_status(program);
        let log = gl.get_program_info_log(program);
        gl.detach_shader(program, vert);
        gl.detach_shader(program, frag);
        gl.delete_shader(vert);
        gl.delete_shader(frag);

        if !linked {
            gl.delete_program(program);
            return Err(GfxError::ShaderLink(log));
        }
        if !log.is_empty() {
            info!("Shader program: {log}");
        }

        let uniforms = shader::reflect(gl, program, self.limits.texture_units());
        Ok(self.shaders.insert(Shader {
            program,
            uniforms,
            units: Units::default(),
        }))
    }

    fn texture_uniform(&self, id: ShaderId, index: usize) -> Option<(usize, usize)> {
        let Some(shader) = self.shaders.get(id) else {
            invalid("shader", id);
            return None;
        };
        let Some(uniform) = shader.uniforms.get(index) else {
            error!(
                "Uniform index {index} is out of range ({} uniforms)",
                shader.uniforms.len()
            );
            return None;
        };
        if uniform.ty != UniformType::Texture2D {
            error!("Uniform '{}' is not a texture/sampler", uniform.name);
            return None;
        }
        Some((uniform.sampler_index, uniform.array_elements))
    }

    fn set_attributes(&mut self, id: MeshId, stream: Stream, format: &VertexFormat) {
        if format.elements.len() > MAX_VERTEX_FORMAT_ELEMENTS {
            error!(
                "Vertex format has {} elements, at most {MAX_VERTEX_FORMAT_ELEMENTS} are supported",
                format.elements.len()
            );
            return;
        }
        let Some(mesh) = self.meshes.get_mut(id) else {
            invalid("mesh", id);
            return;
        };

        let gl = self.ctx.gl();
        self.state.bind_array(gl, mesh.vertex_array);
        let buffer = match mesh.buffer_mut(stream).ensure(gl) {
            Ok(buffer) => buffer,
            Err(err) => {
                error!("Failed to create mesh buffer: {err}");
                return;
            }
        };
        gl.bind_buffer(glow::ARRAY_BUFFER, buffer);

        let divisor = u32::from(stream == Stream::Instance);
        let mut offset = 0usize;
        for element in &format.elements {
            let (ty, components) = convert::vertex_type(element.ty);
            gl.enable_vertex_attrib_array(element.index);
            gl.vertex_attrib_pointer(
                element.index,
                components,
                ty,
                element.normalized,
                format.stride as i32,
                offset as i32,
            );
            gl.vertex_attrib_divisor(element.index, divisor);
            offset += element.ty.size();
        }
    }

    // Grows but never shrinks.
    fn upload(&mut self, id: MeshId, stream: Stream, data: &[u8], offset: usize) {
        let Some(mesh) = self.meshes.get_mut(id) else {
            invalid("mesh", id);
            return;
        };
        let total = offset.saturating_add(data.len());
        let (Ok(gl_total), Ok(gl_offset)) = (i32::try_from(total), i32::try_from(offset)) else {
            error!(
                "Mesh upload of {} bytes at offset {offset}: {}",
                data.len(),
                GfxError::OutOfRange("buffer size")
            );
            return;
        };

        let gl = self.ctx.gl();
        self.state.bind_array(gl, mesh.vertex_array);
        let buffer = mesh.buffer_mut(stream);
        if let Err(err) = buffer.ensure(gl) {
            error!("Failed to create mesh buffer: {err}");
            return;
        }
        let target = stream.target();
        gl.bind_buffer(target, buffer.id);

        if total > buffer.capacity {
            buffer.capacity = total;
            gl.buffer_data_size(target, gl_total, glow::DYNAMIC_DRAW);
        }
        gl.buffer_sub_data(target, gl_offset, data);
    }

    fn try_draw(&mut self, cmd: &DrawCommand) -> Result<(), GfxError> {
        let mesh = self
            .meshes
            .get(cmd.mesh)
            .ok_or(GfxError::InvalidHandle("mesh"))?;
        let (vertex_array, index_format) = (mesh.vertex_array, mesh.index_format);
        let offset = index_format
            .size()
            .checked_mul(cmd.index_start)
            .and_then(|bytes| i32::try_from(bytes).ok())
            .ok_or(GfxError::OutOfRange("index start"))?;
        let count =
            i32::try_from(cmd.index_count).map_err(|_| GfxError::OutOfRange("index count"))?;
        let instances = i32::try_from(cmd.instance_count)
            .map_err(|_| GfxError::OutOfRange("instance count"))?;
        let program = self
            .shaders
            .get(cmd.shader)
            .ok_or(GfxError::InvalidHandle("shader"))?
            .program;

        self.bind_target(cmd.target)?;

        let gl = self.ctx.gl();
        let state = &mut self.state;
        state.bind_program(gl, program);
        state.bind_array(gl, vertex_array);
        state.set_blend(gl, &cmd.blend);
        state.set_compare(gl, cmd.compare);
        state.set_depth_mask(gl, cmd.depth_mask);
        state.set_cull(gl, cmd.cull);
        state.set_viewport(gl, cmd.viewport);
        state.set_scissor(gl, cmd.scissor);

        let shader = self
            .shaders
            .get(cmd.shader)
            .ok_or(GfxError::InvalidHandle("shader"))?;
        let mut units: SmallVec<[i32; MAX_UNIFORM_TEXTURES]> = SmallVec::new();
        for uniform in shader.uniforms.iter().filter(|u| u.ty == UniformType::Texture2D) {
            units.clear();
            let start = uniform.sampler_index;
            for unit in start..start + uniform.array_elements {
                let live = shader.units.textures[unit]
                    .and_then(|id| self.textures.get_mut(id))
                    .filter(|t| !t.disposed);
                match live {
                    Some(tex) => {
                        state.bind_texture(gl, unit, tex.id);
                        let sampler = shader.units.samplers[unit];
                        if tex.sampler != Some(sampler) {
                            state.set_active_unit(gl, unit as u32);
                            apply_sampler(gl, sampler);
                            tex.sampler = Some(sampler);
                        }
                    }
                    None => state.bind_texture(gl, unit, 0),
                }
                units.push(unit as i32);
            }
            gl.uniform_1_i32_slice(uniform.location, &units);
        }

        let index_type = convert::index_type(index_format);
        if instances > 0 {
            gl.draw_elements_instanced(glow::TRIANGLES, count, index_type, offset, instances);
        } else {
            gl.draw_elements(glow::TRIANGLES, count, index_type, offset);
        }
        Ok(())
    }

    fn try_clear(&mut self, cmd: &ClearCommand) -> Result<(), GfxError> {
        self.bind_target(cmd.target)?;

        let gl = self.ctx.gl();
        self.state.set_viewport(gl, None);
        self.state.set_scissor(gl, None);

        let mut bits = 0;
        if cmd.mask.contains(ClearMask::COLOR) {
            bits |= glow::COLOR_BUFFER_BIT;
            self.state.set_color_mask(gl, ColorMask::RGBA);
            let [r, g, b, a] = cmd.color.to_f32();
            gl.clear_color(r, g, b, a);
        }
        if cmd.mask.contains(ClearMask::DEPTH) {
            bits |= glow::DEPTH_BUFFER_BIT;
            self.state.set_depth_mask(gl, true);
            gl.clear_depth(cmd.depth);
        }
        if cmd.mask.contains(ClearMask::STENCIL) {
            bits |= glow::STENCIL_BUFFER_BIT;
            gl.clear_stencil(cmd.stencil);
        }
        if bits != 0 {
            gl.clear(bits);
        }
        Ok(())
    }
}

impl<C: GlContext> RenderDevice for OpenGlDevice<C> {
    fn renderer(&self) -> Renderer {
        Renderer::OpenGl
    }

    fn shutdown(&mut self) {
        info!("Cleaning up OpenGL resources...");
        let gl = self.ctx.gl();
        for (_, shader) in self.shaders.drain() {
            gl.delete_program(shader.program);
        }
        for (_, mesh) in self.meshes.drain() {
            for buffer in [mesh.vertex, mesh.index, mesh.instance] {
                if buffer.id != 0 {
                    gl.delete_buffer(buffer.id);
                }
            }
            gl.delete_vertex_array(mesh.vertex_array);
        }
        for (_, target) in self.targets.drain() {
            gl.delete_framebuffer(target.framebuffer);
        }
        for (_, texture) in self.textures.drain() {
            if !texture.disposed {
                gl.delete_texture(texture.id);
            }
        }
        self.state = StateCache::new();
        info!("OpenGL resources cleaned up.");
    }

    fn frame_begin(&mut self) {}

    fn frame_end(&mut self) {
        // Some platforms require the backbuffer bound when presenting.
        if let Err(err) = self.bind_target(None) {
            error!("{err}");
        }
        if let Err(err) = self.ctx.swap_buffers() {
            error!("Failed to present frame: {err}");
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            warn!("Ignoring resize to zero dimensions.");
            return;
        }
        self.ctx.resize(width, height);
    }

    // --- Textures ---

    fn texture_create(
        &mut self,
        width: i32,
        height: i32,
        format: TextureFormat,
    ) -> Option<TextureId> {
        self.try_texture_create(width, height, format)
            .inspect_err(|err| error!("Failed to create texture: {err}"))
            .ok()
    }

    fn texture_set_data(&mut self, id: TextureId, data: &[u8]) {
        let Some(tex) = self.textures.get(id).filter(|t| !t.disposed) else {
            invalid("texture", id);
            return;
        };
        let len = tex.byte_len();
        if data.len() < len {
            error!(
                "Texture data is {} bytes, a {}x{} {:?} texture needs {len}",
                data.len(),
                tex.width,
                tex.height,
                tex.format
            );
            return;
        }
        let gl = self.ctx.gl();
        let f = tex.gl_format;
        self.state.select_texture(gl, 0, tex.id);
        gl.tex_image_2d(
            f.internal,
            tex.width,
            tex.height,
            f.format,
            f.ty,
            Some(&data[..len]),
        );
    }

    fn texture_get_data(&mut self, id: TextureId, data: &mut [u8]) {
        let Some(tex) = self.textures.get(id).filter(|t| !t.disposed) else {
            invalid("texture", id);
            return;
        };
        let len = tex.byte_len();
        if data.len() < len {
            error!(
                "Texture readback buffer is {} bytes, {len} needed",
                data.len()
            );
            return;
        }
        let gl = self.ctx.gl();
        self.state.select_texture(gl, 0, tex.id);
        gl.get_tex_image(tex.gl_format.format, tex.gl_format.ty, &mut data[..len]);
    }

    fn texture_destroy(&mut self, id: TextureId) {
        if !self.dispose_texture(id) {
            invalid("texture", id);
        }
    }

    // --- Targets ---

    fn target_create(
        &mut self,
        width: i32,
        height: i32,
        attachments: &[TextureFormat],
    ) -> Option<TargetId> {
        self.try_target_create(width, height, attachments)
            .inspect_err(|err| error!("Failed to create target: {err}"))
            .ok()
    }

    fn target_get_attachment(&self, id: TargetId, index: usize) -> Option<TextureId> {
        let Some(target) = self.targets.get(id) else {
            invalid("target", id);
            return None;
        };
        let attachment = target.attachments.get(index).copied();
        if attachment.is_none() {
            error!(
                "Target {id:?} has {} attachments, index {index} requested",
                target.attachments.len()
            );
        }
        attachment
    }

    fn target_destroy(&mut self, id: TargetId) {
        let Some(target) = self.targets.remove(id) else {
            invalid("target", id);
            return;
        };
        for texture in target.attachments {
            self.dispose_texture(texture);
        }
        self.ctx.gl().delete_framebuffer(target.framebuffer);
        self.state.forget_framebuffer(target.framebuffer);
    }

    // --- Shaders ---

    fn shader_create(&mut self, data: &ShaderData<'_>) -> Option<ShaderId> {
        self.try_shader_create(data)
            .inspect_err(|err| error!("Failed to create shader: {err}"))
            .ok()
    }

    fn shader_get_uniforms(&self, id: ShaderId) -> Vec<UniformInfo> {
        match self.shaders.get(id) {
            Some(shader) => shader::describe(&shader.uniforms),
            None => {
                invalid("shader", id);
                Vec::new()
            }
        }
    }

    fn shader_set_uniform(&mut self, id: ShaderId, index: usize, values: &[f32]) {
        let Some(shader) = self.shaders.get(id) else {
            invalid("shader", id);
            return;
        };
        let Some(uniform) = shader.uniforms.get(index) else {
            error!(
                "Uniform index {index} is out of range ({} uniforms)",
                shader.uniforms.len()
            );
            return;
        };
        let per_element = uniform.ty.float_count();
        if per_element == 0 {
            error!("Uniform '{}' is a texture and takes no values", uniform.name);
            return;
        }
        let needed = per_element * uniform.array_elements;
        if values.len() < needed {
            error!(
                "Uniform '{}' needs {needed} floats, {} given",
                uniform.name,
                values.len()
            );
            return;
        }

        let gl = self.ctx.gl();
        self.state.bind_program(gl, shader.program);
        let (location, values) = (uniform.location, &values[..needed]);
        match uniform.ty {
            UniformType::Float => gl.uniform_1_f32_slice(location, values),
            UniformType::Float2 => gl.uniform_2_f32_slice(location, values),
            UniformType::Float3 => gl.uniform_3_f32_slice(location, values),
            UniformType::Float4 => gl.uniform_4_f32_slice(location, values),
            UniformType::Mat3x2 => gl.uniform_matrix_3x2_f32_slice(location, values),
            UniformType::Mat4x4 => gl.uniform_matrix_4_f32_slice(location, values),
            UniformType::Texture2D | UniformType::Sampler2D => {}
        }
    }

    fn shader_set_texture(&mut self, id: ShaderId, index: usize, textures: &[Option<TextureId>]) {
        let Some((start, len)) = self.texture_uniform(id, index) else {
            return;
        };

        // Stale or destroyed handles clear the slot.
        let incoming: SmallVec<[Option<TextureId>; MAX_UNIFORM_TEXTURES]> = textures
            .iter()
            .take(len)
            .map(|slot| {
                slot.filter(|&t| {
                    let live = self.live_texture(t).is_some();
                    if !live {
                        invalid("texture", t);
                    }
                    live
                })
            })
            .collect();

        let Some(shader) = self.shaders.get_mut(id) else {
            return;
        };
        for (unit, next) in (start..start + len).zip(incoming) {
            let prev = shader.units.textures[unit];
            if prev == next {
                continue;
            }
            if let Some(tex) = next.and_then(|t| self.textures.get_mut(t)) {
                tex.ref_count += 1;
            }
            if let Some(prev) = prev {
                release_texture(&mut self.textures, prev);
            }
            shader.units.textures[unit] = next;
        }
    }

    fn shader_set_sampler(&mut self, id: ShaderId, index: usize, samplers: &[TextureSampler]) {
        let Some((start, len)) = self.texture_uniform(id, index) else {
            return;
        };
        let Some(shader) = self.shaders.get_mut(id) else {
            return;
        };
        for (unit, sampler) in (start..start + len).zip(samplers) {
            shader.units.samplers[unit] = *sampler;
        }
    }

    fn shader_destroy(&mut self, id: ShaderId) {
        let Some(shader) = self.shaders.remove(id) else {
            invalid("shader", id);
            return;
        };
        self.ctx.gl().delete_program(shader.program);
        self.state.forget_program(shader.program);
        for texture in shader.units.textures.into_iter().flatten() {
            release_texture(&mut self.textures, texture);
        }
    }

    // --- Meshes ---

    fn mesh_create(&mut self) -> Option<MeshId> {
        match self.ctx.gl().create_vertex_array() {
            Ok(vertex_array) => Some(self.meshes.insert(Mesh {
                vertex_array,
                vertex: Buffer::default(),
                index: Buffer::default(),
                instance: Buffer::default(),
                index_format: IndexFormat::default(),
            })),
            Err(err) => {
                error!("Failed to create mesh: {}", GfxError::from(err));
                None
            }
        }
    }

    fn mesh_set_vertex_format(&mut self, id: MeshId, format: &VertexFormat) {
        self.set_attributes(id, Stream::Vertex, format);
    }

    fn mesh_set_vertex_data(&mut self, id: MeshId, data: &[u8], offset: usize) {
        self.upload(id, Stream::Vertex, data, offset);
    }

    fn mesh_set_instance_format(&mut self, id: MeshId, format: &VertexFormat) {
        self.set_attributes(id, Stream::Instance, format);
    }

    fn mesh_set_instance_data(&mut self, id: MeshId, data: &[u8], offset: usize) {
        self.upload(id, Stream::Instance, data, offset);
    }

    fn mesh_set_index_format(&mut self, id: MeshId, format: IndexFormat) {
        match self.meshes.get_mut(id) {
            Some(mesh) => mesh.index_format = format,
            None => invalid("mesh", id),
        }
    }

    fn mesh_set_index_data(&mut self, id: MeshId, data: &[u8], offset: usize) {
        self.upload(id, Stream::Index, data, offset);
    }

    fn mesh_destroy(&mut self, id: MeshId) {
        let Some(mesh) = self.meshes.remove(id) else {
            invalid("mesh", id);
            return;
        };
        let gl = self.ctx.gl();
        for buffer in [mesh.vertex, mesh.index, mesh.instance] {
            if buffer.id != 0 {
                gl.delete_buffer(buffer.id);
            }
        }
        gl.delete_vertex_array(mesh.vertex_array);
        self.state.forget_array(mesh.vertex_array);
    }

    // --- Commands ---

    fn draw(&mut self, command: &DrawCommand) {
        if let Err(err) = self.try_draw(command) {
            error!("Draw failed: {err}");
        }
    }

    fn clear(&mut self, command: &ClearCommand) {
        if let Err(err) = self.try_clear(command) {
            error!("Clear failed: {err}");
        }
    }
}
