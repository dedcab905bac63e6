//! The application-owned graphics context.
//!
//! [`Gfx`] holds whichever stage the selected backend is in and routes every
//! operation to the running device. Calls made before a successful
//! [`Gfx::start`] or after [`Gfx::shutdown`] log an error and return a safe
//! default.

use crate::config::GfxConfig;
use crate::gfx::{
    Backend, ClearCommand, ContextHints, DrawCommand, GfxError, IndexFormat, MeshId, RenderDevice,
    Renderer, ShaderData, ShaderId, Surface, TargetId, TextureFormat, TextureId, TextureSampler,
    UniformInfo, VertexFormat, get_device,
};
use log::{error, info, warn};

enum Stage {
    Selected(Box<dyn Backend>),
    Running(Box<dyn RenderDevice>),
    Stopped,
}

pub struct Gfx {
    renderer: Renderer,
    stage: Stage,
}

impl Gfx {
    /// Selects a backend. Fails when `preferred` resolves to a renderer
    /// this build cannot provide.
    pub fn new(preferred: Renderer, config: &GfxConfig) -> Result<Self, GfxError> {
        get_device(preferred, config).map(Self::from_backend)
    }

    pub fn from_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            renderer: backend.renderer(),
            stage: Stage::Selected(backend),
        }
    }

    #[inline(always)]
    pub const fn renderer(&self) -> Renderer {
        self.renderer
    }

    #[inline(always)]
    pub const fn is_running(&self) -> bool {
        matches!(self.stage, Stage::Running(_))
    }

    /// Context hints for window creation. Only meaningful before `start`.
    pub fn prepare(&mut self) -> Option<ContextHints> {
        match &mut self.stage {
            Stage::Selected(backend) => Some(backend.prepare()),
            _ => {
                warn!("Graphics hints requested after the device was started.");
                None
            }
        }
    }

    /// Creates the native context for `surface`. On failure the context
    /// never becomes running.
    pub fn start(&mut self, surface: &dyn Surface) -> Result<(), GfxError> {
        match std::mem::replace(&mut self.stage, Stage::Stopped) {
            Stage::Selected(backend) => match backend.initialize(surface) {
                Ok(device) => {
                    info!("{} device running.", self.renderer);
                    self.stage = Stage::Running(device);
                    Ok(())
                }
                Err(err) => {
                    error!("Failed to initialize {} device: {err}", self.renderer);
                    Err(err)
                }
            },
            Stage::Running(device) => {
                warn!("Graphics device already running.");
                self.stage = Stage::Running(device);
                Ok(())
            }
            Stage::Stopped => Err(GfxError::NotRunning),
        }
    }

    /// Releases every GPU object and the native context.
    pub fn shutdown(&mut self) {
        if let Stage::Running(mut device) = std::mem::replace(&mut self.stage, Stage::Stopped) {
            device.shutdown();
        }
    }

    fn device(&mut self, op: &str) -> Option<&mut dyn RenderDevice> {
        match &mut self.stage {
            Stage::Running(device) => Some(device.as_mut()),
            _ => {
                error!("{op}: {}", GfxError::NotRunning);
                None
            }
        }
    }

    fn device_ref(&self, op: &str) -> Option<&dyn RenderDevice> {
        match &self.stage {
            Stage::Running(device) => Some(device.as_ref()),
            _ => {
                error!("{op}: {}", GfxError::NotRunning);
                None
            }
        }
    }

    pub fn frame_begin(&mut self) {
        if let Some(d) = self.device("frame_begin") {
            d.frame_begin();
        }
    }

    pub fn frame_end(&mut self) {
        if let Some(d) = self.device("frame_end") {
            d.frame_end();
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(d) = self.device("resize") {
            d.resize(width, height);
        }
    }

    // --- Textures ---

    pub fn texture_create(
        &mut self,
        width: i32,
        height: i32,
        format: TextureFormat,
    ) -> Option<TextureId> {
        self.device("texture_create")?
            .texture_create(width, height, format)
    }

    pub fn texture_set_data(&mut self, texture: TextureId, data: &[u8]) {
        if let Some(d) = self.device("texture_set_data") {
            d.texture_set_data(texture, data);
        }
    }

    pub fn texture_get_data(&mut self, texture: TextureId, data: &mut [u8]) {
        if let Some(d) = self.device("texture_get_data") {
            d.texture_get_data(texture, data);
        }
    }

    pub fn texture_destroy(&mut self, texture: TextureId) {
        if let Some(d) = self.device("texture_destroy") {
            d.texture_destroy(texture);
        }
    }

    // --- Targets ---

    pub fn target_create(
        &mut self,
        width: i32,
        height: i32,
        attachments: &[TextureFormat],
    ) -> Option<TargetId> {
        self.device("target_create")?
            .target_create(width, height, attachments)
    }

    pub fn target_get_attachment(&self, target: TargetId, index: usize) -> Option<TextureId> {
        self.device_ref("target_get_attachment")?
            .target_get_attachment(target, index)
    }

    pub fn target_destroy(&mut self, target: TargetId) {
        if let Some(d) = self.device("target_destroy") {
            d.target_destroy(target);
        }
    }

    // --- Shaders ---

    pub fn shader_create(&mut self, data: &ShaderData<'_>) -> Option<ShaderId> {
        self.device("shader_create")?.shader_create(data)
    }

    pub fn shader_get_uniforms(&self, shader: ShaderId) -> Vec<UniformInfo> {
        self.device_ref("shader_get_uniforms")
            .map(|d| d.shader_get_uniforms(shader))
            .unwrap_or_default()
    }

    pub fn shader_set_uniform(&mut self, shader: ShaderId, index: usize, values: &[f32]) {
        if let Some(d) = self.device("shader_set_uniform") {
            d.shader_set_uniform(shader, index, values);
        }
    }

    pub fn shader_set_texture(
        &mut self,
        shader: ShaderId,
        index: usize,
        textures: &[Option<TextureId>],
    ) {
        if let Some(d) = self.device("shader_set_texture") {
            d.shader_set_texture(shader, index, textures);
        }
    }

    pub fn shader_set_sampler(
        &mut self,
        shader: ShaderId,
        index: usize,
        samplers: &[TextureSampler],
    ) {
        if let Some(d) = self.device("shader_set_sampler") {
            d.shader_set_sampler(shader, index, samplers);
        }
    }

    pub fn shader_destroy(&mut self, shader: ShaderId) {
        if let Some(d) = self.device("shader_destroy") {
            d.shader_destroy(shader);
        }
    }

    // --- Meshes ---

    pub fn mesh_create(&mut self) -> Option<MeshId> {
        self.device("mesh_create")?.mesh_create()
    }

    pub fn mesh_set_vertex_format(&mut self, mesh: MeshId, format: &VertexFormat) {
        if let Some(d) = self.device("mesh_set_vertex_format") {
            d.mesh_set_vertex_format(mesh, format);
        }
    }

    pub fn mesh_set_vertex_data(&mut self, mesh: MeshId, data: &[u8], offset: usize) {
        if let Some(d) = self.device("mesh_set_vertex_data") {
            d.mesh_set_vertex_data(mesh, data, offset);
        }
    }

    pub fn mesh_set_instance_format(&mut self, mesh: MeshId, format: &VertexFormat) {
        if let Some(d) = self.device("mesh_set_instance_format") {
            d.mesh_set_instance_format(mesh, format);
        }
    }

    pub fn mesh_set_instance_data(&mut self, mesh: MeshId, data: &[u8], offset: usize) {
        if let Some(d) = self.device("mesh_set_instance_data") {
            d.mesh_set_instance_data(mesh, data, offset);
        }
    }

    pub fn mesh_set_index_format(&mut self, mesh: MeshId, format: IndexFormat) {
        if let Some(d) = self.device("mesh_set_index_format") {
            d.mesh_set_index_format(mesh, format);
        }
    }

    pub fn mesh_set_index_data(&mut self, mesh: MeshId, data: &[u8], offset: usize) {
        if let Some(d) = self.device("mesh_set_index_data") {
            d.mesh_set_index_data(mesh, data, offset);
        }
    }

    pub fn mesh_destroy(&mut self, mesh: MeshId) {
        if let Some(d) = self.device("mesh_destroy") {
            d.mesh_destroy(mesh);
        }
    }

    // --- Commands ---

    pub fn draw(&mut self, command: &DrawCommand) {
        if let Some(d) = self.device("draw") {
            d.draw(command);
        }
    }

    pub fn clear(&mut self, command: &ClearCommand) {
        if let Some(d) = self.device("clear") {
            d.clear(command);
        }
    }
}

impl Drop for Gfx {
    fn drop(&mut self) {
        self.shutdown();
    }
}
