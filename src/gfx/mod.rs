pub mod backends;
pub mod context;
pub mod error;
pub mod handle;

use crate::config::GfxConfig;
use crate::gfx::backends::{d3d11, opengl};
use log::{error, info};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::str::FromStr;

pub use context::Gfx;
pub use error::GfxError;
pub use handle::{MeshId, ShaderId, TargetId, TextureId};

/// Maximum attachments a single [`Target`](TargetId) may own.
pub const MAX_TARGET_ATTACHMENTS: usize = 8;
/// Maximum attributes in one [`VertexFormat`].
pub const MAX_VERTEX_FORMAT_ELEMENTS: usize = 16;
/// Texture units a single shader may address across all of its samplers.
pub const MAX_UNIFORM_TEXTURES: usize = 32;

// --- Public Data Contract ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Renderer {
    /// Resolve to the platform default at selection time.
    #[default]
    Unspecified,
    OpenGl,
    D3d11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8G8B8A8,
    R8,
    Depth24Stencil8,
}

impl TextureFormat {
    pub const ALL: [Self; 3] = [Self::R8G8B8A8, Self::R8, Self::Depth24Stencil8];

    #[inline(always)]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::R8G8B8A8 | Self::Depth24Stencil8 => 4,
            Self::R8 => 1,
        }
    }

    #[inline(always)]
    pub const fn is_depth_stencil(self) -> bool {
        matches!(self, Self::Depth24Stencil8)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureSampler {
    pub filter: TextureFilter,
    pub wrap_x: TextureWrap,
    pub wrap_y: TextureWrap,
}

impl TextureSampler {
    #[inline(always)]
    pub const fn new(filter: TextureFilter, wrap: TextureWrap) -> Self {
        Self {
            filter,
            wrap_x: wrap,
            wrap_y: wrap,
        }
    }
}

impl Default for TextureSampler {
    #[inline(always)]
    fn default() -> Self {
        Self::new(TextureFilter::Linear, TextureWrap::ClampToEdge)
    }
}

/// Depth comparison. `None` disables depth testing entirely, which is not
/// the same thing as `Always` (test enabled, always passes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Compare {
    #[default]
    None,
    Always,
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Cull {
    #[default]
    None,
    Front,
    Back,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BlendOp {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BlendFactor {
    #[default]
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SrcAlphaSaturate,
    Src1Color,
    OneMinusSrc1Color,
    Src1Alpha,
    OneMinusSrc1Alpha,
}

bitflags::bitflags! {
    /// Color channels a draw is allowed to write.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ColorMask: u8 {
        const R = 1 << 0;
        const G = 1 << 1;
        const B = 1 << 2;
        const A = 1 << 3;
        const RGB = Self::R.bits() | Self::G.bits() | Self::B.bits();
        const RGBA = Self::RGB.bits() | Self::A.bits();
    }
}

bitflags::bitflags! {
    /// Buffers a clear command resets.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ClearMask: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    #[inline(always)]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Unpacks `0xRRGGBBAA`.
    #[inline(always)]
    pub const fn from_rgba(rgba: u32) -> Self {
        Self::new(
            (rgba >> 24) as u8,
            (rgba >> 16) as u8,
            (rgba >> 8) as u8,
            rgba as u8,
        )
    }

    #[inline(always)]
    pub fn to_f32(self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }
}

/// Full blend descriptor. The all-zero `Default` is the state the backend
/// assumes right after bring-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct BlendState {
    pub color_op: BlendOp,
    pub color_src: BlendFactor,
    pub color_dst: BlendFactor,
    pub alpha_op: BlendOp,
    pub alpha_src: BlendFactor,
    pub alpha_dst: BlendFactor,
    pub mask: ColorMask,
    pub color: Color,
}

impl BlendState {
    const fn uniform(op: BlendOp, src: BlendFactor, dst: BlendFactor) -> Self {
        Self {
            color_op: op,
            color_src: src,
            color_dst: dst,
            alpha_op: op,
            alpha_src: src,
            alpha_dst: dst,
            mask: ColorMask::RGBA,
            color: Color::WHITE,
        }
    }

    pub const PREMULTIPLY: Self =
        Self::uniform(BlendOp::Add, BlendFactor::One, BlendFactor::OneMinusSrcAlpha);
    pub const ALPHA: Self = Self::uniform(
        BlendOp::Add,
        BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha,
    );
    pub const ADD: Self = Self::uniform(BlendOp::Add, BlendFactor::SrcAlpha, BlendFactor::One);
    pub const MULTIPLY: Self = Self::uniform(BlendOp::Add, BlendFactor::DstColor, BlendFactor::Zero);
    pub const SUBTRACT: Self =
        Self::uniform(BlendOp::ReverseSubtract, BlendFactor::One, BlendFactor::One);
}

/// Pixel rectangle with a top-left origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    #[inline(always)]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Float2,
    Float3,
    Float4,
    Mat3x2,
    Mat4x4,
    Texture2D,
    Sampler2D,
}

impl UniformType {
    /// Number of `f32` values one array element of this type consumes.
    #[inline(always)]
    pub const fn float_count(self) -> usize {
        match self {
            Self::Float => 1,
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 => 4,
            Self::Mat3x2 => 6,
            Self::Mat4x4 => 16,
            Self::Texture2D | Self::Sampler2D => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformInfo {
    /// Index to pass back into the `shader_set_*` calls. Texture and sampler
    /// entries split from the same native sampler share one index.
    pub index: usize,
    pub name: String,
    pub ty: UniformType,
    pub array_elements: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexType {
    Float,
    Float2,
    Float3,
    Float4,
    Byte4,
    UByte4,
    Short2,
    UShort2,
    Short4,
    UShort4,
}

impl VertexType {
    #[inline(always)]
    pub const fn components(self) -> usize {
        match self {
            Self::Float => 1,
            Self::Float2 | Self::Short2 | Self::UShort2 => 2,
            Self::Float3 => 3,
            Self::Float4 | Self::Byte4 | Self::UByte4 | Self::Short4 | Self::UShort4 => 4,
        }
    }

    #[inline(always)]
    pub const fn component_size(self) -> usize {
        match self {
            Self::Float | Self::Float2 | Self::Float3 | Self::Float4 => 4,
            Self::Byte4 | Self::UByte4 => 1,
            Self::Short2 | Self::UShort2 | Self::Short4 | Self::UShort4 => 2,
        }
    }

    #[inline(always)]
    pub const fn size(self) -> usize {
        self.components() * self.component_size()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexElement {
    /// Shader attribute location.
    pub index: u32,
    pub ty: VertexType,
    pub normalized: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VertexFormat {
    pub elements: Vec<VertexElement>,
    pub stride: usize,
}

impl VertexFormat {
    /// Tightly packed layout: stride is the sum of element sizes.
    pub fn packed(elements: &[VertexElement]) -> Self {
        Self {
            stride: elements.iter().map(|e| e.ty.size()).sum(),
            elements: elements.to_vec(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    #[default]
    Sixteen,
    ThirtyTwo,
}

impl IndexFormat {
    #[inline(always)]
    pub const fn size(self) -> usize {
        match self {
            Self::Sixteen => 2,
            Self::ThirtyTwo => 4,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ShaderData<'a> {
    pub vertex: &'a str,
    pub fragment: &'a str,
}

#[derive(Clone, Copy, Debug)]
pub struct DrawCommand {
    /// `None` draws to the backbuffer.
    pub target: Option<TargetId>,
    pub mesh: MeshId,
    pub shader: ShaderId,
    /// `None` uses the full framebuffer.
    pub viewport: Option<Rect>,
    /// `None` disables the scissor test.
    pub scissor: Option<Rect>,
    pub index_start: usize,
    pub index_count: usize,
    /// `0` issues a non-instanced draw.
    pub instance_count: usize,
    pub compare: Compare,
    pub depth_mask: bool,
    pub cull: Cull,
    pub blend: BlendState,
}

#[derive(Clone, Copy, Debug)]
pub struct ClearCommand {
    /// `None` clears the backbuffer.
    pub target: Option<TargetId>,
    pub color: Color,
    pub depth: f32,
    pub stencil: i32,
    pub mask: ClearMask,
}

/// Context requirements a backend asks of the window before it exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextHints {
    pub major_version: u8,
    pub minor_version: u8,
    pub core_profile: bool,
    pub forward_compatible: bool,
    pub double_buffer: bool,
    pub depth_bits: u8,
    pub stencil_bits: u8,
    pub samples: u8,
}

// --- Backend Boundary ---

/// The presentation surface the windowing layer hands to a backend.
pub trait Surface: HasWindowHandle + HasDisplayHandle {
    fn size_in_pixels(&self) -> (u32, u32);
}

impl Surface for winit::window::Window {
    fn size_in_pixels(&self) -> (u32, u32) {
        self.inner_size().into()
    }
}

/// A selected but not yet initialized backend.
pub trait Backend {
    fn renderer(&self) -> Renderer;

    /// Hints to apply before the window is created.
    fn prepare(&mut self) -> ContextHints;

    /// Creates the native context and brings the device to its default state.
    fn initialize(
        self: Box<Self>,
        surface: &dyn Surface,
    ) -> Result<Box<dyn RenderDevice>, GfxError>;
}

/// Every operation an initialized backend must provide.
///
/// Creation calls return `None` (after logging) on failure. Calls taking a
/// handle that is not live log an error and do nothing.
pub trait RenderDevice {
    fn renderer(&self) -> Renderer;
    fn shutdown(&mut self);
    fn frame_begin(&mut self);
    /// Presents the backbuffer.
    fn frame_end(&mut self);
    fn resize(&mut self, width: u32, height: u32);

    fn texture_create(&mut self, width: i32, height: i32, format: TextureFormat)
    -> Option<TextureId>;
    fn texture_set_data(&mut self, texture: TextureId, data: &[u8]);
    fn texture_get_data(&mut self, texture: TextureId, data: &mut [u8]);
    fn texture_destroy(&mut self, texture: TextureId);

    fn target_create(
        &mut self,
        width: i32,
        height: i32,
        attachments: &[TextureFormat],
    ) -> Option<TargetId>;
    fn target_get_attachment(&self, target: TargetId, index: usize) -> Option<TextureId>;
    fn target_destroy(&mut self, target: TargetId);

    fn shader_create(&mut self, data: &ShaderData<'_>) -> Option<ShaderId>;
    fn shader_get_uniforms(&self, shader: ShaderId) -> Vec<UniformInfo>;
    fn shader_set_uniform(&mut self, shader: ShaderId, index: usize, values: &[f32]);
    fn shader_set_texture(&mut self, shader: ShaderId, index: usize, textures: &[Option<TextureId>]);
    fn shader_set_sampler(&mut self, shader: ShaderId, index: usize, samplers: &[TextureSampler]);
    fn shader_destroy(&mut self, shader: ShaderId);

    fn mesh_create(&mut self) -> Option<MeshId>;
    fn mesh_set_vertex_format(&mut self, mesh: MeshId, format: &VertexFormat);
    fn mesh_set_vertex_data(&mut self, mesh: MeshId, data: &[u8], offset: usize);
    fn mesh_set_instance_format(&mut self, mesh: MeshId, format: &VertexFormat);
    fn mesh_set_instance_data(&mut self, mesh: MeshId, data: &[u8], offset: usize);
    fn mesh_set_index_format(&mut self, mesh: MeshId, format: IndexFormat);
    fn mesh_set_index_data(&mut self, mesh: MeshId, data: &[u8], offset: usize);
    fn mesh_destroy(&mut self, mesh: MeshId);

    fn draw(&mut self, command: &DrawCommand);
    fn clear(&mut self, command: &ClearCommand);
}

impl Renderer {
    /// Whether this build carries a working implementation.
    pub const fn is_available(self) -> bool {
        match self {
            Self::Unspecified => false,
            Self::OpenGl => opengl::AVAILABLE,
            Self::D3d11 => d3d11::AVAILABLE,
        }
    }

    /// Maps `Unspecified` to the first available backend in platform
    /// preference order. Explicit choices are returned unchanged.
    pub fn resolve(self) -> Self {
        if self != Self::Unspecified {
            return self;
        }
        let preference: &[Self] = if cfg!(target_os = "windows") {
            &[Self::D3d11, Self::OpenGl]
        } else {
            &[Self::OpenGl]
        };
        preference
            .iter()
            .copied()
            .find(|r| r.is_available())
            .unwrap_or(Self::Unspecified)
    }
}

/// Selects the backend once per process run.
pub fn get_device(preferred: Renderer, config: &GfxConfig) -> Result<Box<dyn Backend>, GfxError> {
    let renderer = preferred.resolve();
    let backend: Option<Box<dyn Backend>> = match renderer {
        Renderer::OpenGl => Some(Box::new(opengl::OpenGlBackend::new(config.clone()))),
        Renderer::D3d11 => d3d11::backend(config),
        Renderer::Unspecified => None,
    };
    match backend {
        Some(backend) => {
            info!("Selected {renderer} renderer (requested {preferred}).");
            Ok(backend)
        }
        None => {
            let err = GfxError::Unavailable(renderer);
            error!("{err}");
            Err(err)
        }
    }
}

// -- Boilerplate impls --
impl core::fmt::Display for Renderer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unspecified => write!(f, "Default"),
            Self::OpenGl => write!(f, "OpenGL"),
            Self::D3d11 => write!(f, "D3D11"),
        }
    }
}

impl FromStr for Renderer {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "default" | "auto" | "none" => Ok(Self::Unspecified),
            "opengl" | "gl" => Ok(Self::OpenGl),
            "d3d11" | "directx" | "directx11" | "dx11" => Ok(Self::D3d11),
            _ => Err(format!("'{s}' is not a valid video renderer")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspecified_resolves_to_an_available_backend() {
        let resolved = Renderer::Unspecified.resolve();
        assert_eq!(resolved, Renderer::OpenGl);
        assert!(resolved.is_available());
    }

    #[test]
    fn explicit_choice_is_not_rewritten() {
        assert_eq!(Renderer::D3d11.resolve(), Renderer::D3d11);
        assert_eq!(Renderer::OpenGl.resolve(), Renderer::OpenGl);
    }

    #[test]
    fn unavailable_backend_fails_selection() {
        let result = get_device(Renderer::D3d11, &GfxConfig::default());
        assert_eq!(
            result.err(),
            Some(GfxError::Unavailable(Renderer::D3d11))
        );
    }

    #[test]
    fn opengl_backend_is_selectable() {
        let backend = get_device(Renderer::OpenGl, &GfxConfig::default()).ok();
        assert_eq!(backend.map(|b| b.renderer()), Some(Renderer::OpenGl));
    }

    #[test]
    fn renderer_parses_from_config_strings() {
        assert_eq!("OpenGL".parse::<Renderer>(), Ok(Renderer::OpenGl));
        assert_eq!("dx11".parse::<Renderer>(), Ok(Renderer::D3d11));
        assert_eq!("auto".parse::<Renderer>(), Ok(Renderer::Unspecified));
        assert!("vulkan".parse::<Renderer>().is_err());
        assert_eq!(Renderer::OpenGl.to_string().parse(), Ok(Renderer::OpenGl));
    }

    #[test]
    fn color_unpacks_and_normalizes() {
        let c = Color::from_rgba(0xff80_0040);
        assert_eq!(c, Color::new(255, 128, 0, 64));
        assert_eq!(c.to_f32()[0], 1.0);
        assert_eq!(c.to_f32()[2], 0.0);
    }

    #[test]
    fn packed_vertex_format_sums_element_sizes() {
        let format = VertexFormat::packed(&[
            VertexElement { index: 0, ty: VertexType::Float2, normalized: false },
            VertexElement { index: 1, ty: VertexType::UByte4, normalized: true },
        ]);
        assert_eq!(format.stride, 12);
    }
}
