//! Public enums to GL constants.

use crate::gfx::{
    BlendFactor, BlendOp, Compare, Cull, IndexFormat, TextureFilter, TextureFormat, TextureWrap,
    UniformType, VertexType,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatTriple {
    pub internal: u32,
    pub format: u32,
    pub ty: u32,
}

pub const fn texture_format(format: TextureFormat) -> FormatTriple {
    match format {
        TextureFormat::R8G8B8A8 => FormatTriple {
            internal: glow::RGBA8,
            format: glow::RGBA,
            ty: glow::UNSIGNED_BYTE,
        },
        TextureFormat::R8 => FormatTriple {
            internal: glow::R8,
            format: glow::RED,
            ty: glow::UNSIGNED_BYTE,
        },
        TextureFormat::Depth24Stencil8 => FormatTriple {
            internal: glow::DEPTH24_STENCIL8,
            format: glow::DEPTH_STENCIL,
            ty: glow::UNSIGNED_INT_24_8,
        },
    }
}

pub const fn filter(filter: TextureFilter) -> i32 {
    (match filter {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
    }) as i32
}

pub const fn wrap(wrap: TextureWrap) -> i32 {
    (match wrap {
        TextureWrap::Repeat => glow::REPEAT,
        TextureWrap::MirroredRepeat => glow::MIRRORED_REPEAT,
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        TextureWrap::ClampToBorder => glow::CLAMP_TO_BORDER,
    }) as i32
}

/// `None` has no GL function: it means the depth test is disabled.
pub const fn compare(compare: Compare) -> Option<u32> {
    match compare {
        Compare::None => None,
        Compare::Always => Some(glow::ALWAYS),
        Compare::Never => Some(glow::NEVER),
        Compare::Less => Some(glow::LESS),
        Compare::Equal => Some(glow::EQUAL),
        Compare::LessOrEqual => Some(glow::LEQUAL),
        Compare::Greater => Some(glow::GREATER),
        Compare::NotEqual => Some(glow::NOTEQUAL),
        Compare::GreaterOrEqual => Some(glow::GEQUAL),
    }
}

pub const fn cull(cull: Cull) -> Option<u32> {
    match cull {
        Cull::None => None,
        Cull::Front => Some(glow::FRONT),
        Cull::Back => Some(glow::BACK),
    }
}

pub const fn blend_op(op: BlendOp) -> u32 {
    match op {
        BlendOp::Add => glow::FUNC_ADD,
        BlendOp::Subtract => glow::FUNC_SUBTRACT,
        BlendOp::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
        BlendOp::Min => glow::MIN,
        BlendOp::Max => glow::MAX,
    }
}

pub const fn blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcColor => glow::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => glow::DST_COLOR,
        BlendFactor::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => glow::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
        BlendFactor::ConstantColor => glow::CONSTANT_COLOR,
        BlendFactor::OneMinusConstantColor => glow::ONE_MINUS_CONSTANT_COLOR,
        BlendFactor::ConstantAlpha => glow::CONSTANT_ALPHA,
        BlendFactor::OneMinusConstantAlpha => glow::ONE_MINUS_CONSTANT_ALPHA,
        BlendFactor::SrcAlphaSaturate => glow::SRC_ALPHA_SATURATE,
        BlendFactor::Src1Color => glow::SRC1_COLOR,
        BlendFactor::OneMinusSrc1Color => glow::ONE_MINUS_SRC1_COLOR,
        BlendFactor::Src1Alpha => glow::SRC1_ALPHA,
        BlendFactor::OneMinusSrc1Alpha => glow::ONE_MINUS_SRC1_ALPHA,
    }
}

// (component type, component count)
pub const fn vertex_type(ty: VertexType) -> (u32, i32) {
    let gl = match ty {
        VertexType::Float | VertexType::Float2 | VertexType::Float3 | VertexType::Float4 => {
            glow::FLOAT
        }
        VertexType::Byte4 => glow::BYTE,
        VertexType::UByte4 => glow::UNSIGNED_BYTE,
        VertexType::Short2 | VertexType::Short4 => glow::SHORT,
        VertexType::UShort2 | VertexType::UShort4 => glow::UNSIGNED_SHORT,
    };
    (gl, ty.components() as i32)
}

pub const fn index_type(format: IndexFormat) -> u32 {
    match format {
        IndexFormat::Sixteen => glow::UNSIGNED_SHORT,
        IndexFormat::ThirtyTwo => glow::UNSIGNED_INT,
    }
}

/// Reflected GL uniform type to the caller-facing kind. Samplers map to
/// [`UniformType::Texture2D`]; the sampler twin is added during reflection.
pub const fn uniform_type(utype: u32) -> Option<UniformType> {
    match utype {
        glow::FLOAT => Some(UniformType::Float),
        glow::FLOAT_VEC2 => Some(UniformType::Float2),
        glow::FLOAT_VEC3 => Some(UniformType::Float3),
        glow::FLOAT_VEC4 => Some(UniformType::Float4),
        glow::FLOAT_MAT3x2 => Some(UniformType::Mat3x2),
        glow::FLOAT_MAT4 => Some(UniformType::Mat4x4),
        glow::SAMPLER_2D => Some(UniformType::Texture2D),
        _ => None,
    }
}

pub const fn type_name(ty: u32) -> &'static str {
    match ty {
        glow::DEBUG_TYPE_ERROR => "ERROR",
        glow::DEBUG_TYPE_DEPRECATED_BEHAVIOR => "DEPRECATED BEHAVIOR",
        glow::DEBUG_TYPE_MARKER => "MARKER",
        glow::DEBUG_TYPE_OTHER => "OTHER",
        glow::DEBUG_TYPE_PERFORMANCE => "PERFORMANCE",
        glow::DEBUG_TYPE_POP_GROUP => "POP GROUP",
        glow::DEBUG_TYPE_PORTABILITY => "PORTABILITY",
        glow::DEBUG_TYPE_PUSH_GROUP => "PUSH GROUP",
        glow::DEBUG_TYPE_UNDEFINED_BEHAVIOR => "UNDEFINED BEHAVIOR",
        _ => "UNKNOWN",
    }
}

pub const fn severity_name(severity: u32) -> &'static str {
    match severity {
        glow::DEBUG_SEVERITY_HIGH => "HIGH",
        glow::DEBUG_SEVERITY_MEDIUM => "MEDIUM",
        glow::DEBUG_SEVERITY_LOW => "LOW",
        glow::DEBUG_SEVERITY_NOTIFICATION => "NOTIFICATION",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_compare_and_cull_have_no_gl_value() {
        assert_eq!(compare(Compare::None), None);
        assert_eq!(compare(Compare::Always), Some(glow::ALWAYS));
        assert_eq!(cull(Cull::None), None);
        assert_eq!(cull(Cull::Back), Some(glow::BACK));
    }

    #[test]
    fn only_supported_uniform_types_are_reflected() {
        assert_eq!(uniform_type(glow::FLOAT_MAT4), Some(UniformType::Mat4x4));
        assert_eq!(uniform_type(glow::SAMPLER_2D), Some(UniformType::Texture2D));
        assert_eq!(uniform_type(glow::INT), None);
        assert_eq!(uniform_type(glow::SAMPLER_3D), None);
    }
}
