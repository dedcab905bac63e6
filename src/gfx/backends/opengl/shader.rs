//! Program reflection.

use crate::gfx::backends::opengl::api::{GlApi, GlId};
use crate::gfx::backends::opengl::convert;
use crate::gfx::{MAX_UNIFORM_TEXTURES, TextureId, TextureSampler, UniformInfo, UniformType};
use log::warn;

// Texture uniforms own units `sampler_index..sampler_index + array_elements`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Uniform {
    pub name: String,
    pub ty: UniformType,
    pub array_elements: usize,
    pub location: u32,
    pub sampler_index: usize,
}

// The driver reports `name[0]` for arrays.
pub fn strip_array_suffix(name: &str) -> &str {
    name.strip_suffix("[0]").unwrap_or(name)
}

/// Enumerates the active uniforms of a linked program. Unsupported types
/// are skipped, and texture uniforms share `unit_budget` units in
/// declaration order.
pub fn reflect<G: GlApi + ?Sized>(gl: &G, program: GlId, unit_budget: usize) -> Vec<Uniform> {
    let count = gl.get_active_uniforms(program);
    let mut uniforms = Vec::with_capacity(count as usize);
    let mut next_unit = 0usize;

    for index in 0..count {
        let Some(active) = gl.get_active_uniform(program, index) else {
            continue;
        };
        let Some(ty) = convert::uniform_type(active.utype) else {
            warn!(
                "Uniform '{}' has an unsupported type {:#x}; skipping.",
                active.name, active.utype
            );
            continue;
        };
        let Some(location) = gl.get_uniform_location(program, &active.name) else {
            continue;
        };

        let mut array_elements = active.size.max(1) as usize;
        let sampler_index = next_unit;
        if ty == UniformType::Texture2D {
            let room = unit_budget.saturating_sub(next_unit);
            if array_elements > room {
                warn!(
                    "Uniform '{}' needs {array_elements} texture units but only {room} remain.",
                    active.name
                );
                if room == 0 {
                    continue;
                }
                array_elements = room;
            }
            next_unit += array_elements;
        }

        uniforms.push(Uniform {
            name: strip_array_suffix(&active.name).to_owned(),
            ty,
            array_elements,
            location,
            sampler_index,
        });
    }
    uniforms
}

/// Each texture uniform also yields a `_sampler` twin sharing its index.
pub fn describe(uniforms: &[Uniform]) -> Vec<UniformInfo> {
    let mut out = Vec::with_capacity(uniforms.len());
    for (index, u) in uniforms.iter().enumerate() {
        out.push(UniformInfo {
            index,
            name: u.name.clone(),
            ty: u.ty,
            array_elements: u.array_elements,
        });
        if u.ty == UniformType::Texture2D {
            out.push(UniformInfo {
                index,
                name: format!("{}_sampler", u.name),
                ty: UniformType::Sampler2D,
                array_elements: u.array_elements,
            });
        }
    }
    out
}

#[derive(Clone, Debug)]
pub struct Units {
    pub textures: [Option<TextureId>; MAX_UNIFORM_TEXTURES],
    pub samplers: [TextureSampler; MAX_UNIFORM_TEXTURES],
}

impl Default for Units {
    fn default() -> Self {
        Self {
            textures: [None; MAX_UNIFORM_TEXTURES],
            samplers: [TextureSampler::default(); MAX_UNIFORM_TEXTURES],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_a_trailing_zero_subscript_is_stripped() {
        assert_eq!(strip_array_suffix("uColors[0]"), "uColors");
        assert_eq!(strip_array_suffix("uColors"), "uColors");
        assert_eq!(strip_array_suffix("lights[0].color"), "lights[0].color");
        assert_eq!(strip_array_suffix("uBones[1]"), "uBones[1]");
    }

    #[test]
    fn texture_uniform_gains_a_sampler_twin() {
        let uniforms = vec![
            Uniform {
                name: "u_matrix".into(),
                ty: UniformType::Mat4x4,
                array_elements: 1,
                location: 0,
                sampler_index: 0,
            },
            Uniform {
                name: "u_tex".into(),
                ty: UniformType::Texture2D,
                array_elements: 2,
                location: 1,
                sampler_index: 0,
            },
        ];
        let infos = describe(&uniforms);
        assert_eq!(infos.len(), 3);
        assert_eq!(infos[2].name, "u_tex_sampler");
        assert_eq!(infos[2].ty, UniformType::Sampler2D);
        assert_eq!(infos[1].index, infos[2].index);
        assert_eq!(infos[2].array_elements, 2);
    }
}
