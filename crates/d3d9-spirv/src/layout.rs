//! Pipeline layout metadata derived from a converted shader.

use spirv::Word;
use wgpu::{ShaderStages, VertexFormat};

use crate::token::{DeclUsage, TextureType};

/// One vertex buffer attribute consumed by a vertex shader input register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexInputAttribute {
    pub binding: u32,
    /// Equals the `v#` register index.
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u64,
}

impl VertexInputAttribute {
    pub fn to_wgpu(&self) -> wgpu::VertexAttribute {
        wgpu::VertexAttribute {
            format: self.format,
            offset: self.offset,
            shader_location: self.location,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    /// The `c#` float constant block.
    UniformBuffer,
    SampledTexture(TextureType),
    Sampler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorBinding {
    pub set: u32,
    pub binding: u32,
    pub kind: DescriptorKind,
    pub stages: ShaderStages,
    pub count: u32,
}

impl DescriptorBinding {
    pub fn to_wgpu(&self) -> wgpu::BindGroupLayoutEntry {
        let ty = match self.kind {
            DescriptorKind::UniformBuffer => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            DescriptorKind::SampledTexture(texture_type) => wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: match texture_type {
                    TextureType::Texture1D => wgpu::TextureViewDimension::D1,
                    TextureType::TextureCube => wgpu::TextureViewDimension::Cube,
                    TextureType::Texture3D => wgpu::TextureViewDimension::D3,
                    TextureType::Texture2D | TextureType::Unknown(_) => {
                        wgpu::TextureViewDimension::D2
                    }
                },
                multisampled: false,
            },
            DescriptorKind::Sampler => {
                wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
            }
        };
        wgpu::BindGroupLayoutEntry {
            binding: self.binding,
            visibility: self.stages,
            ty,
            count: None,
        }
    }
}

/// Result of a conversion whose module was handed to a [`crate::ModuleLoader`].
#[derive(Debug)]
pub struct ConvertedShader<M> {
    pub vertex_input_attributes: Vec<VertexInputAttribute>,
    pub descriptor_bindings: Vec<DescriptorBinding>,
    /// Module size in bytes.
    pub size: usize,
    pub module: M,
}

/// Result of a conversion that keeps the SPIR-V words.
#[derive(Debug, Clone, PartialEq)]
pub struct SpirvShader {
    pub stage: ShaderStages,
    pub words: Vec<Word>,
    pub vertex_input_attributes: Vec<VertexInputAttribute>,
    pub descriptor_bindings: Vec<DescriptorBinding>,
}

impl SpirvShader {
    pub fn size(&self) -> usize {
        self.words.len() * std::mem::size_of::<Word>()
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// The id bound stored in the module header.
    pub fn id_bound(&self) -> Word {
        self.words.get(3).copied().unwrap_or_default()
    }
}

/// Vertex buffer format for an input declared with `usage`.
///
/// D3DCOLOR inputs arrive as packed bytes (`Uint8x4`) when `d3dcolor_inputs` is set and are
/// unpacked in the shader; otherwise they are plain floats.
pub fn vertex_format_for_usage(usage: DeclUsage, d3dcolor_inputs: bool) -> Option<VertexFormat> {
    Some(match usage {
        DeclUsage::Position | DeclUsage::Normal | DeclUsage::Tangent | DeclUsage::Binormal => {
            VertexFormat::Float32x3
        }
        DeclUsage::PositionT
        | DeclUsage::BlendWeight
        | DeclUsage::BlendIndices
        | DeclUsage::Sample => VertexFormat::Float32x4,
        DeclUsage::TexCoord => VertexFormat::Float32x2,
        DeclUsage::Color if d3dcolor_inputs => VertexFormat::Uint8x4,
        DeclUsage::Color => VertexFormat::Float32x4,
        DeclUsage::PointSize | DeclUsage::Fog | DeclUsage::Depth | DeclUsage::TessFactor => {
            VertexFormat::Float32
        }
        DeclUsage::Unknown(_) => return None,
    })
}

/// Interface location shared by vertex shader outputs and pixel shader inputs.
///
/// | D3D usage | index | location |
/// |-----------|-------|----------|
/// | COLOR     | 0..3  | 0..3     |
/// | TEXCOORD  | 0..7  | 4..11    |
/// | FOG       | 0     | 12       |
/// | NORMAL    | 0     | 13       |
/// | TANGENT   | 0     | 14       |
/// | BINORMAL  | 0     | 15       |
///
/// `POSITION` and `PSIZE` are built-ins and have no location.
pub fn varying_location(usage: DeclUsage, usage_index: u8) -> Option<u32> {
    match (usage, usage_index) {
        (DeclUsage::Color, 0..=3) => Some(usage_index as u32),
        (DeclUsage::TexCoord, 0..=7) => Some(4 + usage_index as u32),
        (DeclUsage::Fog, 0) => Some(12),
        (DeclUsage::Normal, 0) => Some(13),
        (DeclUsage::Tangent, 0) => Some(14),
        (DeclUsage::Binormal, 0) => Some(15),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_format_follows_d3dcolor_option() {
        assert_eq!(
            vertex_format_for_usage(DeclUsage::Color, true),
            Some(VertexFormat::Uint8x4)
        );
        assert_eq!(
            vertex_format_for_usage(DeclUsage::Color, false),
            Some(VertexFormat::Float32x4)
        );
        assert_eq!(vertex_format_for_usage(DeclUsage::Unknown(20), true), None);
    }

    #[test]
    fn varyings_do_not_collide() {
        let mut seen = std::collections::HashSet::new();
        let semantics = (0..4)
            .map(|i| (DeclUsage::Color, i))
            .chain((0..8).map(|i| (DeclUsage::TexCoord, i)))
            .chain([
                (DeclUsage::Fog, 0),
                (DeclUsage::Normal, 0),
                (DeclUsage::Tangent, 0),
                (DeclUsage::Binormal, 0),
            ]);
        for (usage, index) in semantics {
            let location = varying_location(usage, index).unwrap();
            assert!(seen.insert(location), "{usage:?}{index} reuses {location}");
        }
        assert_eq!(varying_location(DeclUsage::Position, 0), None);
        assert_eq!(varying_location(DeclUsage::TexCoord, 8), None);
    }

    #[test]
    fn descriptor_bindings_map_to_wgpu_entries() {
        let binding = DescriptorBinding {
            set: 0,
            binding: 3,
            kind: DescriptorKind::SampledTexture(TextureType::TextureCube),
            stages: ShaderStages::FRAGMENT,
            count: 1,
        };
        let entry = binding.to_wgpu();
        assert_eq!(entry.binding, 3);
        assert!(matches!(
            entry.ty,
            wgpu::BindingType::Texture {
                view_dimension: wgpu::TextureViewDimension::Cube,
                ..
            }
        ));
    }
}
