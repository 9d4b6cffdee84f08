//! Binding points for shader constants and samplers.
//!
//! The device that owns constant storage decides where each register file lives; the converter
//! only reads these assignments. D3D9 gives vertex and pixel shaders separate constant files and
//! sampler namespaces, so every lookup is made for a stage.

use crate::limits::{FLOAT_CONSTANT_REGISTERS, MAX_SAMPLER_REGISTER_INDEX};
use crate::token::ShaderStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantFile {
    /// `c#`
    Float,
    /// `i#`
    Int,
    /// `b#`
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantSlot {
    pub set: u32,
    pub binding: u32,
    /// Element of the block holding register 0 of the stage.
    pub base: u32,
    /// Registers addressable by the stage.
    pub register_count: u32,
    /// Element count of the whole block, which may be shared with the other stage.
    pub block_registers: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSlot {
    pub set: u32,
    pub texture_binding: u32,
    pub sampler_binding: u32,
}

pub trait ConstantRegistry: Send + Sync {
    fn slot(&self, stage: ShaderStage, file: ConstantFile) -> ConstantSlot;

    fn sampler_binding(&self, stage: ShaderStage, index: u32) -> SamplerSlot;
}

/// Default layout.
///
/// Both stages share one float constant block of `vec4[512]` at set 0 binding 0: vertex shader
/// registers occupy elements 0..256 and pixel shader registers 256..512. Samplers live in a set per
/// stage (1 for vertex, 2 for pixel) with texture binding `2*s` and sampler binding `2*s + 1`.
///
/// Integer and boolean constants only exist as `defi`/`defb` literals, so their slots are only
/// consulted for register counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderConstantSlots {
    pub constant_set: u32,
    pub vertex_sampler_set: u32,
    pub pixel_sampler_set: u32,
}

impl Default for ShaderConstantSlots {
    fn default() -> Self {
        Self {
            constant_set: 0,
            vertex_sampler_set: 1,
            pixel_sampler_set: 2,
        }
    }
}

impl ConstantRegistry for ShaderConstantSlots {
    fn slot(&self, stage: ShaderStage, file: ConstantFile) -> ConstantSlot {
        let register_count = match file {
            ConstantFile::Float => FLOAT_CONSTANT_REGISTERS,
            ConstantFile::Int | ConstantFile::Bool => 16,
        };
        let base = match stage {
            ShaderStage::Vertex => 0,
            ShaderStage::Pixel => register_count,
        };
        ConstantSlot {
            set: self.constant_set,
            binding: 0,
            base,
            register_count,
            block_registers: 2 * register_count,
        }
    }

    fn sampler_binding(&self, stage: ShaderStage, index: u32) -> SamplerSlot {
        debug_assert!(index <= MAX_SAMPLER_REGISTER_INDEX);
        let set = match stage {
            ShaderStage::Vertex => self.vertex_sampler_set,
            ShaderStage::Pixel => self.pixel_sampler_set,
        };
        SamplerSlot {
            set,
            texture_binding: 2 * index,
            sampler_binding: 2 * index + 1,
        }
    }
}
