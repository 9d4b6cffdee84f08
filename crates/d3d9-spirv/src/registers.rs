//! Register bindings for one conversion.

use std::collections::HashMap;

use spirv::{StorageClass, Word};

use crate::token::{
    DeclUsage, RegisterFile, RegisterRef, ShaderStage, TextureType, RASTOUT_FOG,
    RASTOUT_POINT_SIZE,
};
use crate::types::TypeDescription;

/// Usage attached to a register by `dcl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    pub usage: DeclUsage,
    pub usage_index: u8,
}

/// Current SPIR-V value of each register.
///
/// Every write rebinds the register to a fresh id; reads see the most recent binding.
#[derive(Debug, Default)]
pub struct RegisterTable {
    ids: HashMap<RegisterRef, Word>,
    declarations: HashMap<RegisterRef, Declaration>,
    sampler_types: HashMap<u32, TextureType>,
}

impl RegisterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self, reg: RegisterRef) -> Option<Word> {
        self.ids.get(&reg).copied()
    }

    /// Binds `reg` to `id`, returning the previous binding.
    pub fn set(&mut self, reg: RegisterRef, id: Word) -> Option<Word> {
        self.ids.insert(reg, id)
    }

    pub fn declare(&mut self, reg: RegisterRef, declaration: Declaration) -> Option<Declaration> {
        self.declarations.insert(reg, declaration)
    }

    pub fn declaration(&self, reg: RegisterRef) -> Option<Declaration> {
        self.declarations.get(&reg).copied()
    }

    pub fn declare_sampler(&mut self, index: u32, ty: TextureType) {
        self.sampler_types.insert(index, ty);
    }

    pub fn sampler_type(&self, index: u32) -> Option<TextureType> {
        self.sampler_types.get(&index).copied()
    }
}

/// Storage class of the interface or resource variable backing a register file.
pub fn storage_class_for(file: RegisterFile) -> StorageClass {
    match file {
        RegisterFile::Input | RegisterFile::Texture => StorageClass::Input,
        f if f.is_output() => StorageClass::Output,
        RegisterFile::Const => StorageClass::Uniform,
        RegisterFile::Sampler => StorageClass::UniformConstant,
        _ => StorageClass::Function,
    }
}

/// Type of the variable backing `reg`, inferred from its file and declared usage.
pub fn type_by_register(
    stage: ShaderStage,
    reg: RegisterRef,
    usage: Option<DeclUsage>,
    d3dcolor_inputs: bool,
    sampler_type: Option<TextureType>,
) -> TypeDescription {
    match reg.file {
        RegisterFile::Input
            if stage == ShaderStage::Vertex
                && d3dcolor_inputs
                && usage == Some(DeclUsage::Color) =>
        {
            TypeDescription::uint_vector(4)
        }
        RegisterFile::RastOut if matches!(reg.index, RASTOUT_FOG | RASTOUT_POINT_SIZE) => {
            TypeDescription::float()
        }
        RegisterFile::Output if usage == Some(DeclUsage::PointSize) => TypeDescription::float(),
        RegisterFile::DepthOut => TypeDescription::float(),
        RegisterFile::Sampler => {
            let dim = match sampler_type {
                Some(TextureType::Texture1D) => spirv::Dim::Dim1D,
                Some(TextureType::TextureCube) => spirv::Dim::DimCube,
                Some(TextureType::Texture3D) => spirv::Dim::Dim3D,
                _ => spirv::Dim::Dim2D,
            };
            TypeDescription::image(dim)
        }
        RegisterFile::Addr => TypeDescription::ivec4(),
        RegisterFile::ConstInt => TypeDescription::ivec4(),
        RegisterFile::ConstBool => TypeDescription::bool(),
        _ => TypeDescription::vec4(),
    }
}
