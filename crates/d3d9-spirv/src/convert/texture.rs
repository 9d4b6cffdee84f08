use spirv::{Op, StorageClass, Word};

use super::{SamplerVars, Translation};
use crate::error::ConvertError;
use crate::layout::{DescriptorBinding, DescriptorKind};
use crate::module::Instruction;
use crate::registers::type_by_register;
use crate::token::{Opcode, RegisterFile, RegisterRef, SrcParam, TextureType, TokenReader};
use crate::types::TypeDescription;

/// `texld` control bits.
const TEXLD_PROJECT: u8 = 1;
const TEXLD_BIAS: u8 = 2;

impl Translation<'_> {
    /// `dcl_2d s#` and friends: a separate texture and sampler binding per sampler register.
    pub(super) fn declare_sampler(
        &mut self,
        index: u32,
        texture_type: TextureType,
    ) -> Result<(), ConvertError> {
        let reg = RegisterRef::new(RegisterFile::Sampler, index);
        if let TextureType::Unknown(_) = texture_type {
            return Err(ConvertError::UnsupportedRegister {
                reg,
                context: "sampler texture type",
            });
        }
        if self.samplers.contains_key(&index) {
            tracing::warn!(%reg, ?texture_type, "ignoring repeated sampler declaration");
            return Ok(());
        }
        self.registers.declare_sampler(index, texture_type);

        let slot = self.registry.sampler_binding(self.stage(), index);
        let image_desc = type_by_register(
            self.stage(),
            reg,
            None,
            self.options.d3dcolor_inputs,
            Some(texture_type),
        );
        let image_pointer = self.types.pointer_type_id(
            &mut self.builder,
            &image_desc,
            StorageClass::UniformConstant,
        );
        let sampler_pointer = self.types.pointer_type_id(
            &mut self.builder,
            &TypeDescription::sampler(),
            StorageClass::UniformConstant,
        );

        let image = self.builder.alloc_id();
        let sampler = self.builder.alloc_id();
        for (id, pointer, binding, name) in [
            (image, image_pointer, slot.texture_binding, format!("{reg}_texture")),
            (sampler, sampler_pointer, slot.sampler_binding, format!("{reg}_sampler")),
        ] {
            self.builder.declare(Instruction::variable(
                pointer,
                id,
                StorageClass::UniformConstant,
                None,
            ));
            self.builder.decorate(Instruction::decorate(
                id,
                spirv::Decoration::DescriptorSet,
                &[slot.set],
            ));
            self.builder
                .decorate(Instruction::decorate(id, spirv::Decoration::Binding, &[binding]));
            self.builder.debug_name(Instruction::name(id, &name));
        }

        let stages = self.shader_stages();
        self.descriptor_bindings.push(DescriptorBinding {
            set: slot.set,
            binding: slot.texture_binding,
            kind: DescriptorKind::SampledTexture(texture_type),
            stages,
            count: 1,
        });
        self.descriptor_bindings.push(DescriptorBinding {
            set: slot.set,
            binding: slot.sampler_binding,
            kind: DescriptorKind::Sampler,
            stages,
            count: 1,
        });
        self.samplers.insert(index, SamplerVars { image, sampler });
        Ok(())
    }

    /// Loads the texture and sampler of `src` and combines them.
    fn sampled_image(&mut self, src: &SrcParam) -> Result<(Word, TextureType), ConvertError> {
        if src.reg.file != RegisterFile::Sampler {
            return Err(ConvertError::UnsupportedRegister {
                reg: src.reg,
                context: "texture sampler operand",
            });
        }
        let vars = self
            .samplers
            .get(&src.reg.index)
            .copied()
            .ok_or(ConvertError::UndeclaredRegister(src.reg))?;
        let texture_type = self
            .registers
            .sampler_type(src.reg.index)
            .ok_or(ConvertError::UndeclaredRegister(src.reg))?;

        let dim = match texture_type {
            TextureType::Texture1D => spirv::Dim::Dim1D,
            TextureType::TextureCube => spirv::Dim::DimCube,
            TextureType::Texture3D => spirv::Dim::Dim3D,
            TextureType::Texture2D | TextureType::Unknown(_) => spirv::Dim::Dim2D,
        };
        let image_type = self.type_id(&TypeDescription::image(dim));
        let sampler_type = self.type_id(&TypeDescription::sampler());
        let sampled_type = self.type_id(&TypeDescription::sampled_image(dim));

        let image = self.builder.alloc_id();
        self.emit(Instruction::load(image_type, image, vars.image));
        let sampler = self.builder.alloc_id();
        self.emit(Instruction::load(sampler_type, sampler, vars.sampler));
        let combined = self.builder.alloc_id();
        self.emit(Instruction::sampled_image(
            sampled_type,
            combined,
            image,
            sampler,
        ));
        Ok((combined, texture_type))
    }

    fn sample(
        &mut self,
        op: Op,
        sampled_image: Word,
        coordinates: Word,
        operands: Option<(spirv::ImageOperands, &[Word])>,
    ) -> Word {
        let vec4 = self.float_type(4);
        let id = self.builder.alloc_id();
        self.emit(Instruction::image_sample(
            op,
            vec4,
            id,
            sampled_image,
            coordinates,
            operands,
        ));
        id
    }

    /// `texld`, `texldp` and `texldb` (pixel shaders only).
    pub(super) fn emit_texld(
        &mut self,
        reader: &mut TokenReader<'_>,
        control: u8,
        token_index: usize,
    ) -> Result<(), ConvertError> {
        let dst = reader.read_dst(self.version)?;
        let coord = reader.read_src(self.version)?;
        let sampler = reader.read_src(self.version)?;

        let (sampled_image, texture_type) = self.sampled_image(&sampler)?;
        let width = texture_type.coordinate_count();
        let full = self.swizzled_id(&coord, 4)?;

        let value = match control {
            0 => {
                let coordinates = self.truncate(full, width);
                self.sample(Op::ImageSampleImplicitLod, sampled_image, coordinates, None)
            }
            TEXLD_PROJECT => {
                if texture_type == TextureType::TextureCube {
                    return Err(ConvertError::UnsupportedRegister {
                        reg: sampler.reg,
                        context: "projected cube texture sampling",
                    });
                }
                // Coordinates followed by the projective divisor `w`.
                let ty = self.float_type(width + 1);
                let mut components: Vec<Word> = (0..width).collect();
                components.push(3);
                let coordinates = self.shuffle(ty, full, full, &components);
                self.sample(
                    Op::ImageSampleProjImplicitLod,
                    sampled_image,
                    coordinates,
                    None,
                )
            }
            TEXLD_BIAS => {
                let coordinates = self.truncate(full, width);
                let float = self.float_type(1);
                let bias = [self.extract(float, full, 3)];
                self.sample(
                    Op::ImageSampleImplicitLod,
                    sampled_image,
                    coordinates,
                    Some((spirv::ImageOperands::BIAS, &bias[..])),
                )
            }
            _ => {
                return Err(ConvertError::UnsupportedOpcode {
                    name: Opcode::Tex.name(),
                    raw: 0x42,
                    token_index,
                })
            }
        };
        self.write_dst(&dst, value, 4)
    }

    /// `texldl`: explicit level of detail taken from `coord.w`.
    pub(super) fn emit_texldl(&mut self, reader: &mut TokenReader<'_>) -> Result<(), ConvertError> {
        let dst = reader.read_dst(self.version)?;
        let coord = reader.read_src(self.version)?;
        let sampler = reader.read_src(self.version)?;

        let (sampled_image, texture_type) = self.sampled_image(&sampler)?;
        let full = self.swizzled_id(&coord, 4)?;
        let coordinates = self.truncate(full, texture_type.coordinate_count());
        let float = self.float_type(1);
        let lod = [self.extract(float, full, 3)];
        let value = self.sample(
            Op::ImageSampleExplicitLod,
            sampled_image,
            coordinates,
            Some((spirv::ImageOperands::LOD, &lod[..])),
        );
        self.write_dst(&dst, value, 4)
    }
}
