use spirv::Word;

use super::{InterfaceVar, Translation};
use crate::constants::ConstantFile;
use crate::error::ConvertError;
use crate::layout::{varying_location, vertex_format_for_usage, VertexInputAttribute};
use crate::limits::MAX_VERTEX_INPUT_ATTRIBUTES;
use crate::module::Instruction;
use crate::registers::{storage_class_for, type_by_register, Declaration};
use crate::token::{
    DeclUsage, RegisterFile, RegisterRef, ShaderStage, TokenReader, RASTOUT_FOG,
    RASTOUT_POINT_SIZE, RASTOUT_POSITION,
};
use crate::types::TypeDescription;

/// How an interface variable is matched up with the other pipeline stage.
#[derive(Debug, Clone, Copy)]
enum InterfaceSlot {
    Location(u32),
    BuiltIn(spirv::BuiltIn),
}

impl Translation<'_> {
    pub(super) fn emit_dcl(&mut self, reader: &mut TokenReader<'_>) -> Result<(), ConvertError> {
        let decl = reader.next_token()?;
        let dst = reader.read_dst(self.version)?;
        let reg = dst.reg;
        let usage = decl.usage();
        let usage_index = decl.usage_index();

        match (self.stage(), reg.file) {
            (_, RegisterFile::Sampler) => self.declare_sampler(reg.index, decl.texture_type()),
            (ShaderStage::Vertex, RegisterFile::Input) => {
                self.declare_vertex_input(reg, usage, usage_index)
            }
            (ShaderStage::Vertex, RegisterFile::Output) => {
                self.declare_output(reg, usage, usage_index)
            }
            (ShaderStage::Pixel, RegisterFile::Input) if self.version.major >= 3 => {
                self.declare_pixel_input(reg, usage, usage_index)
            }
            // ps_2_x carries no usage: v# are colors and t# texture coordinates.
            (ShaderStage::Pixel, RegisterFile::Input) => {
                self.declare_pixel_input(reg, DeclUsage::Color, reg.index as u8)
            }
            (ShaderStage::Pixel, RegisterFile::Texture) => {
                self.declare_pixel_input(reg, DeclUsage::TexCoord, reg.index as u8)
            }
            _ => Err(ConvertError::UnsupportedRegister {
                reg,
                context: "declaration",
            }),
        }
    }

    fn interface_variable(
        &mut self,
        reg: RegisterRef,
        ty: &TypeDescription,
        slot: InterfaceSlot,
    ) -> Word {
        let storage_class = storage_class_for(reg.file);
        let pointer = self
            .types
            .pointer_type_id(&mut self.builder, ty, storage_class);
        let id = self.builder.alloc_id();
        self.builder
            .declare(Instruction::variable(pointer, id, storage_class, None));
        let decoration = match slot {
            InterfaceSlot::Location(location) => {
                Instruction::decorate(id, spirv::Decoration::Location, &[location])
            }
            InterfaceSlot::BuiltIn(builtin) => {
                Instruction::decorate(id, spirv::Decoration::BuiltIn, &[builtin as Word])
            }
        };
        self.builder.decorate(decoration);
        self.builder.debug_name(Instruction::name(id, &reg.to_string()));
        self.interface.push(id);
        id
    }

    fn declare_vertex_input(
        &mut self,
        reg: RegisterRef,
        usage: DeclUsage,
        usage_index: u8,
    ) -> Result<(), ConvertError> {
        if self.inputs.contains_key(&reg) {
            tracing::warn!(%reg, ?usage, "ignoring repeated input declaration");
            return Ok(());
        }
        if self.vertex_inputs.len() >= MAX_VERTEX_INPUT_ATTRIBUTES {
            return Err(ConvertError::TooManyVertexInputs {
                max: MAX_VERTEX_INPUT_ATTRIBUTES,
            });
        }
        let format = vertex_format_for_usage(usage, self.options.d3dcolor_inputs)
            .ok_or(ConvertError::UnsupportedUsage { reg, usage })?;

        self.registers.declare(reg, Declaration { usage, usage_index });
        let ty = type_by_register(
            self.stage(),
            reg,
            Some(usage),
            self.options.d3dcolor_inputs,
            None,
        );
        let id = self.interface_variable(reg, &ty, InterfaceSlot::Location(reg.index));
        self.inputs.insert(
            reg,
            InterfaceVar {
                id,
                ty,
                builtin: None,
            },
        );

        self.vertex_inputs.push(VertexInputAttribute {
            binding: 0,
            location: reg.index,
            format,
            offset: self.vertex_input_stride,
        });
        self.vertex_input_stride += format.size();
        Ok(())
    }

    fn declare_pixel_input(
        &mut self,
        reg: RegisterRef,
        usage: DeclUsage,
        usage_index: u8,
    ) -> Result<(), ConvertError> {
        if self.inputs.contains_key(&reg) {
            tracing::warn!(%reg, ?usage, "ignoring repeated input declaration");
            return Ok(());
        }
        let location = varying_location(usage, usage_index)
            .ok_or(ConvertError::UnsupportedUsage { reg, usage })?;

        self.registers.declare(reg, Declaration { usage, usage_index });
        let ty = TypeDescription::vec4();
        let id = self.interface_variable(reg, &ty, InterfaceSlot::Location(location));
        self.inputs.insert(
            reg,
            InterfaceVar {
                id,
                ty,
                builtin: None,
            },
        );
        Ok(())
    }

    /// `dcl_* o#` in vs_3_0.
    fn declare_output(
        &mut self,
        reg: RegisterRef,
        usage: DeclUsage,
        usage_index: u8,
    ) -> Result<(), ConvertError> {
        if self.outputs.contains_key(&reg) {
            tracing::warn!(%reg, ?usage, "ignoring repeated output declaration");
            return Ok(());
        }
        let slot = match (usage, usage_index) {
            (DeclUsage::Position, 0) => InterfaceSlot::BuiltIn(spirv::BuiltIn::Position),
            (DeclUsage::PointSize, 0) => InterfaceSlot::BuiltIn(spirv::BuiltIn::PointSize),
            _ => InterfaceSlot::Location(
                varying_location(usage, usage_index)
                    .ok_or(ConvertError::UnsupportedUsage { reg, usage })?,
            ),
        };
        self.registers.declare(reg, Declaration { usage, usage_index });
        let ty = type_by_register(
            self.stage(),
            reg,
            Some(usage),
            self.options.d3dcolor_inputs,
            None,
        );
        self.create_output(reg, ty, slot);
        Ok(())
    }

    fn create_output(&mut self, reg: RegisterRef, ty: TypeDescription, slot: InterfaceSlot) {
        let id = self.interface_variable(reg, &ty, slot);
        let builtin = match slot {
            InterfaceSlot::BuiltIn(builtin) => Some(builtin),
            InterfaceSlot::Location(_) => None,
        };
        self.outputs.insert(reg, InterfaceVar { id, ty, builtin });
    }

    /// Creates the interface variable of an output register that SM1/SM2 writes without `dcl`.
    pub(super) fn ensure_output_var(&mut self, reg: RegisterRef) -> Result<(), ConvertError> {
        if self.outputs.contains_key(&reg) {
            return Ok(());
        }
        let slot = match (reg.file, reg.index) {
            (RegisterFile::RastOut, RASTOUT_POSITION) => {
                InterfaceSlot::BuiltIn(spirv::BuiltIn::Position)
            }
            (RegisterFile::RastOut, RASTOUT_FOG) => InterfaceSlot::Location(
                varying_location(DeclUsage::Fog, 0).unwrap_or_default(),
            ),
            (RegisterFile::RastOut, RASTOUT_POINT_SIZE) => {
                InterfaceSlot::BuiltIn(spirv::BuiltIn::PointSize)
            }
            (RegisterFile::AttrOut, index) | (RegisterFile::ColorOut, index) => {
                InterfaceSlot::Location(index)
            }
            (RegisterFile::TexCoordOut, index) => InterfaceSlot::Location(
                varying_location(DeclUsage::TexCoord, index as u8)
                    .ok_or(ConvertError::UnsupportedRegister {
                        reg,
                        context: "texture coordinate output",
                    })?,
            ),
            (RegisterFile::DepthOut, _) => {
                self.writes_depth = true;
                InterfaceSlot::BuiltIn(spirv::BuiltIn::FragDepth)
            }
            // vs_3_0 outputs carry their semantic in `dcl`.
            (RegisterFile::Output, _) => return Err(ConvertError::UndeclaredRegister(reg)),
            _ => {
                return Err(ConvertError::UnsupportedRegister {
                    reg,
                    context: "output",
                })
            }
        };
        let ty = type_by_register(
            self.stage(),
            reg,
            None,
            self.options.d3dcolor_inputs,
            None,
        );
        self.create_output(reg, ty, slot);
        Ok(())
    }

    pub(super) fn emit_def(&mut self, reader: &mut TokenReader<'_>) -> Result<(), ConvertError> {
        let dst = reader.read_dst(self.version)?;
        let mut values = [0f32; 4];
        for value in &mut values {
            *value = reader.next_token()?.as_f32();
        }
        self.check_constant_register(dst.reg, RegisterFile::Const, ConstantFile::Float)?;

        let id = self.const_vec4(values);
        self.bind_defined_constant(dst.reg, id);
        Ok(())
    }

    pub(super) fn emit_defi(&mut self, reader: &mut TokenReader<'_>) -> Result<(), ConvertError> {
        let dst = reader.read_dst(self.version)?;
        let mut constituents = Vec::with_capacity(4);
        for _ in 0..4 {
            let value = reader.next_token()?.as_i32();
            constituents.push(self.const_i32(value));
        }
        self.check_constant_register(dst.reg, RegisterFile::ConstInt, ConstantFile::Int)?;

        let id = self.const_composite(&TypeDescription::ivec4(), constituents);
        self.bind_defined_constant(dst.reg, id);
        Ok(())
    }

    pub(super) fn emit_defb(&mut self, reader: &mut TokenReader<'_>) -> Result<(), ConvertError> {
        let dst = reader.read_dst(self.version)?;
        let value = reader.next_token()?.raw() != 0;
        self.check_constant_register(dst.reg, RegisterFile::ConstBool, ConstantFile::Bool)?;

        let id = self.const_bool(value);
        self.bind_defined_constant(dst.reg, id);
        Ok(())
    }

    fn check_constant_register(
        &self,
        reg: RegisterRef,
        expected: RegisterFile,
        file: ConstantFile,
    ) -> Result<(), ConvertError> {
        if reg.file != expected {
            return Err(ConvertError::UnsupportedRegister {
                reg,
                context: "constant definition",
            });
        }
        let count = self.registry.slot(self.stage(), file).register_count;
        if reg.index >= count {
            return Err(ConvertError::RegisterIndexTooLarge {
                index: reg.index,
                count,
            });
        }
        Ok(())
    }

    /// A later `def` of the same register replaces the earlier one.
    fn bind_defined_constant(&mut self, reg: RegisterRef, id: Word) {
        if !self.defined_constants.insert(reg) {
            tracing::warn!(%reg, "constant register redefined, keeping the newest value");
        }
        self.set_id_by_register(reg, id);
    }
}
