use spirv::{Op, StorageClass, Word};

use super::Translation;
use crate::constants::{ConstantFile, ConstantSlot};
use crate::error::ConvertError;
use crate::layout::{DescriptorBinding, DescriptorKind};
use crate::module::Instruction;
use crate::token::{
    DeclUsage, DstParam, RegisterFile, RegisterRef, ResultShift, SrcModifier, SrcParam,
    WriteMask,
};
use crate::types::TypeDescription;

impl Translation<'_> {
    pub(super) fn type_id(&mut self, desc: &TypeDescription) -> Word {
        self.types.type_id(&mut self.builder, desc)
    }

    /// `float` for a width of 1, `vecN` otherwise.
    pub(super) fn float_type(&mut self, width: u32) -> Word {
        self.types.float_type_id(&mut self.builder, width)
    }

    pub(super) fn emit(&mut self, instruction: Instruction) {
        self.builder.emit(instruction);
    }

    pub(super) fn ext_inst(
        &mut self,
        op: spirv::GLOp,
        result_type: Word,
        operands: &[Word],
    ) -> Word {
        let id = self.builder.alloc_id();
        self.emit(Instruction::ext_inst(
            self.glsl_std_450,
            op,
            result_type,
            id,
            operands,
        ));
        id
    }

    pub(super) fn binary(&mut self, op: Op, result_type: Word, a: Word, b: Word) -> Word {
        let id = self.builder.alloc_id();
        self.emit(Instruction::binary(op, result_type, id, a, b));
        id
    }

    pub(super) fn unary(&mut self, op: Op, result_type: Word, value: Word) -> Word {
        let id = self.builder.alloc_id();
        self.emit(Instruction::unary(op, result_type, id, value));
        id
    }

    pub(super) fn extract(&mut self, result_type: Word, composite: Word, index: u32) -> Word {
        let id = self.builder.alloc_id();
        self.emit(Instruction::composite_extract(
            result_type,
            id,
            composite,
            &[index],
        ));
        id
    }

    pub(super) fn shuffle(
        &mut self,
        result_type: Word,
        a: Word,
        b: Word,
        components: &[Word],
    ) -> Word {
        let id = self.builder.alloc_id();
        self.emit(Instruction::vector_shuffle(result_type, id, a, b, components));
        id
    }

    /// Replicates a scalar float into a `vec4`.
    pub(super) fn splat(&mut self, scalar: Word) -> Word {
        let vec4 = self.float_type(4);
        let id = self.builder.alloc_id();
        self.emit(Instruction::composite_construct(
            vec4,
            id,
            &[scalar, scalar, scalar, scalar],
        ));
        id
    }

    /// The first `width` components of a `vec4` value.
    pub(super) fn truncate(&mut self, value: Word, width: u32) -> Word {
        match width {
            4 => value,
            1 => {
                let float = self.float_type(1);
                self.extract(float, value, 0)
            }
            _ => {
                let ty = self.float_type(width);
                let components: Vec<Word> = (0..width).collect();
                self.shuffle(ty, value, value, &components)
            }
        }
    }

    //
    //  Constants
    //

    fn scalar_constant(&mut self, desc: &TypeDescription, bits: Word) -> Word {
        let ty = self.type_id(desc);
        if let Some(&id) = self.scalar_constants.get(&(ty, bits)) {
            return id;
        }
        let id = self.builder.alloc_id();
        self.builder.declare(Instruction::constant_32bit(ty, id, bits));
        self.scalar_constants.insert((ty, bits), id);
        id
    }

    pub(super) fn const_f32(&mut self, value: f32) -> Word {
        self.scalar_constant(&TypeDescription::float(), value.to_bits())
    }

    pub(super) fn const_i32(&mut self, value: i32) -> Word {
        self.scalar_constant(&TypeDescription::int(true), value as Word)
    }

    pub(super) fn const_u32(&mut self, value: u32) -> Word {
        self.scalar_constant(&TypeDescription::int(false), value)
    }

    pub(super) fn const_bool(&mut self, value: bool) -> Word {
        let ty = self.type_id(&TypeDescription::bool());
        let bits = value as Word;
        if let Some(&id) = self.scalar_constants.get(&(ty, bits)) {
            return id;
        }
        let id = self.builder.alloc_id();
        self.builder.declare(if value {
            Instruction::constant_true(ty, id)
        } else {
            Instruction::constant_false(ty, id)
        });
        self.scalar_constants.insert((ty, bits), id);
        id
    }

    pub(super) fn const_composite(
        &mut self,
        desc: &TypeDescription,
        constituents: Vec<Word>,
    ) -> Word {
        let ty = self.type_id(desc);
        let key = (ty, constituents);
        if let Some(&id) = self.composite_constants.get(&key) {
            return id;
        }
        let id = self.builder.alloc_id();
        self.builder
            .declare(Instruction::constant_composite(ty, id, &key.1));
        self.composite_constants.insert(key, id);
        id
    }

    pub(super) fn const_vec4(&mut self, values: [f32; 4]) -> Word {
        let constituents = values.iter().map(|&v| self.const_f32(v)).collect();
        self.const_composite(&TypeDescription::vec4(), constituents)
    }

    pub(super) fn const_null(&mut self, desc: &TypeDescription) -> Word {
        let ty = self.type_id(desc);
        if let Some(&id) = self.null_constants.get(&ty) {
            return id;
        }
        let id = self.builder.alloc_id();
        self.builder.declare(Instruction::constant_null(ty, id));
        self.null_constants.insert(ty, id);
        id
    }

    //
    //  Register resolution
    //

    /// Current value of `reg`, creating it on first reference.
    ///
    /// Unwritten temporaries and outputs read as zero; inputs are loaded from their interface
    /// variable and float constants without a `def` are read from the constant block.
    pub(super) fn id_by_register(
        &mut self,
        reg: RegisterRef,
        usage: Option<DeclUsage>,
    ) -> Result<Word, ConvertError> {
        if let Some(id) = self.registers.id(reg) {
            return Ok(id);
        }

        let id = match reg.file {
            RegisterFile::Temp => self.const_null(&TypeDescription::vec4()),
            file if file.is_output() => self.const_null(&TypeDescription::vec4()),
            RegisterFile::Input | RegisterFile::Texture => self.load_input(reg, usage)?,
            RegisterFile::Const => self.load_uniform_constant(reg)?,
            RegisterFile::Addr | RegisterFile::ConstInt | RegisterFile::ConstBool => {
                return Err(ConvertError::UndeclaredRegister(reg))
            }
            _ => {
                return Err(ConvertError::UnsupportedRegister {
                    reg,
                    context: "register read",
                })
            }
        };
        self.set_id_by_register(reg, id);
        Ok(id)
    }

    pub(super) fn set_id_by_register(&mut self, reg: RegisterRef, id: Word) {
        self.registers.set(reg, id);
    }

    fn load_input(
        &mut self,
        reg: RegisterRef,
        usage: Option<DeclUsage>,
    ) -> Result<Word, ConvertError> {
        let var = self
            .inputs
            .get(&reg)
            .cloned()
            .ok_or(ConvertError::UndeclaredRegister(reg))?;
        let ty = self.type_id(&var.ty);
        let loaded = self.builder.alloc_id();
        self.emit(Instruction::load(ty, loaded, var.id));

        let usage = usage.or_else(|| self.registers.declaration(reg).map(|d| d.usage));
        if var.ty == TypeDescription::uint_vector(4) && usage == Some(DeclUsage::Color) {
            Ok(self.unpack_d3dcolor(loaded))
        } else {
            Ok(loaded)
        }
    }

    fn float_constant_slot(&self) -> ConstantSlot {
        self.registry.slot(self.stage(), ConstantFile::Float)
    }

    fn load_uniform_constant(&mut self, reg: RegisterRef) -> Result<Word, ConvertError> {
        let slot = self.check_float_constant(reg)?;
        let element = self.const_i32((slot.base + reg.index) as i32);
        self.constant_block_element(element)
    }

    fn check_float_constant(&self, reg: RegisterRef) -> Result<ConstantSlot, ConvertError> {
        let slot = self.float_constant_slot();
        if reg.index >= slot.register_count {
            return Err(ConvertError::RegisterIndexTooLarge {
                index: reg.index,
                count: slot.register_count,
            });
        }
        Ok(slot)
    }

    /// Loads element `index` (an `int` id) of the constant block.
    fn constant_block_element(&mut self, index: Word) -> Result<Word, ConvertError> {
        let block = self.constant_block();
        let vec4 = TypeDescription::vec4();
        let pointer = self
            .types
            .pointer_type_id(&mut self.builder, &vec4, StorageClass::Uniform);
        let member = self.const_i32(0);
        let element = self.builder.alloc_id();
        self.emit(Instruction::access_chain(pointer, element, block, &[member, index]));

        let ty = self.type_id(&vec4);
        let value = self.builder.alloc_id();
        self.emit(Instruction::load(ty, value, element));
        Ok(value)
    }

    /// The `c#` uniform block, declared on first use.
    fn constant_block(&mut self) -> Word {
        if let Some(id) = self.constant_block {
            return id;
        }

        let slot = self.float_constant_slot();
        let vec4 = self.type_id(&TypeDescription::vec4());
        let length = self.const_u32(slot.block_registers);
        let array = self.type_id(&TypeDescription::array(vec4, length));
        let block_desc = TypeDescription::structure(vec![array]);
        let block = self.type_id(&block_desc);
        let pointer =
            self.types
                .pointer_type_id(&mut self.builder, &block_desc, StorageClass::Uniform);

        let var = self.builder.alloc_id();
        self.builder
            .declare(Instruction::variable(pointer, var, StorageClass::Uniform, None));

        self.builder
            .decorate(Instruction::decorate(array, spirv::Decoration::ArrayStride, &[16]));
        self.builder
            .decorate(Instruction::decorate(block, spirv::Decoration::Block, &[]));
        self.builder.decorate(Instruction::member_decorate(
            block,
            0,
            spirv::Decoration::Offset,
            &[0],
        ));
        self.builder.decorate(Instruction::decorate(
            var,
            spirv::Decoration::DescriptorSet,
            &[slot.set],
        ));
        self.builder.decorate(Instruction::decorate(
            var,
            spirv::Decoration::Binding,
            &[slot.binding],
        ));
        self.builder
            .debug_name(Instruction::name(block, "D3D9FloatConstants"));
        self.builder
            .debug_name(Instruction::member_name(block, 0, "c"));
        self.builder.debug_name(Instruction::name(var, "c"));

        self.descriptor_bindings.push(DescriptorBinding {
            set: slot.set,
            binding: slot.binding,
            kind: DescriptorKind::UniformBuffer,
            stages: self.shader_stages(),
            count: 1,
        });
        self.constant_block = Some(var);
        var
    }

    /// `c[a0.? + n]`.
    ///
    /// The register index is clamped to the stage's constant file. Registers set by `def` take
    /// precedence over the block for relative reads too, so each one is selected in when the
    /// computed index matches.
    fn relative_constant(&mut self, src: &SrcParam) -> Result<Word, ConvertError> {
        let Some(relative) = src.relative else {
            return self.id_by_register(src.reg, None);
        };
        if src.reg.file != RegisterFile::Const {
            return Err(ConvertError::UnsupportedRegister {
                reg: src.reg,
                context: "relative addressing",
            });
        }
        if relative.reg.file != RegisterFile::Addr {
            return Err(ConvertError::UnsupportedRegister {
                reg: relative.reg,
                context: "relative address register",
            });
        }

        let slot = self.check_float_constant(src.reg)?;
        let addr = self
            .registers
            .id(relative.reg)
            .ok_or(ConvertError::UndeclaredRegister(relative.reg))?;
        let int = self.types.scalar_type_id(&mut self.builder, Op::TypeInt);
        let offset = self.extract(int, addr, relative.component as u32);
        let register = self.const_i32(src.reg.index as i32);
        let unclamped = self.binary(Op::IAdd, int, offset, register);
        let min = self.const_i32(0);
        let max = self.const_i32(slot.register_count as i32 - 1);
        let index = self.ext_inst(spirv::GLOp::SClamp, int, &[unclamped, min, max]);
        let base = self.const_i32(slot.base as i32);
        let element = self.binary(Op::IAdd, int, base, index);
        let mut value = self.constant_block_element(element)?;

        let mut defined: Vec<RegisterRef> = self
            .defined_constants
            .iter()
            .copied()
            .filter(|reg| reg.file == RegisterFile::Const)
            .collect();
        defined.sort();
        if defined.is_empty() {
            return Ok(value);
        }
        let bool_type = self.type_id(&TypeDescription::bool());
        let bvec4 = self.type_id(&TypeDescription::vector(Op::TypeBool, 4));
        let vec4 = self.float_type(4);
        for reg in defined {
            let Some(defined_value) = self.registers.id(reg) else {
                continue;
            };
            let target = self.const_i32(reg.index as i32);
            let matches = self.binary(Op::IEqual, bool_type, index, target);
            let condition = self.builder.alloc_id();
            self.emit(Instruction::composite_construct(
                bvec4,
                condition,
                &[matches, matches, matches, matches],
            ));
            let selected = self.builder.alloc_id();
            self.emit(Instruction::select(
                vec4,
                selected,
                condition,
                defined_value,
                value,
            ));
            value = selected;
        }
        Ok(value)
    }

    /// Resolves a source operand with swizzle and modifier applied, narrowed to `width`
    /// components.
    ///
    /// Scalar (`width == 1`) reads select the replicated component: `w` in SM1, the first
    /// swizzle component otherwise.
    pub(super) fn swizzled_id(&mut self, src: &SrcParam, width: u32) -> Result<Word, ConvertError> {
        match src.reg.file {
            RegisterFile::Temp
            | RegisterFile::Input
            | RegisterFile::Texture
            | RegisterFile::Const => {}
            file if file.is_output() => {}
            _ => {
                return Err(ConvertError::UnsupportedRegister {
                    reg: src.reg,
                    context: "arithmetic source",
                })
            }
        }

        let base = self.relative_constant(src)?;
        let swizzle = src.swizzle.0;
        let value = match width {
            4 if src.swizzle.is_identity() => base,
            1 => {
                let component = if self.version.is_sm1() {
                    swizzle[3]
                } else {
                    swizzle[0]
                };
                let float = self.float_type(1);
                self.extract(float, base, component as u32)
            }
            _ => {
                let ty = self.float_type(width);
                let components: Vec<Word> = swizzle[..width as usize]
                    .iter()
                    .map(|&c| c as Word)
                    .collect();
                self.shuffle(ty, base, base, &components)
            }
        };

        let ty = self.float_type(width);
        match src.modifier {
            SrcModifier::None => Ok(value),
            SrcModifier::Negate => Ok(self.unary(Op::FNegate, ty, value)),
            SrcModifier::Abs => Ok(self.ext_inst(spirv::GLOp::FAbs, ty, &[value])),
            SrcModifier::AbsNegate => {
                let abs = self.ext_inst(spirv::GLOp::FAbs, ty, &[value]);
                Ok(self.unary(Op::FNegate, ty, abs))
            }
            modifier => Err(ConvertError::UnsupportedSrcModifier {
                reg: src.reg,
                modifier,
            }),
        }
    }

    //
    //  Destination writes
    //

    /// Applies the result modifier and write mask, then rebinds the destination register.
    ///
    /// `value` is a float scalar (`width == 1`, replicated) or a `vec4`.
    pub(super) fn write_dst(
        &mut self,
        dst: &DstParam,
        value: Word,
        width: u32,
    ) -> Result<(), ConvertError> {
        let file = dst.reg.file;
        if file != RegisterFile::Temp && !file.is_output() {
            return Err(ConvertError::UnsupportedRegister {
                reg: dst.reg,
                context: "destination",
            });
        }
        if file.is_output() {
            self.ensure_output_var(dst.reg)?;
        }

        let vec4 = self.float_type(4);
        let mut value = if width == 1 { self.splat(value) } else { value };

        let scale = match dst.modifier.shift {
            ResultShift::Unknown(raw) => return Err(ConvertError::UnsupportedResultShift(raw)),
            shift => shift.scale().unwrap_or(1.0),
        };
        if scale != 1.0 {
            let scale = self.const_f32(scale);
            value = self.binary(Op::VectorTimesScalar, vec4, value, scale);
        }
        if dst.modifier.saturate {
            let zero = self.const_vec4([0.0; 4]);
            let one = self.const_vec4([1.0; 4]);
            value = self.ext_inst(spirv::GLOp::FClamp, vec4, &[value, zero, one]);
        }

        let value = self.apply_write_mask(dst.reg, dst.mask, value, &TypeDescription::vec4())?;
        tracing::trace!(dst = %dst.reg, mask = ?dst.mask, id = value, "register write");
        self.set_id_by_register(dst.reg, value);
        Ok(())
    }

    /// Merges `value` into the previous value of `reg` for the components outside `mask`.
    pub(super) fn apply_write_mask(
        &mut self,
        reg: RegisterRef,
        mask: WriteMask,
        value: Word,
        ty: &TypeDescription,
    ) -> Result<Word, ConvertError> {
        if mask == WriteMask::XYZW {
            return Ok(value);
        }
        let previous = match self.registers.id(reg) {
            Some(id) => id,
            None if reg.file == RegisterFile::Addr => self.const_null(ty),
            None => self.id_by_register(reg, None)?,
        };
        let components: Vec<Word> = (0..4)
            .map(|i| if mask.writes(i) { 4 + i } else { i })
            .collect();
        let ty = self.type_id(ty);
        Ok(self.shuffle(ty, previous, value, &components))
    }

    /// Writes a float `vec4` to `a0`, rounding (`mova`) or flooring (SM1 `mov`).
    pub(super) fn write_address(
        &mut self,
        dst: &DstParam,
        value: Word,
        round: bool,
    ) -> Result<(), ConvertError> {
        let vec4 = self.float_type(4);
        let rounded = self.ext_inst(
            if round {
                spirv::GLOp::Round
            } else {
                spirv::GLOp::Floor
            },
            vec4,
            &[value],
        );
        let ivec4_desc = TypeDescription::ivec4();
        let ivec4 = self.type_id(&ivec4_desc);
        let converted = self.unary(Op::ConvertFToS, ivec4, rounded);
        let merged = self.apply_write_mask(dst.reg, dst.mask, converted, &ivec4_desc)?;
        tracing::trace!(dst = %dst.reg, mask = ?dst.mask, id = merged, "address register write");
        self.set_id_by_register(dst.reg, merged);
        Ok(())
    }
}
