use spirv::{GLOp, Op, Word};

use super::Translation;
use crate::error::ConvertError;
use crate::module::Instruction;
use crate::token::{Opcode, RegisterFile, SrcParam, TokenReader};
use crate::types::TypeDescription;

impl Translation<'_> {
    fn read_sources(
        &mut self,
        reader: &mut TokenReader<'_>,
        count: usize,
    ) -> Result<Vec<SrcParam>, ConvertError> {
        let mut sources = Vec::with_capacity(count);
        for _ in 0..count {
            sources.push(reader.read_src(self.version)?);
        }
        Ok(sources)
    }

    pub(super) fn emit_mov(&mut self, reader: &mut TokenReader<'_>) -> Result<(), ConvertError> {
        let dst = reader.read_dst(self.version)?;
        let src = reader.read_src(self.version)?;
        let value = self.swizzled_id(&src, 4)?;
        if dst.reg.file == RegisterFile::Addr {
            // vs_1_1 loads the address register with `mov`, which truncates toward -inf.
            self.write_address(&dst, value, false)
        } else {
            self.write_dst(&dst, value, 4)
        }
    }

    pub(super) fn emit_mova(&mut self, reader: &mut TokenReader<'_>) -> Result<(), ConvertError> {
        let dst = reader.read_dst(self.version)?;
        let src = reader.read_src(self.version)?;
        if dst.reg.file != RegisterFile::Addr {
            return Err(ConvertError::UnsupportedRegister {
                reg: dst.reg,
                context: "mova destination",
            });
        }
        let value = self.swizzled_id(&src, 4)?;
        self.write_address(&dst, value, true)
    }

    /// Per-component float operations on `vec4` operands.
    pub(super) fn emit_component_wise(
        &mut self,
        reader: &mut TokenReader<'_>,
        opcode: Opcode,
    ) -> Result<(), ConvertError> {
        let arity = match opcode {
            Opcode::Frc | Opcode::Abs => 1,
            Opcode::Mad | Opcode::Lrp => 3,
            _ => 2,
        };
        let dst = reader.read_dst(self.version)?;
        let sources = self.read_sources(reader, arity)?;
        let mut args = Vec::with_capacity(arity);
        for src in &sources {
            args.push(self.swizzled_id(src, 4)?);
        }

        let vec4 = self.float_type(4);
        let value = match opcode {
            Opcode::Add => self.binary(Op::FAdd, vec4, args[0], args[1]),
            Opcode::Sub => self.binary(Op::FSub, vec4, args[0], args[1]),
            Opcode::Mul => self.binary(Op::FMul, vec4, args[0], args[1]),
            Opcode::Mad => {
                let product = self.binary(Op::FMul, vec4, args[0], args[1]);
                self.binary(Op::FAdd, vec4, product, args[2])
            }
            Opcode::Min => self.ext_inst(GLOp::FMin, vec4, &[args[0], args[1]]),
            Opcode::Max => self.ext_inst(GLOp::FMax, vec4, &[args[0], args[1]]),
            Opcode::Slt => self.compare_select(Op::FOrdLessThan, args[0], args[1]),
            Opcode::Sge => self.compare_select(Op::FOrdGreaterThanEqual, args[0], args[1]),
            Opcode::Frc => self.ext_inst(GLOp::Fract, vec4, &[args[0]]),
            Opcode::Abs => self.ext_inst(GLOp::FAbs, vec4, &[args[0]]),
            // lrp dst, f, a, b: f * a + (1 - f) * b
            Opcode::Lrp => self.ext_inst(GLOp::FMix, vec4, &[args[2], args[1], args[0]]),
            other => unreachable!("{} is not component-wise", other.name()),
        };
        self.write_dst(&dst, value, 4)
    }

    /// `1.0` where `op(a, b)` holds, `0.0` elsewhere.
    fn compare_select(&mut self, op: Op, a: Word, b: Word) -> Word {
        let bvec4 = self.type_id(&TypeDescription::vector(Op::TypeBool, 4));
        let condition = self.binary(op, bvec4, a, b);
        let vec4 = self.float_type(4);
        let one = self.const_vec4([1.0; 4]);
        let zero = self.const_vec4([0.0; 4]);
        let id = self.builder.alloc_id();
        self.emit(Instruction::select(vec4, id, condition, one, zero));
        id
    }

    /// Operations on a replicated scalar source whose result is broadcast to every component.
    pub(super) fn emit_scalar(
        &mut self,
        reader: &mut TokenReader<'_>,
        opcode: Opcode,
    ) -> Result<(), ConvertError> {
        let arity = if opcode == Opcode::Pow { 2 } else { 1 };
        let dst = reader.read_dst(self.version)?;
        let sources = self.read_sources(reader, arity)?;
        let mut args = Vec::with_capacity(arity);
        for src in &sources {
            args.push(self.swizzled_id(src, 1)?);
        }

        let float = self.float_type(1);
        let value = match opcode {
            Opcode::Rcp => {
                let one = self.const_f32(1.0);
                self.binary(Op::FDiv, float, one, args[0])
            }
            // rsq, log and pow operate on |src0|.
            Opcode::Rsq => {
                let abs = self.ext_inst(GLOp::FAbs, float, &[args[0]]);
                self.ext_inst(GLOp::InverseSqrt, float, &[abs])
            }
            Opcode::Exp => self.ext_inst(GLOp::Exp2, float, &[args[0]]),
            Opcode::Log => {
                let abs = self.ext_inst(GLOp::FAbs, float, &[args[0]]);
                self.ext_inst(GLOp::Log2, float, &[abs])
            }
            Opcode::Pow => {
                let abs = self.ext_inst(GLOp::FAbs, float, &[args[0]]);
                self.ext_inst(GLOp::Pow, float, &[abs, args[1]])
            }
            other => unreachable!("{} is not a scalar operation", other.name()),
        };
        self.write_dst(&dst, value, 1)
    }

    pub(super) fn emit_dot(
        &mut self,
        reader: &mut TokenReader<'_>,
        width: u32,
    ) -> Result<(), ConvertError> {
        let dst = reader.read_dst(self.version)?;
        let sources = self.read_sources(reader, 2)?;
        let a = self.swizzled_id(&sources[0], width)?;
        let b = self.swizzled_id(&sources[1], width)?;
        let float = self.float_type(1);
        let dot = self.binary(Op::Dot, float, a, b);
        self.write_dst(&dst, dot, 1)
    }
}
