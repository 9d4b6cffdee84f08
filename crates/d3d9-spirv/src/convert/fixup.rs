use spirv::{Op, Word};

use super::Translation;
use crate::error::ConvertError;
use crate::module::Instruction;

impl Translation<'_> {
    /// Packed D3DCOLOR bytes (BGRA, `uvec4`) to normalized RGBA floats.
    pub(super) fn unpack_d3dcolor(&mut self, packed: Word) -> Word {
        let vec4 = self.float_type(4);
        let floats = self.unary(Op::ConvertUToF, vec4, packed);
        let scale = self.const_f32(1.0 / 255.0);
        let normalized = self.binary(Op::VectorTimesScalar, vec4, floats, scale);
        self.shuffle(vec4, normalized, normalized, &[2, 1, 0, 3])
    }

    /// Negates the Y component of a position.
    fn flip_y(&mut self, position: Word) -> Word {
        let float = self.float_type(1);
        let y = self.extract(float, position, 1);
        let negated = self.unary(Op::FNegate, float, y);
        let vec4 = self.float_type(4);
        let id = self.builder.alloc_id();
        self.emit(Instruction::composite_insert(
            vec4,
            id,
            negated,
            position,
            &[1],
        ));
        id
    }

    /// Stores the final value of every output register to its interface variable.
    pub(super) fn store_outputs(&mut self) -> Result<(), ConvertError> {
        let outputs: Vec<_> = self
            .outputs
            .iter()
            .map(|(reg, var)| (*reg, var.clone()))
            .collect();
        for (reg, var) in outputs {
            let mut value = self.id_by_register(reg, None)?;
            if var.builtin == Some(spirv::BuiltIn::Position) && self.options.flip_y {
                value = self.flip_y(value);
            }
            if var.ty.is_scalar_float() {
                let float = self.float_type(1);
                value = self.extract(float, value, 0);
            }
            self.emit(Instruction::store(var.id, value));
        }
        Ok(())
    }
}
