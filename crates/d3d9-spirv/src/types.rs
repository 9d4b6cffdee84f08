//! SPIR-V type descriptions and the deduplicating type table.

use std::collections::HashMap;

use spirv::{Op, StorageClass, Word};

use crate::module::{Instruction, ModuleBuilder};

/// Structural description of a SPIR-V type.
///
/// `primary` is the `OpType*` opcode. For vectors and matrices `secondary` is the component
/// kind; pointers name their pointee type id in `arguments[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescription {
    pub primary: Op,
    pub secondary: Op,
    pub storage_class: StorageClass,
    pub component_count: u32,
    pub arguments: Vec<Word>,
}

impl Default for TypeDescription {
    fn default() -> Self {
        Self {
            primary: Op::TypeVoid,
            secondary: Op::Nop,
            storage_class: StorageClass::Function,
            component_count: 0,
            arguments: Vec::new(),
        }
    }
}

impl TypeDescription {
    pub fn void() -> Self {
        Self::default()
    }

    pub fn bool() -> Self {
        Self {
            primary: Op::TypeBool,
            ..Self::default()
        }
    }

    pub fn float() -> Self {
        Self {
            primary: Op::TypeFloat,
            ..Self::default()
        }
    }

    pub fn int(signed: bool) -> Self {
        Self {
            primary: Op::TypeInt,
            arguments: vec![signed as Word],
            ..Self::default()
        }
    }

    /// `component` is `TypeFloat`, `TypeInt` (signed) or `TypeBool`.
    pub fn vector(component: Op, count: u32) -> Self {
        Self {
            primary: Op::TypeVector,
            secondary: component,
            component_count: count,
            ..Self::default()
        }
    }

    pub fn uint_vector(count: u32) -> Self {
        Self {
            arguments: vec![0],
            ..Self::vector(Op::TypeInt, count)
        }
    }

    pub fn vec4() -> Self {
        Self::vector(Op::TypeFloat, 4)
    }

    pub fn ivec4() -> Self {
        Self::vector(Op::TypeInt, 4)
    }

    /// Float scalar for a count of 1, float vector otherwise.
    pub fn float_n(count: u32) -> Self {
        if count == 1 {
            Self::float()
        } else {
            Self::vector(Op::TypeFloat, count)
        }
    }

    pub fn image(dim: spirv::Dim) -> Self {
        Self {
            primary: Op::TypeImage,
            secondary: Op::TypeFloat,
            arguments: vec![dim as Word],
            ..Self::default()
        }
    }

    pub fn sampler() -> Self {
        Self {
            primary: Op::TypeSampler,
            ..Self::default()
        }
    }

    pub fn sampled_image(dim: spirv::Dim) -> Self {
        Self {
            primary: Op::TypeSampledImage,
            ..Self::image(dim)
        }
    }

    /// `length` is the id of an integer constant.
    pub fn array(element: Word, length: Word) -> Self {
        Self {
            primary: Op::TypeArray,
            arguments: vec![element, length],
            ..Self::default()
        }
    }

    pub fn structure(members: Vec<Word>) -> Self {
        Self {
            primary: Op::TypeStruct,
            arguments: members,
            ..Self::default()
        }
    }

    pub fn function(return_type: Word, parameters: &[Word]) -> Self {
        let mut arguments = vec![return_type];
        arguments.extend_from_slice(parameters);
        Self {
            primary: Op::TypeFunction,
            arguments,
            ..Self::default()
        }
    }

    pub fn pointer_to_id(pointee: Word, storage_class: StorageClass) -> Self {
        Self {
            primary: Op::TypePointer,
            storage_class,
            arguments: vec![pointee],
            ..Self::default()
        }
    }

    /// Integer signedness; a missing argument means signed.
    fn signedness(&self) -> Word {
        self.arguments.first().copied().unwrap_or(1)
    }

    pub fn is_scalar_float(&self) -> bool {
        self.primary == Op::TypeFloat
    }

    fn key(&self) -> Option<TypeKey> {
        let key = match self.primary {
            Op::TypeVoid => TypeKey::Void,
            Op::TypeBool => TypeKey::Bool,
            Op::TypeFloat => TypeKey::Float,
            Op::TypeSampler => TypeKey::Sampler,
            Op::TypeInt => TypeKey::Int {
                signed: self.signedness(),
            },
            Op::TypeVector | Op::TypeMatrix => TypeKey::Aggregate {
                primary: self.primary as u32,
                component: self.secondary as u32,
                count: self.component_count,
                signed: if self.secondary == Op::TypeInt {
                    self.signedness()
                } else {
                    0
                },
            },
            Op::TypeImage | Op::TypeSampledImage | Op::TypeArray | Op::TypeStruct
            | Op::TypeFunction => TypeKey::Composite {
                primary: self.primary as u32,
                arguments: self.arguments.clone(),
            },
            Op::TypePointer => TypeKey::Pointer {
                storage_class: self.storage_class as u32,
                pointee: self.arguments.first().copied().unwrap_or_default(),
            },
            other => {
                tracing::warn!(kind = ?other, "unsupported type kind in type comparison");
                return None;
            }
        };
        Some(key)
    }
}

/// Hashable projection of a [`TypeDescription`]; only the fields relevant to its kind take part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TypeKey {
    Void,
    Bool,
    Float,
    Sampler,
    Int {
        signed: Word,
    },
    Aggregate {
        primary: u32,
        component: u32,
        count: u32,
        signed: Word,
    },
    Composite {
        primary: u32,
        arguments: Vec<Word>,
    },
    Pointer {
        storage_class: u32,
        pointee: Word,
    },
}

/// Maps type descriptions to SPIR-V type ids, emitting each distinct type once.
#[derive(Debug, Default)]
pub struct TypeTable {
    ids: HashMap<TypeKey, Word>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `desc`, declaring it (and any component types) on first use.
    pub fn type_id(&mut self, builder: &mut ModuleBuilder, desc: &TypeDescription) -> Word {
        let key = desc.key();
        if let Some(id) = key.as_ref().and_then(|key| self.ids.get(key)) {
            return *id;
        }

        let instruction = match desc.primary {
            Op::TypeVoid => Instruction::type_void(builder.alloc_id()),
            Op::TypeBool => Instruction::type_bool(builder.alloc_id()),
            Op::TypeFloat => Instruction::type_float(builder.alloc_id(), 32),
            Op::TypeInt => Instruction::type_int(builder.alloc_id(), 32, desc.signedness()),
            Op::TypeVector => {
                let component = self.component_id(builder, desc);
                Instruction::type_vector(builder.alloc_id(), component, desc.component_count)
            }
            Op::TypeMatrix => {
                // Columns are square: `component_count` columns of `component_count` rows.
                let column = self.type_id(
                    builder,
                    &TypeDescription::vector(desc.secondary, desc.component_count),
                );
                Instruction::type_matrix(builder.alloc_id(), column, desc.component_count)
            }
            Op::TypeImage => {
                let sampled = self.type_id(builder, &TypeDescription::float());
                let dim = image_dim(desc);
                if dim == spirv::Dim::Dim1D {
                    builder.require_capability(spirv::Capability::Sampled1D);
                }
                Instruction::type_image(builder.alloc_id(), sampled, dim)
            }
            Op::TypeSampler => Instruction::type_sampler(builder.alloc_id()),
            Op::TypeSampledImage => {
                let image = self.type_id(builder, &TypeDescription::image(image_dim(desc)));
                Instruction::type_sampled_image(builder.alloc_id(), image)
            }
            Op::TypeArray => Instruction::type_array(
                builder.alloc_id(),
                desc.arguments.first().copied().unwrap_or_default(),
                desc.arguments.get(1).copied().unwrap_or_default(),
            ),
            Op::TypeStruct => Instruction::type_struct(builder.alloc_id(), &desc.arguments),
            Op::TypeFunction => Instruction::type_function(
                builder.alloc_id(),
                desc.arguments.first().copied().unwrap_or_default(),
                desc.arguments.get(1..).unwrap_or_default(),
            ),
            Op::TypePointer => Instruction::type_pointer(
                builder.alloc_id(),
                desc.storage_class,
                desc.arguments.first().copied().unwrap_or_default(),
            ),
            other => {
                // Unkeyed kinds still need an id so callers can proceed; declare an opaque
                // placeholder that is never deduplicated.
                tracing::warn!(kind = ?other, "declaring unsupported type kind as void");
                Instruction::type_void(builder.alloc_id())
            }
        };

        let id = instruction.result_id().unwrap_or_default();
        builder.declare(instruction);
        if let Some(key) = key {
            self.ids.insert(key, id);
        }
        id
    }

    fn component_id(&mut self, builder: &mut ModuleBuilder, desc: &TypeDescription) -> Word {
        let component = match desc.secondary {
            Op::TypeInt => TypeDescription::int(desc.signedness() != 0),
            Op::TypeBool => TypeDescription::bool(),
            _ => TypeDescription::float(),
        };
        self.type_id(builder, &component)
    }

    pub fn void_type_id(&mut self, builder: &mut ModuleBuilder) -> Word {
        self.type_id(builder, &TypeDescription::void())
    }

    pub fn scalar_type_id(&mut self, builder: &mut ModuleBuilder, kind: Op) -> Word {
        let desc = match kind {
            Op::TypeInt => TypeDescription::int(true),
            Op::TypeBool => TypeDescription::bool(),
            _ => TypeDescription::float(),
        };
        self.type_id(builder, &desc)
    }

    pub fn vector_type_id(&mut self, builder: &mut ModuleBuilder, kind: Op, count: u32) -> Word {
        self.type_id(builder, &TypeDescription::vector(kind, count))
    }

    /// Float scalar for a count of 1, float vector otherwise.
    pub fn float_type_id(&mut self, builder: &mut ModuleBuilder, count: u32) -> Word {
        self.type_id(builder, &TypeDescription::float_n(count))
    }

    pub fn pointer_type_id(
        &mut self,
        builder: &mut ModuleBuilder,
        pointee: &TypeDescription,
        storage_class: StorageClass,
    ) -> Word {
        let pointee = self.type_id(builder, pointee);
        self.type_id(
            builder,
            &TypeDescription::pointer_to_id(pointee, storage_class),
        )
    }
}

fn image_dim(desc: &TypeDescription) -> spirv::Dim {
    match desc.arguments.first().copied() {
        Some(d) if d == spirv::Dim::Dim1D as Word => spirv::Dim::Dim1D,
        Some(d) if d == spirv::Dim::Dim3D as Word => spirv::Dim::Dim3D,
        Some(d) if d == spirv::Dim::DimCube as Word => spirv::Dim::DimCube,
        _ => spirv::Dim::Dim2D,
    }
}
