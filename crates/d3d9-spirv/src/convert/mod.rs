//! D3D9 token stream to SPIR-V conversion.
//!
//! A conversion is a single pass: every instruction is decoded and lowered straight into the
//! function body of a [`ModuleBuilder`], register values are versioned in a [`RegisterTable`] and
//! interface variables are stored once after the body.

mod arith;
mod declare;
mod fixup;
mod operand;
mod texture;

use std::collections::{BTreeMap, HashMap, HashSet};

use spirv::Word;
use wgpu::ShaderStages;

use crate::constants::{ConstantRegistry, ShaderConstantSlots};
use crate::error::ConvertError;
use crate::layout::{ConvertedShader, DescriptorBinding, SpirvShader, VertexInputAttribute};
use crate::limits::{MAX_SHADER_BYTECODE_BYTES, MAX_SHADER_TOKEN_COUNT};
use crate::module::{Instruction, ModuleBuilder, ModuleLoader};
use crate::registers::RegisterTable;
use crate::token::{
    Opcode, RegisterFile, RegisterRef, ShaderStage, ShaderVersion, Token, TokenReader,
};
use crate::types::{TypeDescription, TypeTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConvertOptions {
    /// Negate `oPos.y` before it is written, mapping D3D clip space onto a Y-down viewport.
    pub flip_y: bool,
    /// Vertex `COLOR` inputs are packed BGRA bytes (`Uint8x4`) unpacked in the shader.
    pub d3dcolor_inputs: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            flip_y: true,
            d3dcolor_inputs: true,
        }
    }
}

/// Converts D3D9 shader bytecode into SPIR-V modules.
///
/// The converter only holds configuration; every call builds its own tables, so a converter can
/// be shared between threads.
#[derive(Debug, Clone)]
pub struct ShaderConverter<R = ShaderConstantSlots> {
    options: ConvertOptions,
    registry: R,
}

impl Default for ShaderConverter {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

impl ShaderConverter {
    pub fn new(options: ConvertOptions) -> Self {
        Self::with_registry(options, ShaderConstantSlots::default())
    }
}

impl<R: ConstantRegistry> ShaderConverter<R> {
    pub fn with_registry(options: ConvertOptions, registry: R) -> Self {
        Self { options, registry }
    }

    pub fn options(&self) -> ConvertOptions {
        self.options
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Translates a token stream into SPIR-V words and layout metadata.
    pub fn translate(&self, tokens: &[u32]) -> Result<SpirvShader, ConvertError> {
        if tokens.len() > MAX_SHADER_TOKEN_COUNT {
            return Err(ConvertError::BytecodeTooLarge {
                len: tokens.len() * 4,
                max: MAX_SHADER_BYTECODE_BYTES,
            });
        }
        Translation::run(tokens, self.options, &self.registry)
    }

    /// Translates little-endian bytecode.
    pub fn translate_bytes(&self, bytes: &[u8]) -> Result<SpirvShader, ConvertError> {
        let tokens = tokens_from_bytes(bytes)?;
        self.translate(&tokens)
    }

    /// Translates `tokens` and hands the module to `loader`.
    pub fn convert<L: ModuleLoader>(
        &self,
        tokens: &[u32],
        loader: &L,
    ) -> Result<ConvertedShader<L::Module>, ConvertError> {
        let shader = self.translate(tokens)?;
        let size = shader.size();
        let module = loader.load_module(&shader.words)?;
        Ok(ConvertedShader {
            vertex_input_attributes: shader.vertex_input_attributes,
            descriptor_bindings: shader.descriptor_bindings,
            size,
            module,
        })
    }
}

/// Splits little-endian bytecode into tokens.
pub fn tokens_from_bytes(bytes: &[u8]) -> Result<Vec<u32>, ConvertError> {
    if bytes.len() > MAX_SHADER_BYTECODE_BYTES {
        return Err(ConvertError::BytecodeTooLarge {
            len: bytes.len(),
            max: MAX_SHADER_BYTECODE_BYTES,
        });
    }
    if bytes.len() % 4 != 0 {
        return Err(ConvertError::InvalidByteLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Interface variable backing an input or output register.
#[derive(Debug, Clone)]
struct InterfaceVar {
    id: Word,
    ty: TypeDescription,
    builtin: Option<spirv::BuiltIn>,
}

#[derive(Debug, Clone, Copy)]
struct SamplerVars {
    image: Word,
    sampler: Word,
}

/// Per-call conversion state; dropped once the module is assembled.
struct Translation<'a> {
    options: ConvertOptions,
    registry: &'a dyn ConstantRegistry,
    version: ShaderVersion,
    builder: ModuleBuilder,
    types: TypeTable,
    registers: RegisterTable,
    glsl_std_450: Word,
    entry_point: Word,

    scalar_constants: HashMap<(Word, Word), Word>,
    composite_constants: HashMap<(Word, Vec<Word>), Word>,
    null_constants: HashMap<Word, Word>,
    defined_constants: HashSet<RegisterRef>,

    interface: Vec<Word>,
    inputs: BTreeMap<RegisterRef, InterfaceVar>,
    outputs: BTreeMap<RegisterRef, InterfaceVar>,
    constant_block: Option<Word>,
    samplers: BTreeMap<u32, SamplerVars>,

    vertex_inputs: Vec<VertexInputAttribute>,
    vertex_input_stride: u64,
    descriptor_bindings: Vec<DescriptorBinding>,
    writes_depth: bool,
    instruction_count: usize,
}

impl<'a> Translation<'a> {
    fn run(
        tokens: &[u32],
        options: ConvertOptions,
        registry: &'a dyn ConstantRegistry,
    ) -> Result<SpirvShader, ConvertError> {
        let mut reader = TokenReader::new(tokens);
        let version_token = reader.next_token()?.raw();
        let version = ShaderVersion::decode(version_token)
            .filter(ShaderVersion::is_supported)
            .ok_or(ConvertError::UnsupportedVersion(version_token))?;

        let mut translation = Translation::new(version, options, registry);
        while !reader.is_at_end() {
            let token_index = reader.position();
            let token = reader.next_token()?;
            let opcode = Opcode::from_raw(token.opcode());
            match opcode {
                Opcode::Comment => {
                    reader.skip_tokens(token.comment_length())?;
                    continue;
                }
                Opcode::End => break,
                _ => {}
            }

            let operand_count = if version.is_sm1() {
                opcode
                    .sm1_operand_count()
                    .ok_or_else(|| unsupported_opcode(opcode, token, token_index))?
            } else {
                token.instruction_length()
            };
            reader.begin_instruction(operand_count)?;
            translation.emit_instruction(&mut reader, token, opcode, token_index)?;
            reader.end_instruction(opcode)?;
        }

        translation.finish()
    }

    fn new(
        version: ShaderVersion,
        options: ConvertOptions,
        registry: &'a dyn ConstantRegistry,
    ) -> Self {
        let mut builder = ModuleBuilder::new();
        builder.require_capability(spirv::Capability::Shader);
        let glsl_std_450 = builder.alloc_id();
        Instruction::ext_inst_import(glsl_std_450, "GLSL.std.450")
            .to_words(&mut builder.sections.ext_inst_imports);
        Instruction::memory_model(spirv::AddressingModel::Logical, spirv::MemoryModel::GLSL450)
            .to_words(&mut builder.sections.memory_model);

        let mut translation = Self {
            options,
            registry,
            version,
            builder,
            types: TypeTable::new(),
            registers: RegisterTable::new(),
            glsl_std_450,
            entry_point: 0,
            scalar_constants: HashMap::new(),
            composite_constants: HashMap::new(),
            null_constants: HashMap::new(),
            defined_constants: HashSet::new(),
            interface: Vec::new(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            constant_block: None,
            samplers: BTreeMap::new(),
            vertex_inputs: Vec::new(),
            vertex_input_stride: 0,
            descriptor_bindings: Vec::new(),
            writes_depth: false,
            instruction_count: 0,
        };
        translation.begin_function();
        translation
    }

    fn begin_function(&mut self) {
        let void = self.types.void_type_id(&mut self.builder);
        let fn_type = self
            .types
            .type_id(&mut self.builder, &TypeDescription::function(void, &[]));
        self.entry_point = self.builder.alloc_id();
        let label = self.builder.alloc_id();
        self.builder.debug_name(Instruction::name(self.entry_point, "main"));
        self.builder.emit(Instruction::function(
            void,
            self.entry_point,
            spirv::FunctionControl::NONE,
            fn_type,
        ));
        self.builder.emit(Instruction::label(label));
    }

    fn stage(&self) -> ShaderStage {
        self.version.stage
    }

    fn shader_stages(&self) -> ShaderStages {
        match self.stage() {
            ShaderStage::Vertex => ShaderStages::VERTEX,
            ShaderStage::Pixel => ShaderStages::FRAGMENT,
        }
    }

    fn emit_instruction(
        &mut self,
        reader: &mut TokenReader<'_>,
        token: Token,
        opcode: Opcode,
        token_index: usize,
    ) -> Result<(), ConvertError> {
        tracing::trace!(opcode = opcode.name(), token_index, "converting instruction");
        if token.is_predicated() {
            return Err(ConvertError::UnsupportedRegister {
                reg: RegisterRef::new(RegisterFile::Predicate, 0),
                context: "predicated instruction",
            });
        }

        match opcode {
            Opcode::Nop => {
                reader.skip_tokens(reader.remaining())?;
            }
            Opcode::Dcl => self.emit_dcl(reader)?,
            Opcode::Def => self.emit_def(reader)?,
            Opcode::DefI => self.emit_defi(reader)?,
            Opcode::DefB => self.emit_defb(reader)?,
            Opcode::Mov => self.emit_mov(reader)?,
            Opcode::Mova => self.emit_mova(reader)?,
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Mad
            | Opcode::Min
            | Opcode::Max
            | Opcode::Slt
            | Opcode::Sge
            | Opcode::Frc
            | Opcode::Abs
            | Opcode::Lrp => self.emit_component_wise(reader, opcode)?,
            Opcode::Rcp | Opcode::Rsq | Opcode::Exp | Opcode::Log | Opcode::Pow => {
                self.emit_scalar(reader, opcode)?
            }
            Opcode::Dp3 => self.emit_dot(reader, 3)?,
            Opcode::Dp4 => self.emit_dot(reader, 4)?,
            Opcode::Tex if self.stage() == ShaderStage::Pixel => {
                self.emit_texld(reader, token.opcode_specific(), token_index)?
            }
            Opcode::TexLdl => self.emit_texldl(reader)?,
            _ => return Err(unsupported_opcode(opcode, token, token_index)),
        }
        self.instruction_count += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<SpirvShader, ConvertError> {
        self.store_outputs()?;
        self.builder.emit(Instruction::return_void());
        self.builder.emit(Instruction::function_end());

        let execution_model = match self.stage() {
            ShaderStage::Vertex => spirv::ExecutionModel::Vertex,
            ShaderStage::Pixel => spirv::ExecutionModel::Fragment,
        };
        Instruction::entry_point(execution_model, self.entry_point, "main", &self.interface)
            .to_words(&mut self.builder.sections.entry_points);
        if self.stage() == ShaderStage::Pixel {
            Instruction::execution_mode(self.entry_point, spirv::ExecutionMode::OriginUpperLeft)
                .to_words(&mut self.builder.sections.execution_modes);
            if self.writes_depth {
                Instruction::execution_mode(self.entry_point, spirv::ExecutionMode::DepthReplacing)
                    .to_words(&mut self.builder.sections.execution_modes);
            }
        }

        let words = self.builder.assemble();
        tracing::debug!(
            stage = ?self.version.stage,
            major = self.version.major,
            minor = self.version.minor,
            instructions = self.instruction_count,
            id_bound = self.builder.bound(),
            words = words.len(),
            "converted d3d9 shader"
        );

        Ok(SpirvShader {
            stage: self.shader_stages(),
            words,
            vertex_input_attributes: self.vertex_inputs,
            descriptor_bindings: self.descriptor_bindings,
        })
    }
}

fn unsupported_opcode(opcode: Opcode, token: Token, token_index: usize) -> ConvertError {
    ConvertError::UnsupportedOpcode {
        name: opcode.name(),
        raw: token.opcode(),
        token_index,
    }
}
