//! SPIR-V instruction encoding, module sections and assembly.

use std::borrow::Cow;
use std::collections::BTreeSet;

use spirv::{Op, Word};

use crate::error::ModuleLoadError;

pub const SPIRV_MAGIC: Word = 0x0723_0203;
/// SPIR-V 1.0.
pub const SPIRV_VERSION: Word = 0x0001_0000;
/// Unregistered generator id; the low half carries the generator's own version.
pub const GENERATOR_ID: Word = 0x0000_0001;
pub const HEADER_WORDS: usize = 5;

/// A single SPIR-V instruction under construction.
#[derive(Debug, Clone)]
pub struct Instruction {
    op: Op,
    wc: u32,
    type_id: Option<Word>,
    result_id: Option<Word>,
    operands: Vec<Word>,
}

impl Instruction {
    pub fn new(op: Op) -> Self {
        Self {
            op,
            wc: 1,
            type_id: None,
            result_id: None,
            operands: Vec::new(),
        }
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn result_id(&self) -> Option<Word> {
        self.result_id
    }

    pub fn set_type(&mut self, id: Word) {
        debug_assert!(self.type_id.is_none(), "type can only be set once");
        self.type_id = Some(id);
        self.wc += 1;
    }

    pub fn set_result(&mut self, id: Word) {
        debug_assert!(self.result_id.is_none(), "result can only be set once");
        self.result_id = Some(id);
        self.wc += 1;
    }

    pub fn add_operand(&mut self, operand: Word) {
        self.operands.push(operand);
        self.wc += 1;
    }

    pub fn add_operands(&mut self, operands: impl IntoIterator<Item = Word>) {
        for operand in operands {
            self.add_operand(operand);
        }
    }

    pub fn to_words(&self, sink: &mut Vec<Word>) {
        sink.push((self.wc << 16) | self.op as u32);
        sink.extend(self.type_id);
        sink.extend(self.result_id);
        sink.extend_from_slice(&self.operands);
    }

    //
    //  Mode-setting and debug instructions
    //

    pub fn capability(capability: spirv::Capability) -> Self {
        let mut instruction = Self::new(Op::Capability);
        instruction.add_operand(capability as Word);
        instruction
    }

    pub fn ext_inst_import(id: Word, name: &str) -> Self {
        let mut instruction = Self::new(Op::ExtInstImport);
        instruction.set_result(id);
        instruction.add_operands(string_to_words(name));
        instruction
    }

    pub fn memory_model(
        addressing_model: spirv::AddressingModel,
        memory_model: spirv::MemoryModel,
    ) -> Self {
        let mut instruction = Self::new(Op::MemoryModel);
        instruction.add_operand(addressing_model as Word);
        instruction.add_operand(memory_model as Word);
        instruction
    }

    pub fn entry_point(
        execution_model: spirv::ExecutionModel,
        function_id: Word,
        name: &str,
        interface: &[Word],
    ) -> Self {
        let mut instruction = Self::new(Op::EntryPoint);
        instruction.add_operand(execution_model as Word);
        instruction.add_operand(function_id);
        instruction.add_operands(string_to_words(name));
        instruction.add_operands(interface.iter().copied());
        instruction
    }

    pub fn execution_mode(entry_point_id: Word, execution_mode: spirv::ExecutionMode) -> Self {
        let mut instruction = Self::new(Op::ExecutionMode);
        instruction.add_operand(entry_point_id);
        instruction.add_operand(execution_mode as Word);
        instruction
    }

    pub fn name(target_id: Word, name: &str) -> Self {
        let mut instruction = Self::new(Op::Name);
        instruction.add_operand(target_id);
        instruction.add_operands(string_to_words(name));
        instruction
    }

    pub fn member_name(target_id: Word, member: Word, name: &str) -> Self {
        let mut instruction = Self::new(Op::MemberName);
        instruction.add_operand(target_id);
        instruction.add_operand(member);
        instruction.add_operands(string_to_words(name));
        instruction
    }

    //
    //  Annotation instructions
    //

    pub fn decorate(target_id: Word, decoration: spirv::Decoration, operands: &[Word]) -> Self {
        let mut instruction = Self::new(Op::Decorate);
        instruction.add_operand(target_id);
        instruction.add_operand(decoration as Word);
        instruction.add_operands(operands.iter().copied());
        instruction
    }

    pub fn member_decorate(
        target_id: Word,
        member_index: Word,
        decoration: spirv::Decoration,
        operands: &[Word],
    ) -> Self {
        let mut instruction = Self::new(Op::MemberDecorate);
        instruction.add_operand(target_id);
        instruction.add_operand(member_index);
        instruction.add_operand(decoration as Word);
        instruction.add_operands(operands.iter().copied());
        instruction
    }

    //
    //  Type declaration instructions
    //

    pub fn type_void(id: Word) -> Self {
        let mut instruction = Self::new(Op::TypeVoid);
        instruction.set_result(id);
        instruction
    }

    pub fn type_bool(id: Word) -> Self {
        let mut instruction = Self::new(Op::TypeBool);
        instruction.set_result(id);
        instruction
    }

    pub fn type_int(id: Word, width: Word, signedness: Word) -> Self {
        let mut instruction = Self::new(Op::TypeInt);
        instruction.set_result(id);
        instruction.add_operand(width);
        instruction.add_operand(signedness);
        instruction
    }

    pub fn type_float(id: Word, width: Word) -> Self {
        let mut instruction = Self::new(Op::TypeFloat);
        instruction.set_result(id);
        instruction.add_operand(width);
        instruction
    }

    pub fn type_vector(id: Word, component_type_id: Word, component_count: Word) -> Self {
        let mut instruction = Self::new(Op::TypeVector);
        instruction.set_result(id);
        instruction.add_operand(component_type_id);
        instruction.add_operand(component_count);
        instruction
    }

    pub fn type_matrix(id: Word, column_type_id: Word, column_count: Word) -> Self {
        let mut instruction = Self::new(Op::TypeMatrix);
        instruction.set_result(id);
        instruction.add_operand(column_type_id);
        instruction.add_operand(column_count);
        instruction
    }

    /// Single-sampled, non-arrayed, non-depth image used with a sampler.
    pub fn type_image(id: Word, sampled_type_id: Word, dim: spirv::Dim) -> Self {
        let mut instruction = Self::new(Op::TypeImage);
        instruction.set_result(id);
        instruction.add_operand(sampled_type_id);
        instruction.add_operand(dim as Word);
        instruction.add_operand(0); // depth
        instruction.add_operand(0); // arrayed
        instruction.add_operand(0); // multisampled
        instruction.add_operand(1); // sampled
        instruction.add_operand(spirv::ImageFormat::Unknown as Word);
        instruction
    }

    pub fn type_sampler(id: Word) -> Self {
        let mut instruction = Self::new(Op::TypeSampler);
        instruction.set_result(id);
        instruction
    }

    pub fn type_sampled_image(id: Word, image_type_id: Word) -> Self {
        let mut instruction = Self::new(Op::TypeSampledImage);
        instruction.set_result(id);
        instruction.add_operand(image_type_id);
        instruction
    }

    pub fn type_array(id: Word, element_type_id: Word, length_id: Word) -> Self {
        let mut instruction = Self::new(Op::TypeArray);
        instruction.set_result(id);
        instruction.add_operand(element_type_id);
        instruction.add_operand(length_id);
        instruction
    }

    pub fn type_struct(id: Word, member_ids: &[Word]) -> Self {
        let mut instruction = Self::new(Op::TypeStruct);
        instruction.set_result(id);
        instruction.add_operands(member_ids.iter().copied());
        instruction
    }

    pub fn type_pointer(id: Word, storage_class: spirv::StorageClass, type_id: Word) -> Self {
        let mut instruction = Self::new(Op::TypePointer);
        instruction.set_result(id);
        instruction.add_operand(storage_class as Word);
        instruction.add_operand(type_id);
        instruction
    }

    pub fn type_function(id: Word, return_type_id: Word, parameter_ids: &[Word]) -> Self {
        let mut instruction = Self::new(Op::TypeFunction);
        instruction.set_result(id);
        instruction.add_operand(return_type_id);
        instruction.add_operands(parameter_ids.iter().copied());
        instruction
    }

    //
    //  Constant-creation instructions
    //

    pub fn constant_true(result_type_id: Word, id: Word) -> Self {
        let mut instruction = Self::new(Op::ConstantTrue);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction
    }

    pub fn constant_false(result_type_id: Word, id: Word) -> Self {
        let mut instruction = Self::new(Op::ConstantFalse);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction
    }

    pub fn constant_32bit(result_type_id: Word, id: Word, value: Word) -> Self {
        let mut instruction = Self::new(Op::Constant);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction.add_operand(value);
        instruction
    }

    pub fn constant_composite(result_type_id: Word, id: Word, constituent_ids: &[Word]) -> Self {
        let mut instruction = Self::new(Op::ConstantComposite);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction.add_operands(constituent_ids.iter().copied());
        instruction
    }

    pub fn constant_null(result_type_id: Word, id: Word) -> Self {
        let mut instruction = Self::new(Op::ConstantNull);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction
    }

    //
    //  Memory instructions
    //

    pub fn variable(
        result_type_id: Word,
        id: Word,
        storage_class: spirv::StorageClass,
        initializer_id: Option<Word>,
    ) -> Self {
        let mut instruction = Self::new(Op::Variable);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction.add_operand(storage_class as Word);
        instruction.add_operands(initializer_id);
        instruction
    }

    pub fn load(result_type_id: Word, id: Word, pointer_id: Word) -> Self {
        let mut instruction = Self::new(Op::Load);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction.add_operand(pointer_id);
        instruction
    }

    pub fn store(pointer_id: Word, value_id: Word) -> Self {
        let mut instruction = Self::new(Op::Store);
        instruction.add_operand(pointer_id);
        instruction.add_operand(value_id);
        instruction
    }

    pub fn access_chain(result_type_id: Word, id: Word, base_id: Word, index_ids: &[Word]) -> Self {
        let mut instruction = Self::new(Op::AccessChain);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction.add_operand(base_id);
        instruction.add_operands(index_ids.iter().copied());
        instruction
    }

    //
    //  Function and control-flow instructions
    //

    pub fn function(
        return_type_id: Word,
        id: Word,
        function_control: spirv::FunctionControl,
        function_type_id: Word,
    ) -> Self {
        let mut instruction = Self::new(Op::Function);
        instruction.set_type(return_type_id);
        instruction.set_result(id);
        instruction.add_operand(function_control.bits());
        instruction.add_operand(function_type_id);
        instruction
    }

    pub fn function_end() -> Self {
        Self::new(Op::FunctionEnd)
    }

    pub fn label(id: Word) -> Self {
        let mut instruction = Self::new(Op::Label);
        instruction.set_result(id);
        instruction
    }

    pub fn return_void() -> Self {
        Self::new(Op::Return)
    }

    //
    //  Arithmetic, composite and image instructions
    //

    pub fn unary(op: Op, result_type_id: Word, id: Word, value: Word) -> Self {
        let mut instruction = Self::new(op);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction.add_operand(value);
        instruction
    }

    pub fn binary(
        op: Op,
        result_type_id: Word,
        id: Word,
        operand_1: Word,
        operand_2: Word,
    ) -> Self {
        let mut instruction = Self::new(op);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction.add_operand(operand_1);
        instruction.add_operand(operand_2);
        instruction
    }

    pub fn select(
        result_type_id: Word,
        id: Word,
        condition_id: Word,
        accept_id: Word,
        reject_id: Word,
    ) -> Self {
        let mut instruction = Self::new(Op::Select);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction.add_operand(condition_id);
        instruction.add_operand(accept_id);
        instruction.add_operand(reject_id);
        instruction
    }

    pub fn ext_inst(
        set_id: Word,
        op: spirv::GLOp,
        result_type_id: Word,
        id: Word,
        operands: &[Word],
    ) -> Self {
        let mut instruction = Self::new(Op::ExtInst);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction.add_operand(set_id);
        instruction.add_operand(op as Word);
        instruction.add_operands(operands.iter().copied());
        instruction
    }

    pub fn vector_shuffle(
        result_type_id: Word,
        id: Word,
        v1_id: Word,
        v2_id: Word,
        components: &[Word],
    ) -> Self {
        let mut instruction = Self::new(Op::VectorShuffle);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction.add_operand(v1_id);
        instruction.add_operand(v2_id);
        instruction.add_operands(components.iter().copied());
        instruction
    }

    pub fn composite_construct(result_type_id: Word, id: Word, constituent_ids: &[Word]) -> Self {
        let mut instruction = Self::new(Op::CompositeConstruct);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction.add_operands(constituent_ids.iter().copied());
        instruction
    }

    pub fn composite_extract(
        result_type_id: Word,
        id: Word,
        composite_id: Word,
        indices: &[Word],
    ) -> Self {
        let mut instruction = Self::new(Op::CompositeExtract);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction.add_operand(composite_id);
        instruction.add_operands(indices.iter().copied());
        instruction
    }

    pub fn composite_insert(
        result_type_id: Word,
        id: Word,
        object_id: Word,
        composite_id: Word,
        indices: &[Word],
    ) -> Self {
        let mut instruction = Self::new(Op::CompositeInsert);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction.add_operand(object_id);
        instruction.add_operand(composite_id);
        instruction.add_operands(indices.iter().copied());
        instruction
    }

    pub fn sampled_image(result_type_id: Word, id: Word, image: Word, sampler: Word) -> Self {
        let mut instruction = Self::new(Op::SampledImage);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction.add_operand(image);
        instruction.add_operand(sampler);
        instruction
    }

    /// One of the `OpImageSample*` family; `image_operands` is the mask followed by its ids.
    pub fn image_sample(
        op: Op,
        result_type_id: Word,
        id: Word,
        sampled_image: Word,
        coordinates: Word,
        image_operands: Option<(spirv::ImageOperands, &[Word])>,
    ) -> Self {
        let mut instruction = Self::new(op);
        instruction.set_type(result_type_id);
        instruction.set_result(id);
        instruction.add_operand(sampled_image);
        instruction.add_operand(coordinates);
        if let Some((mask, ids)) = image_operands {
            instruction.add_operand(mask.bits());
            instruction.add_operands(ids.iter().copied());
        }
        instruction
    }
}

/// Encodes a nul-terminated UTF-8 literal string, padded to a whole number of words.
pub fn string_to_words(input: &str) -> Vec<Word> {
    let bytes = input.as_bytes();
    let mut words = Vec::with_capacity(bytes.len() / 4 + 1);
    for chunk in bytes.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        words.push(Word::from_le_bytes(word));
    }
    if bytes.len() % 4 == 0 {
        // Terminator.
        words.push(0);
    }
    words
}

/// Append-only instruction sections, concatenated in logical-layout order.
#[derive(Debug, Default)]
pub struct Sections {
    pub capabilities: Vec<Word>,
    pub extensions: Vec<Word>,
    pub ext_inst_imports: Vec<Word>,
    pub memory_model: Vec<Word>,
    pub entry_points: Vec<Word>,
    pub execution_modes: Vec<Word>,
    pub debug_names: Vec<Word>,
    pub decorations: Vec<Word>,
    pub declarations: Vec<Word>,
    pub functions: Vec<Word>,
}

impl Sections {
    pub fn word_count(&self) -> usize {
        self.in_order().iter().map(|section| section.len()).sum()
    }

    fn in_order(&self) -> [&Vec<Word>; 10] {
        [
            &self.capabilities,
            &self.extensions,
            &self.ext_inst_imports,
            &self.memory_model,
            &self.entry_points,
            &self.execution_modes,
            &self.debug_names,
            &self.decorations,
            &self.declarations,
            &self.functions,
        ]
    }

    pub fn combine_sections(&self) -> Vec<Word> {
        let mut words = Vec::with_capacity(self.word_count());
        for section in self.in_order() {
            words.extend_from_slice(section);
        }
        words
    }
}

/// Id allocation plus the sections of the module being emitted.
#[derive(Debug)]
pub struct ModuleBuilder {
    next_id: Word,
    capabilities: BTreeSet<u32>,
    pub sections: Sections,
}

impl Default for ModuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            capabilities: BTreeSet::new(),
            sections: Sections::default(),
        }
    }

    pub fn alloc_id(&mut self) -> Word {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// One past the highest allocated id.
    pub fn bound(&self) -> Word {
        self.next_id
    }

    pub fn require_capability(&mut self, capability: spirv::Capability) {
        if self.capabilities.insert(capability as u32) {
            Instruction::capability(capability).to_words(&mut self.sections.capabilities);
        }
    }

    pub fn declare(&mut self, instruction: Instruction) {
        instruction.to_words(&mut self.sections.declarations);
    }

    pub fn decorate(&mut self, instruction: Instruction) {
        instruction.to_words(&mut self.sections.decorations);
    }

    pub fn debug_name(&mut self, instruction: Instruction) {
        instruction.to_words(&mut self.sections.debug_names);
    }

    pub fn emit(&mut self, instruction: Instruction) {
        instruction.to_words(&mut self.sections.functions);
    }

    /// Prepends the header to the combined sections.
    pub fn assemble(&self) -> Vec<Word> {
        let mut words = Vec::with_capacity(HEADER_WORDS + self.sections.word_count());
        words.extend_from_slice(&[SPIRV_MAGIC, SPIRV_VERSION, GENERATOR_ID, self.bound(), 0]);
        words.extend(self.sections.combine_sections());
        words
    }
}

/// Driver-side sink for assembled modules.
pub trait ModuleLoader {
    type Module;

    fn load_module(&self, words: &[Word]) -> Result<Self::Module, ModuleLoadError>;
}

impl ModuleLoader for wgpu::Device {
    type Module = wgpu::ShaderModule;

    fn load_module(&self, words: &[Word]) -> Result<Self::Module, ModuleLoadError> {
        self.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("d3d9-spirv-shader"),
            source: wgpu::ShaderSource::SpirV(Cow::Borrowed(words)),
        });
        match pollster::block_on(self.pop_error_scope()) {
            Some(err) => Err(ModuleLoadError {
                message: err.to_string(),
            }),
            None => Ok(module),
        }
    }
}
