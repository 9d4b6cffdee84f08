#![allow(dead_code)]

use std::cell::Cell;

use d3d9_spirv::{ModuleLoadError, ModuleLoader, ShaderStage, SpirvShader};
use rspirv::dr::{Instruction, Module, Operand};
use rspirv::spirv::{Decoration, GLOp, Op, Word};

pub const END: u32 = 0x0000_FFFF;

pub const OP_MOV: u16 = 1;
pub const OP_ADD: u16 = 2;
pub const OP_MAD: u16 = 4;
pub const OP_MUL: u16 = 5;
pub const OP_RCP: u16 = 6;
pub const OP_RSQ: u16 = 7;
pub const OP_DP3: u16 = 8;
pub const OP_MIN: u16 = 10;
pub const OP_MAX: u16 = 11;
pub const OP_SLT: u16 = 12;
pub const OP_EXP: u16 = 14;
pub const OP_LOG: u16 = 15;
pub const OP_LRP: u16 = 18;
pub const OP_FRC: u16 = 19;
pub const OP_DCL: u16 = 31;
pub const OP_POW: u16 = 32;
pub const OP_ABS: u16 = 35;
pub const OP_IF: u16 = 40;
pub const OP_MOVA: u16 = 46;
pub const OP_TEX: u16 = 0x42;
pub const OP_DEF: u16 = 81;
pub const OP_DEFI: u16 = 82;
pub const OP_DEFB: u16 = 83;
pub const OP_TEXLDL: u16 = 0x5F;

pub const REG_TEMP: u8 = 0;
pub const REG_INPUT: u8 = 1;
pub const REG_CONST: u8 = 2;
/// `t#` in pixel shaders, `a0` in vertex shaders.
pub const REG_TEXTURE: u8 = 3;
pub const REG_RASTOUT: u8 = 4;
pub const REG_ATTROUT: u8 = 5;
pub const REG_OUTPUT: u8 = 6;
pub const REG_CONSTINT: u8 = 7;
pub const REG_COLOROUT: u8 = 8;
pub const REG_SAMPLER: u8 = 10;
pub const REG_CONSTBOOL: u8 = 14;

/// `a0` in vertex shaders.
pub const REG_ADDR: u8 = REG_TEXTURE;

pub const SWIZZLE_XYZW: u8 = 0xE4;
pub const SWIZZLE_XXXX: u8 = 0x00;
pub const SWIZZLE_YYYY: u8 = 0x55;
pub const SWIZZLE_ZZZZ: u8 = 0xAA;
pub const SWIZZLE_WWWW: u8 = 0xFF;

pub const SRCMOD_NEGATE: u8 = 1;

/// Destination result modifier bits.
pub const DST_SATURATE: u32 = 1 << 20;
pub const DST_SHIFT_X2: u32 = 1 << 24;
pub const DST_SHIFT_D2: u32 = 15 << 24;

/// Source operand relative-addressing flag.
pub const RELATIVE: u32 = 0x2000;

pub const USAGE_POSITION: u32 = 0;
pub const USAGE_TEXCOORD: u32 = 5;
pub const USAGE_COLOR: u32 = 10;

pub const TEXTURE_2D: u32 = 2;
pub const TEXTURE_CUBE: u32 = 3;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

pub fn version_token(stage: ShaderStage, major: u8, minor: u8) -> u32 {
    let prefix = match stage {
        ShaderStage::Vertex => 0xFFFE_0000,
        ShaderStage::Pixel => 0xFFFF_0000,
    };
    prefix | ((major as u32) << 8) | (minor as u32)
}

/// SM2+ opcode token; the length field counts operand tokens only.
pub fn opcode_token(op: u16, operand_count: u8) -> u32 {
    (op as u32) | ((operand_count as u32) << 24)
}

pub fn reg_token(regtype: u8, index: u32) -> u32 {
    let low3 = (regtype as u32) & 0x7;
    let high2 = (regtype as u32) & 0x18;
    0x8000_0000 | (low3 << 28) | (high2 << 8) | (index & 0x7FF)
}

pub fn dst_token(regtype: u8, index: u32, mask: u8) -> u32 {
    reg_token(regtype, index) | ((mask as u32) << 16)
}

pub fn src_token(regtype: u8, index: u32, swizzle: u8, srcmod: u8) -> u32 {
    reg_token(regtype, index) | ((swizzle as u32) << 16) | ((srcmod as u32) << 24)
}

/// `dcl_<usage><index>` token.
pub fn usage_token(usage: u32, index: u32) -> u32 {
    0x8000_0000 | usage | (index << 16)
}

/// `dcl_<type> s#` token.
pub fn sampler_type_token(texture_type: u32) -> u32 {
    0x8000_0000 | (texture_type << 27)
}

pub fn def_tokens(index: u32, values: [f32; 4]) -> Vec<u32> {
    let mut tokens = vec![opcode_token(OP_DEF, 5), dst_token(REG_CONST, index, 0xF)];
    tokens.extend(values.iter().map(|v| v.to_bits()));
    tokens
}

/// `c[a0.<component> + index]` with the SM2+ address token.
pub fn relative_const_tokens(index: u32, swizzle: u8, component_swizzle: u8) -> [u32; 2] {
    [
        src_token(REG_CONST, index, swizzle, 0) | RELATIVE,
        src_token(REG_ADDR, 0, component_swizzle, 0),
    ]
}

pub fn to_bytes(words: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 4);
    for w in words {
        out.extend_from_slice(&w.to_le_bytes());
    }
    out
}

pub fn parse(words: &[Word]) -> Module {
    rspirv::dr::load_words(words).expect("converter output should parse as SPIR-V")
}

/// Runs the module through naga's SPIR-V front end and validator.
pub fn validate(shader: &SpirvShader) {
    let module = naga::front::spv::parse_u8_slice(
        shader.as_bytes(),
        &naga::front::spv::Options::default(),
    )
    .expect("converter output should be accepted by the SPIR-V front end");
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .expect("converter output should validate");
}

pub fn body(module: &Module) -> impl Iterator<Item = &Instruction> {
    module
        .functions
        .iter()
        .flat_map(|f| f.blocks.iter())
        .flat_map(|b| b.instructions.iter())
}

pub fn count_ops(module: &Module, op: Op) -> usize {
    body(module).filter(|inst| inst.class.opcode == op).count()
}

/// `GLSL.std.450` instruction numbers of every `OpExtInst`, in body order.
pub fn ext_inst_ops(module: &Module) -> Vec<u32> {
    body(module)
        .filter(|inst| inst.class.opcode == Op::ExtInst)
        .filter_map(|inst| match inst.operands[1] {
            Operand::LiteralExtInstInteger(op) => Some(op),
            _ => None,
        })
        .collect()
}

pub fn count_ext_inst(module: &Module, op: GLOp) -> usize {
    ext_inst_ops(module)
        .into_iter()
        .filter(|&n| n == op as u32)
        .count()
}

/// The body instruction producing `id`.
pub fn producer(module: &Module, id: Word) -> &Instruction {
    body(module)
        .find(|inst| inst.result_id == Some(id))
        .unwrap_or_else(|| panic!("no body instruction produces {id}"))
}

/// Constant element indices of every `c#` block access, sorted.
pub fn constant_block_elements(module: &Module) -> Vec<u32> {
    let mut elements: Vec<u32> = body(module)
        .filter(|inst| inst.class.opcode == Op::AccessChain)
        .filter_map(|inst| {
            let index = id_operand(inst, 2);
            module
                .types_global_values
                .iter()
                .find(|global| global.result_id == Some(index))
                .map(|global| literal_operands(global)[0])
        })
        .collect();
    elements.sort_unstable();
    elements
}

/// Literal bits of a scalar `OpConstant`.
pub fn constant_bits(module: &Module, id: Word) -> u32 {
    let constant = global(module, id);
    assert_eq!(constant.class.opcode, Op::Constant);
    literal_operands(constant)[0]
}

pub fn global(module: &Module, id: Word) -> &Instruction {
    module
        .types_global_values
        .iter()
        .find(|inst| inst.result_id == Some(id))
        .unwrap_or_else(|| panic!("no global with id {id}"))
}

pub fn id_operand(inst: &Instruction, index: usize) -> Word {
    match &inst.operands[index] {
        Operand::IdRef(id) => *id,
        other => panic!("operand {index} of {:?} is {other:?}", inst.class.opcode),
    }
}

pub fn literal_operands(inst: &Instruction) -> Vec<u32> {
    inst.operands
        .iter()
        .filter_map(|operand| match operand {
            Operand::LiteralBit32(v) => Some(*v),
            _ => None,
        })
        .collect()
}

/// Float values of a `vec4` constant composite.
pub fn constant_vec4(module: &Module, id: Word) -> Vec<f32> {
    let composite = global(module, id);
    assert_eq!(composite.class.opcode, Op::ConstantComposite);
    (0..composite.operands.len())
        .map(|i| {
            let component = global(module, id_operand(composite, i));
            f32::from_bits(literal_operands(component)[0])
        })
        .collect()
}

/// Value id stored by the single `OpStore` in the shader body.
pub fn stored_value(module: &Module) -> Word {
    let stores: Vec<_> = body(module)
        .filter(|inst| inst.class.opcode == Op::Store)
        .collect();
    assert_eq!(stores.len(), 1, "expected exactly one store");
    id_operand(stores[0], 1)
}

/// Literal operands of every `target` decoration with the given kind.
pub fn decorations(module: &Module, decoration: Decoration) -> Vec<(Word, Vec<u32>)> {
    module
        .annotations
        .iter()
        .filter(|inst| inst.class.opcode == Op::Decorate)
        .filter(|inst| matches!(inst.operands[1], Operand::Decoration(d) if d == decoration))
        .map(|inst| (id_operand(inst, 0), literal_operands(inst)))
        .collect()
}

/// Loader that records the word count it was handed.
#[derive(Default)]
pub struct CountingLoader {
    pub calls: Cell<usize>,
}

impl ModuleLoader for CountingLoader {
    type Module = usize;

    fn load_module(&self, words: &[Word]) -> Result<usize, ModuleLoadError> {
        self.calls.set(self.calls.get() + 1);
        Ok(words.len())
    }
}

pub struct RejectingLoader;

impl ModuleLoader for RejectingLoader {
    type Module = ();

    fn load_module(&self, _words: &[Word]) -> Result<(), ModuleLoadError> {
        Err(ModuleLoadError {
            message: "validation failed".to_owned(),
        })
    }
}
