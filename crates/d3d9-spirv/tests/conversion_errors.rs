mod common;

use common::*;
use d3d9_spirv::token::{RegisterFile, RegisterRef, SrcModifier};
use d3d9_spirv::{
    ConstantFile, ConstantRegistry, ConstantSlot, ConvertError, ConvertOptions, SamplerSlot,
    ShaderConverter, ShaderStage,
};

fn translate(tokens: &[u32]) -> ConvertError {
    ShaderConverter::default().translate(tokens).unwrap_err()
}

#[test]
fn rejects_unknown_opcode() {
    let tokens = vec![
        version_token(ShaderStage::Vertex, 2, 0),
        // if b0
        opcode_token(OP_IF, 1),
        src_token(14, 0, 0xE4, 0),
        END,
    ];
    match translate(&tokens) {
        ConvertError::UnsupportedOpcode {
            raw, token_index, ..
        } => {
            assert_eq!(raw, OP_IF);
            assert_eq!(token_index, 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn rejects_unsupported_versions() {
    for token in [
        version_token(ShaderStage::Pixel, 1, 4),
        version_token(ShaderStage::Pixel, 1, 1),
        version_token(ShaderStage::Vertex, 4, 0),
        0x1234_5678,
    ] {
        match translate(&[token, END]) {
            ConvertError::UnsupportedVersion(v) => assert_eq!(v, token),
            other => panic!("unexpected error {other:?}"),
        }
    }
}

#[test]
fn rejects_texld_in_vertex_shader() {
    let tokens = vec![
        version_token(ShaderStage::Vertex, 3, 0),
        opcode_token(OP_DCL, 2),
        sampler_type_token(TEXTURE_2D),
        dst_token(REG_SAMPLER, 0, 0xF),
        opcode_token(OP_DCL, 2),
        usage_token(USAGE_TEXCOORD, 0),
        dst_token(REG_INPUT, 0, 0xF),
        opcode_token(OP_TEX, 3),
        dst_token(REG_TEMP, 0, 0xF),
        src_token(REG_INPUT, 0, 0xE4, 0),
        src_token(REG_SAMPLER, 0, 0xE4, 0),
        END,
    ];
    assert!(matches!(
        translate(&tokens),
        ConvertError::UnsupportedOpcode { raw: OP_TEX, .. }
    ));
}

#[test]
fn rejects_projected_cube_sampling() {
    let tokens = vec![
        version_token(ShaderStage::Pixel, 2, 0),
        opcode_token(OP_DCL, 2),
        0x8000_0000,
        dst_token(REG_TEXTURE, 0, 0xF),
        opcode_token(OP_DCL, 2),
        sampler_type_token(TEXTURE_CUBE),
        dst_token(REG_SAMPLER, 0, 0xF),
        opcode_token(OP_TEX, 3) | (1 << 16),
        dst_token(REG_TEMP, 0, 0xF),
        src_token(REG_TEXTURE, 0, 0xE4, 0),
        src_token(REG_SAMPLER, 0, 0xE4, 0),
        END,
    ];
    assert!(matches!(
        translate(&tokens),
        ConvertError::UnsupportedRegister { .. }
    ));
}

#[test]
fn rejects_reads_of_undeclared_inputs() {
    let tokens = vec![
        version_token(ShaderStage::Vertex, 2, 0),
        opcode_token(OP_MOV, 2),
        dst_token(REG_RASTOUT, 0, 0xF),
        src_token(REG_INPUT, 0, 0xE4, 0),
        END,
    ];
    match translate(&tokens) {
        ConvertError::UndeclaredRegister(reg) => {
            assert_eq!(reg, RegisterRef::new(RegisterFile::Input, 0))
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn rejects_writes_to_undeclared_vs3_outputs() {
    let mut tokens = vec![version_token(ShaderStage::Vertex, 3, 0)];
    tokens.extend(def_tokens(0, [0.0; 4]));
    tokens.extend([
        opcode_token(OP_MOV, 2),
        dst_token(REG_OUTPUT, 2, 0xF),
        src_token(REG_CONST, 0, 0xE4, 0),
        END,
    ]);
    match translate(&tokens) {
        ConvertError::UndeclaredRegister(reg) => {
            assert_eq!(reg, RegisterRef::new(RegisterFile::Output, 2))
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn rejects_unsupported_source_modifier() {
    let mut tokens = vec![version_token(ShaderStage::Vertex, 2, 0)];
    tokens.extend(def_tokens(0, [0.0; 4]));
    tokens.extend([
        opcode_token(OP_MOV, 2),
        dst_token(REG_RASTOUT, 0, 0xF),
        // c0_bias
        src_token(REG_CONST, 0, 0xE4, 2),
        END,
    ]);
    assert!(matches!(
        translate(&tokens),
        ConvertError::UnsupportedSrcModifier {
            modifier: SrcModifier::Bias,
            ..
        }
    ));
}

#[test]
fn rejects_predicated_instructions() {
    let mut tokens = vec![version_token(ShaderStage::Vertex, 2, 0)];
    tokens.extend(def_tokens(0, [0.0; 4]));
    tokens.extend([
        opcode_token(OP_MOV, 2) | 0x1000_0000,
        dst_token(REG_RASTOUT, 0, 0xF),
        src_token(REG_CONST, 0, 0xE4, 0),
        END,
    ]);
    assert!(matches!(
        translate(&tokens),
        ConvertError::UnsupportedRegister { .. }
    ));
}

#[test]
fn rejects_truncated_instruction() {
    let tokens = vec![
        version_token(ShaderStage::Vertex, 2, 0),
        opcode_token(OP_MOV, 2),
        dst_token(REG_RASTOUT, 0, 0xF),
    ];
    assert!(matches!(translate(&tokens), ConvertError::Decode(_)));
}

#[test]
fn rejects_instruction_with_unconsumed_operands() {
    let mut tokens = vec![version_token(ShaderStage::Vertex, 2, 0)];
    tokens.extend(def_tokens(0, [0.0; 4]));
    tokens.extend([
        opcode_token(OP_MOV, 3),
        dst_token(REG_RASTOUT, 0, 0xF),
        src_token(REG_CONST, 0, 0xE4, 0),
        src_token(REG_CONST, 0, 0xE4, 0),
        END,
    ]);
    match translate(&tokens) {
        ConvertError::Decode(err) => assert!(err.message.contains("unconsumed"), "{err}"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn rejects_misaligned_bytecode() {
    let converter = ShaderConverter::default();
    assert!(matches!(
        converter.translate_bytes(&[0xFF, 0xFF, 0xFE]),
        Err(ConvertError::InvalidByteLength(3))
    ));

    let tokens = vec![
        version_token(ShaderStage::Vertex, 2, 0),
        opcode_token(OP_DCL, 2),
        usage_token(USAGE_POSITION, 0),
        dst_token(REG_INPUT, 0, 0xF),
        END,
    ];
    let shader = converter.translate_bytes(&to_bytes(&tokens)).unwrap();
    assert_eq!(shader.vertex_input_attributes.len(), 1);
}

#[derive(Debug, Clone, Copy)]
struct SmallConstantFile;

impl ConstantRegistry for SmallConstantFile {
    fn slot(&self, _stage: ShaderStage, _file: ConstantFile) -> ConstantSlot {
        ConstantSlot {
            set: 1,
            binding: 0,
            base: 0,
            register_count: 4,
            block_registers: 4,
        }
    }

    fn sampler_binding(&self, _stage: ShaderStage, index: u32) -> SamplerSlot {
        SamplerSlot {
            set: 2,
            texture_binding: 2 * index,
            sampler_binding: 2 * index + 1,
        }
    }
}

#[test]
fn constant_reads_respect_registry_size() {
    let converter = ShaderConverter::with_registry(ConvertOptions::default(), SmallConstantFile);
    let read = |index: u32| {
        converter.translate(&[
            version_token(ShaderStage::Vertex, 2, 0),
            opcode_token(OP_MOV, 2),
            dst_token(REG_RASTOUT, 0, 0xF),
            src_token(REG_CONST, index, 0xE4, 0),
            END,
        ])
    };

    let shader = read(3).unwrap();
    assert_eq!(shader.descriptor_bindings.len(), 1);
    assert_eq!(shader.descriptor_bindings[0].set, 1);

    assert!(matches!(
        read(7),
        Err(ConvertError::RegisterIndexTooLarge { index: 7, count: 4 })
    ));
}

#[test]
fn loader_failures_are_reported() {
    let tokens = vec![
        version_token(ShaderStage::Vertex, 2, 0),
        opcode_token(OP_DCL, 2),
        usage_token(USAGE_POSITION, 0),
        dst_token(REG_INPUT, 0, 0xF),
        END,
    ];
    let err = ShaderConverter::default()
        .convert(&tokens, &RejectingLoader)
        .unwrap_err();
    assert!(matches!(err, ConvertError::ModuleLoad(_)));
    assert!(err.to_string().contains("validation failed"));
}
