mod common;

use std::collections::BTreeSet;

use common::*;
use d3d9_spirv::{DescriptorKind, ShaderConverter, ShaderStage, SpirvShader};
use pretty_assertions::assert_eq;
use wgpu::ShaderStages;

/// vs_3_0: `dcl_position o0; dcl_2d s0; texldl r0, c1, s0; add o0, r0, c0`
fn vertex_texture_tokens() -> Vec<u32> {
    vec![
        version_token(ShaderStage::Vertex, 3, 0),
        opcode_token(OP_DCL, 2),
        usage_token(USAGE_POSITION, 0),
        dst_token(REG_OUTPUT, 0, 0xF),
        opcode_token(OP_DCL, 2),
        sampler_type_token(TEXTURE_2D),
        dst_token(REG_SAMPLER, 0, 0xF),
        opcode_token(OP_TEXLDL, 3),
        dst_token(REG_TEMP, 0, 0xF),
        src_token(REG_CONST, 1, SWIZZLE_XYZW, 0),
        src_token(REG_SAMPLER, 0, SWIZZLE_XYZW, 0),
        opcode_token(OP_ADD, 3),
        dst_token(REG_OUTPUT, 0, 0xF),
        src_token(REG_TEMP, 0, SWIZZLE_XYZW, 0),
        src_token(REG_CONST, 0, SWIZZLE_XYZW, 0),
        END,
    ]
}

/// ps_3_0: `dcl_2d s0; texld r0, c1, s0; mul oC0, r0, c0`
fn pixel_texture_tokens() -> Vec<u32> {
    vec![
        version_token(ShaderStage::Pixel, 3, 0),
        opcode_token(OP_DCL, 2),
        sampler_type_token(TEXTURE_2D),
        dst_token(REG_SAMPLER, 0, 0xF),
        opcode_token(OP_TEX, 3),
        dst_token(REG_TEMP, 0, 0xF),
        src_token(REG_CONST, 1, SWIZZLE_XYZW, 0),
        src_token(REG_SAMPLER, 0, SWIZZLE_XYZW, 0),
        opcode_token(OP_MUL, 3),
        dst_token(REG_COLOROUT, 0, 0xF),
        src_token(REG_TEMP, 0, SWIZZLE_XYZW, 0),
        src_token(REG_CONST, 0, SWIZZLE_XYZW, 0),
        END,
    ]
}

fn resource_slots(shader: &SpirvShader) -> BTreeSet<(u32, u32)> {
    shader
        .descriptor_bindings
        .iter()
        .filter(|binding| binding.kind != DescriptorKind::UniformBuffer)
        .map(|binding| (binding.set, binding.binding))
        .collect()
}

#[test]
fn vertex_and_pixel_resources_do_not_alias() {
    init_tracing();
    let converter = ShaderConverter::default();
    let vs = converter.translate(&vertex_texture_tokens()).unwrap();
    let ps = converter.translate(&pixel_texture_tokens()).unwrap();

    let vs_slots = resource_slots(&vs);
    let ps_slots = resource_slots(&ps);
    assert_eq!(vs_slots, BTreeSet::from([(1, 0), (1, 1)]));
    assert_eq!(ps_slots, BTreeSet::from([(2, 0), (2, 1)]));
    assert!(vs_slots.is_disjoint(&ps_slots));

    // Both stages bind the same constant buffer but address separate halves of it.
    for (shader, stages) in [(&vs, ShaderStages::VERTEX), (&ps, ShaderStages::FRAGMENT)] {
        let constants: Vec<_> = shader
            .descriptor_bindings
            .iter()
            .filter(|binding| binding.kind == DescriptorKind::UniformBuffer)
            .collect();
        assert_eq!(constants.len(), 1);
        assert_eq!((constants[0].set, constants[0].binding), (0, 0));
        assert_eq!(constants[0].stages, stages);
    }
    assert_eq!(constant_block_elements(&parse(&vs.words)), vec![0, 1]);
    assert_eq!(constant_block_elements(&parse(&ps.words)), vec![256, 257]);

    validate(&vs);
    validate(&ps);
}

#[test]
fn constant_block_covers_both_stages() {
    let vs = ShaderConverter::default()
        .translate(&vertex_texture_tokens())
        .unwrap();
    let module = parse(&vs.words);

    let array = module
        .types_global_values
        .iter()
        .find(|inst| inst.class.opcode == rspirv::spirv::Op::TypeArray)
        .unwrap();
    assert_eq!(constant_bits(&module, id_operand(array, 1)), 512);
}
