mod common;

use common::*;
use d3d9_spirv::{
    ConvertError, ConvertOptions, ShaderCache, ShaderCacheLookupSource, ShaderConverter,
    ShaderStage,
};
use pretty_assertions::assert_eq;

fn passthrough_bytes() -> Vec<u8> {
    to_bytes(&[
        version_token(ShaderStage::Vertex, 2, 0),
        opcode_token(OP_DCL, 2),
        usage_token(USAGE_POSITION, 0),
        dst_token(REG_INPUT, 0, 0xF),
        opcode_token(OP_MOV, 2),
        dst_token(REG_RASTOUT, 0, 0xF),
        src_token(REG_INPUT, 0, 0xE4, 0),
        END,
    ])
}

#[test]
fn second_lookup_hits_memory() {
    let bytes = passthrough_bytes();
    let mut cache = ShaderCache::default();
    assert!(cache.is_empty());

    let first = cache.get_or_translate(&bytes).unwrap();
    assert_eq!(first.source, ShaderCacheLookupSource::Translated);
    assert_eq!(first.hash, blake3::hash(&bytes));
    let words = first.shader.words.clone();

    let second = cache.get_or_translate(&bytes).unwrap();
    assert_eq!(second.source, ShaderCacheLookupSource::Memory);
    assert_eq!(second.shader.words, words);
    assert_eq!(cache.len(), 1);

    let direct = ShaderConverter::default().translate_bytes(&bytes).unwrap();
    assert_eq!(direct.words, words);
}

#[test]
fn changing_options_invalidates_entries() {
    let bytes = passthrough_bytes();
    let mut cache = ShaderCache::new(ConvertOptions::default());
    cache.get_or_translate(&bytes).unwrap();

    cache.set_options(ConvertOptions::default());
    assert_eq!(cache.len(), 1);

    cache.set_options(ConvertOptions {
        flip_y: false,
        ..ConvertOptions::default()
    });
    assert!(cache.is_empty());
    assert!(!cache.options().flip_y);

    let lookup = cache.get_or_translate(&bytes).unwrap();
    assert_eq!(lookup.source, ShaderCacheLookupSource::Translated);
}

#[test]
fn failed_translations_are_not_cached() {
    let mut cache = ShaderCache::default();
    let bytes = to_bytes(&[version_token(ShaderStage::Pixel, 1, 4), END]);
    assert!(matches!(
        cache.get_or_translate(&bytes),
        Err(ConvertError::UnsupportedVersion(_))
    ));
    assert!(cache.is_empty());
}
