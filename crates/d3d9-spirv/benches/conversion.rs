#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
#[cfg(not(target_arch = "wasm32"))]
use d3d9_spirv::{tokens_from_bytes, ShaderCache, ShaderConverter};

#[cfg(not(target_arch = "wasm32"))]
fn reg(regtype: u32, index: u32) -> u32 {
    0x8000_0000 | ((regtype & 0x7) << 28) | ((regtype & 0x18) << 8) | index
}

/// vs_2_0: transforms a position by four constant rows and forwards a color and texcoord.
#[cfg(not(target_arch = "wasm32"))]
fn vertex_shader() -> Vec<u32> {
    let mut tokens = vec![0xFFFE_0200];
    for (usage, index) in [(0u32, 0u32), (10, 1), (5, 2)] {
        tokens.extend([31 | (2 << 24), 0x8000_0000 | usage, reg(1, index) | (0xF << 16)]);
    }
    for row in 0..4 {
        // dp4 r0.<row>, v0, c<row>
        tokens.extend([
            9 | (3 << 24),
            reg(0, 0) | (1 << (16 + row)),
            reg(1, 0) | (0xE4 << 16),
            reg(2, row) | (0xE4 << 16),
        ]);
    }
    tokens.extend([
        // mov oPos, r0
        1 | (2 << 24),
        reg(4, 0) | (0xF << 16),
        reg(0, 0) | (0xE4 << 16),
        // mul oD0, v1, c4
        5 | (3 << 24),
        reg(5, 0) | (0xF << 16),
        reg(1, 1) | (0xE4 << 16),
        reg(2, 4) | (0xE4 << 16),
        // mov oT0, v2
        1 | (2 << 24),
        reg(6, 0) | (0xF << 16),
        reg(1, 2) | (0xE4 << 16),
        0x0000_FFFF,
    ]);
    tokens
}

/// ps_2_0: modulates a texture sample by the interpolated color.
#[cfg(not(target_arch = "wasm32"))]
fn pixel_shader() -> Vec<u32> {
    vec![
        0xFFFF_0200,
        31 | (2 << 24),
        0x8000_0000,
        reg(1, 0) | (0xF << 16),
        31 | (2 << 24),
        0x8000_0000,
        reg(3, 0) | (0xF << 16),
        31 | (2 << 24),
        0x9000_0000,
        reg(10, 0) | (0xF << 16),
        // texld r0, t0, s0
        0x42 | (3 << 24),
        reg(0, 0) | (0xF << 16),
        reg(3, 0) | (0xE4 << 16),
        reg(10, 0) | (0xE4 << 16),
        // mul_sat oC0, r0, v0
        5 | (3 << 24),
        reg(8, 0) | (0xF << 16) | (1 << 20),
        reg(0, 0) | (0xE4 << 16),
        reg(1, 0) | (0xE4 << 16),
        0x0000_FFFF,
    ]
}

#[cfg(not(target_arch = "wasm32"))]
fn to_bytes(tokens: &[u32]) -> Vec<u8> {
    tokens.iter().flat_map(|t| t.to_le_bytes()).collect()
}

#[cfg(not(target_arch = "wasm32"))]
fn bench_conversion(c: &mut Criterion) {
    let converter = ShaderConverter::default();
    let shaders = [("vs_2_0", vertex_shader()), ("ps_2_0", pixel_shader())];

    let mut group = c.benchmark_group("d3d9_spirv_conversion");
    for (name, tokens) in &shaders {
        let bytes = to_bytes(tokens);
        group.bench_with_input(BenchmarkId::new("decode", name), &bytes, |b, bytes| {
            b.iter(|| {
                let tokens = tokens_from_bytes(black_box(bytes)).unwrap();
                black_box(tokens.len());
            })
        });
        group.bench_with_input(BenchmarkId::new("translate", name), tokens, |b, tokens| {
            b.iter(|| {
                let shader = converter.translate(black_box(tokens)).unwrap();
                black_box(shader.words.len());
            })
        });
        group.bench_with_input(BenchmarkId::new("cached", name), &bytes, |b, bytes| {
            let mut cache = ShaderCache::default();
            cache.get_or_translate(bytes).unwrap();
            b.iter(|| {
                let lookup = cache.get_or_translate(black_box(bytes)).unwrap();
                black_box(lookup.shader.words.len());
            })
        });
    }
    group.finish();
}

#[cfg(not(target_arch = "wasm32"))]
criterion_group!(benches, bench_conversion);
#[cfg(not(target_arch = "wasm32"))]
criterion_main!(benches);
