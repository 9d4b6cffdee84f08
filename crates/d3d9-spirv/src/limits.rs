//! Centralized limits for D3D9 shader conversion.
//!
//! Shader bytecode is treated as untrusted input. These limits bound memory usage and keep the
//! emitted modules within what Vulkan/WebGPU pipelines accept.

/// Maximum accepted D3D9 shader bytecode length in bytes.
pub(crate) const MAX_SHADER_BYTECODE_BYTES: usize = 256 * 1024; // 256 KiB

/// Maximum accepted D3D9 shader token count (DWORDs / `u32`s).
pub(crate) const MAX_SHADER_TOKEN_COUNT: usize = MAX_SHADER_BYTECODE_BYTES / 4;

/// Maximum tolerated register index for any register file not listed below.
pub(crate) const MAX_REGISTER_INDEX: u32 = 255;

/// `r#`: 32 temporaries in SM3.
pub(crate) const MAX_TEMP_REGISTER_INDEX: u32 = 31;

/// `v#`: 16 vertex inputs (VS) or 10 varyings (PS 3.0).
pub(crate) const MAX_INPUT_REGISTER_INDEX: u32 = 15;

/// `t#`: pixel shader texture coordinate inputs.
pub(crate) const MAX_TEXTURE_REGISTER_INDEX: u32 = 7;

/// `s#`: 16 samplers per stage.
pub(crate) const MAX_SAMPLER_REGISTER_INDEX: u32 = 15;

/// `oC#`: 4 render targets.
pub(crate) const MAX_COLOR_OUTPUT_REGISTER_INDEX: u32 = 3;

/// `o#` / `oT#`: 12 vertex shader outputs in SM3.
pub(crate) const MAX_OUTPUT_REGISTER_INDEX: u32 = 11;

/// `c#` registers per stage.
pub const FLOAT_CONSTANT_REGISTERS: u32 = 256;

/// Vertex input attribute descriptors a single shader may produce.
pub const MAX_VERTEX_INPUT_ATTRIBUTES: usize = 32;
