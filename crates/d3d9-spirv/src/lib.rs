//! Direct3D 9 shader bytecode (vs_1_1 to vs_3_0, ps_2_0 to ps_3_0) to SPIR-V conversion.
//!
//! [`ShaderConverter`] decodes a D3D9 token stream and emits a SPIR-V 1.0 module together with
//! the vertex input and descriptor layout a pipeline needs to run it.
//!
//! The emitted layout is:
//! - descriptor set 0, binding 0: float constants (`c#`) as a uniform block of `vec4[512]` shared
//!   by both stages, vertex shader registers first and pixel shader registers from element 256
//!   (only when the shader reads a constant it does not `def`)
//! - descriptor set 1 (vertex) or 2 (pixel), bindings `2*s` / `2*s + 1`: texture and sampler for
//!   sampler register `s#`
//! - vertex buffer binding 0: one attribute per `dcl`'d input, `@location` equal to the `v#` index
//!
//! Binding assignment can be changed by supplying a custom [`ConstantRegistry`].

pub mod cache;
pub mod constants;
pub mod convert;
pub mod error;
pub mod layout;
pub mod limits;
pub mod module;
pub mod registers;
pub mod token;
pub mod types;

pub use cache::{ShaderCache, ShaderCacheLookup, ShaderCacheLookupSource};
pub use constants::{ConstantFile, ConstantRegistry, ConstantSlot, SamplerSlot, ShaderConstantSlots};
pub use convert::{tokens_from_bytes, ConvertOptions, ShaderConverter};
pub use error::{ConvertError, DecodeError, ModuleLoadError};
pub use layout::{
    ConvertedShader, DescriptorBinding, DescriptorKind, SpirvShader, VertexInputAttribute,
};
pub use module::ModuleLoader;
pub use token::{ShaderStage, ShaderVersion};
