use thiserror::Error;

use crate::token::{DeclUsage, RegisterRef, SrcModifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub token_index: usize,
    pub message: String,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "D3D9 shader decode error at token {}: {}",
            self.token_index, self.message
        )
    }
}

impl std::error::Error for DecodeError {}

/// The driver rejected an assembled SPIR-V module.
#[derive(Debug, Clone, Error)]
#[error("shader module load failed: {message}")]
pub struct ModuleLoadError {
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("unsupported shader version token 0x{0:08x}")]
    UnsupportedVersion(u32),
    #[error("unsupported opcode {name} (0x{raw:04x}) at token {token_index}")]
    UnsupportedOpcode {
        name: &'static str,
        raw: u16,
        token_index: usize,
    },
    #[error("unsupported register {reg} in {context}")]
    UnsupportedRegister {
        reg: RegisterRef,
        context: &'static str,
    },
    #[error("unsupported source modifier {modifier:?} on {reg}")]
    UnsupportedSrcModifier {
        reg: RegisterRef,
        modifier: SrcModifier,
    },
    #[error("unsupported result shift {0}")]
    UnsupportedResultShift(u8),
    #[error("unsupported declaration usage {usage:?} for {reg}")]
    UnsupportedUsage { reg: RegisterRef, usage: DeclUsage },
    #[error("register {0} is read before it is declared or defined")]
    UndeclaredRegister(RegisterRef),
    #[error("register index {index} exceeds the {count} registers of its constant slot")]
    RegisterIndexTooLarge { index: u32, count: u32 },
    #[error("shader declares more than {max} vertex input attributes")]
    TooManyVertexInputs { max: usize },
    #[error("shader bytecode length {len} exceeds maximum {max} bytes")]
    BytecodeTooLarge { len: usize, max: usize },
    #[error("shader bytecode length {0} is not a multiple of 4")]
    InvalidByteLength(usize),
    #[error(transparent)]
    ModuleLoad(#[from] ModuleLoadError),
}
