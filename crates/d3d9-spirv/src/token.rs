//! D3D9 SM1-SM3 token stream reading and bit-field decoding.
//!
//! Tokens are decoded lazily: the converter pulls opcode and parameter tokens through a
//! [`TokenReader`] and interprets them with the accessors on [`Token`].

use bitflags::bitflags;

use crate::error::DecodeError;
use crate::limits::{
    MAX_COLOR_OUTPUT_REGISTER_INDEX, MAX_INPUT_REGISTER_INDEX, MAX_OUTPUT_REGISTER_INDEX,
    MAX_REGISTER_INDEX, MAX_SAMPLER_REGISTER_INDEX, MAX_TEMP_REGISTER_INDEX,
    MAX_TEXTURE_REGISTER_INDEX,
};

const OPCODE_MASK: u32 = 0x0000_FFFF;
const OPCODE_SPECIFIC_MASK: u32 = 0x00FF_0000;
const OPCODE_SPECIFIC_SHIFT: u32 = 16;
const INSTLENGTH_MASK: u32 = 0x0F00_0000;
const INSTLENGTH_SHIFT: u32 = 24;
const COMMENT_LENGTH_MASK: u32 = 0x7FFF_0000;
const COMMENT_LENGTH_SHIFT: u32 = 16;
const PREDICATED: u32 = 0x1000_0000;

const REGNUM_MASK: u32 = 0x0000_07FF;
const REGTYPE_MASK: u32 = 0x7000_0000;
const REGTYPE_SHIFT: u32 = 28;
const REGTYPE_MASK2: u32 = 0x0000_1800;
const REGTYPE_SHIFT2: u32 = 8;
const RELATIVE: u32 = 0x0000_2000;
const PARAMETER: u32 = 0x8000_0000;

const WRITEMASK_MASK: u32 = 0x000F_0000;
const WRITEMASK_SHIFT: u32 = 16;
const DSTMOD_MASK: u32 = 0x00F0_0000;
const DSTMOD_SHIFT: u32 = 20;
const DSTSHIFT_MASK: u32 = 0x0F00_0000;
const DSTSHIFT_SHIFT: u32 = 24;

const SWIZZLE_MASK: u32 = 0x00FF_0000;
const SWIZZLE_SHIFT: u32 = 16;
const SRCMOD_MASK: u32 = 0x0F00_0000;
const SRCMOD_SHIFT: u32 = 24;

const DCL_USAGE_MASK: u32 = 0x0000_001F;
const DCL_USAGEINDEX_MASK: u32 = 0x000F_0000;
const DCL_USAGEINDEX_SHIFT: u32 = 16;
const TEXTURETYPE_MASK: u32 = 0x7800_0000;
const TEXTURETYPE_SHIFT: u32 = 27;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderVersion {
    pub stage: ShaderStage,
    pub major: u8,
    pub minor: u8,
}

impl ShaderVersion {
    /// Decodes a version token (`0xFFFE_MMmm` for vertex, `0xFFFF_MMmm` for pixel shaders).
    pub fn decode(token: u32) -> Option<Self> {
        let stage = match token & 0xFFFF_0000 {
            0xFFFE_0000 => ShaderStage::Vertex,
            0xFFFF_0000 => ShaderStage::Pixel,
            _ => return None,
        };
        Some(Self {
            stage,
            major: ((token >> 8) & 0xFF) as u8,
            minor: (token & 0xFF) as u8,
        })
    }

    /// vs_1_1, vs_2_0, vs_2_x, vs_3_0, ps_2_0, ps_2_x and ps_3_0.
    pub fn is_supported(&self) -> bool {
        match (self.stage, self.major) {
            (ShaderStage::Vertex, 1) => self.minor == 1,
            (_, 2) => self.minor <= 1,
            (_, 3) => self.minor == 0,
            _ => false,
        }
    }

    /// SM1 streams carry no instruction length and encode relative addressing implicitly.
    pub fn is_sm1(&self) -> bool {
        self.major < 2
    }
}

/// A raw 32-bit word of the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(pub u32);

impl Token {
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Immediate operands of `def` are IEEE floats stored in the token stream.
    pub fn as_f32(self) -> f32 {
        f32::from_bits(self.0)
    }

    pub fn as_i32(self) -> i32 {
        self.0 as i32
    }

    pub fn opcode(self) -> u16 {
        (self.0 & OPCODE_MASK) as u16
    }

    pub fn opcode_specific(self) -> u8 {
        ((self.0 & OPCODE_SPECIFIC_MASK) >> OPCODE_SPECIFIC_SHIFT) as u8
    }

    /// Operand tokens following the opcode token (SM2+ only).
    pub fn instruction_length(self) -> usize {
        ((self.0 & INSTLENGTH_MASK) >> INSTLENGTH_SHIFT) as usize
    }

    pub fn comment_length(self) -> usize {
        ((self.0 & COMMENT_LENGTH_MASK) >> COMMENT_LENGTH_SHIFT) as usize
    }

    pub fn is_predicated(self) -> bool {
        self.0 & PREDICATED != 0
    }

    pub fn is_parameter(self) -> bool {
        self.0 & PARAMETER != 0
    }

    /// The register type is split across bits 28..30 and 11..12.
    pub fn register_type(self) -> u8 {
        (((self.0 & REGTYPE_MASK) >> REGTYPE_SHIFT) | ((self.0 & REGTYPE_MASK2) >> REGTYPE_SHIFT2))
            as u8
    }

    pub fn register_number(self) -> u32 {
        self.0 & REGNUM_MASK
    }

    pub fn is_relative(self) -> bool {
        self.0 & RELATIVE != 0
    }

    pub fn write_mask(self) -> WriteMask {
        WriteMask::from_bits_truncate(((self.0 & WRITEMASK_MASK) >> WRITEMASK_SHIFT) as u8)
    }

    pub fn result_modifier(self) -> ResultModifier {
        let bits = ((self.0 & DSTMOD_MASK) >> DSTMOD_SHIFT) as u8;
        let shift = ((self.0 & DSTSHIFT_MASK) >> DSTSHIFT_SHIFT) as u8;
        ResultModifier {
            saturate: bits & 0x1 != 0,
            partial_precision: bits & 0x2 != 0,
            centroid: bits & 0x4 != 0,
            shift: ResultShift::from_raw(shift),
        }
    }

    pub fn swizzle(self) -> Swizzle {
        Swizzle::from_byte(((self.0 & SWIZZLE_MASK) >> SWIZZLE_SHIFT) as u8)
    }

    pub fn src_modifier(self) -> SrcModifier {
        SrcModifier::from_raw(((self.0 & SRCMOD_MASK) >> SRCMOD_SHIFT) as u8)
    }

    pub fn usage(self) -> DeclUsage {
        DeclUsage::from_raw((self.0 & DCL_USAGE_MASK) as u8)
    }

    pub fn usage_index(self) -> u8 {
        ((self.0 & DCL_USAGEINDEX_MASK) >> DCL_USAGEINDEX_SHIFT) as u8
    }

    pub fn texture_type(self) -> TextureType {
        TextureType::from_raw(((self.0 & TEXTURETYPE_MASK) >> TEXTURETYPE_SHIFT) as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Nop,
    Mov,
    Add,
    Sub,
    Mad,
    Mul,
    Rcp,
    Rsq,
    Dp3,
    Dp4,
    Min,
    Max,
    Slt,
    Sge,
    Exp,
    Log,
    Lrp,
    Frc,
    Dcl,
    Pow,
    Abs,
    Mova,
    Tex,
    TexLdl,
    Def,
    DefI,
    DefB,
    Comment,
    End,
    Unknown(u16),
}

impl Opcode {
    pub fn from_raw(op: u16) -> Self {
        match op {
            0 => Self::Nop,
            1 => Self::Mov,
            2 => Self::Add,
            3 => Self::Sub,
            4 => Self::Mad,
            5 => Self::Mul,
            6 => Self::Rcp,
            7 => Self::Rsq,
            8 => Self::Dp3,
            9 => Self::Dp4,
            10 => Self::Min,
            11 => Self::Max,
            12 => Self::Slt,
            13 => Self::Sge,
            14 => Self::Exp,
            15 => Self::Log,
            18 => Self::Lrp,
            19 => Self::Frc, // 0x13
            31 => Self::Dcl, // 0x1F
            32 => Self::Pow, // 0x20
            35 => Self::Abs, // 0x23
            46 => Self::Mova, // 0x2E
            66 => Self::Tex, // 0x42 (texld/texldp/texldb)
            95 => Self::TexLdl, // 0x5F
            81 => Self::Def, // 0x51
            82 => Self::DefI, // 0x52
            83 => Self::DefB, // 0x53
            0xFFFE => Self::Comment,
            0xFFFF => Self::End,
            other => Self::Unknown(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::Mov => "mov",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mad => "mad",
            Self::Mul => "mul",
            Self::Rcp => "rcp",
            Self::Rsq => "rsq",
            Self::Dp3 => "dp3",
            Self::Dp4 => "dp4",
            Self::Min => "min",
            Self::Max => "max",
            Self::Slt => "slt",
            Self::Sge => "sge",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Lrp => "lrp",
            Self::Frc => "frc",
            Self::Dcl => "dcl",
            Self::Pow => "pow",
            Self::Abs => "abs",
            Self::Mova => "mova",
            Self::Tex => "texld",
            Self::TexLdl => "texldl",
            Self::Def => "def",
            Self::DefI => "defi",
            Self::DefB => "defb",
            Self::Comment => "comment",
            Self::End => "end",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Operand token count for SM1 streams, where the opcode token carries no length.
    ///
    /// Relative addressing in vs_1_1 is implicit (`a0.x`), so every operand is one token.
    pub fn sm1_operand_count(&self) -> Option<usize> {
        Some(match self {
            Self::Nop => 0,
            Self::Mov
            | Self::Rcp
            | Self::Rsq
            | Self::Exp
            | Self::Log
            | Self::Frc
            | Self::Abs
            | Self::Mova
            | Self::Dcl
            | Self::DefB => 2,
            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Dp3
            | Self::Dp4
            | Self::Min
            | Self::Max
            | Self::Slt
            | Self::Sge
            | Self::Pow
            | Self::Tex
            | Self::TexLdl => 3,
            Self::Mad | Self::Lrp => 4,
            Self::Def | Self::DefI => 5,
            Self::Comment | Self::End | Self::Unknown(_) => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegisterFile {
    Temp,        // r#
    Input,       // v#
    Const,       // c#
    Addr,        // a#
    Texture,     // t#
    RastOut,     // oPos, oFog, oPts
    AttrOut,     // oD#
    TexCoordOut, // oT#
    Output,      // o#
    ConstInt,    // i#
    ColorOut,    // oC#
    DepthOut,    // oDepth
    Sampler,     // s#
    ConstBool,   // b#
    Loop,        // aL
    MiscType,    // vPos, vFace
    Label,       // l#
    Predicate,   // p0
    Unknown(u8),
}

impl RegisterFile {
    /// Maps a `D3DSHADER_PARAM_REGISTER_TYPE` value to a register file.
    ///
    /// Types 3, 6 and 8 are stage/version dependent. Type 3 in a relative-addressing token is
    /// always the address register.
    pub fn from_raw(raw: u8, version: ShaderVersion, relative: bool) -> Self {
        match raw {
            0 => Self::Temp,
            1 => Self::Input,
            2 => Self::Const,
            3 if relative => Self::Addr,
            3 => match version.stage {
                ShaderStage::Vertex => Self::Addr,
                ShaderStage::Pixel => Self::Texture,
            },
            4 => Self::RastOut,
            5 => Self::AttrOut,
            6 if version.stage == ShaderStage::Vertex && version.major >= 3 => Self::Output,
            6 => Self::TexCoordOut,
            7 => Self::ConstInt,
            8 => Self::ColorOut,
            9 => Self::DepthOut,
            10 => Self::Sampler,
            11..=13 => Self::Const,
            14 => Self::ConstBool,
            15 => Self::Loop,
            17 => Self::MiscType,
            18 => Self::Label,
            19 => Self::Predicate,
            other => Self::Unknown(other),
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Temp => "r",
            Self::Input => "v",
            Self::Const => "c",
            Self::Addr => "a",
            Self::Texture => "t",
            Self::RastOut => "oRast",
            Self::AttrOut => "oD",
            Self::TexCoordOut => "oT",
            Self::Output => "o",
            Self::ConstInt => "i",
            Self::ColorOut => "oC",
            Self::DepthOut => "oDepth",
            Self::Sampler => "s",
            Self::ConstBool => "b",
            Self::Loop => "aL",
            Self::MiscType => "misc",
            Self::Label => "l",
            Self::Predicate => "p",
            Self::Unknown(_) => "?",
        }
    }

    pub fn is_output(&self) -> bool {
        matches!(
            self,
            Self::RastOut
                | Self::AttrOut
                | Self::TexCoordOut
                | Self::Output
                | Self::ColorOut
                | Self::DepthOut
        )
    }

    fn max_index(&self) -> u32 {
        match self {
            Self::Temp => MAX_TEMP_REGISTER_INDEX,
            Self::Input => MAX_INPUT_REGISTER_INDEX,
            Self::Texture => MAX_TEXTURE_REGISTER_INDEX,
            Self::Sampler => MAX_SAMPLER_REGISTER_INDEX,
            Self::ColorOut => MAX_COLOR_OUTPUT_REGISTER_INDEX,
            Self::Output | Self::TexCoordOut => MAX_OUTPUT_REGISTER_INDEX,
            Self::RastOut => 2,
            Self::AttrOut => 1,
            Self::Addr | Self::DepthOut => 0,
            _ => MAX_REGISTER_INDEX,
        }
    }
}

/// Rast-out register numbers.
pub const RASTOUT_POSITION: u32 = 0;
pub const RASTOUT_FOG: u32 = 1;
pub const RASTOUT_POINT_SIZE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterRef {
    pub file: RegisterFile,
    pub index: u32,
}

impl RegisterRef {
    pub fn new(file: RegisterFile, index: u32) -> Self {
        Self { file, index }
    }
}

impl std::fmt::Display for RegisterRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.file, self.index) {
            (RegisterFile::RastOut, RASTOUT_POSITION) => f.write_str("oPos"),
            (RegisterFile::RastOut, RASTOUT_FOG) => f.write_str("oFog"),
            (RegisterFile::RastOut, RASTOUT_POINT_SIZE) => f.write_str("oPts"),
            (RegisterFile::DepthOut, _) => f.write_str("oDepth"),
            (file, index) => write!(f, "{}{}", file.short_name(), index),
        }
    }
}

bitflags! {
    /// Destination component write mask (`.xyzw`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WriteMask: u8 {
        const X = 0b0001;
        const Y = 0b0010;
        const Z = 0b0100;
        const W = 0b1000;
        const XYZW = Self::X.bits() | Self::Y.bits() | Self::Z.bits() | Self::W.bits();
    }
}

impl WriteMask {
    pub fn writes(self, component: u32) -> bool {
        self.bits() & (1 << component) != 0
    }
}

/// Source component selectors, `0..=3` for `x..=w`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swizzle(pub [u8; 4]);

impl Swizzle {
    pub const XYZW: Swizzle = Swizzle([0, 1, 2, 3]);

    pub fn from_byte(swz: u8) -> Self {
        // 2 bits per component, x in bits 0..1, y in 2..3, z in 4..5, w in 6..7.
        let comp = |shift: u32| (swz >> shift) & 0b11u8;
        Self([comp(0), comp(2), comp(4), comp(6)])
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::XYZW
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SrcModifier {
    None,
    Negate,
    Bias,
    BiasNegate,
    Sign,
    SignNegate,
    Comp,
    X2,
    X2Negate,
    Dz,
    Dw,
    Abs,
    AbsNegate,
    Not,
    Unknown(u8),
}

impl SrcModifier {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::Negate,
            2 => Self::Bias,
            3 => Self::BiasNegate,
            4 => Self::Sign,
            5 => Self::SignNegate,
            6 => Self::Comp,
            7 => Self::X2,
            8 => Self::X2Negate,
            9 => Self::Dz,
            10 => Self::Dw,
            11 => Self::Abs,
            12 => Self::AbsNegate,
            13 => Self::Not,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultShift {
    None,
    Mul2,
    Mul4,
    Mul8,
    Div2,
    Div4,
    Div8,
    Unknown(u8),
}

impl ResultShift {
    /// The shift is a signed 4-bit value: 1..=3 multiply, 13..=15 divide.
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::Mul2,
            2 => Self::Mul4,
            3 => Self::Mul8,
            15 => Self::Div2,
            14 => Self::Div4,
            13 => Self::Div8,
            other => Self::Unknown(other),
        }
    }

    pub fn scale(&self) -> Option<f32> {
        match self {
            Self::None => Some(1.0),
            Self::Mul2 => Some(2.0),
            Self::Mul4 => Some(4.0),
            Self::Mul8 => Some(8.0),
            Self::Div2 => Some(0.5),
            Self::Div4 => Some(0.25),
            Self::Div8 => Some(0.125),
            Self::Unknown(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultModifier {
    pub saturate: bool,
    pub partial_precision: bool,
    pub centroid: bool,
    pub shift: ResultShift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclUsage {
    Position,
    BlendWeight,
    BlendIndices,
    Normal,
    PointSize,
    TexCoord,
    Tangent,
    Binormal,
    TessFactor,
    PositionT,
    Color,
    Fog,
    Depth,
    Sample,
    Unknown(u8),
}

impl DeclUsage {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Position,
            1 => Self::BlendWeight,
            2 => Self::BlendIndices,
            3 => Self::Normal,
            4 => Self::PointSize,
            5 => Self::TexCoord,
            6 => Self::Tangent,
            7 => Self::Binormal,
            8 => Self::TessFactor,
            9 => Self::PositionT,
            10 => Self::Color,
            11 => Self::Fog,
            12 => Self::Depth,
            13 => Self::Sample,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureType {
    Texture1D,
    Texture2D,
    TextureCube,
    Texture3D,
    Unknown(u8),
}

impl TextureType {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Texture1D,
            2 => Self::Texture2D,
            3 => Self::TextureCube,
            4 => Self::Texture3D,
            other => Self::Unknown(other),
        }
    }

    /// Number of coordinate components used to sample a texture of this type.
    pub fn coordinate_count(&self) -> u32 {
        match self {
            Self::Texture1D => 1,
            Self::Texture2D | Self::Unknown(_) => 2,
            Self::TextureCube | Self::Texture3D => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DstParam {
    pub reg: RegisterRef,
    pub mask: WriteMask,
    pub modifier: ResultModifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeAddress {
    pub reg: RegisterRef,
    pub component: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrcParam {
    pub reg: RegisterRef,
    pub swizzle: Swizzle,
    pub modifier: SrcModifier,
    pub relative: Option<RelativeAddress>,
}

/// Cursor over a D3D9 token stream.
///
/// While an instruction is open ([`TokenReader::begin_instruction`]), reads are bounded by the
/// instruction's declared length.
pub struct TokenReader<'a> {
    tokens: &'a [u32],
    pos: usize,
    limit: usize,
}

impl<'a> TokenReader<'a> {
    pub fn new(tokens: &'a [u32]) -> Self {
        Self {
            tokens,
            pos: 0,
            limit: tokens.len(),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.pos)
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn peek_token(&self) -> Option<Token> {
        if self.pos < self.limit {
            self.tokens.get(self.pos).copied().map(Token)
        } else {
            None
        }
    }

    pub fn next_token(&mut self) -> Result<Token, DecodeError> {
        let token = self.peek_token().ok_or_else(|| DecodeError {
            token_index: self.pos,
            message: "unexpected end of token stream".to_owned(),
        })?;
        self.pos += 1;
        Ok(token)
    }

    pub fn skip_tokens(&mut self, count: usize) -> Result<(), DecodeError> {
        if count > self.remaining() {
            return Err(DecodeError {
                token_index: self.pos,
                message: format!(
                    "cannot skip {count} tokens, only {} remaining",
                    self.remaining()
                ),
            });
        }
        self.pos += count;
        Ok(())
    }

    /// Bounds subsequent reads to the next `operand_count` tokens.
    pub fn begin_instruction(&mut self, operand_count: usize) -> Result<(), DecodeError> {
        let end = self.pos + operand_count;
        if end > self.tokens.len() {
            return Err(DecodeError {
                token_index: self.pos,
                message: format!(
                    "instruction length {operand_count} exceeds remaining tokens {}",
                    self.tokens.len() - self.pos
                ),
            });
        }
        self.limit = end;
        Ok(())
    }

    /// Checks that every operand token of the open instruction was consumed.
    pub fn end_instruction(&mut self, opcode: Opcode) -> Result<(), DecodeError> {
        let leftover = self.remaining();
        self.limit = self.tokens.len();
        if leftover != 0 {
            return Err(DecodeError {
                token_index: self.pos,
                message: format!(
                    "opcode {} left {leftover} operand tokens unconsumed",
                    opcode.name()
                ),
            });
        }
        Ok(())
    }

    fn read_register(
        &mut self,
        version: ShaderVersion,
        relative: bool,
    ) -> Result<(Token, RegisterRef), DecodeError> {
        let token_index = self.pos;
        let token = self.next_token()?;
        if !token.is_parameter() {
            return Err(DecodeError {
                token_index,
                message: format!("expected parameter token, got 0x{:08x}", token.raw()),
            });
        }
        let file = RegisterFile::from_raw(token.register_type(), version, relative);
        let index = token.register_number();
        let max = file.max_index();
        if index > max {
            return Err(DecodeError {
                token_index,
                message: format!("register index {index} in {file:?} exceeds maximum {max}"),
            });
        }
        Ok((token, RegisterRef { file, index }))
    }

    pub fn read_dst(&mut self, version: ShaderVersion) -> Result<DstParam, DecodeError> {
        let token_index = self.pos;
        let (token, reg) = self.read_register(version, false)?;
        if token.is_relative() {
            return Err(DecodeError {
                token_index,
                message: "relative addressing on a destination is not supported".to_owned(),
            });
        }
        let mut mask = token.write_mask();
        if mask.is_empty() {
            mask = WriteMask::XYZW;
        }
        Ok(DstParam {
            reg,
            mask,
            modifier: token.result_modifier(),
        })
    }

    pub fn read_src(&mut self, version: ShaderVersion) -> Result<SrcParam, DecodeError> {
        let (token, reg) = self.read_register(version, false)?;
        let relative = if !token.is_relative() {
            None
        } else if version.is_sm1() {
            Some(RelativeAddress {
                reg: RegisterRef::new(RegisterFile::Addr, 0),
                component: 0,
            })
        } else {
            let token_index = self.pos;
            let (rel_token, rel_reg) = self.read_register(version, true)?;
            if rel_token.is_relative() {
                return Err(DecodeError {
                    token_index,
                    message: "nested relative addressing not supported".to_owned(),
                });
            }
            Some(RelativeAddress {
                reg: rel_reg,
                component: rel_token.swizzle().0[0],
            })
        };
        Ok(SrcParam {
            reg,
            swizzle: token.swizzle(),
            modifier: token.src_modifier(),
            relative,
        })
    }
}
