//! Metadata tokens for emitted rows.
//!
//! A token is a 32-bit value: the high byte names the metadata table, the low 24 bits the
//! 1-based row. The emitter assigns one to every definition it writes and to every
//! referenced attribute constructor (`MemberRef`), and custom-attribute rows are ordered by
//! the owner's token.

use std::fmt;

/// Table ids (the high byte of a token) used by the emitter.
#[allow(non_snake_case)]
pub mod TableId {
    /// Module table
    pub const MODULE: u8 = 0x00;
    /// TypeRef table
    pub const TYPE_REF: u8 = 0x01;
    /// TypeDef table
    pub const TYPE_DEF: u8 = 0x02;
    /// Field table
    pub const FIELD: u8 = 0x04;
    /// MethodDef table
    pub const METHOD_DEF: u8 = 0x06;
    /// Param table
    pub const PARAM: u8 = 0x08;
    /// MemberRef table
    pub const MEMBER_REF: u8 = 0x0A;
    /// CustomAttribute table
    pub const CUSTOM_ATTRIBUTE: u8 = 0x0C;
    /// Event table
    pub const EVENT: u8 = 0x14;
    /// Property table
    pub const PROPERTY: u8 = 0x17;
    /// Assembly table
    pub const ASSEMBLY: u8 = 0x20;
    /// File table
    pub const FILE: u8 = 0x26;
    /// GenericParam table
    pub const GENERIC_PARAM: u8 = 0x2A;
}

/// A metadata token.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Create a token from its raw value.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Create a token from a table id and a 1-based row.
    #[must_use]
    pub fn from_parts(table: u8, row: u32) -> Self {
        Token((u32::from(table) << 24) | (row & 0x00FF_FFFF))
    }

    /// The raw value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The table id.
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The row.
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Whether this is the null token.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}
