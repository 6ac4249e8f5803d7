//! Custom error types for the crate.
//!
//! `GpibConfError` is the single error type returned by the configuration
//! loader, the validator and the settings layer. Every variant is fatal for the
//! process consuming the configuration: there is no partial acceptance of a
//! malformed `gpib.conf`.
//!
//! ## Error Hierarchy
//!
//! - **`Io`**: the configuration file could not be read.
//! - **Syntax errors** (`Syntax`, `UnknownBlock`, `UnknownKey`, `DuplicateKey`,
//!   `MissingField`, `InvalidValue`): the text does not describe well-formed
//!   `interface`/`device` blocks. These carry the line and column of the
//!   offending token.
//! - **Semantic errors** (`AddressOutOfRange`, `DanglingDevice`,
//!   `DuplicateMinor`, `DuplicateAddress`, `DuplicateName`, `EmptyValue`):
//!   the blocks parse but describe an impossible bus.
//! - **`Settings`**, **`Figment`**: the tool's own settings are invalid or
//!   could not be loaded.

use std::fmt;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type ConfResult<T> = std::result::Result<T, GpibConfError>;

/// A location in configuration text, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Line number, starting at 1.
    pub line: usize,
    /// Column number in characters, starting at 1.
    pub column: usize,
}

impl Position {
    /// Creates a position from a line and column.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Kind of a configuration block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// An `interface { ... }` block.
    Interface,
    /// A `device { ... }` block.
    Device,
}

impl BlockKind {
    /// Keyword introducing the block in configuration text.
    pub fn keyword(self) -> &'static str {
        match self {
            BlockKind::Interface => "interface",
            BlockKind::Device => "device",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Errors raised while loading, validating or configuring.
#[derive(Error, Debug)]
pub enum GpibConfError {
    /// The configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed text: bad token, unbalanced brace or missing `=`.
    #[error("Syntax error at {pos}: {message}")]
    Syntax {
        /// Where the offending token starts.
        pos: Position,
        /// What was wrong.
        message: String,
    },

    /// A top-level keyword other than `interface` or `device`.
    #[error("Unknown block '{name}' at {pos}; expected 'interface' or 'device'")]
    UnknownBlock {
        /// The keyword found.
        name: String,
        /// Where the keyword starts.
        pos: Position,
    },

    /// A key the block kind does not accept.
    #[error("Unknown key '{key}' in {block} block at {pos}")]
    UnknownKey {
        /// Block containing the key.
        block: BlockKind,
        /// The key as written.
        key: String,
        /// Where the key starts.
        pos: Position,
    },

    /// The same key appears twice in one block.
    #[error("Key '{key}' given twice in {block} block at {pos}")]
    DuplicateKey {
        /// Block containing the key.
        block: BlockKind,
        /// The repeated key.
        key: String,
        /// Where the second occurrence starts.
        pos: Position,
    },

    /// A block lacks a required key.
    #[error("Missing required field '{key}' in {block} block starting at {pos}")]
    MissingField {
        /// Block missing the key.
        block: BlockKind,
        /// The required key.
        key: &'static str,
        /// Where the block starts.
        pos: Position,
    },

    /// A value of the wrong type for its key.
    #[error("Invalid value for '{key}' at {pos}: expected {expected}, found {found}")]
    InvalidValue {
        /// Key being assigned.
        key: String,
        /// Description of the accepted values.
        expected: &'static str,
        /// Description of the token found.
        found: String,
        /// Where the value starts.
        pos: Position,
    },

    /// A primary or secondary address outside the bus range.
    #[error("{field} {value} of {owner} is out of range ({allowed})")]
    AddressOutOfRange {
        /// `pad` or `sad`.
        field: &'static str,
        /// The rejected value.
        value: u32,
        /// Label of the board or device.
        owner: String,
        /// Description of the accepted range.
        allowed: &'static str,
    },

    /// A required text field that is empty.
    #[error("Empty {field} in {owner}")]
    EmptyValue {
        /// `board_type` or `name`.
        field: &'static str,
        /// Label of the board or device.
        owner: String,
    },

    /// A device whose minor matches no interface.
    #[error("Device '{name}' refers to minor {minor}, but no interface declares it")]
    DanglingDevice {
        /// Device name.
        name: String,
        /// The unmatched minor.
        minor: u32,
    },

    /// Two interfaces share a minor.
    #[error("Interface minor {minor} declared more than once")]
    DuplicateMinor {
        /// The repeated minor.
        minor: u32,
    },

    /// Two entries share a (minor, pad, sad) bus address.
    #[error("Address (minor {minor}, pad {pad}, sad {sad}) used by both {first} and {second}")]
    DuplicateAddress {
        /// Board minor.
        minor: u32,
        /// Primary address.
        pad: u8,
        /// Secondary address.
        sad: u8,
        /// Label of the first entry at the address.
        first: String,
        /// Label of the second entry at the address.
        second: String,
    },

    /// Two entries share a name.
    #[error("Name '{name}' used more than once")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },

    /// Settings values that loaded but are not acceptable.
    #[error("Settings error: {0}")]
    Settings(String),

    /// Settings sources could not be read or extracted.
    #[error("Settings error: {0}")]
    Figment(#[from] figment::Error),
}

impl GpibConfError {
    /// Position in the configuration text, for errors raised while parsing.
    pub fn position(&self) -> Option<Position> {
        match self {
            GpibConfError::Syntax { pos, .. }
            | GpibConfError::UnknownBlock { pos, .. }
            | GpibConfError::UnknownKey { pos, .. }
            | GpibConfError::DuplicateKey { pos, .. }
            | GpibConfError::MissingField { pos, .. }
            | GpibConfError::InvalidValue { pos, .. } => Some(*pos),
            _ => None,
        }
    }
}
