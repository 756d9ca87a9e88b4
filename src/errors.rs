//! Error types for building declarations, moving a [crate::bit_cursor::BitCursor]
//! and decoding records.

use thiserror::Error;

/// Errors produced when reading bits from a byte region.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Requested bit range is beyond the end of the data.
    #[error("read past the end of the buffer")]
    OutOfBounds,
    /// More than 64 bits (or zero bits) were requested in a single read.
    #[error("a single read must cover 1 to 64 bits")]
    TooManyBitsRead,
    /// A byte-oriented read was attempted at a position that is not a multiple of 8.
    #[error("cursor is not byte aligned")]
    Unaligned,
}

/// Errors produced when writing bits into a byte region.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// Buffer is too short to write the value.
    #[error("write past the end of the buffer")]
    OutOfBounds,
    /// More than 64 bits (or zero bits) were requested in a single write.
    #[error("a single write must cover 1 to 64 bits")]
    TooManyBitsRead,
    /// A byte-oriented write was attempted at a position that is not a multiple of 8.
    #[error("cursor is not byte aligned")]
    Unaligned,
    /// Value cannot be represented by the declaration (e.g. a string with an interior NUL).
    #[error("value cannot be encoded by its declaration")]
    InvalidValue,
}

/// Errors produced while a declaration is being built, before it is frozen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A struct or variant already has a member with this name.
    #[error("duplicate field: {0}")]
    DuplicateField(String),
    /// Field name is empty.
    #[error("field names must not be empty")]
    InvalidFieldName,
    /// Integer length outside 1..=64.
    #[error("invalid integer length: {0}")]
    InvalidIntegerLength(usize),
    /// Float exponent/mantissa split cannot be stored in 64 bits.
    #[error("invalid float layout")]
    InvalidFloatLayout,
    /// Enum range overlaps an existing range with different bounds or label.
    #[error("range [{low}, {high}] -> {label} overlaps an existing range")]
    OverlappingRange { low: i64, high: i64, label: String },
    /// A descriptor names a declaration kind or reference that does not exist.
    #[error("unknown declaration: {0}")]
    UnknownDeclaration(String),
}

/// Errors that abort the decode of the current record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not enough bits left in the region.
    #[error(transparent)]
    Read(#[from] ReadError),
    /// A sequence length or variant tag is not bound in any enclosing scope.
    #[error("cannot resolve `{name}` from scope `{scope}`")]
    UnresolvedReference { name: String, scope: String },
    /// A sequence length or variant tag resolved to a definition of the wrong kind.
    #[error("`{name}` is not {expected}")]
    WrongKind { name: String, expected: &'static str },
    /// A variant was decoded before its tag was set.
    #[error("variant `{variant}` has no tag")]
    MissingTag { variant: String },
    /// The tag label (or lack of one) selects no member of the variant.
    #[error("variant `{variant}` has no member for tag label {label:?}")]
    UnmatchedTag {
        variant: String,
        label: Option<String>,
    },
    /// A sequence length is negative or above the configured maximum.
    #[error("invalid length {length} for `{name}`")]
    InvalidLength { name: String, length: i64 },
    /// No terminator within the configured maximum string length.
    #[error("string `{name}` is longer than {max} bytes")]
    StringTooLong { name: String, max: usize },
}
