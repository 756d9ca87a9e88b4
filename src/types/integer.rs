use std::{fmt, sync::Arc};

use crate::{
    bit_cursor::BitCursor,
    errors::{BuildError, ReadError, WriteError},
    format::format_number,
    layout::{ByteOrder, Encoding},
    scope::ScopePath,
};

/// Integer type: 1 to 64 bits, either signedness and byte order.
///
/// Values are stored as `i64`; an unsigned 64-bit value keeps its bit pattern
/// and is rendered through [format_number].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntegerDeclaration {
    length: usize,
    signed: bool,
    base: u32,
    byte_order: ByteOrder,
    encoding: Encoding,
    clock: Option<String>,
    alignment: usize,
}

impl IntegerDeclaration {
    /// Creates a base-10, non-character integer. Alignment defaults to 8 bits
    /// for byte-multiple lengths and 1 bit otherwise.
    pub fn new(length: usize, signed: bool, byte_order: ByteOrder) -> Result<Self, BuildError> {
        if length == 0 || length > 64 {
            return Err(BuildError::InvalidIntegerLength(length));
        }

        Ok(Self::raw(length, signed, byte_order))
    }

    const fn raw(length: usize, signed: bool, byte_order: ByteOrder) -> Self {
        Self {
            length,
            signed,
            base: 10,
            byte_order,
            encoding: Encoding::None,
            clock: None,
            alignment: if length % 8 == 0 { 8 } else { 1 },
        }
    }

    pub fn int_8() -> Self {
        Self::raw(8, true, ByteOrder::BigEndian)
    }

    pub fn uint_8() -> Self {
        Self::raw(8, false, ByteOrder::BigEndian)
    }

    pub fn int_32be() -> Self {
        Self::raw(32, true, ByteOrder::BigEndian)
    }

    pub fn int_32le() -> Self {
        Self::raw(32, true, ByteOrder::LittleEndian)
    }

    pub fn uint_32be() -> Self {
        Self::raw(32, false, ByteOrder::BigEndian)
    }

    pub fn int_64be() -> Self {
        Self::raw(64, true, ByteOrder::BigEndian)
    }

    pub fn uint_64be() -> Self {
        Self::raw(64, false, ByteOrder::BigEndian)
    }

    pub fn with_base(mut self, base: u32) -> Self {
        self.base = base;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_clock(mut self, clock: impl Into<String>) -> Self {
        self.clock = Some(clock.into());
        self
    }

    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn clock(&self) -> Option<&str> {
        self.clock.as_deref()
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// An 8-bit integer with an encoding is a character code unit.
    pub fn is_character(&self) -> bool {
        self.length == 8 && self.encoding != Encoding::None
    }

    pub fn min_value(&self) -> i128 {
        if self.signed {
            -(1i128 << (self.length - 1))
        } else {
            0
        }
    }

    pub fn max_value(&self) -> i128 {
        if self.signed {
            (1i128 << (self.length - 1)) - 1
        } else {
            (1i128 << self.length) - 1
        }
    }

    pub fn is_binary_equivalent(&self, other: &IntegerDeclaration) -> bool {
        self.length == other.length
            && self.signed == other.signed
            && self.byte_order == other.byte_order
            && self.alignment == other.alignment
    }

    /// Aligns the cursor and reads one value.
    pub fn read<B: AsRef<[u8]>>(&self, cursor: &mut BitCursor<B>) -> Result<i64, ReadError> {
        cursor.align_to(self.alignment);
        cursor.read_int(self.length, self.signed, self.byte_order)
    }

    pub fn write<B: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        cursor: &mut BitCursor<B>,
        value: i64,
    ) -> Result<(), WriteError> {
        cursor.align_to(self.alignment);
        cursor.write_int(value, self.length, self.byte_order)
    }
}

impl fmt::Display for IntegerDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[declaration] integer[length={}, signed={}, base={}, byte_order={}, encoding={}, \
             alignment={}]",
            self.length, self.signed, self.base, self.byte_order, self.encoding, self.alignment
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegerDefinition {
    declaration: Arc<IntegerDeclaration>,
    path: ScopePath,
    value: i64,
}

impl IntegerDefinition {
    pub fn new(declaration: Arc<IntegerDeclaration>, path: ScopePath, value: i64) -> Self {
        Self {
            declaration,
            path,
            value,
        }
    }

    pub(crate) fn decode<B: AsRef<[u8]>>(
        declaration: &Arc<IntegerDeclaration>,
        cursor: &mut BitCursor<B>,
        path: ScopePath,
    ) -> Result<Self, ReadError> {
        let value = declaration.read(cursor)?;
        Ok(Self::new(declaration.clone(), path, value))
    }

    pub fn declaration(&self) -> &Arc<IntegerDeclaration> {
        &self.declaration
    }

    pub fn path(&self) -> &ScopePath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Raw 64-bit storage.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// The value as a non-negative count, if it is one under the declared signedness.
    pub fn as_unsigned(&self) -> Option<u64> {
        if self.declaration.is_signed() && self.value < 0 {
            None
        } else {
            Some(self.value as u64)
        }
    }

    pub fn write<B: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        cursor: &mut BitCursor<B>,
    ) -> Result<(), WriteError> {
        self.declaration.write(cursor, self.value)
    }
}

impl fmt::Display for IntegerDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.declaration.is_character() {
            return write!(f, "{}", char::from(self.value as u8));
        }

        f.write_str(&format_number(
            self.value,
            self.declaration.base(),
            self.declaration.is_signed(),
        ))
    }
}
