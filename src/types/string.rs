use std::{fmt, sync::Arc};

use crate::{
    bit_cursor::{BitCursor, StringEnd},
    config::DecodeConfig,
    errors::{DecodeError, WriteError},
    layout::Encoding,
    scope::ScopePath,
};

/// NUL-terminated string. Equality and hashing depend only on the encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StringDeclaration {
    encoding: Encoding,
}

impl StringDeclaration {
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn alignment(&self) -> usize {
        8
    }

    pub fn is_binary_equivalent(&self, other: &StringDeclaration) -> bool {
        self.encoding == other.encoding
    }
}

impl fmt::Display for StringDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[declaration] string[encoding={}]", self.encoding)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringDefinition {
    declaration: Arc<StringDeclaration>,
    path: ScopePath,
    value: Arc<str>,
}

impl StringDefinition {
    pub fn new(
        declaration: Arc<StringDeclaration>,
        path: ScopePath,
        value: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            declaration,
            path,
            value: value.into(),
        }
    }

    /// Fails rather than truncating when no terminator is found within
    /// `config.max_string_length` bytes.
    pub(crate) fn decode<B: AsRef<[u8]>>(
        declaration: &Arc<StringDeclaration>,
        cursor: &mut BitCursor<B>,
        config: &DecodeConfig,
        path: ScopePath,
    ) -> Result<Self, DecodeError> {
        cursor.align_to(declaration.alignment());
        let (value, end) =
            cursor.read_string_until(config.max_string_length, declaration.encoding())?;

        if let (StringEnd::Limit, Some(max)) = (end, config.max_string_length) {
            return Err(DecodeError::StringTooLong {
                name: path.to_string(),
                max,
            });
        }

        Ok(Self::new(declaration.clone(), path, value))
    }

    pub fn declaration(&self) -> &Arc<StringDeclaration> {
        &self.declaration
    }

    pub fn path(&self) -> &ScopePath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn write<B: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        cursor: &mut BitCursor<B>,
    ) -> Result<(), WriteError> {
        cursor.align_to(self.declaration.alignment());
        cursor.write_string(&self.value)
    }
}

impl fmt::Display for StringDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.value)
    }
}
