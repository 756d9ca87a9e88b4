use std::{fmt, sync::Arc};

use tracing::trace;

use crate::{
    bit_cursor::BitCursor,
    errors::{DecodeError, WriteError},
    scope::{ScopeId, ScopePath, Scopes},
    types::{Declaration, Definition},
};

/// Fixed number of elements, known when the declaration is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArrayDeclaration {
    length: usize,
    element: Declaration,
}

impl ArrayDeclaration {
    pub fn new(length: usize, element: Declaration) -> Self {
        Self { length, element }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn element(&self) -> &Declaration {
        &self.element
    }

    pub fn alignment(&self) -> usize {
        self.element.alignment()
    }

    pub fn is_binary_equivalent(&self, other: &ArrayDeclaration) -> bool {
        self.length == other.length && self.element.is_binary_equivalent(&other.element)
    }
}

impl fmt::Display for ArrayDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[declaration] array[length={}, element={}]", self.length, self.element)
    }
}

/// Element count read at decode time from an integer field named `length_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequenceDeclaration {
    length_name: String,
    element: Declaration,
}

impl SequenceDeclaration {
    pub fn new(length_name: impl Into<String>, element: Declaration) -> Self {
        Self {
            length_name: length_name.into(),
            element,
        }
    }

    pub fn length_name(&self) -> &str {
        &self.length_name
    }

    pub fn element(&self) -> &Declaration {
        &self.element
    }

    pub fn alignment(&self) -> usize {
        self.element.alignment()
    }

    /// The length field name is not part of the layout.
    pub fn is_binary_equivalent(&self, other: &SequenceDeclaration) -> bool {
        self.element.is_binary_equivalent(&other.element)
    }
}

impl fmt::Display for SequenceDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[declaration] sequence[length={}, element={}]",
            self.length_name, self.element
        )
    }
}

/// Decoded array or sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDefinition {
    declaration: Declaration,
    path: ScopePath,
    elements: Vec<Definition>,
}

impl ArrayDefinition {
    pub fn new(declaration: Declaration, path: ScopePath, elements: Vec<Definition>) -> Self {
        Self {
            declaration,
            path,
            elements,
        }
    }

    pub(crate) fn decode_array<B: AsRef<[u8]>>(
        declaration: &Arc<ArrayDeclaration>,
        cursor: &mut BitCursor<B>,
        scopes: &mut Scopes,
        scope: ScopeId,
        path: ScopePath,
    ) -> Result<Self, DecodeError> {
        let elements = decode_elements(
            declaration.element(),
            declaration.length(),
            cursor,
            scopes,
            scope,
            &path,
        )?;

        Ok(Self::new(Declaration::Array(declaration.clone()), path, elements))
    }

    pub(crate) fn decode_sequence<B: AsRef<[u8]>>(
        declaration: &Arc<SequenceDeclaration>,
        cursor: &mut BitCursor<B>,
        scopes: &mut Scopes,
        scope: ScopeId,
        path: ScopePath,
    ) -> Result<Self, DecodeError> {
        let name = declaration.length_name();
        let length = {
            let reference = scopes.lookup(scope, name).ok_or_else(|| {
                DecodeError::UnresolvedReference {
                    name: name.to_string(),
                    scope: path.to_string(),
                }
            })?;
            let integer = reference.as_integer().ok_or_else(|| DecodeError::WrongKind {
                name: name.to_string(),
                expected: "an integer",
            })?;

            integer
                .as_unsigned()
                .and_then(|n| usize::try_from(n).ok())
                .filter(|n| scopes.config().allows_sequence_length(*n))
                .ok_or_else(|| DecodeError::InvalidLength {
                    name: name.to_string(),
                    length: integer.value(),
                })?
        };

        trace!(path = %path, length, "decoding sequence");
        let elements =
            decode_elements(declaration.element(), length, cursor, scopes, scope, &path)?;

        Ok(Self::new(Declaration::Sequence(declaration.clone()), path, elements))
    }

    /// The array or sequence declaration this was decoded from.
    pub fn declaration(&self) -> &Declaration {
        &self.declaration
    }

    pub fn path(&self) -> &ScopePath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn elements(&self) -> &[Definition] {
        &self.elements
    }

    pub fn get(&self, index: usize) -> Option<&Definition> {
        self.elements.get(index)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn element_declaration(&self) -> Option<&Declaration> {
        match &self.declaration {
            Declaration::Array(d) => Some(d.element()),
            Declaration::Sequence(d) => Some(d.element()),
            _ => None,
        }
    }

    /// Text of a character array, up to the first NUL. `None` unless the
    /// elements are 8-bit integers with an encoding.
    pub fn as_text(&self) -> Option<String> {
        let Some(Declaration::Integer(element)) = self.element_declaration() else {
            return None;
        };
        if !element.is_character() {
            return None;
        }

        let bytes: Vec<u8> = self
            .elements
            .iter()
            .filter_map(Definition::as_integer)
            .map(|i| i.value() as u8)
            .take_while(|b| *b != 0)
            .collect();

        Some(element.encoding().decode(&bytes))
    }

    pub fn write<B: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        cursor: &mut BitCursor<B>,
    ) -> Result<(), WriteError> {
        cursor.align_to(self.declaration.alignment());
        for element in &self.elements {
            element.write(cursor)?;
        }
        Ok(())
    }
}

fn decode_elements<B: AsRef<[u8]>>(
    element: &Declaration,
    length: usize,
    cursor: &mut BitCursor<B>,
    scopes: &mut Scopes,
    scope: ScopeId,
    path: &ScopePath,
) -> Result<Vec<Definition>, DecodeError> {
    cursor.align_to(element.alignment());

    // Every element consumes at least one bit.
    let mut elements = Vec::with_capacity(length.min(cursor.remaining_bits()));
    for index in 0..length {
        elements.push(element.decode_at(cursor, scopes, scope, path.element(index))?);
    }

    Ok(elements)
}

impl fmt::Display for ArrayDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.as_text() {
            return write!(f, "\"{text}\"");
        }

        f.write_str("[")?;
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{element}")?;
        }
        f.write_str("]")
    }
}
