use std::{fmt, sync::Arc};

use tracing::trace;

use crate::{
    bit_cursor::BitCursor,
    errors::{BuildError, DecodeError, WriteError},
    scope::{ScopeId, ScopePath, Scopes},
    types::{Declaration, Definition, resolve},
};

/// Collects the members of a variant and the name of its tag field.
#[derive(Debug, Clone, Default)]
pub struct VariantBuilder {
    tag: Option<String>,
    fields: Vec<(String, Declaration)>,
}

impl VariantBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the enum field whose label selects the member.
    pub fn tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tag = Some(tag.into());
        self
    }

    /// Registers the member selected by `label`. Labels must be non-empty and unique.
    pub fn field(
        &mut self,
        label: impl Into<String>,
        declaration: Declaration,
    ) -> Result<&mut Self, BuildError> {
        let label = label.into();
        if label.is_empty() {
            return Err(BuildError::InvalidFieldName);
        }
        if self.fields.iter().any(|(existing, _)| *existing == label) {
            return Err(BuildError::DuplicateField(label));
        }

        self.fields.push((label, declaration));
        Ok(self)
    }

    pub fn build(self) -> VariantDeclaration {
        VariantDeclaration {
            tag: self.tag,
            fields: self.fields,
        }
    }
}

/// Tagged union: one member is decoded, chosen by the label of an enum
/// field resolved through the enclosing scopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantDeclaration {
    tag: Option<String>,
    fields: Vec<(String, Declaration)>,
}

impl VariantDeclaration {
    pub fn builder() -> VariantBuilder {
        VariantBuilder::new()
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn fields(&self) -> &[(String, Declaration)] {
        &self.fields
    }

    pub fn field(&self, label: &str) -> Option<&Declaration> {
        self.fields
            .iter()
            .find(|(field, _)| field == label)
            .map(|(_, declaration)| declaration)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Members align themselves once selected.
    pub fn alignment(&self) -> usize {
        1
    }

    pub fn is_binary_equivalent(&self, other: &VariantDeclaration) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|((_, a), (_, b))| a.is_binary_equivalent(b))
    }
}

impl fmt::Display for VariantDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[declaration] variant[tag={}, fields=[",
            self.tag.as_deref().unwrap_or("null")
        )?;
        for (i, name) in self.field_names().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
        }
        f.write_str("]]")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantDefinition {
    declaration: Arc<VariantDeclaration>,
    path: ScopePath,
    label: String,
    current: Definition,
    siblings: Arc<[Definition]>,
}

impl VariantDefinition {
    /// `siblings` are the fields decoded before the variant in its enclosing
    /// struct; they back [VariantDefinition::lookup_definition].
    pub fn new(
        declaration: Arc<VariantDeclaration>,
        path: ScopePath,
        label: impl Into<String>,
        current: Definition,
        siblings: impl Into<Arc<[Definition]>>,
    ) -> Self {
        Self {
            declaration,
            path,
            label: label.into(),
            current,
            siblings: siblings.into(),
        }
    }

    pub(crate) fn decode<B: AsRef<[u8]>>(
        declaration: &Arc<VariantDeclaration>,
        cursor: &mut BitCursor<B>,
        scopes: &mut Scopes,
        scope: ScopeId,
        path: ScopePath,
    ) -> Result<Self, DecodeError> {
        let tag = declaration.tag().ok_or_else(|| DecodeError::MissingTag {
            variant: path.to_string(),
        })?;

        let label = {
            let reference = scopes.lookup(scope, tag).ok_or_else(|| {
                DecodeError::UnresolvedReference {
                    name: tag.to_string(),
                    scope: path.to_string(),
                }
            })?;
            let tag_value = reference.as_enum().ok_or_else(|| DecodeError::WrongKind {
                name: tag.to_string(),
                expected: "an enum",
            })?;
            tag_value.label().map(str::to_string)
        };

        let (label, member) = match label {
            Some(label) => match declaration.field(&label) {
                Some(member) => (label, member),
                None => {
                    return Err(DecodeError::UnmatchedTag {
                        variant: path.to_string(),
                        label: Some(label),
                    });
                }
            },
            None => {
                return Err(DecodeError::UnmatchedTag {
                    variant: path.to_string(),
                    label: None,
                });
            }
        };

        trace!(path = %path, tag, label = %label, "decoding variant");
        let siblings = Arc::<[Definition]>::from(scopes.bindings(scope));
        let current = member.decode_at(cursor, scopes, scope, path.child(&label))?;

        Ok(Self::new(declaration.clone(), path, label, current, siblings))
    }

    pub fn declaration(&self) -> &Arc<VariantDeclaration> {
        &self.declaration
    }

    pub fn path(&self) -> &ScopePath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// The member selected by the tag.
    pub fn current_field(&self) -> &Definition {
        &self.current
    }

    /// Label of the selected member.
    pub fn current_field_name(&self) -> &str {
        &self.label
    }

    /// The selected member when `name` is this variant's own field name,
    /// otherwise a field of the enclosing struct decoded before the variant.
    pub fn lookup_definition(&self, name: &str) -> Option<&Definition> {
        if name == self.name() {
            return Some(&self.current);
        }

        resolve(&self.siblings, name)
    }

    typed_lookups!();

    pub fn write<B: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        cursor: &mut BitCursor<B>,
    ) -> Result<(), WriteError> {
        self.current.write(cursor)
    }
}

impl fmt::Display for VariantDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ {} = {} }}", self.label, self.current)
    }
}
