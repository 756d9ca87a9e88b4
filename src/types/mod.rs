//! Declarations (immutable type descriptors) and the definitions they decode into.
//!
//! A [Declaration] is a closed set of kinds sharing their descriptors through
//! `Arc`, so one metadata tree can be used by any number of concurrent
//! decodes. Decoding produces a [Definition] tree whose nodes reference the
//! declaration they came from and carry their dotted [ScopePath].

use std::{fmt, sync::Arc};

use crate::{
    bit_cursor::BitCursor,
    errors::{DecodeError, WriteError},
    scope::{ScopeId, ScopePath, Scopes},
};

/// Generates the typed lookups of a composite definition on top of its
/// `lookup_definition(name) -> Option<&Definition>`.
macro_rules! typed_lookups {
    () => {
        /// Resolves `name` and reports whether it is absent or of another kind.
        pub fn lookup<T: $crate::types::FromDefinition>(
            &self,
            name: &str,
        ) -> $crate::types::Lookup<'_, T> {
            $crate::types::Lookup::from_resolved(self.lookup_definition(name))
        }

        pub fn lookup_integer(&self, name: &str) -> Option<&$crate::types::IntegerDefinition> {
            self.lookup(name).found()
        }

        pub fn lookup_float(&self, name: &str) -> Option<&$crate::types::FloatDefinition> {
            self.lookup(name).found()
        }

        pub fn lookup_string(&self, name: &str) -> Option<&$crate::types::StringDefinition> {
            self.lookup(name).found()
        }

        pub fn lookup_enum(&self, name: &str) -> Option<&$crate::types::EnumDefinition> {
            self.lookup(name).found()
        }

        pub fn lookup_array(&self, name: &str) -> Option<&$crate::types::ArrayDefinition> {
            self.lookup(name).found()
        }

        pub fn lookup_struct(&self, name: &str) -> Option<&$crate::types::StructDefinition> {
            self.lookup(name).found()
        }

        pub fn lookup_variant(&self, name: &str) -> Option<&$crate::types::VariantDefinition> {
            self.lookup(name).found()
        }
    };
}

mod array;
mod enumeration;
mod float;
mod integer;
mod string;
mod structure;
mod variant;

pub use array::{ArrayDeclaration, ArrayDefinition, SequenceDeclaration};
pub use enumeration::{EnumBuilder, EnumDeclaration, EnumDefinition, EnumRange};
pub use float::{FloatDeclaration, FloatDefinition};
pub use integer::{IntegerDeclaration, IntegerDefinition};
pub use string::{StringDeclaration, StringDefinition};
pub use structure::{StructBuilder, StructDeclaration, StructDefinition};
pub use variant::{VariantBuilder, VariantDeclaration, VariantDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Integer,
    Float,
    String,
    Enum,
    Array,
    Sequence,
    Struct,
    Variant,
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeclarationKind::Integer => "integer",
            DeclarationKind::Float => "float",
            DeclarationKind::String => "string",
            DeclarationKind::Enum => "enum",
            DeclarationKind::Array => "array",
            DeclarationKind::Sequence => "sequence",
            DeclarationKind::Struct => "struct",
            DeclarationKind::Variant => "variant",
        })
    }
}

/// Type descriptor controlling how bits are consumed and interpreted.
///
/// Derived equality is full structural equality, member names included;
/// [Declaration::is_binary_equivalent] only compares what affects the wire layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Declaration {
    Integer(Arc<IntegerDeclaration>),
    Float(Arc<FloatDeclaration>),
    String(Arc<StringDeclaration>),
    Enum(Arc<EnumDeclaration>),
    Array(Arc<ArrayDeclaration>),
    Sequence(Arc<SequenceDeclaration>),
    Struct(Arc<StructDeclaration>),
    Variant(Arc<VariantDeclaration>),
}

impl Declaration {
    pub fn kind(&self) -> DeclarationKind {
        match self {
            Declaration::Integer(_) => DeclarationKind::Integer,
            Declaration::Float(_) => DeclarationKind::Float,
            Declaration::String(_) => DeclarationKind::String,
            Declaration::Enum(_) => DeclarationKind::Enum,
            Declaration::Array(_) => DeclarationKind::Array,
            Declaration::Sequence(_) => DeclarationKind::Sequence,
            Declaration::Struct(_) => DeclarationKind::Struct,
            Declaration::Variant(_) => DeclarationKind::Variant,
        }
    }

    /// Alignment in bits applied before the first bit of a value is read.
    pub fn alignment(&self) -> usize {
        match self {
            Declaration::Integer(d) => d.alignment(),
            Declaration::Float(d) => d.alignment(),
            Declaration::String(d) => d.alignment(),
            Declaration::Enum(d) => d.alignment(),
            Declaration::Array(d) => d.alignment(),
            Declaration::Sequence(d) => d.alignment(),
            Declaration::Struct(d) => d.alignment(),
            Declaration::Variant(d) => d.alignment(),
        }
    }

    pub fn is_binary_equivalent(&self, other: &Declaration) -> bool {
        match (self, other) {
            (Declaration::Integer(a), Declaration::Integer(b)) => a.is_binary_equivalent(b),
            (Declaration::Float(a), Declaration::Float(b)) => a.is_binary_equivalent(b),
            (Declaration::String(a), Declaration::String(b)) => a.is_binary_equivalent(b),
            (Declaration::Enum(a), Declaration::Enum(b)) => a.is_binary_equivalent(b),
            (Declaration::Array(a), Declaration::Array(b)) => a.is_binary_equivalent(b),
            (Declaration::Sequence(a), Declaration::Sequence(b)) => a.is_binary_equivalent(b),
            (Declaration::Struct(a), Declaration::Struct(b)) => a.is_binary_equivalent(b),
            (Declaration::Variant(a), Declaration::Variant(b)) => a.is_binary_equivalent(b),
            _ => false,
        }
    }

    /// Decodes a field called `name` inside the frame `scope`.
    ///
    /// Sequence lengths and variant tags are resolved from `scope` outward,
    /// so fields bound earlier in the same struct are visible.
    pub fn decode<B: AsRef<[u8]>>(
        &self,
        cursor: &mut BitCursor<B>,
        scopes: &mut Scopes,
        scope: ScopeId,
        name: &str,
    ) -> Result<Definition, DecodeError> {
        let path = scopes
            .path(scope)
            .map_or_else(|| ScopePath::new(name), |parent| parent.child(name));
        self.decode_at(cursor, scopes, scope, path)
    }

    pub(crate) fn decode_at<B: AsRef<[u8]>>(
        &self,
        cursor: &mut BitCursor<B>,
        scopes: &mut Scopes,
        scope: ScopeId,
        path: ScopePath,
    ) -> Result<Definition, DecodeError> {
        Ok(match self {
            Declaration::Integer(d) => {
                Definition::Integer(IntegerDefinition::decode(d, cursor, path)?)
            }
            Declaration::Float(d) => Definition::Float(FloatDefinition::decode(d, cursor, path)?),
            Declaration::String(d) => {
                Definition::String(StringDefinition::decode(d, cursor, scopes.config(), path)?)
            }
            Declaration::Enum(d) => Definition::Enum(EnumDefinition::decode(d, cursor, path)?),
            Declaration::Array(d) => Definition::Array(Arc::new(ArrayDefinition::decode_array(
                d, cursor, scopes, scope, path,
            )?)),
            Declaration::Sequence(d) => Definition::Array(Arc::new(
                ArrayDefinition::decode_sequence(d, cursor, scopes, scope, path)?,
            )),
            Declaration::Struct(d) => Definition::Struct(Arc::new(StructDefinition::decode(
                d, cursor, scopes, scope, path,
            )?)),
            Declaration::Variant(d) => Definition::Variant(Arc::new(VariantDefinition::decode(
                d, cursor, scopes, scope, path,
            )?)),
        })
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaration::Integer(d) => fmt::Display::fmt(d, f),
            Declaration::Float(d) => fmt::Display::fmt(d, f),
            Declaration::String(d) => fmt::Display::fmt(d, f),
            Declaration::Enum(d) => fmt::Display::fmt(d, f),
            Declaration::Array(d) => fmt::Display::fmt(d, f),
            Declaration::Sequence(d) => fmt::Display::fmt(d, f),
            Declaration::Struct(d) => fmt::Display::fmt(d, f),
            Declaration::Variant(d) => fmt::Display::fmt(d, f),
        }
    }
}

macro_rules! declaration_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Declaration {
                fn from(declaration: $ty) -> Self {
                    Declaration::$variant(Arc::new(declaration))
                }
            }

            impl From<Arc<$ty>> for Declaration {
                fn from(declaration: Arc<$ty>) -> Self {
                    Declaration::$variant(declaration)
                }
            }
        )*
    };
}

declaration_from! {
    Integer => IntegerDeclaration,
    Float => FloatDeclaration,
    String => StringDeclaration,
    Enum => EnumDeclaration,
    Array => ArrayDeclaration,
    Sequence => SequenceDeclaration,
    Struct => StructDeclaration,
    Variant => VariantDeclaration,
}

/// A decoded value. Arrays and sequences share [ArrayDefinition].
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Integer(IntegerDefinition),
    Float(FloatDefinition),
    String(StringDefinition),
    Enum(EnumDefinition),
    Array(Arc<ArrayDefinition>),
    Struct(Arc<StructDefinition>),
    Variant(Arc<VariantDefinition>),
}

impl Definition {
    pub fn kind(&self) -> DeclarationKind {
        match self {
            Definition::Integer(_) => DeclarationKind::Integer,
            Definition::Float(_) => DeclarationKind::Float,
            Definition::String(_) => DeclarationKind::String,
            Definition::Enum(_) => DeclarationKind::Enum,
            Definition::Array(d) => d.declaration().kind(),
            Definition::Struct(_) => DeclarationKind::Struct,
            Definition::Variant(_) => DeclarationKind::Variant,
        }
    }

    pub fn declaration(&self) -> Declaration {
        match self {
            Definition::Integer(d) => Declaration::Integer(d.declaration().clone()),
            Definition::Float(d) => Declaration::Float(d.declaration().clone()),
            Definition::String(d) => Declaration::String(d.declaration().clone()),
            Definition::Enum(d) => Declaration::Enum(d.declaration().clone()),
            Definition::Array(d) => d.declaration().clone(),
            Definition::Struct(d) => Declaration::Struct(d.declaration().clone()),
            Definition::Variant(d) => Declaration::Variant(d.declaration().clone()),
        }
    }

    pub fn path(&self) -> &ScopePath {
        match self {
            Definition::Integer(d) => d.path(),
            Definition::Float(d) => d.path(),
            Definition::String(d) => d.path(),
            Definition::Enum(d) => d.path(),
            Definition::Array(d) => d.path(),
            Definition::Struct(d) => d.path(),
            Definition::Variant(d) => d.path(),
        }
    }

    /// Field name, the last component of [Definition::path].
    pub fn name(&self) -> &str {
        self.path().name()
    }

    pub fn as_integer(&self) -> Option<&IntegerDefinition> {
        match self {
            Definition::Integer(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<&FloatDefinition> {
        match self {
            Definition::Float(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&StringDefinition> {
        match self {
            Definition::String(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDefinition> {
        match self {
            Definition::Enum(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayDefinition> {
        match self {
            Definition::Array(d) => Some(d.as_ref()),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructDefinition> {
        match self {
            Definition::Struct(d) => Some(d.as_ref()),
            _ => None,
        }
    }

    pub fn as_variant(&self) -> Option<&VariantDefinition> {
        match self {
            Definition::Variant(d) => Some(d.as_ref()),
            _ => None,
        }
    }

    /// Re-encodes the value with the alignment and layout of its declaration.
    pub fn write<B: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        cursor: &mut BitCursor<B>,
    ) -> Result<(), WriteError> {
        match self {
            Definition::Integer(d) => d.write(cursor),
            Definition::Float(d) => d.write(cursor),
            Definition::String(d) => d.write(cursor),
            Definition::Enum(d) => d.write(cursor),
            Definition::Array(d) => d.write(cursor),
            Definition::Struct(d) => d.write(cursor),
            Definition::Variant(d) => d.write(cursor),
        }
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Integer(d) => fmt::Display::fmt(d, f),
            Definition::Float(d) => fmt::Display::fmt(d, f),
            Definition::String(d) => fmt::Display::fmt(d, f),
            Definition::Enum(d) => fmt::Display::fmt(d, f),
            Definition::Array(d) => fmt::Display::fmt(d, f),
            Definition::Struct(d) => fmt::Display::fmt(d, f),
            Definition::Variant(d) => fmt::Display::fmt(d, f),
        }
    }
}

/// Outcome of a typed lookup.
#[derive(Debug, PartialEq)]
pub enum Lookup<'a, T> {
    Found(&'a T),
    /// Nothing is bound under the name.
    Absent,
    /// A definition is bound under the name but has this other kind.
    WrongKind(DeclarationKind),
}

impl<'a, T: FromDefinition> Lookup<'a, T> {
    pub(crate) fn from_resolved(resolved: Option<&'a Definition>) -> Self {
        match resolved {
            None => Lookup::Absent,
            Some(definition) => match T::from_definition(definition) {
                Some(found) => Lookup::Found(found),
                None => Lookup::WrongKind(definition.kind()),
            },
        }
    }
}

impl<'a, T> Lookup<'a, T> {
    /// Collapses absence and kind mismatch into `None`.
    pub fn found(self) -> Option<&'a T> {
        match self {
            Lookup::Found(found) => Some(found),
            _ => None,
        }
    }
}

/// Definition types reachable from a [Definition] by kind.
pub trait FromDefinition {
    fn from_definition(definition: &Definition) -> Option<&Self>;
}

macro_rules! from_definition {
    ($($ty:ty => $accessor:ident),* $(,)?) => {
        $(
            impl FromDefinition for $ty {
                fn from_definition(definition: &Definition) -> Option<&Self> {
                    definition.$accessor()
                }
            }
        )*
    };
}

from_definition! {
    IntegerDefinition => as_integer,
    FloatDefinition => as_float,
    StringDefinition => as_string,
    EnumDefinition => as_enum,
    ArrayDefinition => as_array,
    StructDefinition => as_struct,
    VariantDefinition => as_variant,
}

impl FromDefinition for Definition {
    fn from_definition(definition: &Definition) -> Option<&Self> {
        Some(definition)
    }
}

/// Finds `name` among `fields`, descending into struct members and the
/// current field of variants for dotted names (`header.id`).
pub(crate) fn resolve<'a>(fields: &'a [Definition], name: &str) -> Option<&'a Definition> {
    if let Some(found) = fields.iter().find(|d| d.name() == name) {
        return Some(found);
    }

    let (head, rest) = name.split_once('.')?;
    match fields.iter().find(|d| d.name() == head)? {
        Definition::Struct(inner) => resolve(inner.fields(), rest),
        Definition::Variant(inner) => resolve(std::slice::from_ref(inner.current_field()), rest),
        _ => None,
    }
}
