//! JSON-deserializable description of declarations.
//!
//! These types describe already-resolved declarations: every field carries
//! its complete layout, or names an alias defined earlier in the same
//! [MetadataDef]. They are built into the core `ctfcore` types with
//! [DeclarationDef::build], [EventDef::build] or [MetadataDef::build].

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    errors::BuildError,
    event::EventDeclaration,
    layout::{ByteOrder, Encoding},
    types::{
        ArrayDeclaration, Declaration, EnumBuilder, FloatDeclaration, IntegerDeclaration,
        SequenceDeclaration, StringDeclaration, StructBuilder, StructDeclaration, VariantBuilder,
    },
};

/// Named declarations visible to the descriptors built after them.
pub type Aliases = HashMap<String, Declaration>;

/// Description of one declaration, tagged by kind.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeclarationDef {
    Integer(IntegerDef),
    Float {
        exponent: usize,
        mantissa: usize,
        #[serde(default)]
        byte_order: ByteOrder,
        /// Defaults to 8 bits.
        #[serde(default)]
        alignment: Option<usize>,
    },
    String {
        #[serde(default)]
        encoding: Encoding,
    },
    Enum {
        container: IntegerDef,
        ranges: Vec<RangeDef>,
    },
    Array {
        length: usize,
        element: Box<DeclarationDef>,
    },
    Sequence {
        /// Integer field, in an enclosing scope, holding the element count.
        length_name: String,
        element: Box<DeclarationDef>,
    },
    Struct(StructDef),
    Variant {
        /// Enum field whose label selects the member.
        tag: Option<String>,
        fields: Vec<FieldDef>,
    },
    /// Reference to an alias defined earlier.
    Alias { name: String },
}

/// Integer layout. Only `length` is required.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IntegerDef {
    pub length: usize,
    #[serde(default)]
    pub signed: bool,
    #[serde(default)]
    pub byte_order: ByteOrder,
    /// Display base; defaults to 10.
    pub base: Option<u32>,
    /// Set to make an 8-bit integer a character.
    pub encoding: Option<Encoding>,
    pub clock: Option<String>,
    /// Defaults to 8 for byte-multiple lengths and 1 otherwise.
    pub alignment: Option<usize>,
}

/// Inclusive range of an enum.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RangeDef {
    pub low: i64,
    pub high: i64,
    pub label: String,
}

/// Struct members in order.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StructDef {
    #[serde(default)]
    pub min_alignment: usize,
    pub fields: Vec<FieldDef>,
}

/// Named member of a struct or variant.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDef {
    pub name: String,
    pub declaration: DeclarationDef,
}

/// One event type.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EventDef {
    pub name: Option<String>,
    pub id: Option<u64>,
    pub header: Option<StructDef>,
    pub stream_context: Option<StructDef>,
    pub context: Option<StructDef>,
    pub fields: Option<StructDef>,
}

/// Named declaration reusable by later descriptors.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AliasDef {
    pub name: String,
    pub declaration: DeclarationDef,
}

/// Aliases, the packet context and every event type of a stream.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct MetadataDef {
    #[serde(default)]
    pub aliases: Vec<AliasDef>,
    pub packet_context: Option<StructDef>,
    #[serde(default)]
    pub events: Vec<EventDef>,
}

/// Built form of a [MetadataDef].
#[derive(Debug, Clone)]
pub struct Metadata {
    pub aliases: Aliases,
    pub packet_context: Option<Arc<StructDeclaration>>,
    pub events: Vec<Arc<EventDeclaration>>,
}

impl IntegerDef {
    pub fn build(self) -> Result<IntegerDeclaration, BuildError> {
        let mut declaration = IntegerDeclaration::new(self.length, self.signed, self.byte_order)?;
        if let Some(base) = self.base {
            declaration = declaration.with_base(base);
        }
        if let Some(encoding) = self.encoding {
            declaration = declaration.with_encoding(encoding);
        }
        if let Some(clock) = self.clock {
            declaration = declaration.with_clock(clock);
        }
        if let Some(alignment) = self.alignment {
            declaration = declaration.with_alignment(alignment);
        }
        Ok(declaration)
    }
}

impl StructDef {
    pub fn build(self, aliases: &Aliases) -> Result<StructDeclaration, BuildError> {
        let mut builder = StructBuilder::new(self.min_alignment);
        for field in self.fields {
            builder.field(field.name, field.declaration.build(aliases)?)?;
        }
        Ok(builder.build())
    }
}

impl DeclarationDef {
    /// Builds the declaration, resolving `alias` references through `aliases`.
    pub fn build(self, aliases: &Aliases) -> Result<Declaration, BuildError> {
        Ok(match self {
            DeclarationDef::Integer(integer) => integer.build()?.into(),
            DeclarationDef::Float {
                exponent,
                mantissa,
                byte_order,
                alignment,
            } => FloatDeclaration::new(exponent, mantissa, byte_order, alignment.unwrap_or(8))?
                .into(),
            DeclarationDef::String { encoding } => StringDeclaration::new(encoding).into(),
            DeclarationDef::Enum { container, ranges } => {
                let mut builder = EnumBuilder::new(container.build()?);
                for range in ranges {
                    builder.try_add(range.low, range.high, range.label)?;
                }
                builder.build().into()
            }
            DeclarationDef::Array { length, element } => {
                ArrayDeclaration::new(length, element.build(aliases)?).into()
            }
            DeclarationDef::Sequence {
                length_name,
                element,
            } => SequenceDeclaration::new(length_name, element.build(aliases)?).into(),
            DeclarationDef::Struct(def) => def.build(aliases)?.into(),
            DeclarationDef::Variant { tag, fields } => {
                let mut builder = VariantBuilder::new();
                if let Some(tag) = tag {
                    builder.tag(tag);
                }
                for field in fields {
                    builder.field(field.name, field.declaration.build(aliases)?)?;
                }
                builder.build().into()
            }
            DeclarationDef::Alias { name } => aliases
                .get(&name)
                .cloned()
                .ok_or(BuildError::UnknownDeclaration(name))?,
        })
    }
}

impl TryFrom<DeclarationDef> for Declaration {
    type Error = BuildError;

    fn try_from(def: DeclarationDef) -> Result<Self, Self::Error> {
        def.build(&Aliases::new())
    }
}

impl EventDef {
    pub fn build(self, aliases: &Aliases) -> Result<EventDeclaration, BuildError> {
        let mut declaration = match self.name {
            Some(name) => EventDeclaration::new(name),
            None => EventDeclaration::default(),
        };
        if let Some(id) = self.id {
            declaration = declaration.with_id(id);
        }
        if let Some(header) = self.header {
            declaration = declaration.with_header(header.build(aliases)?);
        }
        if let Some(context) = self.stream_context {
            declaration = declaration.with_stream_context(context.build(aliases)?);
        }
        if let Some(context) = self.context {
            declaration = declaration.with_context(context.build(aliases)?);
        }
        if let Some(fields) = self.fields {
            declaration = declaration.with_fields(fields.build(aliases)?);
        }
        Ok(declaration)
    }
}

impl TryFrom<EventDef> for EventDeclaration {
    type Error = BuildError;

    fn try_from(def: EventDef) -> Result<Self, Self::Error> {
        def.build(&Aliases::new())
    }
}

impl MetadataDef {
    /// Builds aliases in order, then the packet context and the events.
    pub fn build(self) -> Result<Metadata, BuildError> {
        let mut aliases = Aliases::new();
        for alias in self.aliases {
            let declaration = alias.declaration.build(&aliases)?;
            aliases.insert(alias.name, declaration);
        }

        let packet_context = self
            .packet_context
            .map(|context| context.build(&aliases).map(Arc::new))
            .transpose()?;

        let events = self
            .events
            .into_iter()
            .map(|event| event.build(&aliases).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Metadata {
            aliases,
            packet_context,
            events,
        })
    }
}
