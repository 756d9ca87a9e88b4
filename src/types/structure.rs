use std::{fmt, sync::Arc};

use tracing::trace;

use crate::{
    bit_cursor::BitCursor,
    errors::{BuildError, DecodeError, WriteError},
    scope::{ScopeId, ScopePath, Scopes},
    types::{Declaration, Definition, resolve},
};

/// Collects struct members in declaration order.
#[derive(Debug, Clone, Default)]
pub struct StructBuilder {
    min_alignment: usize,
    fields: Vec<(String, Declaration)>,
}

impl StructBuilder {
    pub fn new(min_alignment: usize) -> Self {
        Self {
            min_alignment,
            fields: Vec::new(),
        }
    }

    /// Appends a member. Names must be non-empty and unique within the struct.
    pub fn field(
        &mut self,
        name: impl Into<String>,
        declaration: Declaration,
    ) -> Result<&mut Self, BuildError> {
        let name = name.into();
        if name.is_empty() {
            return Err(BuildError::InvalidFieldName);
        }
        if self.fields.iter().any(|(existing, _)| *existing == name) {
            return Err(BuildError::DuplicateField(name));
        }

        self.fields.push((name, declaration));
        Ok(self)
    }

    pub fn build(self) -> StructDeclaration {
        let alignment = self
            .fields
            .iter()
            .map(|(_, declaration)| declaration.alignment())
            .fold(self.min_alignment.max(1), usize::max);

        StructDeclaration {
            min_alignment: self.min_alignment,
            alignment,
            fields: self.fields,
        }
    }
}

/// Ordered, uniquely named members.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructDeclaration {
    min_alignment: usize,
    alignment: usize,
    fields: Vec<(String, Declaration)>,
}

impl StructDeclaration {
    pub fn builder(min_alignment: usize) -> StructBuilder {
        StructBuilder::new(min_alignment)
    }

    pub fn min_alignment(&self) -> usize {
        self.min_alignment
    }

    /// Largest of the declared minimum and every member's alignment.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn fields(&self) -> &[(String, Declaration)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Declaration> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, declaration)| declaration)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_binary_equivalent(&self, other: &StructDeclaration) -> bool {
        self.alignment == other.alignment
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|((_, a), (_, b))| a.is_binary_equivalent(b))
    }
}

impl fmt::Display for StructDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[declaration] struct[alignment={}, fields=[", self.alignment)?;
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
pub struct StructDefinition {
    declaration: Arc<StructDeclaration>,
    path: ScopePath,
    fields: Vec<Definition>,
}

impl StructDefinition {
    pub fn new(
        declaration: Arc<StructDeclaration>,
        path: ScopePath,
        fields: Vec<Definition>,
    ) -> Self {
        Self {
            declaration,
            path,
            fields,
        }
    }

    /// Decodes every member in order inside a new frame under `scope`.
    /// The frame is popped whether or not decoding succeeds.
    pub(crate) fn decode<B: AsRef<[u8]>>(
        declaration: &Arc<StructDeclaration>,
        cursor: &mut BitCursor<B>,
        scopes: &mut Scopes,
        scope: ScopeId,
        path: ScopePath,
    ) -> Result<Self, DecodeError> {
        cursor.align_to(declaration.alignment());
        trace!(path = %path, fields = declaration.fields().len(), "decoding struct");

        let frame = scopes.open(scope, path.clone());
        let decoded = decode_fields(declaration, cursor, scopes, frame);
        let fields = scopes.close(frame);
        decoded?;

        Ok(Self::new(declaration.clone(), path, fields))
    }

    pub fn declaration(&self) -> &Arc<StructDeclaration> {
        &self.declaration
    }

    pub fn path(&self) -> &ScopePath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Members in declaration order.
    pub fn fields(&self) -> &[Definition] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Definition::name)
    }

    /// Member called `name`; dotted names reach into nested structs and variants.
    pub fn lookup_definition(&self, name: &str) -> Option<&Definition> {
        resolve(&self.fields, name)
    }

    typed_lookups!();

    pub fn write<B: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        cursor: &mut BitCursor<B>,
    ) -> Result<(), WriteError> {
        cursor.align_to(self.declaration.alignment());
        for field in &self.fields {
            field.write(cursor)?;
        }
        Ok(())
    }
}

fn decode_fields<B: AsRef<[u8]>>(
    declaration: &StructDeclaration,
    cursor: &mut BitCursor<B>,
    scopes: &mut Scopes,
    frame: ScopeId,
) -> Result<(), DecodeError> {
    for (name, field) in declaration.fields() {
        let definition = field.decode(cursor, scopes, frame, name)?;
        scopes.bind(frame, definition);
    }
    Ok(())
}

impl fmt::Display for StructDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{ ")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = {}", field.name(), field)?;
        }
        f.write_str(" }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::DecodeConfig,
        errors::ReadError,
        layout::{ByteOrder, Encoding},
        types::{
            ArrayDeclaration, EnumBuilder, FloatDeclaration, IntegerDeclaration,
            SequenceDeclaration,
            StringDeclaration,
        },
    };

    fn decode(
        declaration: StructDeclaration,
        data: &[u8],
    ) -> Result<StructDefinition, DecodeError> {
        let mut scopes = Scopes::new();
        let mut cursor = BitCursor::new(data);
        StructDefinition::decode(
            &Arc::new(declaration),
            &mut cursor,
            &mut scopes,
            ScopeId::ROOT,
            ScopePath::new("testStruct"),
        )
    }

    fn mixed() -> StructDeclaration {
        let mut tag = EnumBuilder::new(IntegerDeclaration::uint_8());
        tag.add(0, 1, "a");

        let mut builder = StructBuilder::new(8);
        builder
            .field("id", IntegerDeclaration::uint_8().into())
            .unwrap()
            .field("len", IntegerDeclaration::uint_8().into())
            .unwrap()
            .field(
                "seq",
                SequenceDeclaration::new("len", IntegerDeclaration::uint_8().into()).into(),
            )
            .unwrap()
            .field("name", StringDeclaration::new(Encoding::Ascii).into())
            .unwrap()
            .field("arr", ArrayDeclaration::new(2, IntegerDeclaration::uint_8().into()).into())
            .unwrap()
            .field("tag", tag.build().into())
            .unwrap()
            .field("f", FloatDeclaration::binary32(ByteOrder::BigEndian).into())
            .unwrap();
        builder.build()
    }

    const MIXED: [u8; 16] = [
        9, 2, 10, 11, b'h', b'i', 0, 5, 6, 1, 0x3f, 0xc0, 0, 0, 0xff, 0xff,
    ];

    #[test]
    fn test_fields_in_declaration_order() {
        let definition = decode(mixed(), &MIXED).unwrap();

        let names: Vec<&str> = definition.field_names().collect();
        assert_eq!(names, ["id", "len", "seq", "name", "arr", "tag", "f"]);
        assert_eq!(definition.fields().len(), 7);

        assert_eq!(definition.lookup_integer("id").map(|i| i.value()), Some(9));
        assert_eq!(definition.lookup_array("seq").map(|a| a.len()), Some(2));
        assert_eq!(definition.lookup_string("name").map(|s| s.value()), Some("hi"));
        assert_eq!(definition.lookup_enum("tag").and_then(|e| e.label()), Some("a"));
        assert_eq!(definition.lookup_float("f").map(|f| f.value()), Some(1.5));
        assert!(definition.lookup_struct("id").is_none());
        assert!(definition.lookup_variant("missing").is_none());
    }

    #[test]
    fn test_display() {
        let definition = decode(mixed(), &MIXED).unwrap();
        assert_eq!(
            definition.to_string(),
            "{ id = 9, len = 2, seq = [10, 11], name = \"hi\", arr = [5, 6], \
             tag = { value = a, container = 1 }, f = 1.5 }"
        );
    }

    #[test]
    fn test_paths() {
        let definition = decode(mixed(), &MIXED).unwrap();
        assert_eq!(definition.path().as_str(), "testStruct");
        assert_eq!(definition.lookup_array("seq").unwrap().path().as_str(), "testStruct.seq");
        assert_eq!(
            definition.lookup_array("seq").unwrap().get(1).unwrap().path().as_str(),
            "testStruct.seq[1]"
        );
    }

    #[test]
    fn test_nested_lookup() {
        let mut inner = StructBuilder::new(8);
        inner.field("x", IntegerDeclaration::uint_8().into()).unwrap();

        let mut outer = StructBuilder::new(8);
        outer
            .field("inner", inner.build().into())
            .unwrap()
            .field("y", IntegerDeclaration::uint_8().into())
            .unwrap();

        let definition = decode(outer.build(), &[4, 5]).unwrap();
        assert_eq!(definition.lookup_integer("inner.x").map(|i| i.value()), Some(4));
        assert_eq!(definition.lookup_integer("y").map(|i| i.value()), Some(5));
        assert_eq!(definition.to_string(), "{ inner = { x = 4 }, y = 5 }");
    }

    #[test]
    fn test_sequence_length_from_enclosing_struct() {
        let mut inner = StructBuilder::new(8);
        inner
            .field(
                "data",
                SequenceDeclaration::new("n", IntegerDeclaration::uint_8().into()).into(),
            )
            .unwrap();

        let mut outer = StructBuilder::new(8);
        outer
            .field("n", IntegerDeclaration::uint_8().into())
            .unwrap()
            .field("inner", inner.build().into())
            .unwrap();

        let definition = decode(outer.build(), &[3, 7, 8, 9]).unwrap();
        assert_eq!(
            definition.lookup_array("inner.data").map(|a| a.to_string()),
            Some("[7, 8, 9]".to_string())
        );
    }

    #[test]
    fn test_builder_rejects_bad_names() {
        let mut builder = StructBuilder::new(8);
        builder.field("a", IntegerDeclaration::int_8().into()).unwrap();
        assert_eq!(
            builder.field("a", IntegerDeclaration::int_8().into()).unwrap_err(),
            BuildError::DuplicateField("a".to_string())
        );
        assert_eq!(
            builder.field("", IntegerDeclaration::int_8().into()).unwrap_err(),
            BuildError::InvalidFieldName
        );
        assert_eq!(builder.build().fields().len(), 1);
    }

    #[test]
    fn test_alignment() {
        let mut builder = StructBuilder::new(12);
        builder.field("a", IntegerDeclaration::uint_8().into()).unwrap();
        assert_eq!(builder.build().alignment(), 12);

        let mut builder = StructBuilder::new(0);
        builder
            .field("a", IntegerDeclaration::uint_32be().with_alignment(32).into())
            .unwrap();
        let declaration = builder.build();
        assert_eq!(declaration.alignment(), 32);
        assert_eq!(declaration.min_alignment(), 0);
    }

    #[test]
    fn test_equality_and_binary_equivalence() {
        let build = |name: &str, base: u32| {
            let mut builder = StructBuilder::new(8);
            builder
                .field(name, IntegerDeclaration::int_32be().with_base(base).into())
                .unwrap();
            builder.build()
        };

        let a = build("a", 10);
        assert_eq!(a, build("a", 10));
        assert_ne!(a, build("b", 10));
        assert!(a.is_binary_equivalent(&build("b", 16)));

        let mut wider = StructBuilder::new(8);
        wider
            .field("a", IntegerDeclaration::int_32be().into())
            .unwrap()
            .field("b", IntegerDeclaration::int_8().into())
            .unwrap();
        assert!(!a.is_binary_equivalent(&wider.build()));
    }

    #[test]
    fn test_string_over_limit_fails_struct() {
        let mut builder = StructBuilder::new(8);
        builder
            .field("s", StringDeclaration::new(Encoding::Utf8).into())
            .unwrap()
            .field("n", IntegerDeclaration::uint_8().into())
            .unwrap();
        let declaration = Arc::new(builder.build());
        let config = DecodeConfig::default().with_max_string_length(2);

        let mut scopes = Scopes::with_config(config);
        let mut cursor = BitCursor::new(b"abcdef\0\x05".as_slice());
        let err = StructDefinition::decode(
            &declaration,
            &mut cursor,
            &mut scopes,
            ScopeId::ROOT,
            ScopePath::new("s"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DecodeError::StringTooLong {
                name: "s.s".to_string(),
                max: 2
            }
        );

        let mut cursor = BitCursor::new(b"ab\0\x05".as_slice());
        let definition = StructDefinition::decode(
            &declaration,
            &mut cursor,
            &mut scopes,
            ScopeId::ROOT,
            ScopePath::new("s"),
        )
        .unwrap();
        assert_eq!(definition.to_string(), "{ s = \"ab\", n = 5 }");
    }

    #[test]
    fn test_truncated_input_pops_frame() {
        let mut builder = StructBuilder::new(8);
        builder
            .field("a", IntegerDeclaration::uint_32be().into())
            .unwrap();
        let declaration = Arc::new(builder.build());

        let mut scopes = Scopes::new();
        let mut cursor = BitCursor::new([1u8, 2]);
        let err = StructDefinition::decode(
            &declaration,
            &mut cursor,
            &mut scopes,
            ScopeId::ROOT,
            ScopePath::new("s"),
        )
        .unwrap_err();
        assert_eq!(err, DecodeError::Read(ReadError::OutOfBounds));

        let mut cursor = BitCursor::new([0u8, 0, 0, 42]);
        let definition = StructDefinition::decode(
            &declaration,
            &mut cursor,
            &mut scopes,
            ScopeId::ROOT,
            ScopePath::new("s"),
        )
        .unwrap();
        assert_eq!(definition.lookup_integer("a").map(|i| i.value()), Some(42));
        assert!(scopes.bindings(ScopeId::ROOT).is_empty());
    }
}
