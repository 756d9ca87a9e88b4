//! # ctfcore
//!
//! Type system and bit-level decoder for Common Trace Format records.
//!
//! Build immutable declarations describing the layout of a record (integers
//! of any width and byte order, floats, strings, enums, arrays, sequences,
//! structs and variants), then decode byte regions into definition trees.
//! Sequence lengths and variant tags are resolved at decode time from fields
//! decoded earlier in the same or an enclosing scope.
//!
//! ## Example
//!
//! ```
//! use ctfcore::bit_cursor::BitCursor;
//! use ctfcore::scope::{ScopeId, Scopes};
//! use ctfcore::types::{Declaration, IntegerDeclaration, SequenceDeclaration, StructBuilder};
//!
//! let mut builder = StructBuilder::new(8);
//! builder
//!     .field("len", IntegerDeclaration::uint_8().into())
//!     .unwrap()
//!     .field(
//!         "values",
//!         SequenceDeclaration::new("len", IntegerDeclaration::uint_8().into()).into(),
//!     )
//!     .unwrap();
//! let declaration: Declaration = builder.build().into();
//!
//! let mut cursor = BitCursor::new([2u8, 10, 20]);
//! let definition = declaration
//!     .decode(&mut cursor, &mut Scopes::new(), ScopeId::ROOT, "fields")
//!     .unwrap();
//! assert_eq!(definition.to_string(), "{ len = 2, values = [10, 20] }");
//! ```

pub mod bit_cursor;
pub mod config;
pub mod errors;
pub mod event;
pub mod format;
pub mod layout;
pub mod scope;
#[cfg(feature = "serde")]
pub mod serde;
pub mod types;
