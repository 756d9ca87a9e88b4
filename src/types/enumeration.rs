use std::{fmt, sync::Arc};

use tracing::debug;

use crate::{
    bit_cursor::BitCursor,
    errors::{BuildError, ReadError, WriteError},
    scope::ScopePath,
    types::integer::{IntegerDeclaration, IntegerDefinition},
};

/// Inclusive `[low, high]` range mapped to a label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumRange {
    pub low: i64,
    pub high: i64,
    pub label: String,
}

impl EnumRange {
    fn overlaps(&self, low: i64, high: i64) -> bool {
        self.low <= high && low <= self.high
    }

    fn contains(&self, value: i64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// Accumulates enum ranges before the declaration is frozen.
///
/// Ranges may not overlap, except that re-inserting an identical
/// `[low, high] -> label` is accepted as a no-op. Distinct ranges may share a
/// label.
#[derive(Debug, Clone)]
pub struct EnumBuilder {
    container: IntegerDeclaration,
    ranges: Vec<EnumRange>,
}

impl EnumBuilder {
    pub fn new(container: IntegerDeclaration) -> Self {
        Self {
            container,
            ranges: Vec::new(),
        }
    }

    /// Inserts a range. Returns false, leaving the table untouched, if it
    /// overlaps an existing range that is not identical.
    pub fn add(&mut self, low: i64, high: i64, label: impl Into<String>) -> bool {
        self.try_add(low, high, label).is_ok()
    }

    pub fn try_add(
        &mut self,
        low: i64,
        high: i64,
        label: impl Into<String>,
    ) -> Result<&mut Self, BuildError> {
        let label = label.into();

        if self
            .ranges
            .iter()
            .any(|r| r.low == low && r.high == high && r.label == label)
        {
            return Ok(self);
        }

        if low > high || self.ranges.iter().any(|r| r.overlaps(low, high)) {
            debug!(low, high, label = %label, "rejected enum range");
            return Err(BuildError::OverlappingRange { low, high, label });
        }

        let index = self.ranges.partition_point(|r| r.low < low);
        self.ranges.insert(index, EnumRange { low, high, label });

        Ok(self)
    }

    /// Label lookup during the build phase, same semantics as [EnumDeclaration::query].
    pub fn query(&self, value: i64) -> Option<&str> {
        query(&self.ranges, value)
    }

    pub fn build(self) -> EnumDeclaration {
        EnumDeclaration {
            container: Arc::new(self.container),
            ranges: self.ranges,
        }
    }
}

fn query(ranges: &[EnumRange], value: i64) -> Option<&str> {
    let index = ranges.partition_point(|r| r.high < value);
    ranges
        .get(index)
        .filter(|r| r.contains(value))
        .map(|r| r.label.as_str())
}

/// Integer-backed enumeration with a frozen, sorted range table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumDeclaration {
    container: Arc<IntegerDeclaration>,
    ranges: Vec<EnumRange>,
}

impl EnumDeclaration {
    pub fn builder(container: IntegerDeclaration) -> EnumBuilder {
        EnumBuilder::new(container)
    }

    pub fn container(&self) -> &Arc<IntegerDeclaration> {
        &self.container
    }

    /// Ranges ordered by their lower bound.
    pub fn ranges(&self) -> &[EnumRange] {
        &self.ranges
    }

    pub fn alignment(&self) -> usize {
        self.container.alignment()
    }

    /// Label of the range containing `value`, if any.
    pub fn query(&self, value: i64) -> Option<&str> {
        query(&self.ranges, value)
    }

    /// Lowest value mapped to `label`.
    pub fn value_of(&self, label: &str) -> Option<i64> {
        self.ranges.iter().find(|r| r.label == label).map(|r| r.low)
    }

    /// Same container layout and the same range bounds; labels are ignored.
    pub fn is_binary_equivalent(&self, other: &EnumDeclaration) -> bool {
        self.container.is_binary_equivalent(&other.container)
            && self.ranges.len() == other.ranges.len()
            && self
                .ranges
                .iter()
                .zip(&other.ranges)
                .all(|(a, b)| a.low == b.low && a.high == b.high)
    }
}

impl fmt::Display for EnumDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[declaration] enum[container={}, ranges={{", self.container)?;
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "[{}, {}] -> {}", range.low, range.high, range.label)?;
        }
        f.write_str("}]")
    }
}

/// Decoded enum: the raw container value, labelled through its declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDefinition {
    declaration: Arc<EnumDeclaration>,
    integer: IntegerDefinition,
}

impl EnumDefinition {
    pub fn new(declaration: Arc<EnumDeclaration>, path: ScopePath, value: i64) -> Self {
        let integer = IntegerDefinition::new(declaration.container().clone(), path, value);

        Self {
            declaration,
            integer,
        }
    }

    pub(crate) fn decode<B: AsRef<[u8]>>(
        declaration: &Arc<EnumDeclaration>,
        cursor: &mut BitCursor<B>,
        path: ScopePath,
    ) -> Result<Self, ReadError> {
        let value = declaration.container().read(cursor)?;
        Ok(Self::new(declaration.clone(), path, value))
    }

    pub fn declaration(&self) -> &Arc<EnumDeclaration> {
        &self.declaration
    }

    pub fn path(&self) -> &ScopePath {
        self.integer.path()
    }

    pub fn name(&self) -> &str {
        self.integer.name()
    }

    pub fn integer(&self) -> &IntegerDefinition {
        &self.integer
    }

    pub fn value(&self) -> i64 {
        self.integer.value()
    }

    /// Resolved label; `None` when the value falls outside every range.
    pub fn label(&self) -> Option<&str> {
        self.declaration.query(self.value())
    }

    pub fn write<B: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        cursor: &mut BitCursor<B>,
    ) -> Result<(), WriteError> {
        self.integer.write(cursor)
    }
}

impl fmt::Display for EnumDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ value = {}, container = {} }}",
            self.label().unwrap_or("null"),
            self.integer
        )
    }
}
