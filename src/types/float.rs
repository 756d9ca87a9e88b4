use std::{fmt, sync::Arc};

use crate::{
    bit_cursor::BitCursor,
    errors::{BuildError, ReadError, WriteError},
    layout::ByteOrder,
    scope::ScopePath,
};

/// Floating point type described by its exponent and mantissa widths.
/// The mantissa width includes the implicit leading bit, so IEEE-754 binary32
/// is 8/24 and binary64 is 11/53.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FloatDeclaration {
    exponent: usize,
    mantissa: usize,
    byte_order: ByteOrder,
    alignment: usize,
}

impl FloatDeclaration {
    pub fn new(
        exponent: usize,
        mantissa: usize,
        byte_order: ByteOrder,
        alignment: usize,
    ) -> Result<Self, BuildError> {
        if exponent < 2 || mantissa == 0 || exponent + mantissa > 64 {
            return Err(BuildError::InvalidFloatLayout);
        }

        Ok(Self {
            exponent,
            mantissa,
            byte_order,
            alignment,
        })
    }

    pub fn binary32(byte_order: ByteOrder) -> Self {
        Self {
            exponent: 8,
            mantissa: 24,
            byte_order,
            alignment: 8,
        }
    }

    pub fn binary64(byte_order: ByteOrder) -> Self {
        Self {
            exponent: 11,
            mantissa: 53,
            byte_order,
            alignment: 8,
        }
    }

    pub fn exponent(&self) -> usize {
        self.exponent
    }

    pub fn mantissa(&self) -> usize {
        self.mantissa
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Total width on the wire.
    pub fn length(&self) -> usize {
        self.exponent + self.mantissa
    }

    pub fn read<B: AsRef<[u8]>>(&self, cursor: &mut BitCursor<B>) -> Result<f64, ReadError> {
        cursor.align_to(self.alignment);
        let raw = cursor.read_bits(self.length(), self.byte_order)?;

        Ok(match (self.exponent, self.mantissa) {
            (8, 24) => f32::from_bits(raw as u32) as f64,
            (11, 53) => f64::from_bits(raw),
            _ => self.evaluate(raw),
        })
    }

    /// Only the IEEE-754 binary32 and binary64 layouts can be written.
    pub fn write<B: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        cursor: &mut BitCursor<B>,
        value: f64,
    ) -> Result<(), WriteError> {
        match (self.exponent, self.mantissa) {
            (8, 24) => {
                cursor.align_to(self.alignment);
                cursor.write_f32(value as f32, self.byte_order)
            }
            (11, 53) => {
                cursor.align_to(self.alignment);
                cursor.write_f64(value, self.byte_order)
            }
            _ => Err(WriteError::InvalidValue),
        }
    }

    fn evaluate(&self, raw: u64) -> f64 {
        let fraction_bits = self.mantissa - 1;
        let negative = (raw >> (self.length() - 1)) & 1 == 1;
        let exponent_max = (1u64 << self.exponent) - 1;
        let biased = (raw >> fraction_bits) & exponent_max;
        let fraction = raw & ((1u64 << fraction_bits) - 1);
        let bias = (1i64 << (self.exponent - 1)) - 1;
        let scale = 2f64.powi(fraction_bits as i32);

        let magnitude = if biased == exponent_max {
            if fraction == 0 { f64::INFINITY } else { f64::NAN }
        } else if biased == 0 {
            (fraction as f64 / scale) * 2f64.powi((1 - bias) as i32)
        } else {
            (1.0 + fraction as f64 / scale) * 2f64.powi((biased as i64 - bias) as i32)
        };

        if negative { -magnitude } else { magnitude }
    }

    pub fn is_binary_equivalent(&self, other: &FloatDeclaration) -> bool {
        self == other
    }
}

impl fmt::Display for FloatDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[declaration] float[exponent={}, mantissa={}, byte_order={}, alignment={}]",
            self.exponent, self.mantissa, self.byte_order, self.alignment
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatDefinition {
    declaration: Arc<FloatDeclaration>,
    path: ScopePath,
    value: f64,
}

impl FloatDefinition {
    pub fn new(declaration: Arc<FloatDeclaration>, path: ScopePath, value: f64) -> Self {
        Self {
            declaration,
            path,
            value,
        }
    }

    pub(crate) fn decode<B: AsRef<[u8]>>(
        declaration: &Arc<FloatDeclaration>,
        cursor: &mut BitCursor<B>,
        path: ScopePath,
    ) -> Result<Self, ReadError> {
        let value = declaration.read(cursor)?;
        Ok(Self::new(declaration.clone(), path, value))
    }

    pub fn declaration(&self) -> &Arc<FloatDeclaration> {
        &self.declaration
    }

    pub fn path(&self) -> &ScopePath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn write<B: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        cursor: &mut BitCursor<B>,
    ) -> Result<(), WriteError> {
        self.declaration.write(cursor, self.value)
    }
}

impl fmt::Display for FloatDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
