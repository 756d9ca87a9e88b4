//! Wire layout options shared by every declaration kind.

use std::fmt;

/// Byte order of a multi-byte field.
///
/// Big-endian fields consume bits MSB-first within each byte; little-endian
/// fields consume bits LSB-first, so an aligned little-endian field assembles
/// its bytes in reverse order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::BigEndian => f.write_str("be"),
            ByteOrder::LittleEndian => f.write_str("le"),
        }
    }
}

/// Character encoding of strings and character-valued integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Encoding {
    #[default]
    Utf8,
    /// Bytes above 0x7F decode to U+FFFD.
    Ascii,
    /// Plain bytes, not a character type.
    None,
}

impl Encoding {
    /// Decodes `bytes` into text; invalid sequences are replaced rather than rejected.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { '\u{FFFD}' })
                .collect(),
            Encoding::Utf8 | Encoding::None => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Utf8 => f.write_str("UTF8"),
            Encoding::Ascii => f.write_str("ASCII"),
            Encoding::None => f.write_str("NONE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_replaces_high_bytes() {
        assert_eq!(Encoding::Ascii.decode(b"ab\xffc"), "ab\u{FFFD}c");
    }

    #[test]
    fn test_utf8_decode() {
        assert_eq!(Encoding::Utf8.decode("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn test_encoding_display() {
        assert_eq!(Encoding::Ascii.to_string(), "ASCII");
        assert_eq!(ByteOrder::LittleEndian.to_string(), "le");
    }
}
