//! Limits applied while decoding untrusted trace data.

/// Bounds for values whose size is only known at decode time.
///
/// ```
/// use ctfcore::config::DecodeConfig;
///
/// let cfg = DecodeConfig::default().with_max_sequence_length(64);
/// assert!(cfg.allows_sequence_length(64));
/// assert!(!cfg.allows_sequence_length(65));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecodeConfig {
    /// Largest element count a sequence may resolve to.
    pub max_sequence_length: usize,
    /// Largest number of bytes read for one string, terminator excluded.
    /// `None` reads up to the end of the region.
    pub max_string_length: Option<usize>,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_sequence_length: 1 << 20,
            max_string_length: None,
        }
    }
}

impl DecodeConfig {
    pub fn with_max_sequence_length(mut self, max: usize) -> Self {
        self.max_sequence_length = max;
        self
    }

    pub fn with_max_string_length(mut self, max: usize) -> Self {
        self.max_string_length = Some(max);
        self
    }

    pub fn allows_sequence_length(&self, length: usize) -> bool {
        length <= self.max_sequence_length
    }
}
