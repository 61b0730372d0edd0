// Raw format version detection
// Two header conventions exist in the wild; everything downstream branches
// on this tag rather than re-inspecting header text.

use super::tokenizer::{HeaderError, Result};

/// Raw file format version.
///
/// V2 headers use `=` as the key/value delimiter and `NSubBursts` /
/// `N_ADC_SAMPLES` as the dimension keys.  V1 headers use `:` and
/// `SubBursts in burst` / `Samples`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    V1,
    V2,
}

impl FormatVersion {
    /// Classify a header from its raw lines (or its key set, on the
    /// container-to-raw path).
    ///
    /// The first line starting with a known sub-burst count key decides the
    /// version.  Pure and deterministic; no line order dependence beyond
    /// first match.  Fails with `UnsupportedFormatVersion` when neither
    /// convention is present.
    pub fn detect<I>(lines: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for line in lines {
            let line = line.as_ref();
            if line.starts_with(Self::V2.subbursts_key()) {
                return Ok(Self::V2);
            }
            if line.starts_with(Self::V1.subbursts_key()) {
                return Ok(Self::V1);
            }
        }

        Err(HeaderError::UnsupportedFormatVersion)
    }

    /// Key/value delimiter for header lines.
    pub fn delimiter(&self) -> char {
        match self {
            Self::V1 => ':',
            Self::V2 => '=',
        }
    }

    /// Header key holding the sub-burst count.
    pub fn subbursts_key(&self) -> &'static str {
        match self {
            Self::V1 => "SubBursts in burst",
            Self::V2 => "NSubBursts",
        }
    }

    /// Header key holding the per-sub-burst ADC sample count.
    pub fn samples_key(&self) -> &'static str {
        match self {
            Self::V1 => "Samples",
            Self::V2 => "N_ADC_SAMPLES",
        }
    }
}
