// Payload geometry resolution
// Computes the payload's logical shape and element type from header text
// alone; payload bytes are never consulted.

use super::{BurstError, Result};
use crate::header::{FormatVersion, Header};

/// Header key whose value selects the averaging/stacking configuration,
/// and with it the payload element type.
pub const AVERAGE_KEY: &str = "Average";

/// Optional header key declaring the number of attenuator settings cycled
/// during acquisition.
pub const ATTENUATORS_KEY: &str = "nAttenuators";

/// Payload element type, keyed off the `Average` header value.
///
/// * `Average = 0`: all sub-bursts as raw 16-bit ADC words
/// * `Average = 1`: sub-bursts averaged to 32-bit floats
/// * `Average = 2`: sub-bursts stacked to 32-bit integers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U16,
    F32,
    U32,
}

impl SampleType {
    pub fn from_average(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Self::U16),
            1 => Ok(Self::F32),
            2 => Ok(Self::U32),
            other => Err(BurstError::UnsupportedAveraging(other)),
        }
    }

    /// Element width in bytes.
    pub fn width(&self) -> usize {
        match self {
            Self::U16 => 2,
            Self::F32 | Self::U32 => 4,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::U16 => "u16",
            Self::F32 => "f32",
            Self::U32 => "u32",
        }
    }
}

/// Resolved payload shape: ordered (dimension-key, extent) pairs plus the
/// element type and averaging state.
///
/// Dimension order is fixed: sub-burst (slowest), sample, then attenuator
/// (fastest) when more than one attenuator setting is in use.  The list is
/// variable-length so further optional dimensions can be added without
/// changing call signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataShape {
    dims: Vec<(String, usize)>,
    sample_type: SampleType,
    averaged: bool,
    declared_subbursts: usize,
}

impl DataShape {
    /// Resolve the shape from a parsed header.
    ///
    /// The sub-burst and sample counts are mandatory; a nonzero `Average`
    /// collapses the effective sub-burst extent to 1 (the data were
    /// aggregated on the instrument) while the header's declared count is
    /// retained verbatim.  An attenuator extent > 1 appends a third
    /// dimension; an extent of 1, an absent key, or a non-integer value
    /// adds no dimension.
    pub fn resolve(header: &Header, version: FormatVersion) -> Result<Self> {
        let declared_subbursts = require_extent(header, version.subbursts_key())?;
        let samples = require_extent(header, version.samples_key())?;

        let average = match header.get(AVERAGE_KEY) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| BurstError::InvalidDimensionValue {
                    key: AVERAGE_KEY.to_string(),
                    value: raw.to_string(),
                })?,
            None => 0,
        };
        let sample_type = SampleType::from_average(average)?;
        let averaged = average != 0;

        let subbursts = if averaged { 1 } else { declared_subbursts };
        let mut dims = vec![
            (version.subbursts_key().to_string(), subbursts),
            (version.samples_key().to_string(), samples),
        ];

        if let Some(raw) = header.get(ATTENUATORS_KEY) {
            match raw.parse::<usize>() {
                Ok(n) if n > 1 => dims.push((ATTENUATORS_KEY.to_string(), n)),
                Ok(_) => {}
                Err(_) => {
                    tracing::warn!(
                        "header key {} has non-integer value {:?}, cannot be used as a dimension",
                        ATTENUATORS_KEY,
                        raw
                    );
                }
            }
        }

        Ok(Self {
            dims,
            sample_type,
            averaged,
            declared_subbursts,
        })
    }

    /// Ordered (dimension-key, extent) pairs.
    pub fn dims(&self) -> &[(String, usize)] {
        &self.dims
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    pub fn averaged(&self) -> bool {
        self.averaged
    }

    /// The sub-burst count as declared in the header, unaffected by
    /// averaging.
    pub fn declared_subbursts(&self) -> usize {
        self.declared_subbursts
    }

    /// Effective sub-burst extent of the payload.
    pub fn subbursts(&self) -> usize {
        self.dims[0].1
    }

    pub fn samples(&self) -> usize {
        self.dims[1].1
    }

    /// Attenuator extent; 1 when no attenuator dimension exists.
    pub fn attenuators(&self) -> usize {
        self.dims.get(2).map_or(1, |d| d.1)
    }

    /// Total payload element count: the product of all extents.
    pub fn element_count(&self) -> usize {
        self.dims.iter().map(|(_, n)| n).product()
    }

    /// Total payload byte length.
    pub fn byte_len(&self) -> usize {
        self.element_count() * self.sample_type.width()
    }
}

fn require_extent(header: &Header, key: &str) -> Result<usize> {
    let raw = header
        .get(key)
        .ok_or_else(|| BurstError::MissingDimension(key.to_string()))?;

    raw.parse::<usize>()
        .map_err(|_| BurstError::InvalidDimensionValue {
            key: key.to_string(),
            value: raw.to_string(),
        })
}
