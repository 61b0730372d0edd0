// Burst record: one acquisition's header plus decoded payload

use std::io::{BufRead, Write};

use super::codec::{self, DecodeMode, PayloadDiagnostic, Samples};
use super::shape::DataShape;
use super::{BurstError, Result};
use crate::header::{
    format_header_line, read_header_lines, reconstruct_header_lines, string_to_latin1,
    FormatVersion, Header, HEADER_EOL,
};

/// Subset selection: keep the first N along each axis.  `None` leaves an
/// axis untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubsetLimits {
    pub bursts: Option<usize>,
    pub subbursts: Option<usize>,
    pub samples: Option<usize>,
    pub attenuators: Option<usize>,
}

impl SubsetLimits {
    /// True when no per-burst axis is limited (the burst can be written
    /// back verbatim).
    pub fn burst_level_is_noop(&self) -> bool {
        self.subbursts.is_none() && self.samples.is_none() && self.attenuators.is_none()
    }
}

/// One logical acquisition unit: an ordered header plus a shaped binary
/// payload.
///
/// A burst is immutable once parsed; `subset` produces a new burst rather
/// than mutating.  The raw header lines are retained verbatim so that
/// rewriting a burst that was not subset reproduces its header bytes
/// exactly, whitespace included.
#[derive(Debug, Clone, PartialEq)]
pub struct Burst {
    version: FormatVersion,
    header_lines: Vec<String>,
    header: Header,
    shape: DataShape,
    samples: Samples,
    diagnostic: Option<PayloadDiagnostic>,
}

impl Burst {
    /// Read one burst from the current stream position: header lines up to
    /// the sentinel, then the payload bytes the header calls for.  Leaves
    /// the reader at the next burst boundary (or end of stream).
    pub fn read<R: BufRead>(reader: &mut R, mode: DecodeMode) -> Result<Self> {
        let (header_lines, _header_len) = read_header_lines(reader)?;
        let version = FormatVersion::detect(&header_lines)?;
        let header = Header::parse(&header_lines, version);
        let shape = DataShape::resolve(&header, version)?;
        let (samples, diagnostic) = codec::decode(reader, &shape, mode)?;

        Ok(Self {
            version,
            header_lines,
            header,
            shape,
            samples,
            diagnostic,
        })
    }

    /// Build a burst from a parsed header and payload (the container-to-raw
    /// path).  The format version is re-detected from the header's key set
    /// and the raw header lines are reconstructed with that version's
    /// delimiter.
    pub fn from_header_and_samples(header: Header, samples: Samples) -> Result<Self> {
        let version = FormatVersion::detect(header.keys())?;
        let header_lines = reconstruct_header_lines(&header, version);
        let shape = DataShape::resolve(&header, version)?;

        if samples.sample_type() != shape.sample_type() {
            return Err(BurstError::SampleTypeMismatch {
                expected: shape.sample_type(),
                found: samples.sample_type(),
            });
        }
        if samples.len() != shape.element_count() {
            let width = shape.sample_type().width();
            return Err(BurstError::TruncatedPayload {
                expected: shape.byte_len(),
                actual: samples.len() * width,
            });
        }

        Ok(Self {
            version,
            header_lines,
            header,
            shape,
            samples,
            diagnostic: None,
        })
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// Raw header lines, right-trimmed, marker and blank lines included.
    pub fn header_lines(&self) -> &[String] {
        &self.header_lines
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn shape(&self) -> &DataShape {
        &self.shape
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Forgiving-mode byte-count mismatch, if one was recorded.
    pub fn diagnostic(&self) -> Option<&PayloadDiagnostic> {
        self.diagnostic.as_ref()
    }

    /// Serialize the header: each raw line followed by the format's EOL.
    pub fn write_header<W: Write>(&self, writer: &mut W) -> Result<()> {
        for line in &self.header_lines {
            writer.write_all(&string_to_latin1(line)?)?;
            writer.write_all(HEADER_EOL.as_bytes())?;
        }

        Ok(())
    }

    /// Serialize the payload as little-endian bytes.
    pub fn write_data<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.samples.to_bytes())?;
        Ok(())
    }

    /// Serialize the whole burst: header text immediately followed by the
    /// binary payload, no framing between them.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.write_header(writer)?;
        self.write_data(writer)
    }

    /// Produce a new burst keeping the first N sub-bursts, samples and/or
    /// attenuator settings.
    ///
    /// Requests above an axis extent clamp to it; requests below 1 are
    /// rejected before any data is touched.  Count fields for the subset
    /// axes are rewritten in both the raw header lines and the parsed
    /// header; every other line is carried verbatim, order preserved.
    pub fn subset(&self, limits: &SubsetLimits) -> Result<Burst> {
        for (name, requested) in [
            ("subbursts", limits.subbursts),
            ("samples", limits.samples),
            ("attenuators", limits.attenuators),
        ] {
            if requested == Some(0) {
                return Err(BurstError::InvalidSubsetRequest(format!(
                    "{} limit must be at least 1",
                    name
                )));
            }
        }

        let current = (
            self.shape.subbursts(),
            self.shape.samples(),
            self.shape.attenuators(),
        );
        let take = (
            limits.subbursts.unwrap_or(current.0).min(current.0),
            limits.samples.unwrap_or(current.1).min(current.1),
            limits.attenuators.unwrap_or(current.2).min(current.2),
        );

        let samples = self.samples.slice_leading(current, take);

        let mut header_lines = self.header_lines.clone();
        let mut header = self.header.clone();

        // An averaged burst's payload already has a single sub-burst row;
        // its declared count stays verbatim.
        if limits.subbursts.is_some() && !self.shape.averaged() {
            self.rewrite_count(&mut header_lines, &mut header, self.version.subbursts_key(), take.0);
        }
        if limits.samples.is_some() {
            self.rewrite_count(&mut header_lines, &mut header, self.version.samples_key(), take.1);
        }
        if limits.attenuators.is_some() && self.shape.attenuators() > 1 {
            self.rewrite_count(&mut header_lines, &mut header, super::ATTENUATORS_KEY, take.2);
        }

        let shape = DataShape::resolve(&header, self.version)?;
        debug_assert_eq!(shape.element_count(), samples.len());

        Ok(Burst {
            version: self.version,
            header_lines,
            header,
            shape,
            samples,
            diagnostic: self.diagnostic.clone(),
        })
    }

    /// Rewrite a count field in the raw lines (matching on the exact parsed
    /// key, not a line prefix) and in the parsed header.
    fn rewrite_count(
        &self,
        header_lines: &mut [String],
        header: &mut Header,
        key: &str,
        value: usize,
    ) {
        let value = value.to_string();

        for line in header_lines.iter_mut() {
            if let Some((line_key, _)) = line.split_once(self.version.delimiter()) {
                if line_key.trim() == key {
                    *line = format_header_line(key, &value, self.version);
                }
            }
        }

        header.set(key, &value);
    }
}
