// Raw file container: an ordered sequence of bursts over one byte stream
// A single-burst file is the degenerate case; burst boundaries are found
// by successive header reads, each consuming exactly one burst's bytes.

use std::io::{BufRead, Write};

use thiserror::Error;

use crate::burst::{Burst, BurstError, DecodeMode, SubsetLimits};

/// Canonical raw file suffix.
pub const APRES_SUFFIX: &str = ".dat";

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Burst(#[from] BurstError),
}

pub type Result<T> = std::result::Result<T, FileError>;

/// Lazy forward-pass burst iterator.
///
/// Yields fully materialized bursts until the stream is exhausted.  A
/// fatal burst error ends iteration with that error; the sequence is
/// restartable only by reopening the stream.
pub struct BurstReader<R> {
    reader: R,
    mode: DecodeMode,
    done: bool,
}

impl<R: BufRead> BurstReader<R> {
    pub fn new(reader: R, mode: DecodeMode) -> Self {
        Self {
            reader,
            mode,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for BurstReader<R> {
    type Item = Result<Burst>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.fill_buf() {
            Ok(buf) if buf.is_empty() => {
                self.done = true;
                None
            }
            Ok(_) => match Burst::read(&mut self.reader, self.mode) {
                Ok(burst) => Some(Ok(burst)),
                Err(e) => {
                    self.done = true;
                    Some(Err(e.into()))
                }
            },
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

/// An ordered sequence of bursts backed by (or destined for) one raw file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApresFile {
    bursts: Vec<Burst>,
}

impl ApresFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bursts(bursts: Vec<Burst>) -> Self {
        Self { bursts }
    }

    /// Read every burst from the stream in a single forward pass.
    pub fn read<R: BufRead>(reader: R, mode: DecodeMode) -> Result<Self> {
        let mut bursts = Vec::new();

        for burst in BurstReader::new(reader, mode) {
            let burst = burst?;
            tracing::debug!(
                "read burst {}: {} elements",
                bursts.len(),
                burst.samples().len()
            );
            bursts.push(burst);
        }

        Ok(Self { bursts })
    }

    pub fn bursts(&self) -> &[Burst] {
        &self.bursts
    }

    pub fn push(&mut self, burst: Burst) {
        self.bursts.push(burst);
    }

    pub fn len(&self) -> usize {
        self.bursts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bursts.is_empty()
    }

    /// Serialize every burst in order: header text then payload bytes,
    /// with no separators beyond what the burst format itself defines.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        for burst in &self.bursts {
            burst.write(writer)?;
        }

        Ok(())
    }

    /// Serialize the first N bursts, each subset along the requested axes.
    ///
    /// Bursts untouched by the limits are written back verbatim, without
    /// re-encoding their headers.
    pub fn write_subset<W: Write>(&self, writer: &mut W, limits: &SubsetLimits) -> Result<()> {
        if limits.bursts == Some(0) {
            return Err(
                BurstError::InvalidSubsetRequest("burst limit must be at least 1".into()).into(),
            );
        }

        let count = limits.bursts.unwrap_or(self.bursts.len()).min(self.bursts.len());

        for burst in &self.bursts[..count] {
            if limits.burst_level_is_noop() {
                burst.write(writer)?;
            } else {
                burst.subset(limits)?.write(writer)?;
            }
        }

        Ok(())
    }
}
