// Burst header tokenizer
// A burst header is line-oriented Latin-1 text terminated by a sentinel
// line, immediately followed by the binary payload.

use std::io::BufRead;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use super::version::FormatVersion;

/// Marker text opening a burst's header block.  The embedded EOL means the
/// marker line is preceded by a blank line in the raw byte stream.
pub const HEADER_START_MARKER: &str = "\r\n*** Burst Header ***";

/// Marker text closing a burst's header block.
pub const HEADER_END_MARKER: &str = "\r\n*** End Header ***";

/// End-of-line sequence used when serializing header lines.
pub const HEADER_EOL: &str = "\r\n";

lazy_static! {
    /// Sentinel matched at line granularity.  Anchored to the line start so
    /// trailing whitespace or marker suffix variants cannot hide it.
    static ref END_OF_HEADER_RE: Regex = Regex::new(r"^\*\*\* End Header").unwrap();
}

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("end of header sentinel not found before end of stream")]
    MalformedHeader,

    #[error("header matches no known raw format version")]
    UnsupportedFormatVersion,

    #[error("character {0:?} cannot be encoded as Latin-1")]
    Unencodable(char),
}

pub type Result<T> = std::result::Result<T, HeaderError>;

/// Ordered key/value header map.
///
/// Insertion order is significant and preserved: the header must be
/// reconstructable in its original line order.  Updating an existing key
/// replaces its value in place without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    items: Vec<(String, String)>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse raw header lines into ordered key/value pairs.
    ///
    /// Each line is split on the first occurrence of the version delimiter;
    /// key and value are whitespace-trimmed.  Lines without the delimiter,
    /// or with an empty key, carry no pair (marker and blank lines fall out
    /// here naturally).
    pub fn parse(lines: &[String], version: FormatVersion) -> Self {
        let mut header = Header::new();

        for line in lines {
            if let Some((key, value)) = line.split_once(version.delimiter()) {
                let key = key.trim();
                if !key.is_empty() {
                    header.set(key, value.trim());
                }
            }
        }

        header
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a value, replacing in place if the key already exists.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.items.iter_mut().find(|(k, _)| k == key) {
            Some(item) => item.1 = value.to_string(),
            None => self.items.push((key.to_string(), value.to_string())),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Read raw header lines from a burst boundary up to and including the
/// sentinel line.
///
/// Returns the right-trimmed lines and the exact byte length consumed, so
/// the reader is left positioned on the first payload byte.  Fails with
/// `MalformedHeader` if the stream is exhausted before the sentinel.
pub fn read_header_lines<R: BufRead>(reader: &mut R) -> Result<(Vec<String>, u64)> {
    let mut lines = Vec::new();
    let mut consumed: u64 = 0;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Err(HeaderError::MalformedHeader);
        }
        consumed += n as u64;

        let line = latin1_to_string(&buf);
        let line = line.trim_end().to_string();
        let is_sentinel = END_OF_HEADER_RE.is_match(&line);
        lines.push(line);

        if is_sentinel {
            return Ok((lines, consumed));
        }
    }
}

/// Format a raw header line from a key and value, with the version's
/// delimiter and no padding.
pub fn format_header_line(key: &str, value: &str, version: FormatVersion) -> String {
    format!("{}{}{}", key, version.delimiter(), value)
}

/// Reconstruct raw header lines from a parsed header: start marker,
/// formatted key/value lines in header order, end marker.
pub fn reconstruct_header_lines(header: &Header, version: FormatVersion) -> Vec<String> {
    let mut lines = Vec::with_capacity(header.len() + 2);

    lines.push(HEADER_START_MARKER.to_string());
    for (key, value) in header.iter() {
        lines.push(format_header_line(key, value, version));
    }
    lines.push(HEADER_END_MARKER.to_string());

    lines
}

/// Decode Latin-1 bytes; every byte maps 1:1 to U+0000..U+00FF.
pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Encode a string as Latin-1 bytes.
pub fn string_to_latin1(s: &str) -> Result<Vec<u8>> {
    s.chars()
        .map(|c| {
            let code = c as u32;
            if code > 0xFF {
                Err(HeaderError::Unencodable(c))
            } else {
                Ok(code as u8)
            }
        })
        .collect()
}
