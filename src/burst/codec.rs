// Burst payload codec
// Decodes and encodes the binary payload: little-endian fixed-width
// elements, row-major, sub-burst slowest-varying, attenuator (when
// present) fastest-varying.

use std::fmt;
use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};

use super::shape::{DataShape, SampleType};
use super::{BurstError, Result};

/// Decode policy for payloads whose byte count disagrees with the header.
///
/// Threaded through every decode call explicitly, so the codec stays
/// reentrant and testable per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Any byte-count mismatch is a fatal error.
    Strict,
    /// Read the whole elements available, zero-pad the shortfall (or drop
    /// the surplus), and record a diagnostic on the burst.
    #[default]
    Forgiving,
}

/// Decoded payload elements.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Samples {
    U16(Vec<u16>),
    F32(Vec<f32>),
    U32(Vec<u32>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Self::U16(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            Self::U16(_) => SampleType::U16,
            Self::F32(_) => SampleType::F32,
            Self::U32(_) => SampleType::U32,
        }
    }

    /// Encode as little-endian bytes; the exact inverse of decoding.  The
    /// output length is always an exact multiple of the element width.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::U16(v) => {
                let mut buf = vec![0u8; v.len() * 2];
                LittleEndian::write_u16_into(v, &mut buf);
                buf
            }
            Self::F32(v) => {
                let mut buf = vec![0u8; v.len() * 4];
                LittleEndian::write_f32_into(v, &mut buf);
                buf
            }
            Self::U32(v) => {
                let mut buf = vec![0u8; v.len() * 4];
                LittleEndian::write_u32_into(v, &mut buf);
                buf
            }
        }
    }

    /// The element at a flat index, widened for display.
    pub fn value_at(&self, index: usize) -> f64 {
        match self {
            Self::U16(v) => f64::from(v[index]),
            Self::F32(v) => f64::from(v[index]),
            Self::U32(v) => f64::from(v[index]),
        }
    }

    /// Leading slice along each axis of a (sub-burst, sample, attenuator)
    /// payload.  `shape` gives the current extents, `take` the extents to
    /// keep; both use an attenuator extent of 1 when that dimension is
    /// absent.
    pub(crate) fn slice_leading(
        &self,
        shape: (usize, usize, usize),
        take: (usize, usize, usize),
    ) -> Samples {
        match self {
            Self::U16(v) => Self::U16(slice_leading(v, shape, take)),
            Self::F32(v) => Self::F32(slice_leading(v, shape, take)),
            Self::U32(v) => Self::U32(slice_leading(v, shape, take)),
        }
    }
}

fn slice_leading<T: Copy>(
    data: &[T],
    shape: (usize, usize, usize),
    take: (usize, usize, usize),
) -> Vec<T> {
    let (_, samples, attenuators) = shape;
    let (take_sub, take_samp, take_att) = take;

    let mut out = Vec::with_capacity(take_sub * take_samp * take_att);
    for s in 0..take_sub {
        for j in 0..take_samp {
            for k in 0..take_att {
                out.push(data[(s * samples + j) * attenuators + k]);
            }
        }
    }

    out
}

/// Non-fatal record of a forgiving-mode byte-count mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDiagnostic {
    /// Element count the header called for.
    pub expected_elements: usize,
    /// Whole elements actually present in the stream.
    pub actual_elements: usize,
    /// Bytes left over after the last whole element.
    pub trailing_bytes: usize,
}

impl fmt::Display for PayloadDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "payload has {} of {} expected elements ({} trailing bytes)",
            self.actual_elements, self.expected_elements, self.trailing_bytes
        )
    }
}

/// Decode a payload from a reader.
///
/// Reads exactly the byte length the shape calls for, or as much as the
/// stream holds.  A shortfall is fatal in strict mode; in forgiving mode
/// the missing elements are zero-padded and the shortfall is reported as a
/// diagnostic.
pub fn decode<R: Read>(
    reader: &mut R,
    shape: &DataShape,
    mode: DecodeMode,
) -> Result<(Samples, Option<PayloadDiagnostic>)> {
    let expected = shape.byte_len();
    let mut buf = vec![0u8; expected];
    let actual = read_full(reader, &mut buf)?;

    if actual < expected && mode == DecodeMode::Strict {
        return Err(BurstError::TruncatedPayload { expected, actual });
    }

    decode_bytes(&buf[..actual], shape, mode)
}

/// Decode a payload from an in-memory buffer.
///
/// Same policy as `decode`, and additionally handles a buffer longer than
/// the shape: fatal in strict mode, truncated with a diagnostic in
/// forgiving mode.
pub fn decode_bytes(
    bytes: &[u8],
    shape: &DataShape,
    mode: DecodeMode,
) -> Result<(Samples, Option<PayloadDiagnostic>)> {
    let expected_elements = shape.element_count();
    let width = shape.sample_type().width();
    let expected_bytes = expected_elements * width;

    if bytes.len() != expected_bytes && mode == DecodeMode::Strict {
        return Err(BurstError::TruncatedPayload {
            expected: expected_bytes,
            actual: bytes.len(),
        });
    }

    let actual_elements = bytes.len() / width;
    let used = actual_elements.min(expected_elements);

    let samples = match shape.sample_type() {
        SampleType::U16 => {
            let mut v = vec![0u16; expected_elements];
            LittleEndian::read_u16_into(&bytes[..used * 2], &mut v[..used]);
            Samples::U16(v)
        }
        SampleType::F32 => {
            let mut v = vec![0f32; expected_elements];
            LittleEndian::read_f32_into(&bytes[..used * 4], &mut v[..used]);
            Samples::F32(v)
        }
        SampleType::U32 => {
            let mut v = vec![0u32; expected_elements];
            LittleEndian::read_u32_into(&bytes[..used * 4], &mut v[..used]);
            Samples::U32(v)
        }
    };

    let diagnostic = if bytes.len() != expected_bytes {
        let diagnostic = PayloadDiagnostic {
            expected_elements,
            actual_elements,
            trailing_bytes: bytes.len() % width,
        };
        tracing::warn!("{}", diagnostic);
        Some(diagnostic)
    } else {
        None
    };

    Ok((samples, diagnostic))
}

/// Read until the buffer is full or the stream ends; returns bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{FormatVersion, Header};
    use std::io::Cursor;

    fn shape(lines: &[&str]) -> DataShape {
        let lines: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        let header = Header::parse(&lines, FormatVersion::V2);
        DataShape::resolve(&header, FormatVersion::V2).unwrap()
    }

    fn u16_bytes(values: &[u16]) -> Vec<u8> {
        let mut buf = vec![0u8; values.len() * 2];
        LittleEndian::write_u16_into(values, &mut buf);
        buf
    }

    #[test]
    fn test_decode_exact() {
        let shape = shape(&["NSubBursts=2", "N_ADC_SAMPLES=3", "Average=0"]);
        let bytes = u16_bytes(&[1, 2, 3, 4, 5, 6]);

        let (samples, diagnostic) =
            decode(&mut Cursor::new(bytes), &shape, DecodeMode::Strict).unwrap();

        assert_eq!(Samples::U16(vec![1, 2, 3, 4, 5, 6]), samples);
        assert!(diagnostic.is_none());
    }

    #[test]
    fn test_decode_little_endian_golden() {
        // 0x0201 and 0x0403 as raw LE bytes
        let shape = shape(&["NSubBursts=1", "N_ADC_SAMPLES=2", "Average=0"]);
        let bytes = vec![0x01, 0x02, 0x03, 0x04];

        let (samples, _) = decode(&mut Cursor::new(bytes), &shape, DecodeMode::Strict).unwrap();
        assert_eq!(Samples::U16(vec![0x0201, 0x0403]), samples);
    }

    #[test]
    fn test_decode_attenuator_interleave_golden() {
        // 1 sub-burst, 2 samples, 2 attenuators; the stream interleaves
        // attenuator settings within each sample group: s0a0 s0a1 s1a0 s1a1
        let shape = shape(&[
            "NSubBursts=1",
            "N_ADC_SAMPLES=2",
            "Average=0",
            "nAttenuators=2",
        ]);
        let bytes = u16_bytes(&[10, 11, 20, 21]);

        let (samples, _) = decode(&mut Cursor::new(bytes), &shape, DecodeMode::Strict).unwrap();
        let Samples::U16(v) = &samples else {
            panic!("expected u16 samples")
        };

        // [sample][attenuator] indexing over the flat row-major layout
        assert_eq!(10, v[0 * 2 + 0]);
        assert_eq!(11, v[0 * 2 + 1]);
        assert_eq!(20, v[1 * 2 + 0]);
        assert_eq!(21, v[1 * 2 + 1]);
    }

    #[test]
    fn test_decode_truncated_strict() {
        let shape = shape(&["NSubBursts=2", "N_ADC_SAMPLES=3", "Average=0"]);
        let bytes = u16_bytes(&[1, 2, 3]);

        assert!(matches!(
            decode(&mut Cursor::new(bytes), &shape, DecodeMode::Strict),
            Err(BurstError::TruncatedPayload {
                expected: 12,
                actual: 6
            })
        ));
    }

    #[test]
    fn test_decode_truncated_forgiving_pads_with_zeros() {
        let shape = shape(&["NSubBursts=2", "N_ADC_SAMPLES=3", "Average=0"]);
        let bytes = u16_bytes(&[1, 2, 3]);

        let (samples, diagnostic) =
            decode(&mut Cursor::new(bytes), &shape, DecodeMode::Forgiving).unwrap();

        assert_eq!(Samples::U16(vec![1, 2, 3, 0, 0, 0]), samples);
        let diagnostic = diagnostic.unwrap();
        assert_eq!(6, diagnostic.expected_elements);
        assert_eq!(3, diagnostic.actual_elements);
        assert_eq!(0, diagnostic.trailing_bytes);
    }

    #[test]
    fn test_decode_partial_element_forgiving() {
        let shape = shape(&["NSubBursts=1", "N_ADC_SAMPLES=3", "Average=0"]);
        let mut bytes = u16_bytes(&[7]);
        bytes.push(0xFF); // half an element

        let (samples, diagnostic) =
            decode(&mut Cursor::new(bytes), &shape, DecodeMode::Forgiving).unwrap();

        assert_eq!(Samples::U16(vec![7, 0, 0]), samples);
        assert_eq!(1, diagnostic.unwrap().trailing_bytes);
    }

    #[test]
    fn test_decode_bytes_surplus_strict() {
        let shape = shape(&["NSubBursts=1", "N_ADC_SAMPLES=2", "Average=0"]);
        let bytes = u16_bytes(&[1, 2, 3]);

        assert!(matches!(
            decode_bytes(&bytes, &shape, DecodeMode::Strict),
            Err(BurstError::TruncatedPayload {
                expected: 4,
                actual: 6
            })
        ));
    }

    #[test]
    fn test_decode_bytes_surplus_forgiving_truncates() {
        let shape = shape(&["NSubBursts=1", "N_ADC_SAMPLES=2", "Average=0"]);
        let bytes = u16_bytes(&[1, 2, 3]);

        let (samples, diagnostic) =
            decode_bytes(&bytes, &shape, DecodeMode::Forgiving).unwrap();

        assert_eq!(Samples::U16(vec![1, 2]), samples);
        assert_eq!(3, diagnostic.unwrap().actual_elements);
    }

    #[test]
    fn test_decode_f32_round_trip() {
        let shape = shape(&["NSubBursts=4", "N_ADC_SAMPLES=2", "Average=1"]);
        // Averaged: effective sub-burst extent 1, so 2 elements
        let original = Samples::F32(vec![1.5, -2.25]);
        let bytes = original.to_bytes();

        let (samples, diagnostic) =
            decode(&mut Cursor::new(bytes), &shape, DecodeMode::Strict).unwrap();

        assert_eq!(original, samples);
        assert!(diagnostic.is_none());
    }

    #[test]
    fn test_decode_u32_stacked() {
        let shape = shape(&["NSubBursts=4", "N_ADC_SAMPLES=3", "Average=2"]);
        let original = Samples::U32(vec![70000, 0, u32::MAX]);
        let bytes = original.to_bytes();

        let (samples, _) = decode(&mut Cursor::new(bytes), &shape, DecodeMode::Strict).unwrap();
        assert_eq!(original, samples);
    }

    #[test]
    fn test_encode_is_exact_inverse() {
        let shape = shape(&["NSubBursts=2", "N_ADC_SAMPLES=5", "Average=0"]);
        let bytes = u16_bytes(&[9, 8, 7, 6, 5, 4, 3, 2, 1, 0]);

        let (samples, _) =
            decode(&mut Cursor::new(bytes.clone()), &shape, DecodeMode::Strict).unwrap();
        assert_eq!(bytes, samples.to_bytes());
    }

    #[test]
    fn test_attenuator_fixed_point() {
        // 1 sub-burst, 5 samples, 3 attenuators: 15 elements, 30 bytes
        let shape = shape(&[
            "NSubBursts=1",
            "N_ADC_SAMPLES=5",
            "Average=0",
            "nAttenuators=3",
        ]);
        assert_eq!(15, shape.element_count());

        let values: Vec<u16> = (0..15).collect();
        let bytes = u16_bytes(&values);
        assert_eq!(30, bytes.len());

        let (samples, _) =
            decode(&mut Cursor::new(bytes.clone()), &shape, DecodeMode::Strict).unwrap();
        assert_eq!(bytes, samples.to_bytes());
    }

    #[test]
    fn test_slice_leading() {
        // 2 sub-bursts x 3 samples x 2 attenuators
        let data: Vec<u16> = (0..12).collect();
        let samples = Samples::U16(data);

        let sliced = samples.slice_leading((2, 3, 2), (1, 2, 1));
        // sub-burst 0, samples 0..2, attenuator 0: indices 0 and 2
        assert_eq!(Samples::U16(vec![0, 2]), sliced);
    }

    #[test]
    fn test_slice_leading_full_is_identity() {
        let data: Vec<u16> = (0..12).collect();
        let samples = Samples::U16(data.clone());

        let sliced = samples.slice_leading((2, 3, 2), (2, 3, 2));
        assert_eq!(Samples::U16(data), sliced);
    }
}
