// Bridge between raw bursts and the hierarchical container representation
// Forward: header pairs become string attributes, the payload becomes a
// dimensioned array variable.  Reverse: attributes are read back into an
// ordered header, the version re-detected from its key set, and the raw
// bytes reassembled.

use super::dataset::{Attribute, Dataset, Scope, Variable};
use super::{ContainerError, Result};
use crate::burst::Burst;
use crate::file::ApresFile;
use crate::header::Header;

/// Name of the array variable holding a burst's payload.
pub const DATA_VARIABLE: &str = "data";

/// Root attribute recording the converting command line; never part of a
/// burst's header.
pub const HISTORY_ATTR: &str = "history";

/// Group name prefix for multi-burst files (`burst0`, `burst1`, ...).
pub const GROUP_PREFIX: &str = "burst";

const DATA_UNITS: &str = "1";
const DATA_LONG_NAME: &str = "Sub Burst ADC Samples";

/// Map one burst into a container scope: every header pair as a string
/// attribute in header order, then the payload as the `data` variable with
/// the resolved dimension names and extents.
pub fn burst_to_scope(burst: &Burst, scope: &mut Scope) -> Result<()> {
    for (key, value) in burst.header().iter() {
        scope.set_attribute(key, value);
    }

    for (name, len) in burst.shape().dims() {
        scope.define_dimension(name, *len)?;
    }

    scope.add_variable(Variable {
        name: DATA_VARIABLE.to_string(),
        dimensions: burst.shape().dims().iter().map(|(n, _)| n.clone()).collect(),
        attributes: vec![
            Attribute {
                name: "units".to_string(),
                value: DATA_UNITS.to_string(),
            },
            Attribute {
                name: "long_name".to_string(),
                value: DATA_LONG_NAME.to_string(),
            },
        ],
        data: burst.samples().clone(),
    })?;

    Ok(())
}

/// Map a container scope back to a burst.
///
/// Attributes are read into an ordered header (the `history` attribute is
/// not a header field and is skipped); the format version is re-detected
/// from the key set so the header lines are reconstructed with the right
/// delimiter.
pub fn scope_to_burst(scope: &Scope, scope_name: &str) -> Result<Burst> {
    let variable = scope
        .variable(DATA_VARIABLE)
        .ok_or_else(|| ContainerError::MissingVariable {
            scope: scope_name.to_string(),
        })?;

    let mut header = Header::new();
    for attr in &scope.attributes {
        if attr.name == HISTORY_ATTR {
            continue;
        }
        header.set(&attr.name, &attr.value);
    }

    Ok(Burst::from_header_and_samples(header, variable.data.clone())?)
}

/// Map a whole raw file to a dataset.
///
/// A single-burst file maps onto the root scope; a timeseries maps each
/// burst to its own `burst{i}` group.  An optional history string is
/// recorded as a root attribute.
pub fn file_to_dataset(file: &ApresFile, history: Option<&str>) -> Result<Dataset> {
    let mut dataset = Dataset::new();

    if let Some(history) = history {
        dataset.root.set_attribute(HISTORY_ATTR, history);
    }

    if file.len() == 1 {
        burst_to_scope(&file.bursts()[0], &mut dataset.root)?;
    } else {
        for (i, burst) in file.bursts().iter().enumerate() {
            let group = dataset.create_group(&format!("{}{}", GROUP_PREFIX, i));
            burst_to_scope(burst, &mut group.scope)?;
        }
    }

    Ok(dataset)
}

/// Map a dataset back to a raw file: one burst per group in group order,
/// or a single burst from the root scope when no groups exist.
pub fn dataset_to_file(dataset: &Dataset) -> Result<ApresFile> {
    let mut file = ApresFile::new();

    if dataset.groups.is_empty() {
        file.push(scope_to_burst(&dataset.root, "root")?);
    } else {
        for group in &dataset.groups {
            file.push(scope_to_burst(&group.scope, &group.name)?);
        }
    }

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::burst::DecodeMode;
    use byteorder::{ByteOrder, LittleEndian};
    use std::io::Cursor;

    fn v2_burst_bytes(nsub: usize, nsamp: usize, extra_lines: &[&str], seed: u16) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"\r\n*** Burst Header ***\r\n");
        raw.extend_from_slice(format!("Time stamp=2019-12-25 03:26:{:02}\r\n", seed).as_bytes());
        raw.extend_from_slice(format!("NSubBursts={}\r\n", nsub).as_bytes());
        raw.extend_from_slice(b"Average=0\r\n");
        raw.extend_from_slice(format!("N_ADC_SAMPLES={}\r\n", nsamp).as_bytes());
        for line in extra_lines {
            raw.extend_from_slice(line.as_bytes());
            raw.extend_from_slice(b"\r\n");
        }
        raw.extend_from_slice(b"\r\n*** End Header ***\r\n");

        let count = nsub
            * nsamp
            * extra_lines
                .iter()
                .find_map(|l| l.strip_prefix("nAttenuators="))
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|&n| n > 1)
                .unwrap_or(1);
        let values: Vec<u16> = (0..count as u16).map(|v| v.wrapping_mul(seed + 1)).collect();
        let mut payload = vec![0u8; values.len() * 2];
        LittleEndian::write_u16_into(&values, &mut payload);
        raw.extend_from_slice(&payload);
        raw
    }

    fn round_trip(raw: &[u8]) -> Vec<u8> {
        let file = ApresFile::read(Cursor::new(raw.to_vec()), DecodeMode::Strict).unwrap();
        let dataset = file_to_dataset(&file, None).unwrap();

        // Through the persisted form, to prove the container is
        // self-describing
        let mut json = Vec::new();
        dataset.to_writer(&mut json).unwrap();
        let restored = Dataset::from_reader(json.as_slice()).unwrap();

        let recovered = dataset_to_file(&restored).unwrap();
        let mut out = Vec::new();
        recovered.write(&mut out).unwrap();
        out
    }

    fn strip_spaces(bytes: &[u8]) -> Vec<u8> {
        bytes
            .iter()
            .copied()
            .filter(|&b| b != b' ' && b != b'\t')
            .collect()
    }

    #[test]
    fn test_v2_round_trip_byte_identical() {
        let mut raw = v2_burst_bytes(4, 10, &[], 0);
        raw.extend_from_slice(&v2_burst_bytes(4, 10, &[], 1));

        assert_eq!(raw, round_trip(&raw));
    }

    #[test]
    fn test_v2_single_burst_round_trip_via_root_scope() {
        let raw = v2_burst_bytes(2, 5, &["Temp1=10.0469"], 3);

        let file = ApresFile::read(Cursor::new(raw.clone()), DecodeMode::Strict).unwrap();
        let dataset = file_to_dataset(&file, None).unwrap();
        assert!(dataset.groups.is_empty());
        assert!(dataset.root.variable(DATA_VARIABLE).is_some());

        assert_eq!(raw, round_trip(&raw));
    }

    #[test]
    fn test_v1_round_trip_whitespace_equivalent() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"\r\n*** Burst Header ***\r\n");
        raw.extend_from_slice(b"Time stamp: 2013-12-27 10:32:31\r\n");
        raw.extend_from_slice(b"SubBursts in burst: 2\r\n");
        raw.extend_from_slice(b"Average: 0\r\n");
        raw.extend_from_slice(b"Samples: 3\r\n");
        raw.extend_from_slice(b"\r\n*** End Header ***\r\n");
        let mut payload = vec![0u8; 12];
        LittleEndian::write_u16_into(&[1, 2, 3, 4, 5, 6], &mut payload);
        raw.extend_from_slice(&payload);

        let recovered = round_trip(&raw);

        // Identical apart from the V1 column padding between key and value
        assert_ne!(raw, recovered);
        assert_eq!(strip_spaces(&raw), strip_spaces(&recovered));

        // And the recovered file uses the V1 delimiter
        let text = String::from_utf8_lossy(&recovered[..60]).to_string();
        assert!(text.contains("Time stamp:2013-12-27"));
    }

    #[test]
    fn test_two_burst_scenario_groups_and_shapes() {
        let mut raw = v2_burst_bytes(4, 10, &[], 0);
        raw.extend_from_slice(&v2_burst_bytes(4, 10, &[], 1));

        let file = ApresFile::read(Cursor::new(raw), DecodeMode::Strict).unwrap();
        assert_eq!(2, file.len());

        let dataset = file_to_dataset(&file, None).unwrap();
        assert_eq!(2, dataset.groups.len());

        for name in ["burst0", "burst1"] {
            let scope = &dataset.group(name).unwrap().scope;
            assert_eq!(Some(4), scope.dimension_len("NSubBursts"));
            assert_eq!(Some(10), scope.dimension_len("N_ADC_SAMPLES"));

            let variable = scope.variable(DATA_VARIABLE).unwrap();
            assert_eq!(vec!["NSubBursts", "N_ADC_SAMPLES"], variable.dimensions);
            assert_eq!(40, variable.data.len());
            assert_eq!(Some("1"), variable.attributes.iter().find(|a| a.name == "units").map(|a| a.value.as_str()));
        }
    }

    #[test]
    fn test_attenuator_dimension_omitted_when_single() {
        let raw = v2_burst_bytes(2, 5, &["nAttenuators=1"], 0);
        let file = ApresFile::read(Cursor::new(raw), DecodeMode::Strict).unwrap();
        let dataset = file_to_dataset(&file, None).unwrap();

        assert_eq!(None, dataset.root.dimension_len("nAttenuators"));
        assert_eq!(
            2,
            dataset.root.variable(DATA_VARIABLE).unwrap().dimensions.len()
        );
        // The header attribute itself is still carried
        assert_eq!(Some("1"), dataset.root.attribute("nAttenuators"));
    }

    #[test]
    fn test_attenuator_dimension_present_when_multiple() {
        let raw = v2_burst_bytes(1, 5, &["nAttenuators=3"], 0);
        let file = ApresFile::read(Cursor::new(raw.clone()), DecodeMode::Strict).unwrap();
        let dataset = file_to_dataset(&file, None).unwrap();

        assert_eq!(Some(3), dataset.root.dimension_len("nAttenuators"));
        let variable = dataset.root.variable(DATA_VARIABLE).unwrap();
        assert_eq!(
            vec!["NSubBursts", "N_ADC_SAMPLES", "nAttenuators"],
            variable.dimensions
        );
        assert_eq!(15, variable.data.len());

        // decode-then-encode through the container is a fixed point
        assert_eq!(raw, round_trip(&raw));
    }

    #[test]
    fn test_averaged_round_trip_preserves_declared_count() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"\r\n*** Burst Header ***\r\n");
        raw.extend_from_slice(b"NSubBursts=100\r\nAverage=1\r\nN_ADC_SAMPLES=4\r\n");
        raw.extend_from_slice(b"\r\n*** End Header ***\r\n");
        raw.extend_from_slice(&crate::burst::Samples::F32(vec![1.5, 2.5, 3.5, 4.5]).to_bytes());

        let file = ApresFile::read(Cursor::new(raw.clone()), DecodeMode::Strict).unwrap();
        let dataset = file_to_dataset(&file, None).unwrap();

        // Shape dimension collapses to 1, the attribute keeps the original
        assert_eq!(Some(1), dataset.root.dimension_len("NSubBursts"));
        assert_eq!(Some("100"), dataset.root.attribute("NSubBursts"));

        assert_eq!(raw, round_trip(&raw));
    }

    #[test]
    fn test_history_recorded_and_stripped() {
        let raw = v2_burst_bytes(1, 3, &[], 0);
        let file = ApresFile::read(Cursor::new(raw.clone()), DecodeMode::Strict).unwrap();

        let dataset = file_to_dataset(&file, Some("apres-convert in.dat out.acf")).unwrap();
        assert_eq!(
            Some("apres-convert in.dat out.acf"),
            dataset.root.attribute(HISTORY_ATTR)
        );

        let recovered = dataset_to_file(&dataset).unwrap();
        assert!(!recovered.bursts()[0].header().contains_key(HISTORY_ATTR));

        let mut out = Vec::new();
        recovered.write(&mut out).unwrap();
        assert_eq!(raw, out);
    }

    #[test]
    fn test_scope_without_data_variable() {
        let dataset = Dataset::new();
        assert!(matches!(
            dataset_to_file(&dataset),
            Err(ContainerError::MissingVariable { .. })
        ));
    }

    #[test]
    fn test_differing_sample_counts_across_groups() {
        let mut raw = v2_burst_bytes(2, 10, &[], 0);
        raw.extend_from_slice(&v2_burst_bytes(2, 20, &[], 1));

        let file = ApresFile::read(Cursor::new(raw.clone()), DecodeMode::Strict).unwrap();
        let dataset = file_to_dataset(&file, None).unwrap();

        // Per-group dimensions keep the differing lengths apart
        assert_eq!(
            Some(10),
            dataset.group("burst0").unwrap().scope.dimension_len("N_ADC_SAMPLES")
        );
        assert_eq!(
            Some(20),
            dataset.group("burst1").unwrap().scope.dimension_len("N_ADC_SAMPLES")
        );

        assert_eq!(raw, round_trip(&raw));
    }
}
