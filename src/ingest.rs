//! JSON-lines descriptor input.
//!
//! One record per line:
//! `{"document": "img-001", "descriptors": [[...], ...], "packed": false}`.
//! With `packed: true` every value is a byte (0 to 255) that expands into
//! eight binary components, most significant bit first.

use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::error::{MosaicError, Result};
use crate::features::FeatureSet;

/// The descriptors of one document as produced by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorRecord {
    pub document: String,
    #[serde(default)]
    pub descriptors: Vec<Vec<f32>>,
    #[serde(default)]
    pub packed: bool,
}

impl DescriptorRecord {
    pub fn to_feature_set(&self) -> Result<FeatureSet> {
        descriptors_to_features(&self.descriptors, self.packed)
    }
}

/// Turn raw descriptor rows into a `FeatureSet`, expanding packed bytes.
pub fn descriptors_to_features(descriptors: &[Vec<f32>], packed: bool) -> Result<FeatureSet> {
    if !packed {
        return FeatureSet::from_rows(descriptors);
    }
    let mut rows = Vec::with_capacity(descriptors.len());
    for row in descriptors {
        let mut bytes = Vec::with_capacity(row.len());
        for &v in row {
            if !(0.0..=255.0).contains(&v) || v.fract() != 0.0 {
                return Err(MosaicError::Validation(format!(
                    "packed descriptor value {v} is not a byte"
                )));
            }
            bytes.push(v as u8);
        }
        rows.push(bytes);
    }
    FeatureSet::from_packed(&rows)
}

/// Iterate the records of a JSON-lines stream, skipping blank lines.
/// Errors carry the 1-based line number.
pub fn read_records<R: BufRead>(reader: R) -> impl Iterator<Item = Result<DescriptorRecord>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(i, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(serde_json::from_str(&line).map_err(|e| {
                MosaicError::Validation(format!("line {}: {e}", i + 1))
            })),
            Err(e) => Some(Err(MosaicError::Io(e))),
        })
}
