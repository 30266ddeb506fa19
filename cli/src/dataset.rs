//! Dataset files.
//!
//! A dataset file is YAML or JSON:
//!
//! ```yaml
//! kind: features        # or `projection` for precomputed coordinates
//! rows:
//!   - [5.1, 3.5, 1.4]
//!   - [4.9, 3.0, 1.4]
//! labels: [setosa, setosa]   # optional, strings or numbers
//! ids: [s1, s2]              # optional
//! ```

use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use misclass_cluster::{AnalysisInput, Dataset, FeatureMatrix, ProjectionResult};

/// Error type for dataset loading.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read file: {0}")]
    ReadFile(#[from] io::Error),
    #[error("failed to parse YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("failed to parse JSON: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("failed to parse dataset (tried YAML and JSON)")]
    ParseFailed,
    #[error(transparent)]
    Invalid(#[from] misclass_cluster::MisclassError),
}

/// What the rows of a dataset file hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Raw feature vectors.
    #[default]
    Features,
    /// Coordinates from an earlier dimensionality reduction.
    Projection,
}

/// A label or identifier as written in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelValue::Integer(v) => write!(f, "{v}"),
            LabelValue::Float(v) => write!(f, "{v}"),
            LabelValue::Text(v) => f.write_str(v),
        }
    }
}

/// On-disk dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetFile {
    #[serde(default)]
    pub kind: InputKind,
    pub rows: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<LabelValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<LabelValue>>,
}

fn to_strings(values: Option<Vec<LabelValue>>) -> Option<Vec<String>> {
    values.map(|v| v.iter().map(ToString::to_string).collect())
}

impl DatasetFile {
    /// Converts the file into pipeline input. Ragged rows are rejected.
    pub fn into_input(self) -> Result<AnalysisInput, DatasetError> {
        let matrix = FeatureMatrix::from_rows(self.rows)?;
        let labels = to_strings(self.labels);
        let ids = to_strings(self.ids);
        Ok(match self.kind {
            InputKind::Features => AnalysisInput::Raw(Dataset {
                features: matrix,
                labels,
                ids,
            }),
            InputKind::Projection => AnalysisInput::Projected(ProjectionResult {
                coords: matrix,
                labels,
                ids,
            }),
        })
    }
}

/// Loads a dataset from a YAML or JSON file, or from stdin when `path`
/// is `-`.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<DatasetFile, DatasetError> {
    let path = path.as_ref();
    if path == Path::new("-") {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        return parse_dataset(&data, path);
    }
    let data = fs::read(path)?;
    parse_dataset(&data, path)
}

/// Parses dataset bytes based on the file extension, trying YAML then JSON
/// when the extension is unknown.
pub fn parse_dataset<T: DeserializeOwned>(
    data: &[u8],
    path: impl AsRef<Path>,
) -> Result<T, DatasetError> {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_slice(data)?),
        Some("json") => Ok(serde_json::from_slice(data)?),
        _ => {
            if let Ok(v) = serde_yaml::from_slice(data) {
                return Ok(v);
            }
            if let Ok(v) = serde_json::from_slice(data) {
                return Ok(v);
            }
            Err(DatasetError::ParseFailed)
        }
    }
}
