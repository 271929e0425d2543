//! Persistence helpers for stage artifacts.
//!
//! Artifacts are JSON documents private to this pipeline. Floats are written
//! with the shortest representation that parses back to the same bits, so a
//! save/load cycle reproduces numeric content exactly.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::warn;

/// Serialize a value to a JSON file.
pub fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Deserialize a value from a JSON file.
pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Output files of one stage, published together.
///
/// [`StagedFiles::stage`] hands out a temporary path next to each target;
/// [`StagedFiles::commit`] renames them all into place. If a rename fails,
/// the targets already renamed are removed again. Staged files that are
/// never committed are deleted on drop.
#[derive(Debug, Default)]
pub struct StagedFiles {
    pending: Vec<(TempPath, PathBuf)>,
}

impl StagedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a temporary path for `target`, creating its directory.
    pub fn stage<P: AsRef<Path>>(&mut self, target: P) -> Result<PathBuf> {
        let target = target.as_ref().to_path_buf();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let temp = tempfile::Builder::new()
            .prefix(".staged-")
            .tempfile_in(&dir)?
            .into_temp_path();
        let path = temp.to_path_buf();
        self.pending.push((temp, target));
        Ok(path)
    }

    /// Move every staged file to its target.
    pub fn commit(self) -> Result<Vec<PathBuf>> {
        let mut committed: Vec<PathBuf> = Vec::with_capacity(self.pending.len());
        for (temp, target) in self.pending {
            if let Err(e) = temp.persist(&target) {
                for path in &committed {
                    if let Err(remove) = std::fs::remove_file(path) {
                        warn!("Could not remove {}: {}", path.display(), remove);
                    }
                }
                return Err(e.error.into());
            }
            committed.push(target);
        }
        Ok(committed)
    }
}

/// Serde adapter for float vectors that may hold infinities or NaN.
///
/// JSON has no literal for non-finite numbers, so those are written as the
/// strings `"inf"`, `"-inf"` and `"nan"`.
pub mod nonfinite_vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum JsonFloat {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<JsonFloat> = values
            .iter()
            .map(|&v| {
                if v.is_finite() {
                    JsonFloat::Number(v)
                } else if v.is_nan() {
                    JsonFloat::Text("nan".to_string())
                } else if v > 0.0 {
                    JsonFloat::Text("inf".to_string())
                } else {
                    JsonFloat::Text("-inf".to_string())
                }
            })
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let encoded = Vec::<JsonFloat>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|v| match v {
                JsonFloat::Number(x) => Ok(x),
                JsonFloat::Text(s) => match s.as_str() {
                    "inf" => Ok(f64::INFINITY),
                    "-inf" => Ok(f64::NEG_INFINITY),
                    "nan" => Ok(f64::NAN),
                    other => Err(serde::de::Error::custom(format!(
                        "invalid float literal '{}'",
                        other
                    ))),
                },
            })
            .collect()
    }
}
