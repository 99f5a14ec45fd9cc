// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Durable pipeline artifacts
//!
//! Every stage persists its output as a file under one artifact directory and
//! later stages (or later runs) detect completion by the file's presence.
//! Writes go to a `.tmp` sibling first and are renamed into place, so a crash
//! mid-write never leaves a truncated file under the final name.

use chrono::{DateTime, Local};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{EvalType, Metric, StoreError};

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    /// `{metric}_{eval_type}_report.json`
    pub fn metric_report_name(metric: Metric, eval_type: EvalType) -> String {
        format!("{}_{}_report.json", metric, eval_type)
    }

    /// `evaluation_report_{eval_type}_{YYYYmmdd_HHMMSS}.txt`
    pub fn final_report_name(eval_type: EvalType, at: DateTime<Local>) -> String {
        format!(
            "evaluation_report_{}_{}.txt",
            eval_type,
            at.format("%Y%m%d_%H%M%S")
        )
    }

    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, StoreError> {
        let path = self.path(name);
        let file = fs::File::open(&path).map_err(|e| StoreError::io(&path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| StoreError::json(&path, e))
    }

    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<PathBuf, StoreError> {
        let path = self.path(name);
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::json(&path, e))?;
        self.write_atomic(&path, &bytes)?;
        Ok(path)
    }

    pub fn write_text(&self, name: &str, text: &str) -> Result<PathBuf, StoreError> {
        let path = self.path(name);
        self.write_atomic(&path, text.as_bytes())?;
        Ok(path)
    }

    /// Delete an artifact; a missing file is not an error
    pub fn remove(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed artifact {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        {
            let file = fs::File::create(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;
            let mut writer = BufWriter::new(file);
            writer
                .write_all(bytes)
                .map_err(|e| StoreError::io(&temp_path, e))?;
            let file = writer
                .into_inner()
                .map_err(|e| StoreError::io(&temp_path, e.into_error()))?;
            file.sync_all().map_err(|e| StoreError::io(&temp_path, e))?;
        }

        fs::rename(&temp_path, path).map_err(|e| StoreError::io(path, e))?;
        debug!("Wrote artifact {:?} ({} bytes)", path, bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Golden, MetricResult};
    use chrono::TimeZone;

    #[test]
    fn test_json_roundtrip_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("nested"));

        let goldens = vec![Golden::new("What is the deductible?")];
        let path = store.write_json("goldens_quick.json", &goldens).unwrap();

        assert!(store.exists("goldens_quick.json"));
        assert!(!path.with_extension("json.tmp").exists());
        let loaded: Vec<Golden> = store.read_json("goldens_quick.json").unwrap();
        assert_eq!(loaded, goldens);
    }

    #[test]
    fn test_names() {
        assert_eq!(
            ArtifactStore::metric_report_name(Metric::AnswerRelevancy, EvalType::Quick),
            "answer_relevancy_quick_report.json"
        );
        let at = Local.with_ymd_and_hms(2025, 3, 7, 14, 5, 9).unwrap();
        assert_eq!(
            ArtifactStore::final_report_name(EvalType::Deep, at),
            "evaluation_report_deep_20250307_140509.txt"
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.write_text("faithfulness_quick_report.json", "[]").unwrap();

        store.remove("faithfulness_quick_report.json").unwrap();
        assert!(!store.exists("faithfulness_quick_report.json"));
        store.remove("faithfulness_quick_report.json").unwrap();
    }

    #[test]
    fn test_read_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store.read_json::<Vec<MetricResult>>("missing.json").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_corrupt_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.write_text("broken.json", "[{\"input\": ").unwrap();
        let err = store.read_json::<Vec<MetricResult>>("broken.json").unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
    }
}
