//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times — subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// A temporary knowledge-base data directory.
pub struct DataDir {
    temp: TempDir,
}

#[allow(dead_code)]
impl DataDir {
    pub fn new() -> Self {
        DataDir {
            temp: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Write one pattern record under `zhengxing/<id>.json`.
    pub fn write_pattern(&self, record: &Value) -> PathBuf {
        let id = record["id"].as_str().expect("pattern record needs an id");
        self.write_raw("zhengxing", &format!("{id}.json"), &record.to_string())
    }

    /// Write a satellite entity (classifier, formula, herb, symptom).
    pub fn write_entity(&self, subdir: &str, id: &str, name: &str) -> PathBuf {
        self.write_raw(
            subdir,
            &format!("{id}.json"),
            &json!({"id": id, "name": name}).to_string(),
        )
    }

    /// Write arbitrary file content under `<subdir>/<filename>`.
    pub fn write_raw(&self, subdir: &str, filename: &str, content: &str) -> PathBuf {
        let dir = self.temp.path().join(subdir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(filename);
        std::fs::write(&path, content).unwrap();
        path
    }
}

/// A complete pattern record passing the required-field checks. Callers
/// patch in relational fields as needed.
#[allow(dead_code)]
pub fn pattern(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "zhengsu_composition": {"location": [], "nature": []},
        "symptoms": {"main": [], "secondary": [], "tongue": "", "pulse": ""},
        "treatment_principle": ["補氣"],
    })
}
