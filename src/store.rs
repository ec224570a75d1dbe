//! Record store: batch ingestion of the pattern knowledge base.
//!
//! A data directory holds one JSON file per entity, grouped by kind:
//! `zhengxing/` (pattern records), `zhengsu/` (composition classifiers),
//! `formulas/`, `herbs/`, `symptoms/`. Only pattern records are loaded in
//! full; the satellite directories contribute id sets used for reference
//! resolution. Files whose name starts with `_` are reserved for authoring
//! metadata and skipped.
//!
//! The store is immutable once loaded and is passed explicitly to every
//! downstream component. Iteration is keyed by record id, so a rebuild over
//! an unchanged data directory is byte-reproducible regardless of what order
//! the filesystem lists files in.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::read_to_string,
    path::Path,
};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::ZhengtuError;

/// Composition classifiers for a pattern: where it manifests (`location`)
/// and how (`nature`). Both are opaque classifier ids resolved against the
/// `zhengsu/` directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZhengsuComposition {
    #[serde(default)]
    pub location: Vec<String>,
    #[serde(default)]
    pub nature: Vec<String>,
}

/// One authored differentiation entry: how this pattern is told apart from
/// `compare_with`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Differentiation {
    pub compare_with: String,
    #[serde(default)]
    pub compare_name: Option<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymptomSet {
    #[serde(default)]
    pub main: Vec<String>,
    #[serde(default)]
    pub secondary: Vec<String>,
    #[serde(default)]
    pub tongue: String,
    #[serde(default)]
    pub pulse: String,
}

/// A clinical pattern record as authored in `zhengxing/<id>.json`.
///
/// Fields the validator treats as required (`name`, `zhengsu_composition`,
/// `symptoms`, `treatment_principle`) deserialize as `Option` so their
/// absence is observable rather than papered over with defaults. A file
/// without an `id` fails deserialization outright and is skipped as
/// malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub zhengsu_composition: Option<ZhengsuComposition>,
    #[serde(default)]
    pub symptoms: Option<SymptomSet>,
    #[serde(default)]
    pub treatment_principle: Option<Vec<String>>,
    #[serde(default)]
    pub can_evolve_to: Vec<String>,
    #[serde(default)]
    pub evolved_from: Vec<String>,
    #[serde(default)]
    pub differentiation: Vec<Differentiation>,
    #[serde(default)]
    pub differentiate_from: Vec<String>,
    #[serde(default)]
    pub recommended_formulas: Vec<String>,
    #[serde(default)]
    pub recommended_herbs: Vec<String>,
}

impl PatternRecord {
    /// Display name, falling back to the id for records whose `name` field
    /// is missing.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn location(&self) -> &[String] {
        self.zhengsu_composition
            .as_ref()
            .map(|c| c.location.as_slice())
            .unwrap_or(&[])
    }

    pub fn nature(&self) -> &[String] {
        self.zhengsu_composition
            .as_ref()
            .map(|c| c.nature.as_slice())
            .unwrap_or(&[])
    }
}

/// Minimal header shared by all satellite entities. Only identity and the
/// display name are kept.
#[derive(Debug, Clone, Deserialize)]
struct EntityHeader {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

/// Immutable snapshot of the knowledge base for one build run.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    patterns: BTreeMap<String, PatternRecord>,
    /// Classifier id to display name.
    zhengsu: BTreeMap<String, String>,
    formula_ids: BTreeSet<String>,
    herb_ids: BTreeSet<String>,
    symptom_ids: BTreeSet<String>,
    load_warnings: Vec<String>,
}

impl RecordStore {
    /// Load every entity under `data_dir`. A missing data directory is
    /// fatal; a missing entity subdirectory merely yields an empty id set.
    /// Unreadable or malformed files are skipped with a recorded warning so
    /// the rest of the batch still builds.
    pub fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self, ZhengtuError> {
        let data_dir = data_dir.as_ref();
        if !data_dir.is_dir() {
            return Err(ZhengtuError::NotFound(format!(
                "data directory does not exist: {}",
                data_dir.display()
            )));
        }

        let mut store = RecordStore::default();

        for file in json_files(&data_dir.join("zhengxing")) {
            match read_entity::<PatternRecord>(&file) {
                Ok(record) => {
                    tracing::debug!("loaded pattern record {}", record.id);
                    store.patterns.insert(record.id.clone(), record);
                }
                Err(err) => store.warn_skipped(&file, err),
            }
        }

        for file in json_files(&data_dir.join("zhengsu")) {
            match read_entity::<EntityHeader>(&file) {
                Ok(header) => {
                    let name = header.name.unwrap_or_else(|| header.id.clone());
                    store.zhengsu.insert(header.id, name);
                }
                Err(err) => store.warn_skipped(&file, err),
            }
        }

        let satellites = [
            ("formulas", &mut store.formula_ids),
            ("herbs", &mut store.herb_ids),
            ("symptoms", &mut store.symptom_ids),
        ];
        let mut warnings = Vec::new();
        for (subdir, ids) in satellites {
            for file in json_files(&data_dir.join(subdir)) {
                match read_entity::<EntityHeader>(&file) {
                    Ok(header) => {
                        ids.insert(header.id);
                    }
                    Err(err) => warnings.push(format!(
                        "skipping unreadable record file {}: {err}",
                        file.display()
                    )),
                }
            }
        }
        for warning in warnings {
            tracing::warn!("{warning}");
            store.load_warnings.push(warning);
        }

        tracing::info!(
            patterns = store.patterns.len(),
            zhengsu = store.zhengsu.len(),
            formulas = store.formula_ids.len(),
            herbs = store.herb_ids.len(),
            symptoms = store.symptom_ids.len(),
            "record store loaded"
        );
        Ok(store)
    }

    /// Build a store from in-memory records. Intended for tests and callers
    /// that source records from somewhere other than the data directory.
    pub fn from_records<I: IntoIterator<Item = PatternRecord>>(records: I) -> Self {
        let mut store = RecordStore::default();
        for record in records {
            store.patterns.insert(record.id.clone(), record);
        }
        store
    }

    /// Register classifier ids, for stores assembled via [`Self::from_records`].
    /// Display names default to the ids.
    pub fn with_zhengsu_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            let id = id.into();
            self.zhengsu.insert(id.clone(), id);
        }
        self
    }

    fn warn_skipped(&mut self, file: &Path, err: ZhengtuError) {
        let warning = format!("skipping unreadable record file {}: {err}", file.display());
        tracing::warn!("{warning}");
        self.load_warnings.push(warning);
    }

    /// Pattern records in id order.
    pub fn patterns(&self) -> impl Iterator<Item = &PatternRecord> {
        self.patterns.values()
    }

    pub fn get(&self, id: &str) -> Option<&PatternRecord> {
        self.patterns.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.patterns.contains_key(id)
    }

    /// Display name for any pattern id, whether or not it resolves.
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|r| r.display_name()).unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Classifier id to display name map.
    pub fn zhengsu(&self) -> &BTreeMap<String, String> {
        &self.zhengsu
    }

    pub fn has_zhengsu(&self, id: &str) -> bool {
        self.zhengsu.contains_key(id)
    }

    /// Display name for a classifier id, falling back to the id itself.
    pub fn zhengsu_name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.zhengsu.get(id).map(String::as_str).unwrap_or(id)
    }

    pub fn formula_ids(&self) -> &BTreeSet<String> {
        &self.formula_ids
    }

    pub fn herb_ids(&self) -> &BTreeSet<String> {
        &self.herb_ids
    }

    pub fn symptom_ids(&self) -> &BTreeSet<String> {
        &self.symptom_ids
    }

    /// Warnings recorded while loading (malformed or unreadable files).
    /// Folded into the validation report so a standalone `validate` run
    /// surfaces them alongside structural findings.
    pub fn load_warnings(&self) -> &[String] {
        &self.load_warnings
    }
}

/// JSON files directly inside `dir`, sorted by file name. Underscore-prefixed
/// files are authoring metadata, not records.
fn json_files(dir: &Path) -> Vec<std::path::PathBuf> {
    if !dir.is_dir() {
        tracing::debug!("entity directory not present: {}", dir.display());
        return Vec::new();
    }
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            entry.file_type().is_file() && name.ends_with(".json") && !name.starts_with('_')
        })
        .map(|entry| entry.into_path())
        .collect()
}

fn read_entity<T: serde::de::DeserializeOwned>(file: &Path) -> Result<T, ZhengtuError> {
    let content = read_to_string(file)?;
    Ok(serde_json::from_str(&content)?)
}
