//! # zhengtu-core
//!
//! A batch indexer for a knowledge base of clinical pattern ("zhengxing")
//! records. It loads independently-authored JSON records, derives
//! cross-referencing indexes from them, and validates the structural
//! integrity of everything the records point at.
//!
//! The centerpiece is the **evolution graph**: a directed graph describing
//! how one clinical pattern can evolve into a more severe one, assembled
//! from the forward (`can_evolve_to`) and reverse (`evolved_from`)
//! relational fields scattered across the record set.
//!
//! ## Pipeline
//!
//! ```text
//! RecordStore -> NodeClassifier -> EvolutionGraph -> { Validator,
//!     chain discovery, branch points } -> EvolutionIndex
//! ```
//!
//! - [`store::RecordStore`]: immutable snapshot of the record set, loaded
//!   once per run with deterministic (id-ordered) iteration.
//! - [`classify::NodeClassifier`]: per-record category / severity /
//!   criticality, driven by an explicit [`classify::ClassifyConfig`].
//! - [`graph::EvolutionGraph`]: deduplicated directed edge set with
//!   severity-derived relation labels and branch-point detection.
//! - [`validate::Validator`]: referential-integrity checks and evolution
//!   cycle detection, reported at error / warning / info tiers.
//! - [`chains`]: maximal monotone progression paths merged with curated
//!   canonical chains.
//! - [`index`]: artifact assembly and JSON serialization;
//!   [`indexes`] adds the flat symptom and composition indexes.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use zhengtu_core::{
//!     chains::canonical_chains, classify::NodeClassifier,
//!     index::build_evolution_index, store::RecordStore,
//! };
//!
//! fn main() -> Result<(), zhengtu_core::ZhengtuError> {
//!     let store = RecordStore::load("./data")?;
//!     let classifier = NodeClassifier::default();
//!     let index = build_evolution_index(
//!         &store,
//!         &classifier,
//!         &canonical_chains(),
//!         chrono::Local::now().date_naive(),
//!     );
//!     index.write_json("./data/indexes/evolution_graph.json")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error tolerance
//!
//! The build favors maximal output: malformed record files are skipped with
//! a warning, dangling references still produce (validator-flagged) edges,
//! and even a graph containing a reported cycle is serialized. Only an
//! unreadable data directory aborts a run. A standalone validation run
//! exits nonzero iff any error-tier finding exists.

pub mod chains;
pub mod classify;
pub mod error;
pub mod graph;
pub mod index;
pub mod indexes;
pub mod store;
pub mod validate;

pub use error::*;
