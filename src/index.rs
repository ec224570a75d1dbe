//! Assembly and serialization of the evolution-graph index artifact.
//!
//! Pure packaging: everything here is counting and field plumbing over
//! structures the other modules derived. One deterministic snapshot per
//! build run; the previous artifact is overwritten, never patched.

use std::{fs, path::Path};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    chains::{discover_chains, EvolutionChain},
    classify::NodeClassifier,
    error::ZhengtuError,
    graph::{BranchPoint, EvolutionGraph, GraphEdge, GraphNode},
    store::RecordStore,
};

pub const INDEX_VERSION: &str = "1.0";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub critical_nodes: usize,
    pub evolution_chains: usize,
}

/// The persisted evolution-graph index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionIndex {
    pub version: String,
    pub generated_at: NaiveDate,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub evolution_chains: Vec<EvolutionChain>,
    pub branch_points: Vec<BranchPoint>,
    pub statistics: Statistics,
}

impl EvolutionIndex {
    pub fn assemble(
        graph: EvolutionGraph,
        chains: Vec<EvolutionChain>,
        branch_points: Vec<BranchPoint>,
        generated_at: NaiveDate,
    ) -> Self {
        let statistics = Statistics {
            total_nodes: graph.nodes.len(),
            total_edges: graph.edges.len(),
            critical_nodes: graph.nodes.iter().filter(|n| n.is_critical).count(),
            evolution_chains: chains.len(),
        };
        EvolutionIndex {
            version: INDEX_VERSION.to_string(),
            generated_at,
            nodes: graph.nodes,
            edges: graph.edges,
            evolution_chains: chains,
            branch_points,
            statistics,
        }
    }

    /// Serialize to pretty-printed JSON, creating parent directories as
    /// needed.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ZhengtuError> {
        write_json(path, self)
    }
}

/// Run the full evolution-graph pipeline over one record snapshot.
pub fn build_evolution_index(
    store: &RecordStore,
    classifier: &NodeClassifier,
    canonical: &[EvolutionChain],
    generated_at: NaiveDate,
) -> EvolutionIndex {
    let graph = EvolutionGraph::build(store, classifier);
    let chains = discover_chains(&graph, canonical);
    let branch_points = graph.branch_points(store);
    EvolutionIndex::assemble(graph, chains, branch_points, generated_at)
}

/// Shared JSON emission for every index artifact.
pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), ZhengtuError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    fs::write(path, content)?;
    tracing::info!("index written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chains::canonical_chains, store::PatternRecord};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn statistics_count_critical_nodes_and_chains() {
        let mut a = PatternRecord {
            id: "qi_xu_zheng".to_string(),
            name: Some("氣虛證".to_string()),
            ..Default::default()
        };
        a.can_evolve_to = vec!["wang_yang_zheng".to_string()];
        let b = PatternRecord {
            id: "wang_yang_zheng".to_string(),
            name: Some("亡陽證".to_string()),
            ..Default::default()
        };

        let store = RecordStore::from_records(vec![a, b]);
        let index = build_evolution_index(
            &store,
            &NodeClassifier::default(),
            &canonical_chains(),
            today(),
        );

        assert_eq!(index.version, INDEX_VERSION);
        assert_eq!(index.statistics.total_nodes, 2);
        assert_eq!(index.statistics.total_edges, 1);
        assert_eq!(index.statistics.critical_nodes, 1);
        // Discovered qi_xu→wang_yang chain plus the curated qi-disease chain.
        assert_eq!(index.statistics.evolution_chains, 2);
        assert_eq!(index.statistics.evolution_chains, index.evolution_chains.len());
    }

    #[test]
    fn serialized_artifact_uses_authored_vocabulary() {
        let mut a = PatternRecord {
            id: "a".to_string(),
            name: Some("氣虛證".to_string()),
            ..Default::default()
        };
        a.can_evolve_to = vec!["b".to_string()];
        let b = PatternRecord {
            id: "b".to_string(),
            name: Some("亡陽證".to_string()),
            ..Default::default()
        };

        let store = RecordStore::from_records(vec![a, b]);
        let index = build_evolution_index(&store, &NodeClassifier::default(), &[], today());
        let json = serde_json::to_value(&index).unwrap();

        assert_eq!(json["generated_at"], "2024-01-01");
        assert_eq!(json["edges"][0]["relation"], "危變");
        assert_eq!(json["nodes"][0]["category"], "基礎證候");
        assert!(json["statistics"]["total_nodes"].is_number());
    }
}
