//! Evolution graph construction.
//!
//! Merges the forward (`can_evolve_to`) and reverse (`evolved_from`)
//! relational fields of every record into one deduplicated directed edge
//! set, with per-node classification attached. Edge existence is symmetric
//! in declaration direction; which record's synthesized description wins is
//! decided by id-ordered record iteration, the first writer under the
//! ordered-pair dedup rule.
//!
//! Referential integrity is deliberately not enforced here: an edge whose
//! endpoint never resolves is still emitted (the id stands in for the
//! display name) so the validator is the single place dangling references
//! surface.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};

use crate::{
    classify::{Category, NodeClassifier},
    store::RecordStore,
};

/// Semantic label of an evolution edge, resolved from the severity delta
/// between its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Relation {
    /// Default progression between peer severities.
    #[serde(rename = "發展")]
    Development,
    /// Target is strictly more severe than the source.
    #[serde(rename = "惡化")]
    Worsening,
    /// Target is in the critical tier, regardless of the source.
    #[serde(rename = "危變")]
    CriticalTurn,
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Relation::Development => "發展",
            Relation::Worsening => "惡化",
            Relation::CriticalTurn => "危變",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub severity: u8,
    pub is_critical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub relation: Relation,
    /// Reserved trigger-condition slot; authored data does not populate it
    /// yet but the artifact schema carries it.
    pub condition: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub to: String,
    pub to_name: String,
    pub description: String,
}

/// A node from which more than one distinct progression is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchPoint {
    pub from: String,
    pub from_name: String,
    pub branches: Vec<Branch>,
}

/// The derived evolution graph for one build run. Nodes are sorted by
/// (severity, name); edges keep synthesis order, which is itself fixed by
/// id-ordered record iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl EvolutionGraph {
    /// Build nodes and edges from the full record set.
    pub fn build(store: &RecordStore, classifier: &NodeClassifier) -> Self {
        let nodes = build_nodes(store, classifier);
        let edges = build_edges(store, classifier);
        tracing::info!(
            nodes = nodes.len(),
            edges = edges.len(),
            "evolution graph built"
        );
        EvolutionGraph { nodes, edges }
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Node lookup table keyed by id.
    pub fn node_map(&self) -> BTreeMap<&str, &GraphNode> {
        self.nodes.iter().map(|n| (n.id.as_str(), n)).collect()
    }

    /// Forward adjacency restricted to edges whose endpoints both resolve
    /// to known nodes. Successor iteration order over a
    /// [`DiGraphMap`] follows edge insertion order, which is deterministic
    /// here, but traversals that need a documented order should still sort.
    pub fn adjacency(&self) -> DiGraphMap<&str, ()> {
        let node_ids: BTreeSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        let mut graph = DiGraphMap::new();
        for edge in &self.edges {
            if node_ids.contains(edge.from.as_str()) && node_ids.contains(edge.to.as_str()) {
                graph.add_edge(edge.from.as_str(), edge.to.as_str(), ());
            }
        }
        graph
    }

    /// Group the edge set by source and keep the sources with two or more
    /// distinct targets. Output sorted by source id for reproducibility.
    pub fn branch_points(&self, store: &RecordStore) -> Vec<BranchPoint> {
        let mut out_edges: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for edge in &self.edges {
            out_edges
                .entry(edge.from.as_str())
                .or_default()
                .push(edge.to.as_str());
        }

        out_edges
            .into_iter()
            .filter(|(_, targets)| targets.len() > 1)
            .map(|(from, targets)| BranchPoint {
                from: from.to_string(),
                from_name: store.name_of(from).to_string(),
                branches: targets
                    .into_iter()
                    .map(|to| Branch {
                        to: to.to_string(),
                        to_name: store.name_of(to).to_string(),
                        description: String::new(),
                    })
                    .collect(),
            })
            .collect()
    }
}

fn build_nodes(store: &RecordStore, classifier: &NodeClassifier) -> Vec<GraphNode> {
    let mut nodes: Vec<GraphNode> = store
        .patterns()
        .map(|record| {
            let class = classifier.classify(record);
            GraphNode {
                id: record.id.clone(),
                name: record.display_name().to_string(),
                category: class.category,
                severity: class.severity,
                is_critical: class.is_critical,
            }
        })
        .collect();
    nodes.sort_by(|a, b| (a.severity, &a.name).cmp(&(b.severity, &b.name)));
    nodes
}

fn build_edges(store: &RecordStore, classifier: &NodeClassifier) -> Vec<GraphEdge> {
    let mut edges = Vec::new();
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();

    for record in store.patterns() {
        for target in &record.can_evolve_to {
            push_edge(&mut edges, &mut seen, store, classifier, &record.id, target);
        }
        for source in &record.evolved_from {
            push_edge(&mut edges, &mut seen, store, classifier, source, &record.id);
        }
    }
    edges
}

fn push_edge(
    edges: &mut Vec<GraphEdge>,
    seen: &mut BTreeSet<(String, String)>,
    store: &RecordStore,
    classifier: &NodeClassifier,
    from: &str,
    to: &str,
) {
    if seen.contains(&(from.to_string(), to.to_string())) {
        return;
    }
    seen.insert((from.to_string(), to.to_string()));
    edges.push(build_edge(store, classifier, from, to));
}

/// Synthesize one edge. Unresolved endpoints fall back to severity 1 and
/// use their id as display name.
fn build_edge(store: &RecordStore, classifier: &NodeClassifier, from: &str, to: &str) -> GraphEdge {
    let from_record = store.get(from);
    let to_record = store.get(to);

    let from_severity = from_record.map(|r| classifier.severity(r)).unwrap_or(1);
    let to_severity = to_record.map(|r| classifier.severity(r)).unwrap_or(1);

    let relation = if to_severity >= 4 {
        Relation::CriticalTurn
    } else if to_severity > from_severity {
        Relation::Worsening
    } else {
        Relation::Development
    };

    let description = from_record
        .and_then(|record| {
            record
                .differentiation
                .iter()
                .find(|diff| diff.compare_with == to)
                .and_then(|diff| diff.key_points.first().cloned())
        })
        .unwrap_or_else(|| format!("{}演變為{}", store.name_of(from), store.name_of(to)));

    GraphEdge {
        from: from.to_string(),
        to: to.to_string(),
        relation,
        condition: String::new(),
        description,
    }
}
