//! Evolution chain discovery.
//!
//! A chain is a maximal progression path through the resolved evolution
//! graph, discovered from source nodes (in-degree zero, at least one
//! outgoing edge). Discovered chains are merged with a small curated set of
//! canonical chains under an order-insensitive node-set dedup, so a
//! rediscovered canonical path is not listed twice.
//!
//! The longest-path search backtracks with a single shared visited set
//! (push on enter, pop on exit), which keeps the "no revisits within one
//! path, revisits allowed on sibling branches" semantics without cloning
//! the set per branch. Worst-case cost is still exponential on
//! branch-heavy graphs; acceptable at this scale (tens of nodes).

use std::collections::BTreeSet;

use petgraph::{graphmap::DiGraphMap, Direction};
use serde::{Deserialize, Serialize};

use crate::{classify::severity_label, graph::EvolutionGraph};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionChain {
    pub id: String,
    pub name: String,
    pub description: String,
    pub path: Vec<String>,
    /// Ordinal severity labels joined with an arrow, only when severity is
    /// non-decreasing along the whole path; empty otherwise.
    pub severity_progression: String,
}

/// The hand-curated canonical chains unioned into every build.
pub fn canonical_chains() -> Vec<EvolutionChain> {
    vec![EvolutionChain {
        id: "qi_disease_chain".to_string(),
        name: "氣病演變鏈".to_string(),
        description: "從氣虛到氣脫的完整演變路徑".to_string(),
        path: vec![
            "qi_xu_zheng".to_string(),
            "zhong_qi_xia_xian".to_string(),
            "qi_tuo_zheng".to_string(),
        ],
        severity_progression: "輕 → 中 → 重".to_string(),
    }]
}

/// Discover representative longest chains and union in `canonical`.
pub fn discover_chains(graph: &EvolutionGraph, canonical: &[EvolutionChain]) -> Vec<EvolutionChain> {
    let adjacency = graph.adjacency();
    let node_map = graph.node_map();
    let mut chains: Vec<EvolutionChain> = Vec::new();

    // Candidate starts in node order (severity, name): sources that
    // actually progress somewhere.
    let starts: Vec<&str> = graph
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|&id| {
            adjacency.contains_node(id)
                && adjacency
                    .neighbors_directed(id, Direction::Incoming)
                    .next()
                    .is_none()
                && adjacency
                    .neighbors_directed(id, Direction::Outgoing)
                    .next()
                    .is_some()
        })
        .collect();

    for start in starts {
        let mut visited = BTreeSet::new();
        let path = longest_path(&adjacency, start, &mut visited);
        if path.len() < 2 {
            continue;
        }

        let severities: Vec<u8> = path
            .iter()
            .map(|id| node_map.get(id).map(|n| n.severity).unwrap_or(1))
            .collect();
        let progression = if severities.windows(2).all(|w| w[0] <= w[1]) {
            severities
                .iter()
                .map(|s| severity_label(*s))
                .collect::<Vec<_>>()
                .join(" → ")
        } else {
            String::new()
        };

        let first_name = node_map.get(path[0]).map(|n| n.name.as_str()).unwrap_or(path[0]);
        let last_name = node_map
            .get(path[path.len() - 1])
            .map(|n| n.name.as_str())
            .unwrap_or(path[path.len() - 1]);

        let chain = EvolutionChain {
            id: format!("chain_{start}"),
            name: format!("{first_name}演變鏈"),
            description: format!("從{first_name}到{last_name}的演變路徑"),
            path: path.iter().map(|id| id.to_string()).collect(),
            severity_progression: progression,
        };

        if !contains_node_set(&chains, &chain) {
            chains.push(chain);
        }
    }

    for known in canonical {
        if !contains_node_set(&chains, known) {
            chains.push(known.clone());
        }
    }

    tracing::info!(chains = chains.len(), "evolution chains discovered");
    chains
}

/// Order-insensitive dedup: two chains are duplicates when they visit the
/// same node set.
fn contains_node_set(chains: &[EvolutionChain], candidate: &EvolutionChain) -> bool {
    let candidate_set: BTreeSet<&str> = candidate.path.iter().map(String::as_str).collect();
    chains.iter().any(|chain| {
        let set: BTreeSet<&str> = chain.path.iter().map(String::as_str).collect();
        set == candidate_set
    })
}

/// Longest simple path from `start` over the forward adjacency. `visited`
/// holds the ancestors of the current recursion only; successors are tried
/// in sorted id order so equal-length ties break reproducibly.
fn longest_path<'a>(
    adjacency: &DiGraphMap<&'a str, ()>,
    start: &'a str,
    visited: &mut BTreeSet<&'a str>,
) -> Vec<&'a str> {
    visited.insert(start);

    let mut longest = vec![start];
    let mut successors: Vec<&str> = adjacency
        .neighbors_directed(start, Direction::Outgoing)
        .collect();
    successors.sort_unstable();

    for next in successors {
        if visited.contains(next) {
            continue;
        }
        let tail = longest_path(adjacency, next, visited);
        if tail.len() + 1 > longest.len() {
            longest = std::iter::once(start).chain(tail).collect();
        }
    }

    visited.remove(start);
    longest
}
