//! End-to-end tests for the evolution graph pipeline, loading records from
//! an on-disk data directory the way a production build does.

mod common;

use common::{pattern, DataDir};
use serde_json::json;
use test_log::test;
use zhengtu_core::{
    chains::canonical_chains,
    classify::NodeClassifier,
    graph::{EvolutionGraph, Relation},
    index::build_evolution_index,
    store::RecordStore,
};

fn build_graph(store: &RecordStore) -> EvolutionGraph {
    EvolutionGraph::build(store, &NodeClassifier::default())
}

#[test]
fn every_edge_endpoint_is_known_or_flagged() {
    let data = DataDir::new();
    let mut a = pattern("a_zheng", "氣虛證");
    a["can_evolve_to"] = json!(["b_zheng", "ghost_zheng"]);
    data.write_pattern(&a);
    data.write_pattern(&pattern("b_zheng", "血虛證"));

    let store = RecordStore::load(data.root()).unwrap();
    let graph = build_graph(&store);
    let report = zhengtu_core::validate::Validator::new(&store).run();

    for edge in &graph.edges {
        for endpoint in [&edge.from, &edge.to] {
            let known = graph.node(endpoint).is_some();
            let flagged = report.warnings.iter().any(|w| w.contains(endpoint.as_str()));
            assert!(
                known || flagged,
                "endpoint {endpoint} neither known nor flagged"
            );
        }
    }
}

#[test]
fn mirrored_declarations_never_duplicate_edges() {
    let data = DataDir::new();
    let mut a = pattern("a_zheng", "氣虛證");
    a["can_evolve_to"] = json!(["b_zheng"]);
    let mut b = pattern("b_zheng", "中氣下陷證");
    b["evolved_from"] = json!(["a_zheng"]);
    data.write_pattern(&a);
    data.write_pattern(&b);

    let store = RecordStore::load(data.root()).unwrap();
    let graph = build_graph(&store);

    let mut pairs: Vec<(&str, &str)> = graph
        .edges
        .iter()
        .map(|e| (e.from.as_str(), e.to.as_str()))
        .collect();
    let total = pairs.len();
    pairs.sort_unstable();
    pairs.dedup();
    assert_eq!(pairs.len(), total);
    assert_eq!(total, 1);
}

#[test]
fn one_directional_declaration_emits_edge_and_info() {
    let data = DataDir::new();
    let mut a = pattern("a_zheng", "氣虛證");
    a["can_evolve_to"] = json!(["b_zheng"]);
    data.write_pattern(&a);
    data.write_pattern(&pattern("b_zheng", "血虛證"));

    let store = RecordStore::load(data.root()).unwrap();
    let graph = build_graph(&store);
    assert!(graph
        .edges
        .iter()
        .any(|e| e.from == "a_zheng" && e.to == "b_zheng"));

    let report = zhengtu_core::validate::Validator::new(&store).run();
    assert!(!report.has_errors());
    assert!(report.info.iter().any(|i| i.contains("演變關係單向")));
}

#[test]
fn relation_labels_from_severity_delta() {
    let data = DataDir::new();
    // severities: 氣虛=1, 氣脫=3, 亡陽=4
    let mut x = pattern("x_zheng", "中氣下陷證"); // severity 2
    x["can_evolve_to"] = json!(["critical_zheng", "severe_zheng", "peer_zheng"]);
    data.write_pattern(&x);
    data.write_pattern(&pattern("critical_zheng", "亡陽證"));
    data.write_pattern(&pattern("severe_zheng", "氣脫證"));
    data.write_pattern(&pattern("peer_zheng", "不固證"));

    let store = RecordStore::load(data.root()).unwrap();
    let graph = build_graph(&store);
    let relation_of = |to: &str| {
        graph
            .edges
            .iter()
            .find(|e| e.to == to)
            .map(|e| e.relation)
            .unwrap()
    };

    assert_eq!(relation_of("critical_zheng"), Relation::CriticalTurn);
    assert_eq!(relation_of("severe_zheng"), Relation::Worsening);
    assert_eq!(relation_of("peer_zheng"), Relation::Development);
}

#[test]
fn cycle_is_reported_but_graph_still_builds() {
    let data = DataDir::new();
    let mut a = pattern("a_zheng", "甲證");
    a["can_evolve_to"] = json!(["b_zheng"]);
    let mut b = pattern("b_zheng", "乙證");
    b["can_evolve_to"] = json!(["c_zheng"]);
    let mut c = pattern("c_zheng", "丙證");
    c["can_evolve_to"] = json!(["a_zheng"]);
    data.write_pattern(&a);
    data.write_pattern(&b);
    data.write_pattern(&c);

    let store = RecordStore::load(data.root()).unwrap();
    let report = zhengtu_core::validate::Validator::new(&store).run();

    let cycles: Vec<&String> = report
        .errors
        .iter()
        .filter(|e| e.contains("發現演變循環"))
        .collect();
    assert_eq!(cycles.len(), 1);
    for name in ["甲證", "乙證", "丙證"] {
        assert!(cycles[0].contains(name));
    }

    // The build is not aborted by the cycle.
    let graph = build_graph(&store);
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.edges.len(), 3);
}

#[test]
fn discovered_and_canonical_chains_dedup_by_node_set() {
    let data = DataDir::new();
    let mut a = pattern("qi_xu_zheng", "氣虛證");
    a["can_evolve_to"] = json!(["zhong_qi_xia_xian"]);
    let mut b = pattern("zhong_qi_xia_xian", "中氣下陷證");
    b["can_evolve_to"] = json!(["qi_tuo_zheng"]);
    data.write_pattern(&a);
    data.write_pattern(&b);
    data.write_pattern(&pattern("qi_tuo_zheng", "氣脫證"));

    let store = RecordStore::load(data.root()).unwrap();
    let index = build_evolution_index(
        &store,
        &NodeClassifier::default(),
        &canonical_chains(),
        chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    );

    // The discovered chain matches the curated qi-disease chain node set,
    // so exactly one survives.
    assert_eq!(index.evolution_chains.len(), 1);
    assert_eq!(
        index.evolution_chains[0].path,
        vec!["qi_xu_zheng", "zhong_qi_xia_xian", "qi_tuo_zheng"]
    );
    assert_eq!(index.evolution_chains[0].severity_progression, "輕 → 中 → 重");
}

#[test]
fn branch_point_listed_once_with_all_targets() {
    let data = DataDir::new();
    let mut fork = pattern("fork_zheng", "氣虛證");
    fork["can_evolve_to"] = json!(["left_zheng", "right_zheng"]);
    let mut straight = pattern("straight_zheng", "血虛證");
    straight["can_evolve_to"] = json!(["left_zheng"]);
    data.write_pattern(&fork);
    data.write_pattern(&straight);
    data.write_pattern(&pattern("left_zheng", "中氣下陷證"));
    data.write_pattern(&pattern("right_zheng", "氣脫證"));

    let store = RecordStore::load(data.root()).unwrap();
    let graph = build_graph(&store);
    let branch_points = graph.branch_points(&store);

    assert_eq!(branch_points.len(), 1);
    assert_eq!(branch_points[0].from, "fork_zheng");
    assert_eq!(branch_points[0].branches.len(), 2);
}

#[test]
fn rebuild_on_unchanged_data_is_byte_identical() {
    let data = DataDir::new();
    let mut a = pattern("a_zheng", "氣虛證");
    a["can_evolve_to"] = json!(["b_zheng", "c_zheng"]);
    data.write_pattern(&a);
    data.write_pattern(&pattern("b_zheng", "中氣下陷證"));
    data.write_pattern(&pattern("c_zheng", "氣脫證"));

    let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let build = || {
        let store = RecordStore::load(data.root()).unwrap();
        let index = build_evolution_index(
            &store,
            &NodeClassifier::default(),
            &canonical_chains(),
            date,
        );
        serde_json::to_string_pretty(&index).unwrap()
    };
    assert_eq!(build(), build());
}

#[test]
fn malformed_record_file_is_skipped_with_warning() {
    let data = DataDir::new();
    let mut a = pattern("a_zheng", "氣虛證");
    a["can_evolve_to"] = json!(["broken_zheng"]);
    data.write_pattern(&a);
    data.write_raw("zhengxing", "broken_zheng.json", "{not json");
    // Underscore-prefixed files are authoring metadata, never records.
    data.write_raw("zhengxing", "_meta.json", "{}");

    let store = RecordStore::load(data.root()).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.load_warnings().len(), 1);

    // The malformed record is absent from the node set; the edge that
    // referenced it falls into the dangling-reference warning path.
    let graph = build_graph(&store);
    assert!(graph.node("broken_zheng").is_none());
    assert!(graph.edges.iter().any(|e| e.to == "broken_zheng"));

    let report = zhengtu_core::validate::Validator::new(&store).run();
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("can_evolve_to") && w.contains("broken_zheng")));
}
