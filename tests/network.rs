use std::collections::BTreeSet;

use assert_matches::assert_matches;

use metsea::catalog::PathwayCatalog;
use metsea::domain::{CompoundId, PathwayId};
use metsea::error::MetseaError;
use metsea::relate::{build_graph, shared_pairs};

fn pid(id: &str) -> PathwayId {
    id.parse().unwrap()
}

fn members(ids: &[&str]) -> BTreeSet<CompoundId> {
    ids.iter().map(|id| id.parse().unwrap()).collect()
}

/// Two pathways sharing C00002 and C00003, one disjoint straggler.
fn sample_catalog() -> PathwayCatalog {
    let mut catalog = PathwayCatalog::new();
    catalog.insert(
        pid("hsa00010"),
        Some("Glycolysis".to_string()),
        members(&["C00001", "C00002", "C00003"]),
    );
    catalog.insert(
        pid("hsa00020"),
        Some("TCA cycle".to_string()),
        members(&["C00002", "C00003", "C00004"]),
    );
    catalog.insert(
        pid("hsa00030"),
        Some("Pentose phosphate".to_string()),
        members(&["C00099"]),
    );
    catalog
}

#[test]
fn pairs_meet_the_shared_threshold() {
    let catalog = sample_catalog();
    let selection = [pid("hsa00010"), pid("hsa00020")];

    let pairs = shared_pairs(&selection, &catalog, 2).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].from.as_str(), "hsa00010");
    assert_eq!(pairs[0].to.as_str(), "hsa00020");
    assert_eq!(pairs[0].shared_count, 2);
    assert_eq!(pairs[0].shared_ids, "C00002;C00003");

    // One more required compound and the pair no longer qualifies.
    let pairs = shared_pairs(&selection, &catalog, 3).unwrap();
    assert!(pairs.is_empty());
}

#[test]
fn pair_order_follows_catalog_positions() {
    let mut catalog = PathwayCatalog::new();
    for id in ["hsa00010", "hsa00020", "hsa00030"] {
        catalog.insert(pid(id), None, members(&["C00001", "C00002"]));
    }

    // Selection order is irrelevant; pairs come out in catalog order.
    let selection = [pid("hsa00030"), pid("hsa00010"), pid("hsa00020")];
    let pairs = shared_pairs(&selection, &catalog, 2).unwrap();

    let endpoints: Vec<(&str, &str)> = pairs
        .iter()
        .map(|pair| (pair.from.as_str(), pair.to.as_str()))
        .collect();
    assert_eq!(
        endpoints,
        vec![
            ("hsa00010", "hsa00020"),
            ("hsa00010", "hsa00030"),
            ("hsa00020", "hsa00030"),
        ]
    );
}

#[test]
fn unknown_and_duplicate_entries_collapse() {
    let catalog = sample_catalog();
    let selection = [
        pid("hsa00020"),
        pid("hsa00020"),
        pid("hsa99999"),
        pid("hsa00010"),
    ];

    let pairs = shared_pairs(&selection, &catalog, 2).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].from.as_str(), "hsa00010");
    assert_eq!(pairs[0].to.as_str(), "hsa00020");
}

#[test]
fn zero_threshold_is_rejected() {
    let catalog = sample_catalog();
    let err = shared_pairs(&[pid("hsa00010")], &catalog, 0).unwrap_err();
    assert_matches!(err, MetseaError::InvalidMinShared(0));
}

#[test]
fn graph_keeps_isolated_nodes() {
    let catalog = sample_catalog();
    let selection = [pid("hsa00010"), pid("hsa00020"), pid("hsa00030")];

    let pairs = shared_pairs(&selection, &catalog, 2).unwrap();
    assert_eq!(pairs.len(), 1);

    let graph = build_graph(&pairs, &selection, &catalog);
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 1);

    let ids: Vec<&str> = graph.node_weights().map(|node| node.id.as_str()).collect();
    assert_eq!(ids, vec!["hsa00010", "hsa00020", "hsa00030"]);

    let sizes: Vec<f64> = graph.node_weights().map(|node| node.size).collect();
    assert!((sizes[0] - 3f64.sqrt()).abs() < 1e-12);
    assert!((sizes[2] - 1.0).abs() < 1e-12);

    let weights: Vec<usize> = graph.edge_weights().copied().collect();
    assert_eq!(weights, vec![2]);
}

#[test]
fn fewer_than_two_pathways_yield_nothing() {
    let catalog = sample_catalog();

    assert!(shared_pairs(&[pid("hsa00010")], &catalog, 2).unwrap().is_empty());
    assert!(shared_pairs(&[], &catalog, 2).unwrap().is_empty());

    let graph = build_graph(&[], &[pid("hsa00010")], &catalog);
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.edge_count(), 0);
}
