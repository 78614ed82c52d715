//! Recommendation behavior tests against the public TrackGraph API
//!
//! Tests cover:
//! - Weight validation and edge visibility
//! - Duplicate registration
//! - Empty result for users without history
//! - Ranking, tie-break, and the candidate cap
//! - Owner-gated removal

use trackgraph_core::{
    GraphConfig, GraphError, InteractionKind, Principal, QueryBudget, TrackGraph, TrackId,
    MAX_RESULTS,
};

const OWNER: &str = "0xowner";

fn new_graph() -> TrackGraph {
    TrackGraph::new(GraphConfig::new(OWNER))
}

fn register(graph: &TrackGraph, ids: impl IntoIterator<Item = u64>) {
    for id in ids {
        graph
            .add_track_node(TrackId(id), format!("ipfs://track/{}", id))
            .expect("track registration should succeed");
    }
}

// =============================================================================
// Graph mutation properties
// =============================================================================

#[test]
fn test_all_valid_weights_observable() {
    let graph = new_graph();
    register(&graph, 0..=101);

    for w in 0..=100u32 {
        let to = TrackId(u64::from(w) + 1);
        graph.add_track_edge(TrackId(0), to, w).unwrap();
        assert!(graph.edge_exists(TrackId(0), to), "weight {} should be stored", w);
    }
}

#[test]
fn test_out_of_range_weight_leaves_state_unchanged() {
    let graph = new_graph();
    register(&graph, [1, 2]);
    let before = graph.snapshot();

    assert_eq!(
        graph.add_track_edge(TrackId(1), TrackId(2), 101),
        Err(GraphError::InvalidWeight(101))
    );
    assert!(!graph.edge_exists(TrackId(1), TrackId(2)));
    assert_eq!(graph.snapshot(), before);
}

#[test]
fn test_second_registration_fails_and_keeps_first() {
    let graph = new_graph();
    graph.add_track_node(TrackId(5), "ipfs://first").unwrap();

    let result = graph.add_track_node(TrackId(5), "ipfs://second");

    assert!(matches!(result, Err(GraphError::AlreadyExists(_))));
    let node = graph.track(TrackId(5)).unwrap();
    assert_eq!(node.metadata_uri, "ipfs://first");
    assert_eq!(node.interaction_count, 0);
    assert_eq!(graph.stats().registered_total, 1);
}

#[test]
fn test_non_owner_cannot_remove() {
    let graph = new_graph();
    register(&graph, [1]);

    let result = graph.remove_track_node(&Principal::new("0xsomeone"), TrackId(1));

    assert!(matches!(result, Err(GraphError::Unauthorized(_))));
    assert!(graph.track_exists(TrackId(1)));
}

#[test]
fn test_artist_registration() {
    let graph = new_graph();
    let artist = Principal::new("0xartist");
    assert!(!graph.artist_exists(&artist));

    graph.add_artist_node(artist.clone(), "ipfs://artist").unwrap();

    assert!(graph.artist_exists(&artist));
    assert!(matches!(
        graph.add_artist_node(artist, "ipfs://again"),
        Err(GraphError::AlreadyExists(_))
    ));
}

// =============================================================================
// Recommendation properties
// =============================================================================

#[test]
fn test_fresh_user_gets_empty_list() {
    let graph = new_graph();
    register(&graph, [1, 2]);
    graph.add_track_edge(TrackId(1), TrackId(2), 100).unwrap();

    assert!(graph.get_recommendations(&Principal::new("newcomer")).is_empty());
}

#[test]
fn test_three_track_scenario() {
    let graph = new_graph();
    register(&graph, [1, 2, 3]);
    graph.add_track_edge(TrackId(1), TrackId(2), 50).unwrap();
    graph.add_track_edge(TrackId(1), TrackId(3), 80).unwrap();
    let user = Principal::new("U");
    graph.record_interaction(&user, TrackId(1), InteractionKind::View).unwrap();

    let recs = graph.recommend(&user, QueryBudget::unbounded());

    assert_eq!(recs.track_ids(), vec![TrackId(3), TrackId(2)]);
    assert_eq!(recs.score_of(TrackId(3)), Some(80));
    assert_eq!(recs.score_of(TrackId(2)), Some(50));
}

#[test]
fn test_query_is_idempotent() {
    let graph = new_graph();
    register(&graph, 0..30);
    for to in 1..30 {
        graph
            .add_track_edge(TrackId(0), TrackId(to), (to % 4) as u32 * 10)
            .unwrap();
    }
    let user = Principal::new("u");
    graph.record_interaction(&user, TrackId(0), InteractionKind::Like).unwrap();

    let first = graph.get_recommendations(&user);
    let second = graph.get_recommendations(&user);

    assert_eq!(first, second);
    assert_eq!(graph.track(TrackId(0)).unwrap().interaction_count, 1);
}

#[test]
fn test_equal_scores_follow_discovery_order() {
    let graph = new_graph();
    register(&graph, [100, 30, 20, 10]);
    graph.add_track_edge(TrackId(100), TrackId(10), 25).unwrap();
    graph.add_track_edge(TrackId(100), TrackId(20), 25).unwrap();
    graph.add_track_edge(TrackId(100), TrackId(30), 25).unwrap();
    let user = Principal::new("u");
    graph.record_interaction(&user, TrackId(100), InteractionKind::View).unwrap();

    assert_eq!(
        graph.get_recommendations(&user),
        vec![TrackId(30), TrackId(20), TrackId(10)]
    );
}

#[test]
fn test_cap_keeps_first_hundred_discovered() {
    let graph = new_graph();
    let hub = 0u64;
    let extra = MAX_RESULTS as u64 + 1;
    register(&graph, hub..=extra);
    for to in 1..extra {
        graph.add_track_edge(TrackId(hub), TrackId(to), 1).unwrap();
    }
    graph.add_track_edge(TrackId(hub), TrackId(extra), 100).unwrap();
    let user = Principal::new("u");
    graph.record_interaction(&user, TrackId(hub), InteractionKind::View).unwrap();

    let recommended = graph.get_recommendations(&user);

    assert_eq!(recommended.len(), MAX_RESULTS);
    assert!(!recommended.contains(&TrackId(extra)));
    let expected: Vec<TrackId> = (1..extra).map(TrackId).collect();
    assert_eq!(recommended, expected);
}

#[test]
fn test_removed_track_not_recommended() {
    let graph = new_graph();
    register(&graph, [1, 2, 3]);
    graph.add_track_edge(TrackId(1), TrackId(2), 90).unwrap();
    graph.add_track_edge(TrackId(1), TrackId(3), 10).unwrap();
    let user = Principal::new("u");
    graph.record_interaction(&user, TrackId(1), InteractionKind::Share).unwrap();

    graph
        .remove_track_node(&Principal::new(OWNER), TrackId(2))
        .unwrap();

    assert!(!graph.edge_exists(TrackId(1), TrackId(2)));
    assert_eq!(graph.get_recommendations(&user), vec![TrackId(3)]);
}

#[test]
fn test_removed_source_contributes_nothing() {
    let graph = new_graph();
    register(&graph, [1, 2]);
    graph.add_track_edge(TrackId(1), TrackId(2), 90).unwrap();
    let user = Principal::new("u");
    graph.record_interaction(&user, TrackId(1), InteractionKind::View).unwrap();

    graph
        .remove_track_node(&Principal::new(OWNER), TrackId(1))
        .unwrap();

    // The membership survives removal but the source is gone
    assert!(graph.has_interacted(&user, TrackId(1)));
    assert!(graph.get_recommendations(&user).is_empty());
}
