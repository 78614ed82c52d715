//! Recommendation query
//!
//! Ranks tracks reachable in one hop from the tracks a user has engaged with.
//!
//! For every interacted track `i` (registration order) and every live
//! successor `j` of `i` (registration order) that the user has not engaged
//! with, `j` earns `weight(i, j) * (interaction_count(j) + 1)`. Scores are
//! accumulated in `u64` with saturating arithmetic: a weight is at most 100,
//! so a single contribution only saturates once a counter passes
//! `u64::MAX / 100`.
//!
//! At most [`MAX_RESULTS`] candidates are tracked. Once the set is full a
//! newly discovered track is dropped even if it would outscore everything
//! already present; there is no eviction. Ranking is a stable sort by score,
//! so ties keep discovery order.
//!
//! The query never mutates state and is deterministic for a given state.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::interactions::InteractionTracker;
use crate::store::GraphStore;
use crate::types::{Principal, TrackId};

/// Cap on candidates considered and returned by one query
pub const MAX_RESULTS: usize = 100;

/// How often (in edge inspections) the wall-clock budget is checked
const CLOCK_CHECK_INTERVAL: u64 = 1024;

/// Cooperative limit on the discovery phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryBudget {
    /// Maximum edge inspections
    pub max_steps: Option<u64>,
    /// Maximum wall-clock time spent in discovery
    pub max_duration: Option<Duration>,
}

impl QueryBudget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }
}

/// A track under consideration with its accumulated score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub track_id: TrackId,
    pub score: u64,
}

/// Ranked query output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendations {
    /// Candidates, best first
    pub candidates: Vec<Candidate>,
    /// Discovery stopped early because the budget ran out
    pub truncated: bool,
    /// Edge inspections performed
    pub steps: u64,
    /// New candidates discarded because the set was already full
    pub dropped: u64,
}

impl Recommendations {
    pub fn track_ids(&self) -> Vec<TrackId> {
        self.candidates.iter().map(|c| c.track_id).collect()
    }

    pub fn score_of(&self, track_id: TrackId) -> Option<u64> {
        self.candidates
            .iter()
            .find(|c| c.track_id == track_id)
            .map(|c| c.score)
    }
}

/// Score one edge: `weight * (interaction_count + 1)` without wraparound
pub fn score_contribution(weight: u8, interaction_count: u64) -> u64 {
    u64::from(weight).saturating_mul(interaction_count.saturating_add(1))
}

/// Read-only ranking over a store and its interaction records
pub struct RecommendationEngine<'a> {
    store: &'a GraphStore,
    tracker: &'a InteractionTracker,
}

impl<'a> RecommendationEngine<'a> {
    pub fn new(store: &'a GraphStore, tracker: &'a InteractionTracker) -> Self {
        Self { store, tracker }
    }

    /// Unbounded ranking, ids only
    pub fn get_recommendations(&self, user: &Principal) -> Vec<TrackId> {
        self.recommend(user, QueryBudget::unbounded()).track_ids()
    }

    pub fn recommend(&self, user: &Principal, budget: QueryBudget) -> Recommendations {
        let started = Instant::now();
        let mut result = Recommendations::default();

        // Interacted tracks that still exist, in registration order
        let mut sources: Vec<_> = self
            .tracker
            .interacted_tracks(user)
            .into_iter()
            .filter_map(|id| self.store.track(id))
            .collect();
        if sources.is_empty() {
            return result;
        }
        sources.sort_by_key(|node| node.seq);

        let mut candidates: Vec<Candidate> = Vec::with_capacity(MAX_RESULTS);
        let mut positions: HashMap<TrackId, usize> = HashMap::with_capacity(MAX_RESULTS);

        'discovery: for source in sources {
            for (target, weight) in self.store.live_successors(source.track_id) {
                if budget_exhausted(&budget, result.steps, started) {
                    result.truncated = true;
                    break 'discovery;
                }
                result.steps += 1;

                if target.track_id == source.track_id
                    || self.tracker.has_interacted(user, target.track_id)
                {
                    continue;
                }

                let contribution = score_contribution(weight, target.interaction_count);
                match positions.get(&target.track_id) {
                    Some(&pos) => {
                        let candidate = &mut candidates[pos];
                        candidate.score = candidate.score.saturating_add(contribution);
                    }
                    None if candidates.len() < MAX_RESULTS => {
                        positions.insert(target.track_id, candidates.len());
                        candidates.push(Candidate {
                            track_id: target.track_id,
                            score: contribution,
                        });
                    }
                    None => result.dropped += 1,
                }
            }
        }

        // sort_by is stable: equal scores stay in discovery order
        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        result.candidates = candidates;

        debug!(
            "Recommendations for {}: {} candidates, {} steps, {} dropped, truncated={}",
            user,
            result.candidates.len(),
            result.steps,
            result.dropped,
            result.truncated
        );
        result
    }
}

fn budget_exhausted(budget: &QueryBudget, steps: u64, started: Instant) -> bool {
    if budget.max_steps.is_some_and(|max| steps >= max) {
        return true;
    }
    match budget.max_duration {
        Some(limit) if steps % CLOCK_CHECK_INTERVAL == 0 => started.elapsed() >= limit,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InteractionKind;

    struct Fixture {
        store: GraphStore,
        tracker: InteractionTracker,
    }

    impl Fixture {
        fn with_tracks(ids: impl IntoIterator<Item = u64>) -> Self {
            let mut store = GraphStore::new();
            for id in ids {
                store.add_track_node(TrackId(id), format!("ipfs://{}", id)).unwrap();
            }
            Self {
                store,
                tracker: InteractionTracker::new(),
            }
        }

        fn edge(&mut self, from: u64, to: u64, weight: u32) {
            self.store.add_track_edge(TrackId(from), TrackId(to), weight).unwrap();
        }

        fn interact(&mut self, user: &str, track: u64) {
            self.tracker
                .record_interaction(
                    &mut self.store,
                    &Principal::new(user),
                    TrackId(track),
                    InteractionKind::View,
                )
                .unwrap();
        }

        fn engine(&self) -> RecommendationEngine<'_> {
            RecommendationEngine::new(&self.store, &self.tracker)
        }

        fn ids(&self, user: &str) -> Vec<TrackId> {
            self.engine().get_recommendations(&Principal::new(user))
        }
    }

    fn ids(raw: &[u64]) -> Vec<TrackId> {
        raw.iter().copied().map(TrackId).collect()
    }

    #[test]
    fn test_basic_scenario_orders_by_weight() {
        let mut f = Fixture::with_tracks([1, 2, 3]);
        f.edge(1, 2, 50);
        f.edge(1, 3, 80);
        f.interact("u", 1);

        let recs = f.engine().recommend(&Principal::new("u"), QueryBudget::unbounded());
        assert_eq!(recs.track_ids(), ids(&[3, 2]));
        assert_eq!(recs.score_of(TrackId(2)), Some(50));
        assert_eq!(recs.score_of(TrackId(3)), Some(80));
        assert!(!recs.truncated);
    }

    #[test]
    fn test_user_without_interactions_gets_nothing() {
        let mut f = Fixture::with_tracks([1, 2]);
        f.edge(1, 2, 100);
        f.interact("someone-else", 1);
        assert!(f.ids("nobody").is_empty());
    }

    #[test]
    fn test_already_interacted_tracks_excluded() {
        let mut f = Fixture::with_tracks([1, 2, 3]);
        f.edge(1, 2, 50);
        f.edge(1, 3, 80);
        f.interact("u", 1);
        f.interact("u", 3);
        assert_eq!(f.ids("u"), ids(&[2]));
    }

    #[test]
    fn test_self_loop_ignored() {
        let mut f = Fixture::with_tracks([1]);
        f.edge(1, 1, 90);
        f.interact("u", 1);
        assert!(f.ids("u").is_empty());
    }

    #[test]
    fn test_popularity_multiplies_weight() {
        let mut f = Fixture::with_tracks([1, 2, 3]);
        f.edge(1, 2, 30);
        f.edge(1, 3, 50);
        // Track 2 has been played four times by other listeners
        for listener in ["a", "b", "c", "d"] {
            f.interact(listener, 2);
        }
        f.interact("u", 1);

        let recs = f.engine().recommend(&Principal::new("u"), QueryBudget::unbounded());
        assert_eq!(recs.score_of(TrackId(2)), Some(30 * 5));
        assert_eq!(recs.score_of(TrackId(3)), Some(50));
        assert_eq!(recs.track_ids(), ids(&[2, 3]));
    }

    #[test]
    fn test_scores_accumulate_across_sources() {
        let mut f = Fixture::with_tracks([1, 2, 3, 4]);
        f.edge(1, 4, 20);
        f.edge(2, 4, 20);
        f.edge(1, 3, 30);
        f.interact("u", 1);
        f.interact("u", 2);

        let recs = f.engine().recommend(&Principal::new("u"), QueryBudget::unbounded());
        // 1 and 2 were each played once by u; 4 has not been played
        assert_eq!(recs.score_of(TrackId(4)), Some(40));
        assert_eq!(recs.track_ids(), ids(&[4, 3]));
    }

    #[test]
    fn test_monotonic_in_weight() {
        let mut previous = None;
        for w in 0..=100 {
            let mut f = Fixture::with_tracks([1, 2]);
            f.interact("other", 2);
            f.edge(1, 2, w);
            f.interact("u", 1);
            let score = f
                .engine()
                .recommend(&Principal::new("u"), QueryBudget::unbounded())
                .score_of(TrackId(2))
                .unwrap();
            if let Some(prev) = previous {
                assert!(score > prev, "score must grow with weight ({} -> {})", prev, score);
            }
            previous = Some(score);
        }
    }

    #[test]
    fn test_repeated_query_is_identical() {
        let mut f = Fixture::with_tracks(1..=20);
        for to in 2..=20 {
            f.edge(1, to, (to * 7 % 101) as u32);
        }
        f.interact("u", 1);

        let first = f.ids("u");
        let second = f.ids("u");
        assert_eq!(first, second);
        assert_eq!(first.len(), 19);
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        // Registration order 5, 9, 2 fixes discovery order among successors
        let mut f = Fixture::with_tracks([1, 5, 9, 2]);
        f.edge(1, 2, 40);
        f.edge(1, 9, 40);
        f.edge(1, 5, 40);
        f.interact("u", 1);
        assert_eq!(f.ids("u"), ids(&[5, 9, 2]));
    }

    #[test]
    fn test_ties_across_sources_keep_first_discovery() {
        let mut f = Fixture::with_tracks([1, 2, 3, 4]);
        // 4 is discovered from source 1, 3 only from source 2
        f.edge(1, 4, 25);
        f.edge(2, 3, 25);
        f.interact("u", 2);
        f.interact("u", 1);
        assert_eq!(f.ids("u"), ids(&[4, 3]));
    }

    #[test]
    fn test_cap_drops_late_candidates_regardless_of_weight() {
        let mut f = Fixture::with_tracks(0..=MAX_RESULTS as u64 + 1);
        for to in 1..=MAX_RESULTS as u64 {
            f.edge(0, to, 1);
        }
        // The 101st successor would outscore everyone
        f.edge(0, MAX_RESULTS as u64 + 1, 100);
        f.interact("u", 0);

        let recs = f.engine().recommend(&Principal::new("u"), QueryBudget::unbounded());
        assert_eq!(recs.candidates.len(), MAX_RESULTS);
        assert_eq!(recs.dropped, 1);
        assert!(recs.score_of(TrackId(MAX_RESULTS as u64 + 1)).is_none());
        let expected: Vec<TrackId> = (1..=MAX_RESULTS as u64).map(TrackId).collect();
        assert_eq!(recs.track_ids(), expected);
    }

    #[test]
    fn test_existing_candidate_still_accumulates_when_full() {
        let mut f = Fixture::with_tracks(0..=MAX_RESULTS as u64 + 2);
        let second_source = MAX_RESULTS as u64 + 2;
        for to in 1..=MAX_RESULTS as u64 {
            f.edge(0, to, 1);
        }
        f.edge(second_source, 50, 100);
        f.interact("u", 0);
        f.interact("u", second_source);

        let recs = f.engine().recommend(&Principal::new("u"), QueryBudget::unbounded());
        assert_eq!(recs.candidates.len(), MAX_RESULTS);
        assert_eq!(recs.candidates[0], Candidate { track_id: TrackId(50), score: 101 });
    }

    #[test]
    fn test_removed_targets_are_skipped() {
        use crate::access::AccessController;

        let mut f = Fixture::with_tracks([1, 2, 3]);
        f.edge(1, 2, 50);
        f.edge(1, 3, 80);
        f.interact("u", 1);

        let owner = Principal::new("owner");
        let access = AccessController::new(owner.clone());
        f.store.remove_track_node(&access, &owner, TrackId(3)).unwrap();

        assert_eq!(f.ids("u"), ids(&[2]));
    }

    #[test]
    fn test_step_budget_truncates() {
        let mut f = Fixture::with_tracks(0..=10);
        for to in 1..=10 {
            f.edge(0, to, to as u32);
        }
        f.interact("u", 0);

        let recs = f
            .engine()
            .recommend(&Principal::new("u"), QueryBudget::unbounded().with_max_steps(4));
        assert!(recs.truncated);
        assert_eq!(recs.steps, 4);
        assert_eq!(recs.track_ids(), ids(&[4, 3, 2, 1]));
    }

    #[test]
    fn test_budget_large_enough_is_not_truncated() {
        let mut f = Fixture::with_tracks(0..=3);
        for to in 1..=3 {
            f.edge(0, to, 10);
        }
        f.interact("u", 0);

        let recs = f.engine().recommend(
            &Principal::new("u"),
            QueryBudget::unbounded()
                .with_max_steps(3)
                .with_max_duration(Duration::from_secs(60)),
        );
        assert!(!recs.truncated);
        assert_eq!(recs.candidates.len(), 3);
    }

    #[test]
    fn test_zero_duration_budget_truncates_immediately() {
        let mut f = Fixture::with_tracks(0..=3);
        for to in 1..=3 {
            f.edge(0, to, 10);
        }
        f.interact("u", 0);

        let recs = f.engine().recommend(
            &Principal::new("u"),
            QueryBudget::unbounded().with_max_duration(Duration::ZERO),
        );
        assert!(recs.truncated);
        assert!(recs.candidates.is_empty());
    }

    #[test]
    fn test_score_contribution_saturates() {
        assert_eq!(score_contribution(50, 0), 50);
        assert_eq!(score_contribution(0, 1_000), 0);
        assert_eq!(score_contribution(100, u64::MAX), u64::MAX);
        assert_eq!(score_contribution(100, u64::MAX / 100), u64::MAX);
    }
}
