//! Archive - bounded set of mutually non-dominated candidates
//!
//! One `RwLock` guards the member list. `add` holds the write lock for the
//! whole scan, insert and prune so concurrent inserts serialize only here.
//! Diversity is measured with NSGA-II crowding distance.

use crate::candidate::Candidate;
use crate::scores::{Dimension, ScoreWeights};
use std::cmp::Ordering;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Capacity used when zero is configured
pub const DEFAULT_ARCHIVE_CAPACITY: usize = 50;

/// What `add` did with a candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Stored
    Inserted {
        /// Members removed because the new candidate dominates them
        evicted: Vec<String>,
        /// Members removed by crowding-distance pruning
        pruned: Vec<String>,
    },
    /// Not stored
    Rejected {
        /// Member that dominates the candidate; `None` for an unscored candidate
        dominated_by: Option<String>,
    },
}

impl AddOutcome {
    /// Whether the candidate was stored (it may still be pruned later)
    #[must_use]
    pub fn is_inserted(&self) -> bool {
        matches!(self, AddOutcome::Inserted { .. })
    }
}

/// Pareto archive
pub struct ParetoArchive {
    capacity: usize,
    members: RwLock<Vec<Arc<Candidate>>>,
}

impl ParetoArchive {
    /// Create an archive; a capacity of 0 means the default
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_ARCHIVE_CAPACITY
        } else {
            capacity
        };
        Self {
            capacity,
            members: RwLock::new(Vec::new()),
        }
    }

    /// Configured capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored candidates
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the archive is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offer a scored candidate to the archive
    pub fn add(&self, candidate: Candidate) -> AddOutcome {
        if candidate.scores().is_none() {
            return AddOutcome::Rejected { dominated_by: None };
        }

        let mut members = self.members.write().unwrap_or_else(|e| e.into_inner());

        if let Some(dominator) = members.iter().find(|m| m.dominates(&candidate)) {
            debug!(candidate = %candidate.id, dominated_by = %dominator.id, "Candidate dominated, discarded");
            return AddOutcome::Rejected {
                dominated_by: Some(dominator.id.clone()),
            };
        }

        let mut evicted = Vec::new();
        members.retain(|m| {
            if candidate.dominates(m) {
                evicted.push(m.id.clone());
                false
            } else {
                true
            }
        });

        debug!(candidate = %candidate.id, evicted = evicted.len(), "Candidate inserted");
        members.push(Arc::new(candidate));

        let pruned = if members.len() > self.capacity {
            prune(&mut members, self.capacity)
        } else {
            Vec::new()
        };

        AddOutcome::Inserted { evicted, pruned }
    }

    /// Snapshot of the members in insertion order
    #[must_use]
    pub fn pareto_front(&self) -> Vec<Arc<Candidate>> {
        self.members.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Crowding distance of each member, aligned with [`Self::pareto_front`]
    #[must_use]
    pub fn crowding_distances(&self) -> Vec<f64> {
        crowding_distances(&self.members.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// The `n` most isolated members; all members when `n` covers the archive
    #[must_use]
    pub fn select_for_mutation(&self, n: usize) -> Vec<Arc<Candidate>> {
        let members = self.members.read().unwrap_or_else(|e| e.into_inner());
        if n == 0 || members.is_empty() {
            return Vec::new();
        }
        if n >= members.len() {
            return members.clone();
        }

        rank_by_distance(&members)
            .into_iter()
            .take(n)
            .map(|i| Arc::clone(&members[i]))
            .collect()
    }

    /// Member with the largest weighted score; first one wins a tie
    #[must_use]
    pub fn best_by_weighted_sum(&self, weights: &ScoreWeights) -> Option<Arc<Candidate>> {
        let members = self.members.read().unwrap_or_else(|e| e.into_inner());
        let mut best: Option<(&Arc<Candidate>, f64)> = None;
        for member in members.iter() {
            let score = member.weighted_score(weights);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((member, score));
            }
        }
        best.map(|(member, _)| Arc::clone(member))
    }
}

/// NSGA-II crowding distance per member.
///
/// Boundary members of each dimension get `+inf`; interior members add the
/// normalised gap between their neighbours. Dimensions with zero range are
/// skipped entirely.
#[must_use]
pub fn crowding_distances(members: &[Arc<Candidate>]) -> Vec<f64> {
    let n = members.len();
    let mut distances = vec![0.0; n];
    if n == 0 {
        return distances;
    }

    let values: Vec<[f64; 6]> = members
        .iter()
        .map(|m| m.scores().map_or([0.0; 6], |s| s.to_array()))
        .collect();

    for (d, _) in Dimension::ALL.iter().enumerate() {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            values[a][d]
                .total_cmp(&values[b][d])
                .then_with(|| content_cmp(&members[a], &members[b]))
        });

        let min = values[order[0]][d];
        let max = values[order[n - 1]][d];
        let range = max - min;
        if range == 0.0 {
            continue;
        }

        distances[order[0]] = f64::INFINITY;
        distances[order[n - 1]] = f64::INFINITY;
        for w in order.windows(3) {
            let (prev, mid, next) = (w[0], w[1], w[2]);
            distances[mid] += (values[next][d] - values[prev][d]) / range;
        }
    }

    distances
}

/// Orders candidates by content alone: score vector, then strategy, then
/// lessons. Used to break distance ties so arrival order never decides.
fn content_cmp(a: &Candidate, b: &Candidate) -> Ordering {
    let scores = |c: &Candidate| c.scores().map_or([0.0; 6], |s| s.to_array());
    let (sa, sb) = (scores(a), scores(b));
    sa.iter()
        .zip(&sb)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.strategy.cmp(&b.strategy))
        .then_with(|| a.lessons().cmp(b.lessons()))
}

/// Member indices ordered by crowding distance, largest first. Equal
/// distances go to the larger score vector.
fn rank_by_distance(members: &[Arc<Candidate>]) -> Vec<usize> {
    let distances = crowding_distances(members);
    let mut order: Vec<usize> = (0..members.len()).collect();
    order.sort_by(|&a, &b| {
        distances[b]
            .total_cmp(&distances[a])
            .then_with(|| content_cmp(&members[b], &members[a]))
    });
    order
}

/// Keep the `capacity` most isolated members, in their original order
fn prune(members: &mut Vec<Arc<Candidate>>, capacity: usize) -> Vec<String> {
    let ranked = rank_by_distance(members);
    let mut keep = vec![false; members.len()];
    for &i in ranked.iter().take(capacity) {
        keep[i] = true;
    }

    let mut pruned = Vec::new();
    let mut idx = 0;
    members.retain(|m| {
        let kept = keep[idx];
        idx += 1;
        if !kept {
            pruned.push(m.id.clone());
        }
        kept
    });

    debug!(pruned = pruned.len(), capacity, "Archive pruned by crowding distance");
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::ExecutionTrace;
    use crate::scores::Scores;

    fn scored(values: [f64; 6]) -> Candidate {
        let mut c = Candidate::seed("s");
        c.assign_evaluation(ExecutionTrace::default(), Scores::from_array(values), "")
            .unwrap();
        c
    }

    #[test]
    fn test_capacity_zero_uses_default() {
        assert_eq!(ParetoArchive::new(0).capacity(), DEFAULT_ARCHIVE_CAPACITY);
        assert_eq!(ParetoArchive::new(7).capacity(), 7);
    }

    #[test]
    fn test_unscored_rejected() {
        let archive = ParetoArchive::new(5);
        let outcome = archive.add(Candidate::seed("s"));
        assert_eq!(outcome, AddOutcome::Rejected { dominated_by: None });
        assert!(archive.is_empty());
    }

    #[test]
    fn test_dominated_rejected_and_dominating_evicts() {
        let archive = ParetoArchive::new(5);
        let mid = scored([3.0; 6]);
        let mid_id = mid.id.clone();
        assert!(archive.add(mid).is_inserted());

        let worse = archive.add(scored([2.0; 6]));
        assert_eq!(
            worse,
            AddOutcome::Rejected {
                dominated_by: Some(mid_id.clone())
            }
        );

        let better = archive.add(scored([4.0; 6]));
        assert_eq!(
            better,
            AddOutcome::Inserted {
                evicted: vec![mid_id],
                pruned: vec![]
            }
        );
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_equal_scores_coexist() {
        let archive = ParetoArchive::new(5);
        archive.add(scored([3.0; 6]));
        assert!(archive.add(scored([3.0; 6])).is_inserted());
        assert_eq!(archive.len(), 2);
    }

    #[test]
    fn test_crowding_boundaries_and_interior() {
        // Only effectiveness varies: 1, 2, 4
        let members: Vec<_> = [1.0, 2.0, 4.0]
            .iter()
            .map(|&e| Arc::new(scored([e, 3.0, 3.0, 3.0, 3.0, 3.0])))
            .collect();

        let d = crowding_distances(&members);
        assert!(d[0].is_infinite());
        assert!(d[2].is_infinite());
        assert!((d[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_crowding_zero_range_skipped() {
        let members: Vec<_> = (0..3).map(|_| Arc::new(scored([3.0; 6]))).collect();
        assert_eq!(crowding_distances(&members), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_prune_drops_most_crowded() {
        // A trade-off line on effectiveness vs answer_quality
        let archive = ParetoArchive::new(3);
        let ids: Vec<_> = [(1.0, 5.0), (2.0, 4.0), (2.5, 3.5), (5.0, 1.0)]
            .iter()
            .map(|&(e, q)| {
                let c = scored([e, q, 3.0, 3.0, 3.0, 3.0]);
                let id = c.id.clone();
                archive.add(c);
                id
            })
            .collect();

        assert_eq!(archive.len(), 3);
        let kept: Vec<_> = archive.pareto_front().iter().map(|c| c.id.clone()).collect();
        assert!(kept.contains(&ids[0]));
        assert!(kept.contains(&ids[3]));
    }

    #[test]
    fn test_prune_survivors_independent_of_arrival_order() {
        let vectors = [
            [5.0, 1.0, 3.0, 3.0, 3.0, 3.0],
            [1.0, 5.0, 3.0, 3.0, 3.0, 3.0],
            [3.0, 3.0, 5.0, 1.0, 3.0, 3.0],
        ];
        let survivors = |order: &[usize]| {
            let archive = ParetoArchive::new(2);
            for &i in order {
                archive.add(scored(vectors[i]));
            }
            let mut kept: Vec<_> = archive
                .pareto_front()
                .iter()
                .filter_map(|c| c.scores().map(Scores::to_array))
                .collect();
            kept.sort_by(|a, b| a.partial_cmp(b).unwrap());
            kept
        };

        let forward = survivors(&[0, 1, 2]);
        assert_eq!(forward.len(), 2);
        assert_eq!(forward, survivors(&[2, 1, 0]));
        assert_eq!(forward, survivors(&[1, 2, 0]));
        assert_eq!(forward, vec![vectors[2], vectors[0]]);
    }

    #[test]
    fn test_select_for_mutation_ties_follow_content() {
        let low = scored([1.0, 5.0, 3.0, 3.0, 3.0, 3.0]);
        let high = scored([5.0, 1.0, 3.0, 3.0, 3.0, 3.0]);
        let high_id = high.id.clone();

        let archive = ParetoArchive::new(10);
        archive.add(low);
        archive.add(high);

        let picked = archive.select_for_mutation(1);
        assert_eq!(picked[0].id, high_id);
    }

    #[test]
    fn test_select_for_mutation() {
        let archive = ParetoArchive::new(10);
        for (e, q) in [(1.0, 5.0), (2.0, 4.0), (2.2, 3.8), (5.0, 1.0)] {
            archive.add(scored([e, q, 3.0, 3.0, 3.0, 3.0]));
        }

        assert!(archive.select_for_mutation(0).is_empty());
        assert_eq!(archive.select_for_mutation(10).len(), 4);

        let front = archive.pareto_front();
        let picked = archive.select_for_mutation(2);
        let picked_ids: Vec<_> = picked.iter().map(|c| c.id.clone()).collect();
        assert_eq!(picked_ids, vec![front[0].id.clone(), front[3].id.clone()]);
    }

    #[test]
    fn test_best_by_weighted_sum_first_wins_tie() {
        let archive = ParetoArchive::new(10);
        assert!(archive.best_by_weighted_sum(&ScoreWeights::default()).is_none());

        let first = scored([5.0, 1.0, 3.0, 3.0, 3.0, 3.0]);
        let first_id = first.id.clone();
        archive.add(first);
        archive.add(scored([1.0, 5.0, 3.0, 3.0, 3.0, 3.0]));

        let equal_weights = ScoreWeights {
            effectiveness: 0.5,
            answer_quality: 0.5,
            hallucination: 0.0,
            specificity: 0.0,
            token_cost: 0.0,
            latency: 0.0,
        };
        let best = archive.best_by_weighted_sum(&equal_weights).unwrap();
        assert_eq!(best.id, first_id);
    }
}
