// =============================================================================
// Proto-Object Registry — Frame-to-Frame Persistence Matching
// =============================================================================
//
// Maintains continuity identity for clusters across frames. Lifecycle per
// object: BORN -> (SURVIVING)* -> DEAD, with no resurrection — once an id is
// retired, a later spatially coincident cluster is a new birth under a new,
// strictly greater id.
//
// Matching is greedy and order-dependent: previous objects are processed in
// insertion order and each claims the nearest still-unclaimed cluster by
// Euclidean centroid distance. This is NOT an optimal bipartite assignment;
// ties and local greediness can pair suboptimally. The behaviour is kept
// exactly as-is for compatibility with existing recordings (see DESIGN.md).
//
// Strictly single-threaded: each frame's matching depends on the previous
// frame's registry state.

use serde::Serialize;

use crate::tracker::cluster::Cluster;

/// A tracked spatial cluster with persistent identity.
#[derive(Debug, Clone, Serialize)]
pub struct ProtoObject {
    /// Unique, monotonically increasing id. Never reused.
    pub id: u64,
    pub centroid: (f64, f64),
    pub points: Vec<(usize, usize)>,
    /// Number of consecutive frames observed, starting at 1.
    pub age: u32,
}

/// Lifecycle annotation kinds emitted per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleEvent {
    Birth,
    Survive,
    Death,
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Birth => write!(f, "birth"),
            Self::Survive => write!(f, "survive"),
            Self::Death => write!(f, "death"),
        }
    }
}

/// One lifecycle annotation: reporting output only, never fed back into the
/// matcher.
#[derive(Debug, Clone, Serialize)]
pub struct FrameEvent {
    pub kind: LifecycleEvent,
    pub id: u64,
    pub age: u32,
    pub points: Vec<(usize, usize)>,
}

fn centroid_dist(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dr = a.0 - b.0;
    let dc = a.1 - b.1;
    (dr * dr + dc * dc).sqrt()
}

/// Advance the registry by one frame.
///
/// Consumes the previous registry and the current frame's clusters; returns
/// the new registry, the frame's lifecycle annotations, and the next unused
/// id. Previous objects claim clusters greedily in insertion order; a claim
/// is accepted only within `dist_thresh`. Unclaimed previous objects die
/// (dropped entirely — no ghost state); unclaimed clusters are born with the
/// next monotonic id and age 1.
pub fn advance_frame(
    clusters: &[Cluster],
    registry: Vec<ProtoObject>,
    mut next_id: u64,
    dist_thresh: f64,
) -> (Vec<ProtoObject>, Vec<FrameEvent>, u64) {
    let mut claimed = vec![false; clusters.len()];
    let mut new_registry = Vec::with_capacity(clusters.len());
    let mut events = Vec::new();

    for prev in registry {
        let mut best: Option<(usize, f64)> = None;
        for (ci, cluster) in clusters.iter().enumerate() {
            if claimed[ci] {
                continue;
            }
            let d = centroid_dist(prev.centroid, cluster.centroid);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((ci, d));
            }
        }

        match best {
            Some((ci, d)) if d <= dist_thresh => {
                claimed[ci] = true;
                let survived = ProtoObject {
                    id: prev.id,
                    centroid: clusters[ci].centroid,
                    points: clusters[ci].points.clone(),
                    age: prev.age + 1,
                };
                events.push(FrameEvent {
                    kind: LifecycleEvent::Survive,
                    id: survived.id,
                    age: survived.age,
                    points: survived.points.clone(),
                });
                new_registry.push(survived);
            }
            _ => {
                events.push(FrameEvent {
                    kind: LifecycleEvent::Death,
                    id: prev.id,
                    age: prev.age,
                    points: prev.points,
                });
            }
        }
    }

    for (ci, cluster) in clusters.iter().enumerate() {
        if claimed[ci] {
            continue;
        }
        let born = ProtoObject {
            id: next_id,
            centroid: cluster.centroid,
            points: cluster.points.clone(),
            age: 1,
        };
        next_id += 1;
        events.push(FrameEvent {
            kind: LifecycleEvent::Birth,
            id: born.id,
            age: 1,
            points: born.points.clone(),
        });
        new_registry.push(born);
    }

    (new_registry, events, next_id)
}

/// Owning wrapper around the registry and the id counter.
#[derive(Debug, Default)]
pub struct ProtoTracker {
    registry: Vec<ProtoObject>,
    next_id: u64,
}

impl ProtoTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> &[ProtoObject] {
        &self.registry
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Run one frame of matching against `clusters`.
    pub fn advance(&mut self, clusters: &[Cluster], dist_thresh: f64) -> Vec<FrameEvent> {
        let registry = std::mem::take(&mut self.registry);
        let (new_registry, events, next_id) =
            advance_frame(clusters, registry, self.next_id, dist_thresh);
        self.registry = new_registry;
        self.next_id = next_id;
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster_at(points: &[(usize, usize)]) -> Cluster {
        Cluster::from_points(points.to_vec())
    }

    fn blob(row: usize, col: usize) -> Cluster {
        cluster_at(&[(row, col), (row, col + 1), (row + 1, col)])
    }

    #[test]
    fn single_object_lifecycle() {
        // One cluster in frames 1-3, absent in frame 4, back in frame 5:
        // birth(id 0), survive(age 2), survive(age 3), death, birth(id 1).
        let mut tracker = ProtoTracker::new();
        let thresh = 5.0;

        let ev1 = tracker.advance(&[blob(5, 5)], thresh);
        assert_eq!(ev1.len(), 1);
        assert_eq!(ev1[0].kind, LifecycleEvent::Birth);
        assert_eq!(ev1[0].id, 0);
        assert_eq!(tracker.objects()[0].age, 1);

        let ev2 = tracker.advance(&[blob(5, 5)], thresh);
        assert_eq!(ev2[0].kind, LifecycleEvent::Survive);
        assert_eq!(ev2[0].id, 0);
        assert_eq!(tracker.objects()[0].age, 2);

        let ev3 = tracker.advance(&[blob(5, 5)], thresh);
        assert_eq!(ev3[0].kind, LifecycleEvent::Survive);
        assert_eq!(tracker.objects()[0].age, 3);

        let ev4 = tracker.advance(&[], thresh);
        assert_eq!(ev4.len(), 1);
        assert_eq!(ev4[0].kind, LifecycleEvent::Death);
        assert_eq!(ev4[0].id, 0);
        assert!(tracker.objects().is_empty());

        // Same location, new identity.
        let ev5 = tracker.advance(&[blob(5, 5)], thresh);
        assert_eq!(ev5[0].kind, LifecycleEvent::Birth);
        assert_eq!(ev5[0].id, 1);
        assert_eq!(tracker.objects()[0].age, 1);
    }

    #[test]
    fn ids_are_strictly_monotonic() {
        let mut tracker = ProtoTracker::new();
        tracker.advance(&[blob(0, 0), blob(20, 20)], 3.0);
        assert_eq!(tracker.next_id(), 2);

        tracker.advance(&[], 3.0);
        let ev = tracker.advance(&[blob(0, 0)], 3.0);
        assert_eq!(ev[0].id, 2);
        assert!(tracker.objects().iter().all(|o| o.id >= 2));
    }

    #[test]
    fn match_beyond_threshold_is_death_plus_birth() {
        let mut tracker = ProtoTracker::new();
        tracker.advance(&[blob(0, 0)], 3.0);

        let ev = tracker.advance(&[blob(20, 20)], 3.0);
        let kinds: Vec<LifecycleEvent> = ev.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![LifecycleEvent::Death, LifecycleEvent::Birth]);
        assert_eq!(tracker.objects()[0].id, 1);
    }

    #[test]
    fn drift_within_threshold_survives_and_updates() {
        let mut tracker = ProtoTracker::new();
        tracker.advance(&[blob(10, 10)], 5.0);
        let before = tracker.objects()[0].centroid;

        tracker.advance(&[blob(11, 11)], 5.0);
        let obj = &tracker.objects()[0];
        assert_eq!(obj.id, 0);
        assert_eq!(obj.age, 2);
        assert!(centroid_dist(before, obj.centroid) > 0.0);
    }

    #[test]
    fn greedy_claims_in_insertion_order() {
        // Two previous objects, one cluster between them but closer to the
        // first: the first-inserted object claims it, the second dies, even
        // though a global matcher might have paired differently.
        let mut tracker = ProtoTracker::new();
        tracker.advance(&[blob(0, 0), blob(4, 4)], 10.0);

        let ev = tracker.advance(&[blob(2, 2)], 10.0);
        let survive: Vec<_> = ev
            .iter()
            .filter(|e| e.kind == LifecycleEvent::Survive)
            .collect();
        let death: Vec<_> = ev
            .iter()
            .filter(|e| e.kind == LifecycleEvent::Death)
            .collect();
        assert_eq!(survive.len(), 1);
        assert_eq!(survive[0].id, 0);
        assert_eq!(death.len(), 1);
        assert_eq!(death[0].id, 1);
    }

    #[test]
    fn replay_is_deterministic() {
        let frames: Vec<Vec<Cluster>> = vec![
            vec![blob(2, 2), blob(20, 20)],
            vec![blob(3, 3), blob(20, 21)],
            vec![blob(20, 22)],
            vec![blob(2, 2), blob(20, 23)],
        ];

        let run = |frames: &[Vec<Cluster>]| -> Vec<Vec<(u64, u32)>> {
            let mut tracker = ProtoTracker::new();
            frames
                .iter()
                .map(|clusters| {
                    tracker.advance(clusters, 5.0);
                    tracker.objects().iter().map(|o| (o.id, o.age)).collect()
                })
                .collect()
        };

        assert_eq!(run(&frames), run(&frames));
    }

    #[test]
    fn empty_frame_kills_everything() {
        let mut tracker = ProtoTracker::new();
        tracker.advance(&[blob(1, 1), blob(9, 9), blob(17, 17)], 3.0);
        let ev = tracker.advance(&[], 3.0);
        assert_eq!(ev.len(), 3);
        assert!(ev.iter().all(|e| e.kind == LifecycleEvent::Death));
        assert!(tracker.objects().is_empty());
    }
}
