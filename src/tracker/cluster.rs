// =============================================================================
// Density Clustering of Reaction Points
// =============================================================================
//
// DBSCAN-style grouping without the machinery: for every unvisited point,
// gather its eps-neighbourhood; if it meets the density floor, grow the
// cluster to a fixpoint by absorbing the neighbourhood of every member that
// is itself dense (full transitive closure through core points). Points that
// never reach the density floor are noise and are simply ignored — a point
// that fails to seed a cluster may still be absorbed by a later one.
//
// Membership is deterministic for a given input; only the emission order of
// clusters depends on point order.

use serde::Serialize;

/// A group of reaction points plus their mean coordinate.
#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    pub points: Vec<(usize, usize)>,
    pub centroid: (f64, f64),
}

impl Cluster {
    pub fn from_points(mut points: Vec<(usize, usize)>) -> Self {
        points.sort_unstable();
        let n = points.len().max(1) as f64;
        let (sum_r, sum_c) = points
            .iter()
            .fold((0.0, 0.0), |(r, c), p| (r + p.0 as f64, c + p.1 as f64));
        Self {
            points,
            centroid: (sum_r / n, sum_c / n),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn dist(a: (usize, usize), b: (usize, usize)) -> f64 {
    let dr = a.0 as f64 - b.0 as f64;
    let dc = a.1 as f64 - b.1 as f64;
    (dr * dr + dc * dc).sqrt()
}

/// Indices of all points within `eps` of `points[idx]` (itself included).
fn neighbourhood(points: &[(usize, usize)], idx: usize, eps: f64) -> Vec<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| dist(points[idx], **p) <= eps)
        .map(|(j, _)| j)
        .collect()
}

/// Group `points` into density clusters with radius `eps` and density floor
/// `min_samples`. Sub-density points are dropped as noise.
pub fn cluster_points(points: &[(usize, usize)], eps: f64, min_samples: usize) -> Vec<Cluster> {
    let mut used = vec![false; points.len()];
    let mut clusters = Vec::new();

    for i in 0..points.len() {
        if used[i] {
            continue;
        }

        let seed = neighbourhood(points, i, eps);
        if seed.len() < min_samples {
            continue;
        }

        let mut member = vec![false; points.len()];
        for &j in &seed {
            member[j] = true;
        }

        // Grow to fixpoint: any dense member pulls in its whole
        // neighbourhood.
        let mut changed = true;
        while changed {
            changed = false;
            for idx in 0..points.len() {
                if !member[idx] {
                    continue;
                }
                let near = neighbourhood(points, idx, eps);
                if near.len() < min_samples {
                    continue;
                }
                for j in near {
                    if !member[j] {
                        member[j] = true;
                        changed = true;
                    }
                }
            }
        }

        let cluster: Vec<(usize, usize)> = (0..points.len())
            .filter(|&j| member[j])
            .map(|j| {
                used[j] = true;
                points[j]
            })
            .collect();

        clusters.push(Cluster::from_points(cluster));
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn memberships(clusters: &[Cluster]) -> BTreeSet<Vec<(usize, usize)>> {
        clusters.iter().map(|c| c.points.clone()).collect()
    }

    #[test]
    fn empty_input_no_clusters() {
        assert!(cluster_points(&[], 2.5, 3).is_empty());
    }

    #[test]
    fn sparse_points_are_noise() {
        let points = vec![(0, 0), (10, 10), (20, 20)];
        assert!(cluster_points(&points, 2.5, 3).is_empty());
    }

    #[test]
    fn dense_blob_forms_one_cluster() {
        let points = vec![(5, 5), (5, 6), (6, 5), (6, 6)];
        let clusters = cluster_points(&points, 2.5, 3);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 4);
        assert!((clusters[0].centroid.0 - 5.5).abs() < 1e-12);
        assert!((clusters[0].centroid.1 - 5.5).abs() < 1e-12);
    }

    #[test]
    fn chain_absorbed_transitively() {
        // A chain of points 2 apart: every link is inside eps of the next,
        // so the closure sweeps up the whole chain, not just the seed's
        // immediate neighbourhood.
        let points: Vec<(usize, usize)> = (0..6).map(|i| (0, i * 2)).collect();
        let clusters = cluster_points(&points, 2.5, 3);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 6);
    }

    #[test]
    fn separated_blobs_stay_separate() {
        let mut points = vec![(0, 0), (0, 1), (1, 0)];
        points.extend([(20, 20), (20, 21), (21, 20)]);
        let clusters = cluster_points(&points, 2.5, 3);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn membership_is_order_independent() {
        let points = vec![(5, 5), (5, 6), (6, 5), (6, 6), (30, 30), (30, 31), (31, 30)];
        let mut shuffled = points.clone();
        shuffled.reverse();

        let a = memberships(&cluster_points(&points, 2.5, 3));
        let b = memberships(&cluster_points(&shuffled, 2.5, 3));
        assert_eq!(a, b);
    }

    #[test]
    fn rerun_is_idempotent() {
        let points = vec![(2, 2), (2, 3), (3, 2), (9, 9), (9, 10), (10, 9)];
        let a = memberships(&cluster_points(&points, 2.5, 3));
        let b = memberships(&cluster_points(&points, 2.5, 3));
        assert_eq!(a, b);
    }
}
