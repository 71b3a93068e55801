use super::distance::DistanceSpace;
use crate::core::models::assignment::NOISE;

/// Indices of every point within `radius` of each point, the point itself included.
fn neighbourhoods<D: DistanceSpace + ?Sized>(space: &D, radius: f64) -> Vec<Vec<usize>> {
    let n = space.len();
    let mut neighbours: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if space.distance(i, j) <= radius {
                neighbours[i].push(j);
                neighbours[j].push(i);
            }
        }
    }
    neighbours
}

/// Density-based clustering of every point in `space`.
///
/// A point is a core point when at least `min_points` points (itself included) lie within
/// `radius`. Clusters are grown from core points in index order; border points join the
/// first cluster that reaches them and everything else is labelled [`NOISE`]. Cluster ids are
/// consecutive from zero in order of discovery.
pub fn dbscan<D: DistanceSpace + ?Sized>(space: &D, radius: f64, min_points: usize) -> Vec<i32> {
    let neighbours = neighbourhoods(space, radius);
    let is_core: Vec<bool> = neighbours.iter().map(|n| n.len() >= min_points).collect();

    let mut labels = vec![NOISE; space.len()];
    let mut next_label = 0;
    let mut stack = Vec::new();

    for seed in 0..space.len() {
        if labels[seed] != NOISE || !is_core[seed] {
            continue;
        }

        stack.push(seed);
        while let Some(i) = stack.pop() {
            if labels[i] != NOISE {
                continue;
            }
            labels[i] = next_label;
            if is_core[i] {
                stack.extend(neighbours[i].iter().copied().filter(|&j| labels[j] == NOISE));
            }
        }
        next_label += 1;
    }

    labels
}
