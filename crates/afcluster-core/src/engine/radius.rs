//! Automatic selection of the DBSCAN neighbourhood radius.
//!
//! A coarse sweep clusters a fresh random sample of the members at every candidate radius and
//! keeps the candidate producing the most distinct labels. When the sweep peaks at its very
//! first candidate the coarse grid is too blunt to be trusted, and a refinement pass walks
//! upwards from the minimum at half the step over the full set of members.

use super::config::ClusteringConfig;
use super::dbscan::dbscan;
use super::distance::{DistanceSpace, PairwiseDistances};
use super::progress::{Progress, ProgressReporter};
use super::utils::sampling::{SamplingError, sample_indices};
use crate::core::models::assignment::NOISE;
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Number of distinct labels, noise counted as one label when present.
pub fn distinct_label_count(labels: &[i32]) -> usize {
    labels.iter().copied().collect::<HashSet<_>>().len()
}

fn has_cluster(labels: &[i32]) -> bool {
    labels.iter().any(|&l| l != NOISE)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    pub radius: f64,
    pub label_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadiusStrategy {
    /// The radius was supplied by the caller.
    Fixed,
    /// Too few members to form any cluster; the search minimum is used without searching.
    Degenerate,
    /// The coarse sweep peaked above its first candidate.
    Sweep,
    /// The coarse sweep peaked at its first candidate and refinement took over.
    Refined { steps: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadiusSelection {
    pub radius: f64,
    pub strategy: RadiusStrategy,
    pub sweep: Vec<SweepPoint>,
}

impl RadiusSelection {
    fn fixed(radius: f64) -> Self {
        Self {
            radius,
            strategy: RadiusStrategy::Fixed,
            sweep: Vec::new(),
        }
    }
}

/// Clusters a new random sample of the members at every candidate radius.
pub fn coarse_sweep(
    distances: &PairwiseDistances,
    candidates: &[f64],
    sample_fraction: f64,
    min_points: usize,
    rng: &mut impl Rng,
    reporter: &ProgressReporter,
) -> Result<Vec<SweepPoint>, SamplingError> {
    reporter.report(Progress::TaskStart {
        total: candidates.len() as u64,
    });

    let mut sweep = Vec::with_capacity(candidates.len());
    for &radius in candidates {
        let rows = sample_indices(distances.len(), sample_fraction, rng)?;
        let labels = dbscan(&distances.subset(rows), radius, min_points);
        let label_count = distinct_label_count(&labels);
        debug!(radius, label_count, "Sweep candidate evaluated");
        sweep.push(SweepPoint {
            radius,
            label_count,
        });
        reporter.report(Progress::TaskIncrement { amount: 1 });
    }

    reporter.report(Progress::TaskFinish);
    Ok(sweep)
}

/// Index of the first sweep point with the highest label count.
fn first_maximum(sweep: &[SweepPoint]) -> Option<usize> {
    let best = sweep.iter().map(|p| p.label_count).max()?;
    sweep.iter().position(|p| p.label_count == best)
}

/// Walks upwards from `start` in increments of `step` over every member.
///
/// A step producing more labels than any before it becomes the new best and resets the stale
/// counter. A step matching the best extends the best radius to itself; that and any worse step
/// count as stale. Until the first non-noise cluster shows up, every step counts against
/// `budget`. Afterwards the walk stops once `budget` consecutive steps failed to improve. Once
/// the radius exceeds the largest pairwise distance nothing can change and the walk ends.
///
/// Returns the selected radius and the number of steps taken.
pub fn refine(
    distances: &PairwiseDistances,
    start: f64,
    step: f64,
    budget: usize,
    min_points: usize,
    reporter: &ProgressReporter,
) -> (f64, usize) {
    let ceiling = distances.max_distance();
    let mut best_radius = start;
    let mut best_count: Option<usize> = None;
    let mut stale = 0;
    let mut seen_structure = false;
    let mut steps = 0;

    loop {
        let radius = start + steps as f64 * step;
        let labels = dbscan(distances, radius, min_points);
        let count = distinct_label_count(&labels);
        steps += 1;

        match best_count {
            Some(best) if count < best => stale += 1,
            Some(best) if count == best => {
                best_radius = radius;
                stale += 1;
            }
            _ => {
                best_radius = radius;
                best_count = Some(count);
                stale = 0;
            }
        }

        if !seen_structure && has_cluster(&labels) {
            seen_structure = true;
            stale = 0;
        }

        reporter.status(format!("refining radius {:.2} ({} labels)", radius, count));
        debug!(radius, count, stale, "Refinement step evaluated");

        let exhausted = if seen_structure {
            stale >= budget
        } else {
            steps >= budget
        };
        if exhausted || radius > ceiling {
            break;
        }
    }

    (best_radius, steps)
}

/// Picks the neighbourhood radius for clustering `distances`.
///
/// A radius fixed in `config` is returned as is. Otherwise the coarse sweep runs over
/// `config.search` and, when its first candidate wins, [`refine`] continues from the search
/// minimum with half the step. The result is never below the search minimum.
#[instrument(skip_all, name = "radius_selection")]
pub fn select_radius(
    distances: &PairwiseDistances,
    config: &ClusteringConfig,
    rng: &mut impl Rng,
    reporter: &ProgressReporter,
) -> Result<RadiusSelection, SamplingError> {
    if let Some(radius) = config.radius {
        return Ok(RadiusSelection::fixed(radius));
    }

    let search = config.search;
    if distances.len() < config.min_points {
        info!(
            members = distances.len(),
            min_points = config.min_points,
            "Too few members to form a cluster; skipping radius search"
        );
        return Ok(RadiusSelection {
            radius: search.min,
            strategy: RadiusStrategy::Degenerate,
            sweep: Vec::new(),
        });
    }

    reporter.report(Progress::PhaseStart {
        name: "Radius Search",
    });

    let candidates = search.candidates();
    let sweep = coarse_sweep(
        distances,
        &candidates,
        config.sample_fraction,
        config.min_points,
        rng,
        reporter,
    )?;

    let selection = match first_maximum(&sweep) {
        Some(index) if index > 0 => RadiusSelection {
            radius: sweep[index].radius,
            strategy: RadiusStrategy::Sweep,
            sweep,
        },
        _ => {
            info!("Coarse sweep peaked at its first candidate; refining from the minimum");
            let (radius, steps) = refine(
                distances,
                search.min,
                search.step / 2.0,
                config.refinement_budget,
                config.min_points,
                reporter,
            );
            RadiusSelection {
                radius,
                strategy: RadiusStrategy::Refined { steps },
                sweep,
            }
        }
    };

    reporter.report(Progress::PhaseFinish);
    info!(
        radius = selection.radius,
        strategy = ?selection.strategy,
        "Selected neighbourhood radius"
    );
    Ok(selection)
}
