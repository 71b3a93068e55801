use rand::{Rng, seq::index};
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error, PartialEq)]
pub enum SamplingError {
    #[error("Invalid sampling fraction: {0}. Fraction must lie in (0, 1]")]
    InvalidFraction(f64),
}

/// Number of items drawn when sampling `fraction` of `n`, rounded half to even.
pub fn sample_size(n: usize, fraction: f64) -> usize {
    ((n as f64 * fraction).round_ties_even() as usize).min(n)
}

/// Draws `sample_size(n, fraction)` distinct indices from `0..n` without replacement.
///
/// The returned indices are in the random order they were drawn.
#[instrument(level = "trace", skip(rng))]
pub fn sample_indices(
    n: usize,
    fraction: f64,
    rng: &mut impl Rng,
) -> Result<Vec<usize>, SamplingError> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(SamplingError::InvalidFraction(fraction));
    }
    let amount = sample_size(n, fraction);
    Ok(index::sample(rng, n, amount).into_vec())
}
