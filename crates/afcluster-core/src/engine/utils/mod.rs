//! Utility functions for the engine module.
//!
//! Currently limited to the random sub-sampling used by the coarse radius sweep.

pub mod sampling;
