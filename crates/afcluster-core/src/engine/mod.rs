//! # Engine Module
//!
//! The clustering engine: configuration, density-based clustering of encoded sequences, and
//! the adaptive search for a neighbourhood radius.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Typed clustering, fetch and local-search settings
//! - **Clustering** ([`clustering`]) - Entry point turning an alignment into cluster labels
//! - **Radius Search** ([`radius`]) - Coarse sampled sweep plus refinement when it degenerates
//! - **DBSCAN** ([`dbscan`]) - The density-based clustering primitive
//! - **Distances** ([`distance`]) - Pairwise Euclidean distances over one-hot encodings
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod clustering;
pub mod config;
pub mod dbscan;
pub mod distance;
pub mod error;
pub mod progress;
pub mod radius;
pub mod utils;
