//! # Workflows Module
//!
//! High-level entry points that run a complete clustering job over an alignment file.
//!
//! ## Architecture
//!
//! - **Cluster Workflow** ([`cluster`]) - Reads an alignment, filters gappy members, clusters
//!   the rest and writes one alignment file per cluster, keeping a run log while it works.

pub mod cluster;
