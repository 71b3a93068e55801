//! # Core Module
//!
//! Fundamental data structures and pure transformations used throughout AF-Cluster.
//!
//! - **Sequence Representation** ([`models`]) - Alignment records and the alignment container
//! - **Feature Encoding** ([`encoding`]) - One-hot encoding of aligned sequences
//! - **File I/O** ([`io`]) - A3M/FASTA reading and writing, and cluster partition output

pub mod encoding;
pub mod io;
pub mod models;
