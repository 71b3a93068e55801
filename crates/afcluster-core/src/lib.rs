//! # AF-Cluster Core Library
//!
//! Clusters a multiple sequence alignment (MSA) of homologous proteins into density-based
//! subsets, each of which can be fed to a structure-prediction tool on its own.
//!
//! ## Architectural Philosophy
//!
//! The library follows a layered architecture so that each concern can be tested in isolation.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Record`, `Alignment`), the
//!   one-hot sequence encoder, and A3M/FASTA reading and writing, including the per-cluster
//!   partition writer.
//!
//! - **[`engine`]: The Clustering Logic.** Typed configuration, the DBSCAN primitive over
//!   encoded sequences, and the adaptive search for a neighbourhood radius when none is given.
//!
//! - **[`msa`]: Alignment Retrieval.** Obtains raw alignments for query sequences from a local
//!   search tool when one is configured, falling back to a remote ticket-based service with
//!   retry, polling, caching and deduplication.
//!
//! - **[`workflows`]: The Public API.** Ties the layers together into a complete clustering run
//!   over an alignment file.

pub mod core;
pub mod engine;
pub mod msa;
pub mod workflows;
