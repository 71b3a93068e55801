//! # MSA Module
//!
//! Retrieves raw multiple sequence alignments for query sequences.
//!
//! ## Architecture
//!
//! - **Fetcher** ([`fetcher`]) - Entry point choosing between the local and the remote search
//! - **Remote Search** ([`remote`]) - Ticket state machine, result caching and archive extraction
//! - **Ticket API** ([`api`]) - The HTTP operations of the remote service behind a trait
//! - **Local Search** ([`local`]) - MMseqs2 pipeline run against locally installed databases
//! - **Queries** ([`queries`]) - Deduplication, query numbering and job prefixes
//! - **Blocks** ([`blocks`]) - Splitting result alignments into per-query blocks
//! - **Error Handling** ([`error`]) - Fetch, transport and local-search errors

pub mod api;
pub mod blocks;
pub mod error;
pub mod fetcher;
pub mod local;
pub mod queries;
pub mod remote;
