//! Reading and writing of sequence files.
//!
//! Alignments and query lists share one line-oriented format: a `>` header line carrying the
//! record identifier, followed by the sequence. [`a3m`] implements it behind the
//! [`traits::SequenceFile`] interface, and [`partition`] writes one file per cluster.

pub mod a3m;
pub mod partition;
pub mod traits;
