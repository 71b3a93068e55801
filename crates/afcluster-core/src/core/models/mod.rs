//! Data models for aligned protein sequences.
//!
//! An [`alignment::Alignment`] is an ordered list of [`record::Record`]s whose first entry is
//! the query. The query is carried through every transformation untouched, while the
//! remaining records are filtered, encoded and clustered, producing a
//! [`assignment::ClusterAssignment`].

pub mod alignment;
pub mod assignment;
pub mod record;
