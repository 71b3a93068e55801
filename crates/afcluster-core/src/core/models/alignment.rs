use super::record::Record;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlignmentError {
    #[error("Alignment contains no records; the query record is required")]
    Empty,
    #[error(
        "Record '{id}' has cleaned length {found}, but the alignment width is {expected}"
    )]
    WidthMismatch {
        id: String,
        expected: usize,
        found: usize,
    },
}

/// An ordered set of aligned sequences whose first record is the query.
///
/// The query is exempt from filtering and clustering; the remaining records are referred to
/// as *members* throughout the crate.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    records: Vec<Record>,
}

impl Alignment {
    /// Builds an alignment, requiring at least the query record.
    pub fn new(records: Vec<Record>) -> Result<Self, AlignmentError> {
        if records.is_empty() {
            return Err(AlignmentError::Empty);
        }
        Ok(Self { records })
    }

    pub fn query(&self) -> &Record {
        &self.records[0]
    }

    /// All non-query records in file order.
    pub fn members(&self) -> &[Record] {
        &self.records[1..]
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn num_members(&self) -> usize {
        self.records.len() - 1
    }

    /// Alignment width `L`, taken from the first member's cleaned sequence.
    ///
    /// Falls back to the query when the alignment has no members.
    pub fn width(&self) -> usize {
        self.members()
            .first()
            .unwrap_or_else(|| self.query())
            .cleaned
            .chars()
            .count()
    }

    /// Checks that every member has the same cleaned length as the alignment width.
    pub fn validate_width(&self) -> Result<(), AlignmentError> {
        let expected = self.width();
        for record in self.members() {
            let found = record.cleaned.chars().count();
            if found != expected {
                return Err(AlignmentError::WidthMismatch {
                    id: record.id.clone(),
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    /// Returns a new alignment keeping the query and the members whose gap fraction is
    /// strictly below `cutoff`.
    pub fn filter_by_gap_fraction(&self, cutoff: f64) -> Alignment {
        let width = self.width();
        let mut records = Vec::with_capacity(self.records.len());
        records.push(self.query().clone());
        records.extend(
            self.members()
                .iter()
                .filter(|r| r.gap_fraction(width) < cutoff)
                .cloned(),
        );
        Alignment { records }
    }

    /// Cleaned member sequences, in member order.
    pub fn member_sequences(&self) -> Vec<&str> {
        self.members().iter().map(|r| r.cleaned.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alignment(seqs: &[(&str, &str)]) -> Alignment {
        Alignment::new(seqs.iter().map(|(id, s)| Record::new(*id, *s)).collect()).unwrap()
    }

    #[test]
    fn new_rejects_empty_record_list() {
        assert_eq!(Alignment::new(vec![]), Err(AlignmentError::Empty));
    }

    #[test]
    fn query_is_first_record_and_members_are_the_rest() {
        let aln = alignment(&[("q", "ACDE"), ("a", "AC-E"), ("b", "A--E")]);
        assert_eq!(aln.query().id, "q");
        assert_eq!(aln.num_members(), 2);
        assert_eq!(aln.members()[0].id, "a");
        assert_eq!(aln.member_sequences(), vec!["AC-E", "A--E"]);
    }

    #[test]
    fn width_comes_from_first_member_cleaned_sequence() {
        let aln = alignment(&[("q", "ACDEF"), ("a", "ACddE-")]);
        assert_eq!(aln.width(), 4);
    }

    #[test]
    fn width_falls_back_to_query_without_members() {
        let aln = alignment(&[("q", "ACDEF")]);
        assert_eq!(aln.width(), 5);
        assert_eq!(aln.num_members(), 0);
    }

    #[test]
    fn filter_by_gap_fraction_keeps_query_and_drops_gappy_members() {
        let aln = alignment(&[
            ("q", "----"),
            ("keep", "ACDE"),
            ("edge", "AC--"),
            ("drop", "A---"),
        ]);
        let filtered = aln.filter_by_gap_fraction(0.5);
        let ids: Vec<_> = filtered.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["q", "keep"]);
    }

    #[test]
    fn validate_width_reports_mismatched_member() {
        let aln = alignment(&[("q", "ACDE"), ("a", "ACDE"), ("b", "ACD")]);
        assert_eq!(
            aln.validate_width(),
            Err(AlignmentError::WidthMismatch {
                id: "b".to_string(),
                expected: 4,
                found: 3,
            })
        );
    }
}
