/// Symbol used for alignment gaps.
pub const GAP: char = '-';

/// A single aligned sequence.
///
/// `aligned` is the sequence exactly as it appears in the alignment file, including
/// lowercase insertion states. `cleaned` keeps only the match columns (uppercase residues
/// and gaps), so every record of one alignment has the same cleaned length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub aligned: String,
    pub cleaned: String,
}

impl Record {
    pub fn new(id: impl Into<String>, aligned: impl Into<String>) -> Self {
        let aligned = aligned.into();
        let cleaned = clean_sequence(&aligned);
        Self {
            id: id.into(),
            aligned,
            cleaned,
        }
    }

    /// Number of gap symbols in the cleaned sequence.
    pub fn gap_count(&self) -> usize {
        self.cleaned.chars().filter(|&c| c == GAP).count()
    }

    /// Fraction of `width` positions that are gaps.
    ///
    /// Returns `0.0` for a zero width rather than dividing by zero.
    pub fn gap_fraction(&self, width: usize) -> f64 {
        if width == 0 {
            return 0.0;
        }
        self.gap_count() as f64 / width as f64
    }
}

/// Strips insertion states from an A3M sequence, keeping uppercase residues and gaps.
pub fn clean_sequence(aligned: &str) -> String {
    aligned
        .chars()
        .filter(|c| c.is_uppercase() || *c == GAP)
        .collect()
}
