//! One-hot encoding of aligned sequences.
//!
//! Each sequence becomes a vector of length `max_len * |alphabet|`. Position `p` holding the
//! symbol with alphabet index `a` sets column `p * |alphabet| + a` to one. Characters that are
//! not part of the alphabet are mapped to its last symbol. Positions past the end of a short
//! sequence stay all-zero, so a missing residue contributes nothing to distances while an
//! explicit gap does.

use std::collections::HashMap;
use thiserror::Error;

/// The 20 canonical amino acids followed by the gap symbol.
pub const DEFAULT_ALPHABET: &str = "ACDEFGHIKLMNPQRSTVWY-";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Alphabet must contain at least one symbol")]
    EmptyAlphabet,
    #[error("Alphabet contains duplicate symbol '{0}'")]
    DuplicateSymbol(char),
}

/// An ordered set of residue symbols. The last symbol doubles as the fallback for
/// unrecognized characters.
#[derive(Debug, Clone, PartialEq)]
pub struct Alphabet {
    symbols: Vec<char>,
    lookup: HashMap<char, usize>,
}

impl Alphabet {
    pub fn new(symbols: &str) -> Result<Self, EncodingError> {
        let symbols: Vec<char> = symbols.chars().collect();
        if symbols.is_empty() {
            return Err(EncodingError::EmptyAlphabet);
        }
        let mut lookup = HashMap::with_capacity(symbols.len());
        for (i, &c) in symbols.iter().enumerate() {
            if lookup.insert(c, i).is_some() {
                return Err(EncodingError::DuplicateSymbol(c));
            }
        }
        Ok(Self { symbols, lookup })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn fallback_index(&self) -> usize {
        self.symbols.len() - 1
    }

    #[inline]
    pub fn index_of(&self, c: char) -> usize {
        self.lookup
            .get(&c)
            .copied()
            .unwrap_or_else(|| self.fallback_index())
    }

    pub fn symbols(&self) -> String {
        self.symbols.iter().collect()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        let symbols: Vec<char> = DEFAULT_ALPHABET.chars().collect();
        let lookup = symbols.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        Self { symbols, lookup }
    }
}

/// A binary matrix of shape `(rows, max_len * alphabet_size)`.
///
/// Stored sparsely as the sorted list of set columns per row, since at most one column per
/// position is ever non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMatrix {
    max_len: usize,
    alphabet_size: usize,
    active: Vec<Vec<u32>>,
}

impl EncodedMatrix {
    pub fn num_rows(&self) -> usize {
        self.active.len()
    }

    pub fn num_cols(&self) -> usize {
        self.max_len * self.alphabet_size
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows(), self.num_cols())
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        match self.active[row].binary_search(&(col as u32)) {
            Ok(_) => 1.0,
            Err(_) => 0.0,
        }
    }

    /// Indices of the columns set to one in `row`, ascending.
    pub fn active_columns(&self, row: usize) -> &[u32] {
        &self.active[row]
    }

    pub fn row_dense(&self, row: usize) -> Vec<f32> {
        let mut dense = vec![0.0; self.num_cols()];
        for &col in &self.active[row] {
            dense[col as usize] = 1.0;
        }
        dense
    }

    pub fn to_dense(&self) -> Vec<Vec<f32>> {
        (0..self.num_rows()).map(|r| self.row_dense(r)).collect()
    }

    /// Squared Euclidean distance between two rows.
    ///
    /// For binary vectors this is the size of the symmetric difference of their set columns.
    pub fn squared_distance(&self, a: usize, b: usize) -> usize {
        let (lhs, rhs) = (&self.active[a], &self.active[b]);
        let (mut i, mut j, mut shared) = (0, 0, 0);
        while i < lhs.len() && j < rhs.len() {
            match lhs[i].cmp(&rhs[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    shared += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        lhs.len() + rhs.len() - 2 * shared
    }

    pub fn distance(&self, a: usize, b: usize) -> f64 {
        (self.squared_distance(a, b) as f64).sqrt()
    }
}

/// Encodes `sequences` into a one-hot matrix with `max_len` positions per row.
///
/// Characters beyond `max_len` are ignored; positions beyond a sequence's own length are
/// left all-zero.
pub fn encode_sequences<S: AsRef<str>>(
    sequences: &[S],
    max_len: usize,
    alphabet: &Alphabet,
) -> EncodedMatrix {
    let width = alphabet.len();
    let active = sequences
        .iter()
        .map(|seq| {
            seq.as_ref()
                .chars()
                .take(max_len)
                .enumerate()
                .map(|(pos, c)| (pos * width + alphabet.index_of(c)) as u32)
                .collect()
        })
        .collect();

    EncodedMatrix {
        max_len,
        alphabet_size: width,
        active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_alphabet_has_twenty_one_symbols_with_gap_last() {
        let alphabet = Alphabet::default();
        assert_eq!(alphabet.len(), 21);
        assert_eq!(alphabet.index_of('-'), 20);
        assert_eq!(alphabet.index_of('A'), 0);
        assert_eq!(alphabet.symbols(), DEFAULT_ALPHABET);
    }

    #[test]
    fn unknown_characters_map_to_fallback_slot() {
        let alphabet = Alphabet::default();
        assert_eq!(alphabet.index_of('X'), 20);
        assert_eq!(alphabet.index_of('a'), 20);
    }

    #[test]
    fn alphabet_rejects_empty_and_duplicate_symbols() {
        assert_eq!(Alphabet::new(""), Err(EncodingError::EmptyAlphabet));
        assert_eq!(Alphabet::new("AA-"), Err(EncodingError::DuplicateSymbol('A')));
    }

    #[test]
    fn encode_produces_expected_shape_and_one_hot_columns() {
        let alphabet = Alphabet::new("AC-").unwrap();
        let matrix = encode_sequences(&["AC-", "CXA"], 3, &alphabet);
        assert_eq!(matrix.shape(), (2, 9));
        assert_eq!(
            matrix.row_dense(0),
            vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
        );
        assert_eq!(
            matrix.row_dense(1),
            vec![0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0]
        );
    }

    #[test]
    fn short_sequences_leave_trailing_positions_all_zero() {
        let alphabet = Alphabet::new("AC-").unwrap();
        let matrix = encode_sequences(&["A"], 3, &alphabet);
        assert_eq!(
            matrix.row_dense(0),
            vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
        assert_eq!(matrix.active_columns(0), &[0]);
    }

    #[test]
    fn positions_beyond_max_len_are_ignored() {
        let alphabet = Alphabet::new("AC-").unwrap();
        let matrix = encode_sequences(&["ACCA"], 2, &alphabet);
        assert_eq!(matrix.num_cols(), 6);
        assert_eq!(matrix.active_columns(0), &[0, 4]);
    }

    #[test]
    fn encoding_is_deterministic() {
        let alphabet = Alphabet::default();
        let seqs = ["MKV-LA", "MKILLA", "--VQLA"];
        let first = encode_sequences(&seqs, 6, &alphabet);
        let second = encode_sequences(&seqs, 6, &alphabet);
        assert_eq!(first, second);
        assert_eq!(first.to_dense(), second.to_dense());
    }

    #[test]
    fn squared_distance_counts_differing_one_hot_entries() {
        let alphabet = Alphabet::default();
        let matrix = encode_sequences(&["ACDE", "ACDF", "AC", "ACDE"], 4, &alphabet);
        assert_eq!(matrix.squared_distance(0, 3), 0);
        assert_eq!(matrix.squared_distance(0, 1), 2);
        // Truncated positions contribute one unit each, not two.
        assert_eq!(matrix.squared_distance(0, 2), 2);
        assert!((matrix.distance(0, 1) - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn gap_and_missing_residue_differ_in_distance() {
        let alphabet = Alphabet::default();
        let matrix = encode_sequences(&["AC--", "AC", "ACDE"], 4, &alphabet);
        assert_eq!(matrix.squared_distance(0, 2), 4);
        assert_eq!(matrix.squared_distance(1, 2), 2);
    }
}
