use sha1::{Digest, Sha1};
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Number given to the first unique query; later ones count up from here.
pub const FIRST_QUERY_NUMBER: u32 = 101;

/// A batch of query sequences with duplicates collapsed.
///
/// Unique sequences keep the order of their first appearance and are numbered from
/// [`FIRST_QUERY_NUMBER`]. Every input position remembers the number of its sequence, so
/// results can be mapped back to the original batch, duplicates included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueQueries {
    unique: Vec<String>,
    input_numbers: Vec<u32>,
}

impl UniqueQueries {
    pub fn new<S: AsRef<str>>(sequences: &[S]) -> Self {
        let mut unique: Vec<String> = Vec::new();
        let input_numbers = sequences
            .iter()
            .map(|seq| {
                let seq = seq.as_ref();
                let index = match unique.iter().position(|u| u == seq) {
                    Some(i) => i,
                    None => {
                        unique.push(seq.to_string());
                        unique.len() - 1
                    }
                };
                FIRST_QUERY_NUMBER + index as u32
            })
            .collect();
        Self {
            unique,
            input_numbers,
        }
    }

    pub fn unique(&self) -> &[String] {
        &self.unique
    }

    /// The query number of every input position, in input order.
    pub fn input_numbers(&self) -> &[u32] {
        &self.input_numbers
    }

    pub fn num_inputs(&self) -> usize {
        self.input_numbers.len()
    }

    /// The unique sequences as FASTA with numeric headers (`>101`, `>102`, ...).
    pub fn to_fasta(&self) -> String {
        let mut fasta = String::new();
        for (i, seq) in self.unique.iter().enumerate() {
            let _ = writeln!(fasta, ">{}\n{}", FIRST_QUERY_NUMBER + i as u32, seq);
        }
        fasta
    }
}

pub fn sequence_hash(sequence: &str) -> String {
    format!("{:x}", Sha1::digest(sequence.as_bytes()))
}

/// Path prefix under which every artifact of a fetch for `sequence` is stored.
pub fn job_prefix(tmp_dir: &Path, sequence: &str) -> PathBuf {
    tmp_dir.join(sequence_hash(sequence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_share_a_number_and_keep_first_appearance_order() {
        let queries = UniqueQueries::new(&["MKV", "ACD", "MKV", "WYW", "ACD"]);
        assert_eq!(queries.unique(), &["MKV", "ACD", "WYW"]);
        assert_eq!(queries.input_numbers(), &[101, 102, 101, 103, 102]);
        assert_eq!(queries.num_inputs(), 5);
    }

    #[test]
    fn fasta_lists_unique_sequences_with_numeric_headers() {
        let queries = UniqueQueries::new(&["MKV", "MKV", "ACD"]);
        assert_eq!(queries.to_fasta(), ">101\nMKV\n>102\nACD\n");
    }

    #[test]
    fn sequence_hash_is_hex_sha1() {
        assert_eq!(
            sequence_hash("abc"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn job_prefix_is_keyed_by_sequence_hash() {
        let prefix = job_prefix(Path::new("/tmp/msa"), "abc");
        assert_eq!(
            prefix,
            PathBuf::from("/tmp/msa/a9993e364706816aba3e25717850c26c9cd0d89d")
        );
        assert_ne!(prefix, job_prefix(Path::new("/tmp/msa"), "abd"));
    }
}
