//! Per-query blocks of MMseqs2 result alignments.
//!
//! A result file holds the hits of several queries back to back. Each query's block starts
//! with a header carrying the query number. Blocks after the first are introduced by a NUL
//! byte at the start of their header line, which is what tells a query header apart from a
//! hit that happens to have a numeric name.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::warn;

/// Marks the beginning of a new query block.
pub const BLOCK_SENTINEL: char = '\0';

/// Text of each query block keyed by query number.
pub type QueryBlocks = HashMap<u32, String>;

/// Splits result text into query blocks, keeping every line with its original line ending.
///
/// The first header of the text, and the first header after each sentinel, names the query
/// the following lines belong to. A query appearing in several blocks has them concatenated.
/// Lines under a header that is not a query number are dropped up to the next block.
pub fn gather_blocks(content: &str) -> QueryBlocks {
    let mut blocks = QueryBlocks::new();
    let mut current: Option<u32> = None;
    let mut expect_header = true;

    for raw in content.split_inclusive('\n') {
        let line = if raw.contains(BLOCK_SENTINEL) {
            expect_header = true;
            Cow::Owned(raw.replace(BLOCK_SENTINEL, ""))
        } else {
            Cow::Borrowed(raw)
        };

        if expect_header {
            if let Some(header) = line.strip_prefix('>') {
                current = header.trim().parse().ok();
                if current.is_none() {
                    warn!("Skipping result block with non-numeric header '{}'", header.trim());
                }
                expect_header = false;
            }
        }

        if let Some(number) = current {
            blocks.entry(number).or_default().push_str(&line);
        }
    }

    blocks
}

/// Reads and splits a result file. A missing file yields no blocks.
pub fn read_blocks(path: &Path) -> io::Result<QueryBlocks> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(gather_blocks(&content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Result file '{}' is missing; treating it as empty", path.display());
            Ok(QueryBlocks::new())
        }
        Err(e) => Err(e),
    }
}

/// Builds the final text for every input position by concatenating its blocks across
/// `sources` in order. Positions without any block get an empty string.
pub fn assemble(sources: &[QueryBlocks], input_numbers: &[u32]) -> Vec<String> {
    input_numbers
        .iter()
        .map(|number| {
            sources
                .iter()
                .filter_map(|blocks| blocks.get(number))
                .map(String::as_str)
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn splits_blocks_at_sentinel_headers() {
        let content = ">101\nMKV\n>hit_a\nMKI\n\0>102\nACD\n>hit_b\nACE\n";
        let blocks = gather_blocks(content);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[&101], ">101\nMKV\n>hit_a\nMKI\n");
        assert_eq!(blocks[&102], ">102\nACD\n>hit_b\nACE\n");
    }

    #[test]
    fn numeric_hit_names_do_not_start_a_new_block() {
        let content = ">101\nMKV\n>102\nMKI\n";
        let blocks = gather_blocks(content);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[&101], ">101\nMKV\n>102\nMKI\n");
    }

    #[test]
    fn repeated_query_blocks_are_concatenated() {
        let content = ">101\nMKV\n\0>102\nACD\n\0>101\nMKI\n";
        let blocks = gather_blocks(content);
        assert_eq!(blocks[&101], ">101\nMKV\n>101\nMKI\n");
        assert_eq!(blocks[&102], ">102\nACD\n");
    }

    #[test]
    fn sentinel_on_its_own_line_arms_the_next_header() {
        let content = ">101\nMKV\n\0\n>102\nACD\n";
        let blocks = gather_blocks(content);
        assert_eq!(blocks[&101], ">101\nMKV\n\n");
        assert_eq!(blocks[&102], ">102\nACD\n");
    }

    #[test]
    fn non_numeric_header_drops_lines_until_next_block() {
        let content = ">query\nMKV\n\0>101\nACD\n";
        let blocks = gather_blocks(content);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[&101], ">101\nACD\n");
    }

    #[test]
    fn assemble_merges_sources_in_order_and_fills_missing_with_empty() {
        let uniref = gather_blocks(">101\nAAA\n\0>102\nCCC\n");
        let env = gather_blocks(">101\nDDD\n");
        let result = assemble(&[uniref, env], &[101, 102, 101, 103]);
        assert_eq!(
            result,
            vec![
                ">101\nAAA\n>101\nDDD\n".to_string(),
                ">102\nCCC\n".to_string(),
                ">101\nAAA\n>101\nDDD\n".to_string(),
                String::new(),
            ]
        );
    }

    #[test]
    fn missing_result_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let blocks = read_blocks(&dir.path().join("absent.a3m")).unwrap();
        assert!(blocks.is_empty());
    }
}
