use crate::core::io::traits::SequenceFile;
use crate::core::models::record::Record;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum A3mError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Header on line {line} has no record identifier")]
    MissingIdentifier { line: usize },
}

/// A3M (and plain FASTA) sequence files.
///
/// The identifier is the first whitespace-delimited token of the header; any description
/// after it is dropped. Sequence lines following a header are concatenated. Text before the
/// first header and blank lines are ignored.
pub struct A3mFile;

impl A3mFile {
    pub fn parse_str(content: &str) -> Result<Vec<Record>, A3mError> {
        Self::read_from(&mut content.as_bytes())
    }
}

impl SequenceFile for A3mFile {
    type Error = A3mError;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Record>, Self::Error> {
        let mut records = Vec::new();
        let mut current: Option<(String, String)> = None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(header) = line.strip_prefix('>') {
                if let Some((id, seq)) = current.take() {
                    records.push(Record::new(id, seq));
                }
                let id = header.split_whitespace().next().ok_or(A3mError::MissingIdentifier {
                    line: line_num + 1,
                })?;
                current = Some((id.to_string(), String::new()));
            } else if let Some((_, seq)) = current.as_mut() {
                seq.push_str(line);
            }
        }

        if let Some((id, seq)) = current {
            records.push(Record::new(id, seq));
        }
        Ok(records)
    }

    fn write_to<'a>(
        records: impl IntoIterator<Item = &'a Record>,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for record in records {
            writeln!(writer, ">{}", record.id)?;
            writeln!(writer, "{}", record.aligned)?;
        }
        Ok(())
    }
}
