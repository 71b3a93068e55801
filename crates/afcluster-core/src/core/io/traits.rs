use crate::core::models::record::Record;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing sequence record files.
///
/// Implementors handle format-specific parsing and serialization; the path-based helpers
/// wrap them with buffered file handles.
pub trait SequenceFile {
    /// The error type for I/O and parse failures.
    type Error: Error + From<io::Error>;

    /// Reads all records from a buffered reader, in file order.
    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Record>, Self::Error>;

    /// Writes records to a writer, in the given order.
    fn write_to<'a>(
        records: impl IntoIterator<Item = &'a Record>,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Record>, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes records to `path`, replacing any existing file.
    fn write_to_path<'a, P: AsRef<Path>>(
        records: impl IntoIterator<Item = &'a Record>,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(records, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
