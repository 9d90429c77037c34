//! Tab-separated input and output.
//!
//! Transcript files are read whole into a [`TranscriptCatalog`]; query files
//! are streamed chunk by chunk through a [`QuerySource`]; results are
//! appended through a [`ResultSink`]. Paths ending in `.gz` are decompressed
//! transparently and a leading UTF-8 byte order mark is skipped.
//!
//! [`TranscriptCatalog`]: crate::catalog::TranscriptCatalog

pub mod output;
pub mod queries;
pub mod transcripts;

pub use output::{OutputLayout, ResultSink, TsvResultSink};
pub use queries::{QueryRow, QuerySource, TsvQuerySource, QUERY_COLUMNS};
pub use transcripts::{load_transcripts, read_transcripts, TRANSCRIPT_COLUMNS};

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use crate::error::FerroError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Open an input file, decompressing `.gz` paths.
pub fn open_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead + Send>, FerroError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| FerroError::Io {
        msg: format!("Failed to open {}: {}", path.display(), e),
    })?;

    if path.to_string_lossy().ends_with(".gz") {
        let decoder = flate2::read::GzDecoder::new(file);
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Create an output file, or stdout for `-`.
pub fn create_output<P: AsRef<Path>>(path: P) -> Result<Box<dyn Write + Send>, FerroError> {
    let path = path.as_ref();
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdout()));
    }
    let file = File::create(path).map_err(|e| FerroError::Io {
        msg: format!("Failed to create {}: {}", path.display(), e),
    })?;
    Ok(Box::new(io::BufWriter::new(file)))
}

/// Consume a UTF-8 byte order mark at the current position, if present.
pub fn skip_bom<R: BufRead + ?Sized>(reader: &mut R) -> io::Result<()> {
    let buf = reader.fill_buf()?;
    if buf.starts_with(UTF8_BOM) {
        reader.consume(UTF8_BOM.len());
    }
    Ok(())
}

/// Tab-separated reader settings shared by the transcript and query tables:
/// no quoting, ragged rows allowed, fields trimmed.
pub(crate) fn tsv_reader() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .trim(csv::Trim::All);
    builder
}

/// Strip a trailing `\n` or `\r\n`.
pub(crate) fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Resolve each required column name to its position in `header`.
///
/// Returns the positions in the order of `required`, or
/// [`FerroError::InvalidHeader`] naming every missing column.
pub(crate) fn column_positions<'h, I>(
    input: &str,
    header: I,
    required: &[&str],
) -> Result<Vec<usize>, FerroError>
where
    I: IntoIterator<Item = &'h str>,
{
    let names: Vec<&str> = header.into_iter().map(str::trim).collect();
    let mut positions = Vec::with_capacity(required.len());
    let mut missing = Vec::new();

    for column in required {
        match names.iter().position(|name| name == column) {
            Some(pos) => positions.push(pos),
            None => missing.push(*column),
        }
    }

    if missing.is_empty() {
        Ok(positions)
    } else {
        Err(FerroError::InvalidHeader {
            input: input.to_string(),
            missing: missing.join(", "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn test_skip_bom() {
        let mut reader = Cursor::new(b"\xEF\xBB\xBFType\tTranscript".to_vec());
        skip_bom(&mut reader).unwrap();
        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "Type\tTranscript");

        let mut reader = Cursor::new(b"Type".to_vec());
        skip_bom(&mut reader).unwrap();
        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "Type");
    }

    #[test]
    fn test_trim_line_end() {
        assert_eq!(trim_line_end(b"a\tb\r\n"), b"a\tb");
        assert_eq!(trim_line_end(b"a\tb\n"), b"a\tb");
        assert_eq!(trim_line_end(b"a\tb"), b"a\tb");
    }

    #[test]
    fn test_column_positions_any_order() {
        let positions =
            column_positions("q.tsv", ["B", " A ", "Extra", "C"], &["A", "B", "C"]).unwrap();
        assert_eq!(positions, vec![1, 0, 3]);
    }

    #[test]
    fn test_column_positions_missing() {
        let err = column_positions("q.tsv", ["A"], &["A", "B", "C"]).unwrap_err();
        assert_eq!(
            err,
            FerroError::InvalidHeader {
                input: "q.tsv".to_string(),
                missing: "B, C".to_string(),
            }
        );
    }

    #[test]
    fn test_open_input_gz() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.tsv.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(b"hello\n").unwrap();
        encoder.finish().unwrap();

        let mut reader = open_input(&path).unwrap();
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello\n");
    }

    #[test]
    fn test_open_input_missing_file() {
        let err = open_input("/nonexistent/input.tsv").err().unwrap();
        assert!(matches!(err, FerroError::Io { .. }));
    }
}
