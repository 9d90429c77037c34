//! Streaming query reader
//!
//! Queries are read a chunk at a time. A failed read leaves every row
//! already consumed in the reader's staging area, including a partially read
//! line, so calling [`QuerySource::read_chunk`] again after a transient
//! error resumes exactly where the failure happened.

use std::io::BufRead;
use std::path::Path;

use log::{info, warn};

use super::{column_positions, open_input, skip_bom, trim_line_end, tsv_reader};
use crate::error::FerroError;
use crate::query::{Direction, Query};

/// Required query table columns, in any order.
pub const QUERY_COLUMNS: [&str; 5] = [
    "Type",
    "Transcript",
    "Transcript_Coord",
    "Chromosome",
    "Genome_Coord",
];

/// One data row: its line number and either a validated query or the
/// reason it was rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRow {
    pub line: u64,
    pub query: Result<Query, FerroError>,
}

/// A source of query rows, read in chunks.
pub trait QuerySource {
    /// Read up to `max_rows` data rows.
    ///
    /// Returns `Ok(None)` once the input is exhausted. After an error the
    /// call may be repeated; no row is lost or returned twice.
    fn read_chunk(&mut self, max_rows: usize) -> Result<Option<Vec<QueryRow>>, FerroError>;
}

impl<S: QuerySource + ?Sized> QuerySource for Box<S> {
    fn read_chunk(&mut self, max_rows: usize) -> Result<Option<Vec<QueryRow>>, FerroError> {
        (**self).read_chunk(max_rows)
    }
}

/// Column positions of the query fields in the header.
#[derive(Debug, Clone, Copy)]
struct QueryColumns {
    direction: usize,
    transcript: usize,
    transcript_coord: usize,
    chromosome: usize,
    genome_coord: usize,
}

/// Query source over a tab-separated reader.
///
/// Lines are collected with `read_until` so that a failed read keeps the
/// partial line; complete lines of a chunk are then tokenized together by a
/// `csv` reader with the same settings as the transcript table.
pub struct TsvQuerySource<R> {
    reader: R,
    columns: Option<QueryColumns>,
    /// Last line number consumed
    line: u64,
    /// Bytes of a line whose read was interrupted
    pending: Vec<u8>,
    /// Non-blank lines read for a chunk that has not been returned yet
    staged: Vec<u8>,
    /// Line number of each staged line
    staged_lines: Vec<u64>,
    done: bool,
}

impl TsvQuerySource<Box<dyn BufRead + Send>> {
    /// Open a query file, decompressing `.gz` paths.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FerroError> {
        let path = path.as_ref();
        info!("Reading queries from {}", path.display());
        let reader = open_input(path)?;
        Self::new(reader, &path.display().to_string())
    }
}

impl<R: BufRead> TsvQuerySource<R> {
    /// Read and validate the header. `input` names the source in error
    /// messages. Input with no header line yields no rows.
    pub fn new(mut reader: R, input: &str) -> Result<Self, FerroError> {
        skip_bom(&mut reader)?;

        let mut raw = Vec::new();
        reader.read_until(b'\n', &mut raw)?;
        let mut header = csv::StringRecord::new();
        let has_header = tsv_reader()
            .has_headers(false)
            .from_reader(raw.as_slice())
            .read_record(&mut header)?;

        let columns = if !has_header || header.iter().all(str::is_empty) {
            warn!("{} is empty, no queries to read", input);
            None
        } else {
            let pos = column_positions(input, header.iter(), &QUERY_COLUMNS)?;
            Some(QueryColumns {
                direction: pos[0],
                transcript: pos[1],
                transcript_coord: pos[2],
                chromosome: pos[3],
                genome_coord: pos[4],
            })
        };

        Ok(Self {
            reader,
            done: columns.is_none(),
            columns,
            line: 1,
            pending: Vec::new(),
            staged: Vec::new(),
            staged_lines: Vec::new(),
        })
    }

    /// Number of the last line consumed (header is line 1).
    pub fn line(&self) -> u64 {
        self.line
    }
}

impl<R: BufRead> QuerySource for TsvQuerySource<R> {
    fn read_chunk(&mut self, max_rows: usize) -> Result<Option<Vec<QueryRow>>, FerroError> {
        let Some(columns) = self.columns else {
            return Ok(None);
        };
        let max_rows = max_rows.max(1);

        while !self.done && self.staged_lines.len() < max_rows {
            let n = self.reader.read_until(b'\n', &mut self.pending)?;
            if n == 0 && self.pending.is_empty() {
                self.done = true;
                break;
            }
            if n > 0 && !self.pending.ends_with(b"\n") {
                // final line without a terminator; the next read returns 0
                continue;
            }

            let raw = std::mem::take(&mut self.pending);
            self.line += 1;
            if raw.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            self.staged.extend_from_slice(trim_line_end(&raw));
            self.staged.push(b'\n');
            self.staged_lines.push(self.line);
        }

        if self.staged_lines.is_empty() {
            return Ok(None);
        }
        let staged = std::mem::take(&mut self.staged);
        let lines = std::mem::take(&mut self.staged_lines);
        Ok(Some(parse_rows(&staged, &lines, columns)))
    }
}

/// Tokenize staged lines, one record per entry of `lines`, and validate
/// each record.
fn parse_rows(staged: &[u8], lines: &[u64], columns: QueryColumns) -> Vec<QueryRow> {
    let mut reader = tsv_reader()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_reader(staged);
    let mut record = csv::ByteRecord::new();

    lines
        .iter()
        .map(|&line| {
            let query = match reader.read_byte_record(&mut record) {
                Ok(true) => build_query(&record, columns, line),
                Ok(false) => Err(FerroError::malformed_row(line, "row ended early")),
                Err(e) => Err(FerroError::malformed_row(line, e.to_string())),
            };
            QueryRow { line, query }
        })
        .collect()
}

/// Field `i` of `record`, empty when the row is short.
fn field(record: &csv::ByteRecord, i: usize, line: u64) -> Result<&str, FerroError> {
    std::str::from_utf8(record.get(i).unwrap_or_default())
        .map_err(|e| FerroError::malformed_row(line, e.to_string()))
}

fn build_query(
    record: &csv::ByteRecord,
    columns: QueryColumns,
    line: u64,
) -> Result<Query, FerroError> {
    let direction: Direction = field(record, columns.direction, line)?
        .parse()
        .map_err(|msg: String| FerroError::malformed_row(line, msg))?;

    match direction {
        Direction::T2G => {
            let transcript = field(record, columns.transcript, line)?;
            if transcript.is_empty() {
                return Err(FerroError::malformed_row(line, "T2G query without Transcript"));
            }
            let coord = field(record, columns.transcript_coord, line)?;
            let coord = parse_coord(coord, "Transcript_Coord", line)?;
            Ok(Query::t2g(transcript, coord))
        }
        Direction::G2T => {
            let chromosome = field(record, columns.chromosome, line)?;
            if chromosome.is_empty() {
                return Err(FerroError::malformed_row(line, "G2T query without Chromosome"));
            }
            let coord = field(record, columns.genome_coord, line)?;
            let coord = parse_coord(coord, "Genome_Coord", line)?;
            Ok(Query::g2t(chromosome, coord))
        }
    }
}

fn parse_coord(value: &str, column: &str, line: u64) -> Result<u64, FerroError> {
    if value.is_empty() {
        return Err(FerroError::malformed_row(line, format!("missing {}", column)));
    }
    value.parse::<u64>().map_err(|_| {
        FerroError::malformed_row(
            line,
            format!(
                "invalid {} '{}': expected a non-negative integer",
                column, value
            ),
        )
    })
}
