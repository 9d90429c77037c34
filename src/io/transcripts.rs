//! Transcript table reader

use std::io::BufRead;
use std::path::Path;

use log::{info, warn};

use super::{column_positions, open_input, skip_bom, tsv_reader};
use crate::alignment::Strand;
use crate::catalog::{LoadReport, TranscriptCatalog, TranscriptRecord};
use crate::error::FerroError;

/// Required transcript table columns, in any order.
pub const TRANSCRIPT_COLUMNS: [&str; 5] =
    ["Transcript", "Chromosome", "Genomic_Start", "CIGAR", "Strand"];

/// Read a transcript table and build the catalog from it.
///
/// Rows that fail validation and transcripts that fail to index are
/// recorded in the returned [`LoadReport`]. Only I/O failures and a header
/// missing required columns are fatal.
pub fn load_transcripts<P: AsRef<Path>>(
    path: P,
) -> Result<(TranscriptCatalog, LoadReport), FerroError> {
    let path = path.as_ref();
    info!("Reading transcripts from {}", path.display());

    let reader = open_input(path)?;
    let (records, mut report) = read_transcripts(reader, &path.display().to_string())?;
    let catalog = TranscriptCatalog::load_into(records, &mut report);
    Ok((catalog, report))
}

/// Parse transcript rows from a tab-separated reader.
///
/// `input` names the source in error messages. Empty input (no bytes or
/// header only) yields no records.
pub fn read_transcripts<R: BufRead>(
    mut reader: R,
    input: &str,
) -> Result<(Vec<TranscriptRecord>, LoadReport), FerroError> {
    skip_bom(&mut reader)?;

    let mut rdr = tsv_reader().from_reader(reader);

    let mut report = LoadReport::default();
    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        warn!("{} is empty, no transcripts loaded", input);
        return Ok((Vec::new(), report));
    }
    let columns = column_positions(input, headers.iter(), &TRANSCRIPT_COLUMNS)?;

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                let err = FerroError::from(e);
                match err {
                    FerroError::MalformedRow { line, .. } => {
                        report.reject_row(line, err);
                        continue;
                    }
                    other => return Err(other),
                }
            }
        };

        let line = row.position().map(|p| p.line()).unwrap_or(0);
        match parse_row(&row, &columns, line) {
            Ok(record) => records.push(record),
            Err(err) => report.reject_row(line, err),
        }
    }

    Ok((records, report))
}

fn parse_row(
    row: &csv::StringRecord,
    columns: &[usize],
    line: u64,
) -> Result<TranscriptRecord, FerroError> {
    let field = |i: usize| row.get(columns[i]).unwrap_or("");

    let id = field(0);
    if id.is_empty() {
        return Err(FerroError::malformed_row(line, "missing Transcript"));
    }
    let chromosome = field(1);
    if chromosome.is_empty() {
        return Err(FerroError::malformed_row(
            line,
            format!("transcript {} has no Chromosome", id),
        ));
    }
    let genomic_start = field(2).parse::<u64>().map_err(|_| {
        FerroError::malformed_row(
            line,
            format!(
                "invalid Genomic_Start '{}' for {}: expected a non-negative integer",
                field(2),
                id
            ),
        )
    })?;
    let strand = field(4)
        .parse::<Strand>()
        .map_err(|msg| FerroError::malformed_row(line, format!("{} for {}", msg, id)))?;

    Ok(TranscriptRecord {
        line,
        id: id.to_string(),
        chromosome: chromosome.to_string(),
        genomic_start,
        cigar: field(3).to_string(),
        strand,
    })
}
