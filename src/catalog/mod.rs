//! Transcript catalog.
//!
//! The catalog owns one [`CoordinateIndex`] per transcript plus a
//! chromosome index of transcript spans used to answer genome-to-transcript
//! queries. It is built once, single threaded, and is read-only afterwards:
//! workers share it by reference without any locking.
//!
//! Transcripts that fail to build (malformed CIGAR, empty alignment,
//! duplicate identifier) are excluded and recorded in the [`LoadReport`];
//! the remaining transcripts load normally.

use std::collections::HashMap;

use log::{info, warn};

use crate::alignment::{parse_cigar, Cigar, CoordinateIndex, Strand};
use crate::error::FerroError;

/// A transcript row as read from the input, before its CIGAR is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRecord {
    /// Line number in the source file (header is line 1)
    pub line: u64,
    pub id: String,
    pub chromosome: String,
    /// 0-based genome position of the first aligned base
    pub genomic_start: u64,
    pub cigar: String,
    pub strand: Strand,
}

/// A fully decoded transcript alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub id: String,
    pub chromosome: String,
    pub genomic_start: u64,
    pub cigar: Cigar,
    pub strand: Strand,
}

impl TryFrom<&TranscriptRecord> for Transcript {
    type Error = FerroError;

    fn try_from(record: &TranscriptRecord) -> Result<Self, Self::Error> {
        Ok(Transcript {
            id: record.id.clone(),
            chromosome: record.chromosome.clone(),
            genomic_start: record.genomic_start,
            cigar: parse_cigar(&record.cigar)?,
            strand: record.strand,
        })
    }
}

/// A transcript together with its coordinate index.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub transcript: Transcript,
    pub index: CoordinateIndex,
}

impl CatalogEntry {
    pub fn id(&self) -> &str {
        &self.transcript.id
    }

    pub fn chromosome(&self) -> &str {
        &self.transcript.chromosome
    }
}

/// A transcript that was excluded from the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedTranscript {
    pub line: u64,
    pub id: String,
    pub error: FerroError,
}

/// Outcome of building a catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Transcripts added to the catalog
    pub loaded: usize,
    /// Transcripts excluded, in input order
    pub rejected: Vec<RejectedTranscript>,
}

impl LoadReport {
    pub fn has_rejections(&self) -> bool {
        !self.rejected.is_empty()
    }

    /// Record an input row that never became a transcript record
    pub fn reject_row(&mut self, line: u64, error: FerroError) {
        warn!("Skipping transcript row at line {}: {}", line, error);
        self.rejected.push(RejectedTranscript {
            line,
            id: String::new(),
            error,
        });
    }
}

#[derive(Debug, Clone, Copy)]
struct SpanEntry {
    start: u64,
    end: u64,
    slot: usize,
}

/// Immutable collection of indexed transcripts.
#[derive(Debug, Clone, Default)]
pub struct TranscriptCatalog {
    /// Entries in load order
    entries: Vec<CatalogEntry>,
    by_id: HashMap<String, usize>,
    /// Spans per chromosome, sorted by start then load order
    by_chromosome: HashMap<String, Vec<SpanEntry>>,
}

impl TranscriptCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from transcript records.
    ///
    /// Duplicate identifiers keep the first occurrence; every later row with
    /// the same id is rejected with [`FerroError::DuplicateTranscript`].
    pub fn load<I>(records: I) -> (Self, LoadReport)
    where
        I: IntoIterator<Item = TranscriptRecord>,
    {
        let mut report = LoadReport::default();
        let catalog = Self::load_into(records, &mut report);
        (catalog, report)
    }

    /// Build a catalog, appending rejections to an existing report.
    pub fn load_into<I>(records: I, report: &mut LoadReport) -> Self
    where
        I: IntoIterator<Item = TranscriptRecord>,
    {
        let mut catalog = Self::new();

        for record in records {
            match catalog.insert(&record) {
                Ok(()) => report.loaded += 1,
                Err(error) => {
                    warn!(
                        "Skipping transcript {} at line {}: {}",
                        record.id, record.line, error
                    );
                    report.rejected.push(RejectedTranscript {
                        line: record.line,
                        id: record.id,
                        error,
                    });
                }
            }
        }

        for spans in catalog.by_chromosome.values_mut() {
            spans.sort_by_key(|s| (s.start, s.slot));
        }

        info!(
            "Loaded {} transcript(s) on {} chromosome(s), {} rejected",
            report.loaded,
            catalog.by_chromosome.len(),
            report.rejected.len()
        );

        catalog
    }

    fn insert(&mut self, record: &TranscriptRecord) -> Result<(), FerroError> {
        if self.by_id.contains_key(&record.id) {
            return Err(FerroError::DuplicateTranscript {
                id: record.id.clone(),
            });
        }

        let transcript = Transcript::try_from(record)?;
        let index =
            CoordinateIndex::build(transcript.genomic_start, transcript.strand, &transcript.cigar)?;

        let slot = self.entries.len();
        self.by_chromosome
            .entry(transcript.chromosome.clone())
            .or_default()
            .push(SpanEntry {
                start: index.genomic_start(),
                end: index.genomic_end(),
                slot,
            });
        self.by_id.insert(transcript.id.clone(), slot);
        self.entries.push(CatalogEntry { transcript, index });
        Ok(())
    }

    /// Look up a transcript by identifier.
    pub fn get(&self, id: &str) -> Result<&CatalogEntry, FerroError> {
        self.by_id
            .get(id)
            .map(|&slot| &self.entries[slot])
            .ok_or_else(|| FerroError::UnknownTranscript { id: id.to_string() })
    }

    /// All transcripts on `chromosome` whose genomic span contains `pos`,
    /// in load order.
    pub fn transcripts_covering(&self, chromosome: &str, pos: u64) -> Vec<&CatalogEntry> {
        let Some(spans) = self.by_chromosome.get(chromosome) else {
            return Vec::new();
        };

        let upto = spans.partition_point(|s| s.start <= pos);
        let mut slots: Vec<usize> = spans[..upto]
            .iter()
            .filter(|s| pos < s.end)
            .map(|s| s.slot)
            .collect();
        slots.sort_unstable();
        slots.into_iter().map(|slot| &self.entries[slot]).collect()
    }

    pub fn has_chromosome(&self, chromosome: &str) -> bool {
        self.by_chromosome.contains_key(chromosome)
    }

    /// Number of transcripts in the catalog.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in load order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }
}
