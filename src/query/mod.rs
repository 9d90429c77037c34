//! Single-coordinate queries against a [`TranscriptCatalog`].
//!
//! # Example
//!
//! ```
//! use ferro_txmap::alignment::Strand;
//! use ferro_txmap::catalog::{TranscriptCatalog, TranscriptRecord};
//! use ferro_txmap::query::{MappingStatus, Query, QueryEngine};
//!
//! let (catalog, _) = TranscriptCatalog::load(vec![TranscriptRecord {
//!     line: 2,
//!     id: "TR1".to_string(),
//!     chromosome: "CHR1".to_string(),
//!     genomic_start: 3,
//!     cigar: "8M7D6M2I2M11D7M".to_string(),
//!     strand: Strand::Forward,
//! }]);
//! let engine = QueryEngine::new(&catalog);
//!
//! let result = engine.resolve(&Query::t2g("TR1", 13));
//! assert_eq!(result.status, MappingStatus::Ok);
//! assert_eq!(result.genome_coord, Some(23));
//!
//! let result = engine.resolve(&Query::g2t("CHR1", 23));
//! assert_eq!(result.transcript_id.as_deref(), Some("TR1"));
//! assert_eq!(result.transcript_coord, Some(13));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::alignment::Unmapped;
use crate::catalog::TranscriptCatalog;

/// Query direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    /// Transcript to genome
    T2G,
    /// Genome to transcript
    G2T,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::T2G => write!(f, "T2G"),
            Direction::G2T => write!(f, "G2T"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "T2G" => Ok(Direction::T2G),
            "G2T" => Ok(Direction::G2T),
            other => Err(format!("unknown query type '{}', expected T2G or G2T", other)),
        }
    }
}

/// A validated query.
///
/// Each direction carries exactly the fields it needs, so a query can never
/// reach the engine with its key or coordinate missing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    /// Map a transcript offset to the genome
    T2G { transcript_id: String, coord: u64 },
    /// Map a genome position to a transcript
    G2T { chromosome: String, coord: u64 },
}

impl Query {
    pub fn t2g(transcript_id: impl Into<String>, coord: u64) -> Self {
        Query::T2G {
            transcript_id: transcript_id.into(),
            coord,
        }
    }

    pub fn g2t(chromosome: impl Into<String>, coord: u64) -> Self {
        Query::G2T {
            chromosome: chromosome.into(),
            coord,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Query::T2G { .. } => Direction::T2G,
            Query::G2T { .. } => Direction::G2T,
        }
    }
}

/// Outcome of resolving one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingStatus {
    /// Resolved to a coordinate
    Ok,
    /// Coordinate lies in an insertion or deletion gap
    NotAligned,
    /// T2G query names a transcript absent from the catalog
    UnknownTranscript,
    /// Coordinate lies outside every covered span
    OutOfRange,
}

impl MappingStatus {
    /// Status label used in output files
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingStatus::Ok => "OK",
            MappingStatus::NotAligned => "NOT_ALIGNED",
            MappingStatus::UnknownTranscript => "UNKNOWN_TRANSCRIPT",
            MappingStatus::OutOfRange => "OUT_OF_RANGE",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, MappingStatus::Ok)
    }
}

impl fmt::Display for MappingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Unmapped> for MappingStatus {
    fn from(unmapped: Unmapped) -> Self {
        match unmapped {
            Unmapped::NotAligned => MappingStatus::NotAligned,
            Unmapped::OutOfRange => MappingStatus::OutOfRange,
        }
    }
}

/// One output row: the query's fields plus whatever was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    pub direction: Direction,
    pub transcript_id: Option<String>,
    pub transcript_coord: Option<u64>,
    pub chromosome: Option<String>,
    pub genome_coord: Option<u64>,
    pub status: MappingStatus,
}

impl QueryResult {
    /// The coordinate this query resolved to, if any.
    pub fn resolved_coord(&self) -> Option<u64> {
        match self.direction {
            Direction::T2G => self.genome_coord,
            Direction::G2T => self.transcript_coord,
        }
    }
}

/// Resolves queries against a catalog. Cheap to copy and safe to share
/// across threads.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    catalog: &'a TranscriptCatalog,
}

impl<'a> QueryEngine<'a> {
    pub fn new(catalog: &'a TranscriptCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a TranscriptCatalog {
        self.catalog
    }

    /// Resolve one query.
    pub fn resolve(&self, query: &Query) -> QueryResult {
        match query {
            Query::T2G {
                transcript_id,
                coord,
            } => self.resolve_t2g(transcript_id, *coord),
            Query::G2T { chromosome, coord } => self.resolve_g2t(chromosome, *coord),
        }
    }

    fn resolve_t2g(&self, transcript_id: &str, coord: u64) -> QueryResult {
        let mut result = QueryResult {
            direction: Direction::T2G,
            transcript_id: Some(transcript_id.to_string()),
            transcript_coord: Some(coord),
            chromosome: None,
            genome_coord: None,
            status: MappingStatus::UnknownTranscript,
        };

        let Ok(entry) = self.catalog.get(transcript_id) else {
            return result;
        };

        result.chromosome = Some(entry.chromosome().to_string());
        match entry.index.transcript_to_genome(coord) {
            Ok(pos) => {
                result.genome_coord = Some(pos);
                result.status = MappingStatus::Ok;
            }
            Err(unmapped) => result.status = unmapped.into(),
        }
        result
    }

    /// The first covering transcript in load order that aligns the position
    /// wins. Candidates that all have the position in a deletion yield
    /// `NotAligned`; no candidate at all yields `OutOfRange`.
    fn resolve_g2t(&self, chromosome: &str, coord: u64) -> QueryResult {
        let mut result = QueryResult {
            direction: Direction::G2T,
            transcript_id: None,
            transcript_coord: None,
            chromosome: Some(chromosome.to_string()),
            genome_coord: Some(coord),
            status: MappingStatus::OutOfRange,
        };

        for entry in self.catalog.transcripts_covering(chromosome, coord) {
            match entry.index.genome_to_transcript(coord) {
                Ok(offset) => {
                    result.transcript_id = Some(entry.id().to_string());
                    result.transcript_coord = Some(offset);
                    result.status = MappingStatus::Ok;
                    return result;
                }
                Err(unmapped) => {
                    result.status = MappingStatus::from(unmapped);
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::Strand;
    use crate::catalog::TranscriptRecord;

    fn catalog() -> TranscriptCatalog {
        let rows = [
            ("TR1", "CHR1", 3, "8M7D6M2I2M11D7M", Strand::Forward),
            ("TR2", "CHR2", 10, "20M", Strand::Forward),
            ("TR3", "CHR3", 10, "5M2D3M", Strand::Reverse),
            ("TR4", "CHR3", 14, "10M", Strand::Forward),
        ];
        let records = rows
            .iter()
            .enumerate()
            .map(|(i, (id, chrom, start, cigar, strand))| TranscriptRecord {
                line: i as u64 + 2,
                id: id.to_string(),
                chromosome: chrom.to_string(),
                genomic_start: *start,
                cigar: cigar.to_string(),
                strand: *strand,
            });
        TranscriptCatalog::load(records).0
    }

    #[test]
    fn test_t2g_documented_sample() {
        let catalog = catalog();
        let engine = QueryEngine::new(&catalog);

        for (tx, coord, chrom, expected) in [
            ("TR1", 4, "CHR1", 7),
            ("TR2", 0, "CHR2", 10),
            ("TR1", 13, "CHR1", 23),
            ("TR2", 10, "CHR2", 20),
            ("TR1", 2, "CHR1", 5),
        ] {
            let result = engine.resolve(&Query::t2g(tx, coord));
            assert_eq!(result.status, MappingStatus::Ok);
            assert_eq!(result.chromosome.as_deref(), Some(chrom));
            assert_eq!(result.genome_coord, Some(expected));
            assert_eq!(result.resolved_coord(), Some(expected));
        }
    }

    #[test]
    fn test_t2g_unknown_transcript() {
        let catalog = catalog();
        let result = QueryEngine::new(&catalog).resolve(&Query::t2g("TR9", 1));
        assert_eq!(result.status, MappingStatus::UnknownTranscript);
        assert_eq!(result.transcript_id.as_deref(), Some("TR9"));
        assert_eq!(result.transcript_coord, Some(1));
        assert!(result.chromosome.is_none());
        assert!(result.genome_coord.is_none());
    }

    #[test]
    fn test_t2g_insertion_and_out_of_range() {
        let catalog = catalog();
        let engine = QueryEngine::new(&catalog);
        // TR1 offsets 14 and 15 are the 2I
        assert_eq!(
            engine.resolve(&Query::t2g("TR1", 14)).status,
            MappingStatus::NotAligned
        );
        let result = engine.resolve(&Query::t2g("TR1", 25));
        assert_eq!(result.status, MappingStatus::OutOfRange);
        assert_eq!(result.chromosome.as_deref(), Some("CHR1"));
        assert!(result.genome_coord.is_none());
    }

    #[test]
    fn test_g2t_resolves_transcript() {
        let catalog = catalog();
        let engine = QueryEngine::new(&catalog);

        let result = engine.resolve(&Query::g2t("CHR1", 7));
        assert_eq!(result.status, MappingStatus::Ok);
        assert_eq!(result.transcript_id.as_deref(), Some("TR1"));
        assert_eq!(result.transcript_coord, Some(4));
        assert_eq!(result.resolved_coord(), Some(4));
    }

    #[test]
    fn test_g2t_deletion_is_not_aligned() {
        let catalog = catalog();
        // CHR1 [11, 18) is TR1's 7D
        let result = QueryEngine::new(&catalog).resolve(&Query::g2t("CHR1", 12));
        assert_eq!(result.status, MappingStatus::NotAligned);
        assert!(result.transcript_id.is_none());
        assert!(result.transcript_coord.is_none());
    }

    #[test]
    fn test_g2t_falls_through_to_next_transcript() {
        let catalog = catalog();
        let engine = QueryEngine::new(&catalog);

        // CHR3:16 is inside TR3's deletion but aligned by TR4
        let result = engine.resolve(&Query::g2t("CHR3", 16));
        assert_eq!(result.status, MappingStatus::Ok);
        assert_eq!(result.transcript_id.as_deref(), Some("TR4"));
        assert_eq!(result.transcript_coord, Some(2));

        // CHR3:14 is aligned by both; TR3 loaded first wins
        let result = engine.resolve(&Query::g2t("CHR3", 14));
        assert_eq!(result.transcript_id.as_deref(), Some("TR3"));
        assert_eq!(result.transcript_coord, Some(3));
    }

    #[test]
    fn test_g2t_out_of_range() {
        let catalog = catalog();
        let engine = QueryEngine::new(&catalog);
        assert_eq!(
            engine.resolve(&Query::g2t("CHR2", 30)).status,
            MappingStatus::OutOfRange
        );
        assert_eq!(
            engine.resolve(&Query::g2t("CHRUN", 5)).status,
            MappingStatus::OutOfRange
        );
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = TranscriptCatalog::new();
        let engine = QueryEngine::new(&catalog);
        assert_eq!(
            engine.resolve(&Query::t2g("TR1", 0)).status,
            MappingStatus::UnknownTranscript
        );
        assert_eq!(
            engine.resolve(&Query::g2t("CHR1", 0)).status,
            MappingStatus::OutOfRange
        );
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("T2G".parse::<Direction>(), Ok(Direction::T2G));
        assert_eq!("G2T".parse::<Direction>(), Ok(Direction::G2T));
        assert!("t2g".parse::<Direction>().is_err());
        assert_eq!(Query::g2t("CHR1", 1).direction(), Direction::G2T);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(MappingStatus::Ok.to_string(), "OK");
        assert_eq!(MappingStatus::NotAligned.as_str(), "NOT_ALIGNED");
        assert_eq!(
            serde_json::to_string(&MappingStatus::UnknownTranscript).unwrap(),
            "\"UNKNOWN_TRANSCRIPT\""
        );
    }
}
