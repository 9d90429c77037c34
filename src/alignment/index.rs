//! Bidirectional transcript/genome coordinate index.
//!
//! A [`CoordinateIndex`] is a monotonic piecewise mapping built from one
//! alignment: an ordered list of match runs, each pairing a contiguous
//! transcript range with a contiguous genome range of the same length.
//! Lookups binary-search the runs, so memory is proportional to the number
//! of CIGAR operations rather than the transcript length.
//!
//! # Coordinate System
//!
//! | Context | Basis | Notes |
//! |---------|-------|-------|
//! | Genome positions | 0-based | `genomic_start` is the first aligned base |
//! | Transcript offsets | 0-based | Offset 0 is the first transcript base in read order |
//! | Ranges | half-open | Inclusive start, exclusive end |
//!
//! On the reverse strand the transcript offsets are reflected around the
//! transcript length `L`: offset 0 is the right-most transcript base of the
//! left-to-right walk. Genome positions are never reflected.

use std::fmt;
use std::str::FromStr;

use super::cigar::{Cigar, OpKind};
use crate::error::FerroError;

/// Strand orientation of a transcript relative to the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

impl FromStr for Strand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            other => Err(format!("invalid strand '{}', expected '+' or '-'", other)),
        }
    }
}

/// Why a coordinate has no counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unmapped {
    /// Inside an insertion (transcript side) or deletion (genome side)
    NotAligned,
    /// Outside the span covered by the alignment
    OutOfRange,
}

/// A maximal run of aligned bases.
///
/// `tx_start` is already strand-adjusted. On the reverse strand the run's
/// genome positions decrease as transcript offsets increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRun {
    pub tx_start: u64,
    pub genome_start: u64,
    pub len: u64,
}

impl MatchRun {
    pub fn tx_end(&self) -> u64 {
        self.tx_start + self.len
    }

    pub fn genome_end(&self) -> u64 {
        self.genome_start + self.len
    }
}

/// Immutable coordinate index for one transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateIndex {
    strand: Strand,
    transcript_len: u64,
    genomic_start: u64,
    genomic_end: u64,
    /// Sorted by `tx_start`
    by_tx: Vec<MatchRun>,
    /// Sorted by `genome_start`
    by_genome: Vec<MatchRun>,
}

impl CoordinateIndex {
    /// Build the index by walking `cigar` left to right along the reference.
    ///
    /// Fails with [`FerroError::EmptyAlignment`] when the alignment has no
    /// transcript bases or no match run, and with
    /// [`FerroError::InvalidCoordinates`] when the genomic span overflows.
    pub fn build(genomic_start: u64, strand: Strand, cigar: &Cigar) -> Result<Self, FerroError> {
        if cigar.is_empty() {
            return Err(FerroError::EmptyAlignment {
                cigar: cigar.to_string(),
                msg: "no operations".to_string(),
            });
        }

        let overflow = || FerroError::InvalidCoordinates {
            msg: format!(
                "alignment '{}' starting at {} overflows the coordinate space",
                cigar, genomic_start
            ),
        };

        let mut runs: Vec<MatchRun> = Vec::with_capacity(cigar.len());
        let mut t_cursor: u64 = 0;
        let mut g_cursor: u64 = genomic_start;

        for op in cigar {
            let t_next = if op.kind.consumes_transcript() {
                t_cursor.checked_add(op.len).ok_or_else(overflow)?
            } else {
                t_cursor
            };
            let g_next = if op.kind.consumes_genome() {
                g_cursor.checked_add(op.len).ok_or_else(overflow)?
            } else {
                g_cursor
            };

            if op.kind == OpKind::Match {
                match runs.last_mut() {
                    // Back-to-back M tokens describe one contiguous run
                    Some(last) if last.tx_end() == t_cursor && last.genome_end() == g_cursor => {
                        last.len += op.len;
                    }
                    _ => runs.push(MatchRun {
                        tx_start: t_cursor,
                        genome_start: g_cursor,
                        len: op.len,
                    }),
                }
            }

            t_cursor = t_next;
            g_cursor = g_next;
        }

        if t_cursor == 0 || runs.is_empty() {
            return Err(FerroError::EmptyAlignment {
                cigar: cigar.to_string(),
                msg: "alignment has no matched transcript bases".to_string(),
            });
        }

        let transcript_len = t_cursor;
        let by_genome = runs;
        let by_tx = match strand {
            Strand::Forward => by_genome.clone(),
            Strand::Reverse => by_genome
                .iter()
                .rev()
                .map(|run| MatchRun {
                    tx_start: transcript_len - run.tx_end(),
                    genome_start: run.genome_start,
                    len: run.len,
                })
                .collect(),
        };
        let by_genome = match strand {
            Strand::Forward => by_genome,
            Strand::Reverse => {
                let mut runs = by_tx.clone();
                runs.reverse();
                runs
            }
        };

        Ok(Self {
            strand,
            transcript_len,
            genomic_start,
            genomic_end: g_cursor,
            by_tx,
            by_genome,
        })
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    /// Total transcript length `L` (sum of `M` and `I` lengths)
    pub fn transcript_len(&self) -> u64 {
        self.transcript_len
    }

    /// First genome position spanned by the alignment
    pub fn genomic_start(&self) -> u64 {
        self.genomic_start
    }

    /// One past the last genome position spanned by the alignment
    pub fn genomic_end(&self) -> u64 {
        self.genomic_end
    }

    /// Match runs in genome order
    pub fn runs(&self) -> &[MatchRun] {
        &self.by_genome
    }

    /// Check if a genome position falls within the aligned span (gaps included)
    pub fn contains_genome_pos(&self, pos: u64) -> bool {
        pos >= self.genomic_start && pos < self.genomic_end
    }

    /// Map a transcript offset to its genome position.
    pub fn transcript_to_genome(&self, offset: u64) -> Result<u64, Unmapped> {
        if offset >= self.transcript_len {
            return Err(Unmapped::OutOfRange);
        }

        let idx = self.by_tx.partition_point(|run| run.tx_end() <= offset);
        match self.by_tx.get(idx) {
            Some(run) if run.tx_start <= offset => {
                let delta = offset - run.tx_start;
                Ok(match self.strand {
                    Strand::Forward => run.genome_start + delta,
                    Strand::Reverse => run.genome_start + run.len - 1 - delta,
                })
            }
            _ => Err(Unmapped::NotAligned),
        }
    }

    /// Map a genome position to its transcript offset.
    pub fn genome_to_transcript(&self, pos: u64) -> Result<u64, Unmapped> {
        if !self.contains_genome_pos(pos) {
            return Err(Unmapped::OutOfRange);
        }

        let idx = self.by_genome.partition_point(|run| run.genome_end() <= pos);
        match self.by_genome.get(idx) {
            Some(run) if run.genome_start <= pos => {
                let delta = pos - run.genome_start;
                Ok(match self.strand {
                    Strand::Forward => run.tx_start + delta,
                    Strand::Reverse => run.tx_start + run.len - 1 - delta,
                })
            }
            _ => Err(Unmapped::NotAligned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::parse_cigar;

    fn index(start: u64, cigar: &str, strand: Strand) -> CoordinateIndex {
        CoordinateIndex::build(start, strand, &parse_cigar(cigar).unwrap()).unwrap()
    }

    #[test]
    fn test_forward_documented_sample() {
        let idx = index(3, "8M7D6M2I2M11D7M", Strand::Forward);
        assert_eq!(idx.transcript_to_genome(2), Ok(5));
        assert_eq!(idx.transcript_to_genome(4), Ok(7));
        assert_eq!(idx.transcript_to_genome(13), Ok(23));
        assert_eq!(idx.genome_to_transcript(7), Ok(4));
        assert_eq!(idx.genome_to_transcript(23), Ok(13));
    }

    #[test]
    fn test_forward_deletion_then_match() {
        let idx = index(10, "5M2D3M", Strand::Forward);
        assert_eq!(idx.transcript_to_genome(2), Ok(12));
        assert_eq!(idx.transcript_to_genome(4), Ok(14));
        assert_eq!(idx.transcript_to_genome(5), Ok(17));
        assert_eq!(idx.genome_to_transcript(15), Err(Unmapped::NotAligned));
        assert_eq!(idx.genome_to_transcript(16), Err(Unmapped::NotAligned));
        assert_eq!(idx.genome_to_transcript(17), Ok(5));
    }

    #[test]
    fn test_reverse_reflects_transcript_offsets() {
        // Forward walk: t[0,5)->g[10,15), t[5,8)->g[17,20); L = 8
        let idx = index(10, "5M2D3M", Strand::Reverse);
        assert_eq!(idx.transcript_len(), 8);
        assert_eq!(idx.transcript_to_genome(0), Ok(19));
        assert_eq!(idx.transcript_to_genome(2), Ok(17));
        assert_eq!(idx.transcript_to_genome(3), Ok(14));
        assert_eq!(idx.transcript_to_genome(7), Ok(10));
        assert_eq!(idx.genome_to_transcript(14), Ok(3));
        assert_eq!(idx.genome_to_transcript(19), Ok(0));
        assert_eq!(idx.genome_to_transcript(16), Err(Unmapped::NotAligned));
    }

    #[test]
    fn test_reverse_insertion_is_not_aligned() {
        let idx = index(20, "4M1I4M", Strand::Reverse);
        assert_eq!(idx.transcript_len(), 9);
        // Forward offset 4 is the insertion; reflected it is 9 - 1 - 4 = 4
        assert_eq!(idx.transcript_to_genome(4), Err(Unmapped::NotAligned));
        assert_eq!(idx.transcript_to_genome(3), Ok(24));
        assert_eq!(idx.transcript_to_genome(5), Ok(23));
    }

    #[test]
    fn test_forward_trailing_insertion() {
        let idx = index(10, "5M2I", Strand::Forward);
        assert_eq!(idx.transcript_to_genome(4), Ok(14));
        assert_eq!(idx.transcript_to_genome(5), Err(Unmapped::NotAligned));
        assert_eq!(idx.transcript_to_genome(6), Err(Unmapped::NotAligned));
        assert_eq!(idx.transcript_to_genome(7), Err(Unmapped::OutOfRange));
    }

    #[test]
    fn test_run_boundaries_are_half_open() {
        let idx = index(0, "3M2I3M", Strand::Forward);
        assert_eq!(idx.transcript_to_genome(0), Ok(0));
        assert_eq!(idx.transcript_to_genome(2), Ok(2));
        assert_eq!(idx.transcript_to_genome(3), Err(Unmapped::NotAligned));
        assert_eq!(idx.transcript_to_genome(5), Ok(3));
        assert_eq!(idx.genome_to_transcript(3), Ok(5));
    }

    #[test]
    fn test_out_of_range() {
        let idx = index(100, "10M", Strand::Forward);
        assert_eq!(idx.transcript_to_genome(10), Err(Unmapped::OutOfRange));
        assert_eq!(idx.genome_to_transcript(99), Err(Unmapped::OutOfRange));
        assert_eq!(idx.genome_to_transcript(110), Err(Unmapped::OutOfRange));
        assert_eq!(idx.genome_to_transcript(109), Ok(9));
    }

    #[test]
    fn test_adjacent_matches_coalesce() {
        let idx = index(0, "3M4M1D2M", Strand::Forward);
        assert_eq!(idx.runs().len(), 2);
        assert_eq!(idx.runs()[0].len, 7);
        assert_eq!(idx.genomic_end(), 10);
    }

    #[test]
    fn test_leading_deletion_shifts_span() {
        let idx = index(50, "2D3M", Strand::Forward);
        assert_eq!(idx.genomic_start(), 50);
        assert_eq!(idx.transcript_to_genome(0), Ok(52));
        assert_eq!(idx.genome_to_transcript(50), Err(Unmapped::NotAligned));
    }

    #[test]
    fn test_build_rejects_empty_alignments() {
        let cigar = Cigar::default();
        assert!(matches!(
            CoordinateIndex::build(0, Strand::Forward, &cigar),
            Err(FerroError::EmptyAlignment { .. })
        ));

        let deletion_only = parse_cigar("5D").unwrap();
        assert!(matches!(
            CoordinateIndex::build(0, Strand::Forward, &deletion_only),
            Err(FerroError::EmptyAlignment { .. })
        ));

        let insertion_only = parse_cigar("5I").unwrap();
        assert!(matches!(
            CoordinateIndex::build(0, Strand::Reverse, &insertion_only),
            Err(FerroError::EmptyAlignment { .. })
        ));
    }

    #[test]
    fn test_build_rejects_overflow() {
        let cigar = parse_cigar("10M").unwrap();
        assert!(matches!(
            CoordinateIndex::build(u64::MAX - 3, Strand::Forward, &cigar),
            Err(FerroError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn test_strand_parse_and_display() {
        assert_eq!("+".parse::<Strand>(), Ok(Strand::Forward));
        assert_eq!(" - ".parse::<Strand>(), Ok(Strand::Reverse));
        assert!("x".parse::<Strand>().is_err());
        assert_eq!(Strand::Reverse.to_string(), "-");
    }
}
