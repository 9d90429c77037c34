//! Alignment decoding and per-transcript coordinate indexing.
//!
//! # Example
//!
//! ```
//! use ferro_txmap::alignment::{parse_cigar, CoordinateIndex, Strand};
//!
//! let cigar = parse_cigar("8M7D6M2I2M11D7M").unwrap();
//! let index = CoordinateIndex::build(3, Strand::Forward, &cigar).unwrap();
//!
//! assert_eq!(index.transcript_to_genome(4), Ok(7));
//! assert_eq!(index.genome_to_transcript(23), Ok(13));
//! ```

pub mod cigar;
pub mod index;

pub use cigar::{parse_cigar, AlignmentOp, Cigar, OpKind};
pub use index::{CoordinateIndex, MatchRun, Strand, Unmapped};
