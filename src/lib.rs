// Copyright (c) 2024-2025 Fulcrum Genomics LLC
// SPDX-License-Identifier: MIT

//! ferro-txmap: transcript/genome coordinate mapping
//!
//! Part of the ferro bioinformatics toolkit.
//!
//! Transcripts are described by a chromosome, a 0-based genomic start, a
//! strand and a CIGAR string of `M`/`I`/`D` operations. Each transcript is
//! indexed once; queries then translate transcript offsets to genome
//! positions (T2G) and genome positions back to transcript offsets (G2T).
//!
//! # Example
//!
//! ```
//! use ferro_txmap::{parse_cigar, CoordinateIndex, Strand};
//!
//! let cigar = parse_cigar("8M7D6M2I2M11D7M").unwrap();
//! let index = CoordinateIndex::build(3, Strand::Forward, &cigar).unwrap();
//!
//! assert_eq!(index.transcript_to_genome(2), Ok(5));
//! assert_eq!(index.genome_to_transcript(23), Ok(13));
//! ```

pub mod alignment;
pub mod batch;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod query;

// Re-export commonly used types
pub use alignment::{parse_cigar, Cigar, CoordinateIndex, OpKind, Strand, Unmapped};
pub use batch::{BatchPipeline, CancellationToken, PipelineConfig, PipelineSummary, RetryPolicy};
pub use catalog::{LoadReport, TranscriptCatalog, TranscriptRecord};
pub use config::TxMapConfig;
pub use error::{ErrorCode, FerroError};
pub use query::{Direction, MappingStatus, Query, QueryEngine, QueryResult};

/// Result type alias for ferro-txmap operations
pub type Result<T> = std::result::Result<T, FerroError>;
