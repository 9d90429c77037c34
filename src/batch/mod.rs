//! Batch resolution of transcript coordinate queries.
//!
//! [`BatchPipeline`] streams a query file through a pool of worker threads
//! chunk by chunk, retrying transient I/O failures and honouring a
//! [`CancellationToken`]. Output order always matches input order.
//!
//! # Example
//!
//! ```
//! use ferro_txmap::alignment::Strand;
//! use ferro_txmap::batch::{BatchPipeline, CancellationToken, PipelineConfig};
//! use ferro_txmap::catalog::{TranscriptCatalog, TranscriptRecord};
//! use ferro_txmap::io::{OutputLayout, TsvQuerySource, TsvResultSink};
//!
//! let (catalog, _) = TranscriptCatalog::load(vec![TranscriptRecord {
//!     line: 2,
//!     id: "TR1".to_string(),
//!     chromosome: "CHR1".to_string(),
//!     genomic_start: 3,
//!     cigar: "8M7D6M2I2M11D7M".to_string(),
//!     strand: Strand::Forward,
//! }]);
//!
//! let input = "Type\tTranscript\tTranscript_Coord\tChromosome\tGenome_Coord\n\
//!              T2G\tTR1\t4\t\t\n";
//! let mut source = TsvQuerySource::new(input.as_bytes(), "queries").unwrap();
//! let mut sink = TsvResultSink::new(Vec::new(), OutputLayout::default()).unwrap();
//!
//! let mut pipeline = BatchPipeline::new(PipelineConfig::new().workers(2));
//! let summary = pipeline
//!     .run(&catalog, &mut source, &mut sink, &CancellationToken::new())
//!     .unwrap();
//! assert_eq!(summary.statuses.ok, 1);
//!
//! let output = String::from_utf8(sink.into_inner()).unwrap();
//! assert!(output.ends_with("T2G\tTR1\t4\tCHR1\t7\tOK\n"));
//! ```

mod cancel;
mod pipeline;
mod retry;

pub use cancel::CancellationToken;
pub use pipeline::{BatchPipeline, PipelineConfig, PipelineState, PipelineSummary, StatusCounts};
pub use retry::RetryPolicy;
