//! Chunked, multi-threaded query pipeline.
//!
//! The calling thread reads chunks from a [`QuerySource`] and hands them to
//! a fixed pool of scoped workers over a bounded channel. Workers resolve
//! whole chunks against the shared catalog and send them back tagged with
//! their sequence number; the calling thread reorders them and appends them
//! to the [`ResultSink`] strictly in input order.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, unbounded};
use log::{debug, info, warn};

use super::cancel::CancellationToken;
use super::retry::RetryPolicy;
use crate::catalog::{LoadReport, TranscriptCatalog};
use crate::error::FerroError;
use crate::io::{load_transcripts, QuerySource, ResultSink};
use crate::query::{MappingStatus, Query, QueryEngine, QueryResult};

/// Pipeline tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Worker threads. At least 1.
    pub workers: usize,
    /// Query rows per chunk. At least 1.
    pub chunk_size: usize,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            chunk_size: 10_000,
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Capacity of the work channel.
    pub fn queue_capacity(&self) -> usize {
        2 * self.workers.max(1)
    }
}

/// Lifecycle of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    /// Building the transcript catalog
    Loading,
    /// Reading, resolving and writing chunks
    Streaming,
    /// No more chunks are read; finishing those in flight
    Draining,
    Terminated,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Loading => "loading",
            PipelineState::Streaming => "streaming",
            PipelineState::Draining => "draining",
            PipelineState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Written rows per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub ok: u64,
    pub not_aligned: u64,
    pub unknown_transcript: u64,
    pub out_of_range: u64,
}

impl StatusCounts {
    pub fn record(&mut self, status: MappingStatus) {
        match status {
            MappingStatus::Ok => self.ok += 1,
            MappingStatus::NotAligned => self.not_aligned += 1,
            MappingStatus::UnknownTranscript => self.unknown_transcript += 1,
            MappingStatus::OutOfRange => self.out_of_range += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.ok + self.not_aligned + self.unknown_transcript + self.out_of_range
    }
}

/// Outcome of a completed or cancelled run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSummary {
    /// Final state, `Terminated` once `run` returns
    pub state: PipelineState,
    /// Data rows read, including malformed ones
    pub rows_read: u64,
    /// Result rows appended to the sink
    pub rows_written: u64,
    pub statuses: StatusCounts,
    /// Rows skipped because they failed validation, in input order
    pub malformed: Vec<FerroError>,
    pub chunks_read: u64,
    pub chunks_written: u64,
    /// Chunks read but dropped because of cancellation
    pub chunks_discarded: u64,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl PipelineSummary {
    pub fn has_rejections(&self) -> bool {
        !self.malformed.is_empty()
    }
}

struct WorkItem {
    seq: u64,
    queries: Vec<Query>,
}

struct Completed {
    seq: u64,
    /// `None` when the chunk was discarded without being resolved
    results: Option<Vec<QueryResult>>,
}

/// Holds completed chunks until every earlier chunk has been written.
#[derive(Default)]
struct Reorder {
    pending: BTreeMap<u64, Option<Vec<QueryResult>>>,
    next: u64,
    /// A discarded chunk was reached; nothing after it is written
    closed: bool,
}

impl Reorder {
    fn insert(&mut self, done: Completed) {
        if !self.closed {
            self.pending.insert(done.seq, done.results);
        }
    }

    fn pop_ready(&mut self) -> Option<(u64, Vec<QueryResult>)> {
        if self.closed {
            return None;
        }
        match self.pending.remove(&self.next)? {
            Some(results) => {
                let seq = self.next;
                self.next += 1;
                Some((seq, results))
            }
            None => {
                self.closed = true;
                self.pending.clear();
                None
            }
        }
    }
}

fn receive(done: Completed, reorder: &mut Reorder, summary: &mut PipelineSummary) {
    if done.results.is_none() {
        summary.chunks_discarded += 1;
    }
    reorder.insert(done);
}

/// Streams queries through a worker pool into a sink.
#[derive(Debug)]
pub struct BatchPipeline {
    config: PipelineConfig,
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl BatchPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: PipelineState::Idle,
            history: vec![PipelineState::Idle],
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state entered so far, in order.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    fn transition(&mut self, next: PipelineState) {
        if self.state != next {
            info!("Pipeline {} -> {}", self.state, next);
            self.state = next;
            self.history.push(next);
        }
    }

    /// Load the transcript table that queries will be resolved against.
    pub fn load_catalog<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> Result<(TranscriptCatalog, LoadReport), FerroError> {
        self.transition(PipelineState::Loading);
        match load_transcripts(path) {
            Ok(loaded) => Ok(loaded),
            Err(e) => {
                self.transition(PipelineState::Terminated);
                Err(e)
            }
        }
    }

    /// Resolve every query from `source` and append the results to `sink`.
    ///
    /// Returns the summary on completion or cancellation. A read or write
    /// that exhausts its retries, or any non-transient I/O failure, ends the
    /// run with that error after flushing what was already written.
    pub fn run<S, K>(
        &mut self,
        catalog: &TranscriptCatalog,
        source: &mut S,
        sink: &mut K,
        token: &CancellationToken,
    ) -> Result<PipelineSummary, FerroError>
    where
        S: QuerySource + ?Sized,
        K: ResultSink + ?Sized,
    {
        let start = Instant::now();
        if self.state == PipelineState::Idle {
            self.transition(PipelineState::Loading);
        }
        self.transition(PipelineState::Streaming);

        let workers = self.config.workers.max(1);
        let chunk_size = self.config.chunk_size.max(1);
        let capacity = self.config.queue_capacity();
        let max_in_flight = (capacity + workers) as u64;
        let retry = self.config.retry.clone();
        info!(
            "Resolving queries with {} worker(s), {} row(s) per chunk",
            workers, chunk_size
        );

        let engine = QueryEngine::new(catalog);
        let stop = CancellationToken::new();
        let mut summary = PipelineSummary::default();
        let mut reorder = Reorder::default();
        let mut failure: Option<FerroError> = None;
        let mut sink_failed = false;

        let (work_tx, work_rx) = bounded::<WorkItem>(capacity);
        let (done_tx, done_rx) = unbounded::<Completed>();

        thread::scope(|scope| {
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let done_tx = done_tx.clone();
                let stop = &stop;
                scope.spawn(move || {
                    while let Ok(item) = work_rx.recv() {
                        let results = if token.is_cancelled() || stop.is_cancelled() {
                            None
                        } else {
                            Some(item.queries.iter().map(|q| engine.resolve(q)).collect())
                        };
                        let done = Completed {
                            seq: item.seq,
                            results,
                        };
                        if done_tx.send(done).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(work_rx);
            drop(done_tx);

            let mut write_ready = |reorder: &mut Reorder, summary: &mut PipelineSummary| {
                while let Some((seq, results)) = reorder.pop_ready() {
                    retry.run("write", seq, || sink.write_chunk(&results))?;
                    for result in &results {
                        summary.statuses.record(result.status);
                    }
                    summary.rows_written += results.len() as u64;
                    summary.chunks_written += 1;
                    debug!("Wrote chunk {} ({} rows)", seq, results.len());
                }
                Ok::<(), FerroError>(())
            };

            let mut seq = 0u64;
            'read: loop {
                // A chunk holds a window slot from its read until it is written
                while seq - reorder.next >= max_in_flight
                    && !reorder.closed
                    && !token.is_cancelled()
                {
                    let Ok(done) = done_rx.recv() else { break };
                    receive(done, &mut reorder, &mut summary);
                    if let Err(e) = write_ready(&mut reorder, &mut summary) {
                        sink_failed = true;
                        failure = Some(e);
                        break 'read;
                    }
                }

                if token.is_cancelled() {
                    summary.cancelled = true;
                    info!("Cancellation requested after {} chunk(s) read", seq);
                    break;
                }

                let rows = match retry.run("read", seq, || source.read_chunk(chunk_size)) {
                    Ok(Some(rows)) => rows,
                    Ok(None) => break,
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                };
                summary.chunks_read += 1;
                summary.rows_read += rows.len() as u64;

                let mut queries = Vec::with_capacity(rows.len());
                for row in rows {
                    match row.query {
                        Ok(query) => queries.push(query),
                        Err(e) => {
                            warn!("Skipping query row: {}", e);
                            summary.malformed.push(e);
                        }
                    }
                }

                if work_tx.send(WorkItem { seq, queries }).is_err() {
                    failure = Some(FerroError::Io {
                        msg: "worker pool stopped unexpectedly".to_string(),
                    });
                    break;
                }
                seq += 1;

                while let Ok(done) = done_rx.try_recv() {
                    receive(done, &mut reorder, &mut summary);
                }
                if let Err(e) = write_ready(&mut reorder, &mut summary) {
                    sink_failed = true;
                    failure = Some(e);
                    break;
                }
            }

            self.transition(PipelineState::Draining);
            if failure.is_some() {
                stop.cancel();
            }
            drop(work_tx);

            for done in done_rx.iter() {
                receive(done, &mut reorder, &mut summary);
                if !sink_failed {
                    if let Err(e) = write_ready(&mut reorder, &mut summary) {
                        sink_failed = true;
                        stop.cancel();
                        if failure.is_none() {
                            failure = Some(e);
                        }
                    }
                }
            }
        });

        let flushed = retry.run("flush", summary.chunks_written, || sink.flush());
        self.transition(PipelineState::Terminated);
        summary.state = self.state;
        summary.elapsed = start.elapsed();

        info!(
            "Read {} row(s) in {} chunk(s), wrote {} row(s) in {} chunk(s): \
             {} ok, {} not aligned, {} unknown transcript, {} out of range, {} malformed",
            summary.rows_read,
            summary.chunks_read,
            summary.rows_written,
            summary.chunks_written,
            summary.statuses.ok,
            summary.statuses.not_aligned,
            summary.statuses.unknown_transcript,
            summary.statuses.out_of_range,
            summary.malformed.len()
        );

        match (failure, flushed) {
            (Some(e), flushed) => {
                if let Err(flush_err) = flushed {
                    warn!("Flushing output after failure also failed: {}", flush_err);
                }
                Err(e)
            }
            (None, Err(e)) => Err(e),
            (None, Ok(())) => {
                if summary.cancelled {
                    warn!(
                        "Run cancelled: {} chunk(s) written, {} discarded",
                        summary.chunks_written, summary.chunks_discarded
                    );
                }
                Ok(summary)
            }
        }
    }
}
