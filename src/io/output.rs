//! Result writers

use std::io::Write;

use crate::error::FerroError;
use crate::query::QueryResult;

/// Output column layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLayout {
    /// Append the `Status` column
    pub status_column: bool,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            status_column: true,
        }
    }
}

impl OutputLayout {
    pub fn header(&self) -> Vec<&'static str> {
        let mut header = vec![
            "Type",
            "Transcript",
            "Transcript_Coord",
            "Chromosome",
            "Genome_Coord",
        ];
        if self.status_column {
            header.push("Status");
        }
        header
    }
}

/// A destination for resolved chunks.
pub trait ResultSink {
    /// Append one chunk of results.
    ///
    /// If this returns an error the same chunk may be passed again; a sink
    /// must not emit any row of it twice.
    fn write_chunk(&mut self, results: &[QueryResult]) -> Result<(), FerroError>;

    /// Flush everything written so far.
    fn flush(&mut self) -> Result<(), FerroError>;
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn write_chunk(&mut self, results: &[QueryResult]) -> Result<(), FerroError> {
        (**self).write_chunk(results)
    }

    fn flush(&mut self) -> Result<(), FerroError> {
        (**self).flush()
    }
}

/// Collects results in memory.
impl ResultSink for Vec<QueryResult> {
    fn write_chunk(&mut self, results: &[QueryResult]) -> Result<(), FerroError> {
        self.extend_from_slice(results);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), FerroError> {
        Ok(())
    }
}

/// Tab-separated result writer.
///
/// Each chunk is encoded once into a buffer and the number of bytes
/// accepted by the writer is tracked. Until a chunk is fully written, a
/// repeated call continues from the first byte that was not written and
/// ignores the results passed in. The header is emitted ahead of the
/// first chunk, or on [`flush`](ResultSink::flush) when there are no rows.
pub struct TsvResultSink<W: Write> {
    writer: W,
    layout: OutputLayout,
    buffer: Vec<u8>,
    written: usize,
    /// Row count of the chunk in the buffer, until it is fully written
    in_flight: Option<usize>,
    rows: u64,
}

impl<W: Write> TsvResultSink<W> {
    pub fn new(writer: W, layout: OutputLayout) -> Result<Self, FerroError> {
        let mut sink = Self {
            writer,
            layout,
            buffer: Vec::new(),
            written: 0,
            in_flight: None,
            rows: 0,
        };
        let header = layout.header();
        sink.buffer = encode(|w| w.write_record(&header))?;
        Ok(sink)
    }

    /// Rows fully written so far.
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn encode_chunk(&self, results: &[QueryResult]) -> Result<Vec<u8>, FerroError> {
        let layout = self.layout;
        encode(|w| {
            for result in results {
                let mut row = vec![
                    result.direction.to_string(),
                    result.transcript_id.clone().unwrap_or_default(),
                    result
                        .transcript_coord
                        .map(|c| c.to_string())
                        .unwrap_or_default(),
                    result.chromosome.clone().unwrap_or_default(),
                    result
                        .genome_coord
                        .map(|c| c.to_string())
                        .unwrap_or_default(),
                ];
                if layout.status_column {
                    row.push(result.status.to_string());
                }
                w.write_record(&row)?;
            }
            Ok(())
        })
    }

    fn finish_chunk(&mut self) {
        if let Some(rows) = self.in_flight.take() {
            self.rows += rows as u64;
        }
    }

    /// Write the unwritten tail of the buffer.
    fn drain_buffer(&mut self) -> Result<(), FerroError> {
        while self.written < self.buffer.len() {
            match self.writer.write(&self.buffer[self.written..]) {
                Ok(0) => {
                    return Err(FerroError::Io {
                        msg: "writer accepted no bytes".to_string(),
                    })
                }
                Ok(n) => self.written += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.buffer.clear();
        self.written = 0;
        Ok(())
    }
}

impl<W: Write> ResultSink for TsvResultSink<W> {
    fn write_chunk(&mut self, results: &[QueryResult]) -> Result<(), FerroError> {
        if self.in_flight.is_none() {
            let mut encoded = self.encode_chunk(results)?;
            self.buffer.append(&mut encoded);
            self.in_flight = Some(results.len());
        }

        self.drain_buffer()?;
        self.finish_chunk();
        Ok(())
    }

    /// Also completes a chunk whose write previously failed part way.
    fn flush(&mut self) -> Result<(), FerroError> {
        self.drain_buffer()?;
        self.finish_chunk();
        self.writer.flush()?;
        Ok(())
    }
}

/// Run `f` against a tab-separated writer over a fresh buffer.
fn encode<F>(f: F) -> Result<Vec<u8>, FerroError>
where
    F: FnOnce(&mut csv::Writer<Vec<u8>>) -> csv::Result<()>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(Vec::new());
    f(&mut writer)?;
    writer.into_inner().map_err(|e| FerroError::Io {
        msg: e.to_string(),
    })
}
