//! Output formatting utilities for CLI operations

use std::io::{self, Write};
use std::str::FromStr;

use crate::catalog::LoadReport;
use crate::error::FerroError;
use crate::query::{Direction, QueryResult};

/// Output format for single lookups and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain text format (default)
    #[default]
    Text,
    /// JSON format, one object per line
    Json,
}

impl FromStr for OutputFormat {
    type Err = std::convert::Infallible;

    /// Parse an output format from a string
    ///
    /// # Examples
    ///
    /// ```
    /// use ferro_txmap::cli::OutputFormat;
    /// use std::str::FromStr;
    ///
    /// assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
    /// assert_eq!(OutputFormat::from_str("anything").unwrap(), OutputFormat::Text);
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        })
    }
}

/// Write one resolved query
///
/// # Examples
///
/// ```
/// use ferro_txmap::cli::{output_result, OutputFormat};
/// use ferro_txmap::query::{Direction, MappingStatus, QueryResult};
///
/// let result = QueryResult {
///     direction: Direction::T2G,
///     transcript_id: Some("TR1".to_string()),
///     transcript_coord: Some(4),
///     chromosome: Some("CHR1".to_string()),
///     genome_coord: Some(7),
///     status: MappingStatus::Ok,
/// };
/// let mut buffer = Vec::new();
/// output_result(&mut buffer, &result, OutputFormat::Text).unwrap();
/// assert_eq!(String::from_utf8(buffer).unwrap(), "TR1:4 -> CHR1:7\tOK\n");
/// ```
pub fn output_result<W: Write>(
    writer: &mut W,
    result: &QueryResult,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, result)?;
            writeln!(writer)
        }
        OutputFormat::Text => {
            let tx = locus(result.transcript_id.as_deref(), result.transcript_coord);
            let genome = locus(result.chromosome.as_deref(), result.genome_coord);
            let (from, to) = match result.direction {
                Direction::T2G => (tx, genome),
                Direction::G2T => (genome, tx),
            };
            writeln!(writer, "{} -> {}\t{}", from, to, result.status)
        }
    }
}

fn locus(name: Option<&str>, coord: Option<u64>) -> String {
    match (name, coord) {
        (Some(name), Some(coord)) => format!("{}:{}", name, coord),
        (Some(name), None) => format!("{}:?", name),
        (None, Some(coord)) => format!("?:{}", coord),
        (None, None) => "?".to_string(),
    }
}

/// Write an error with optional line number context
///
/// # Examples
///
/// ```
/// use ferro_txmap::cli::{output_error_with_context, OutputFormat};
/// use ferro_txmap::FerroError;
///
/// let mut buffer = Vec::new();
/// let error = FerroError::DuplicateTranscript { id: "TR1".to_string() };
/// output_error_with_context(&mut buffer, &error, OutputFormat::Text, Some(42)).unwrap();
/// let text = String::from_utf8(buffer).unwrap();
/// assert!(text.starts_with("ERROR (line 42): [E1103]"));
/// ```
pub fn output_error_with_context<W: Write>(
    writer: &mut W,
    error: &FerroError,
    format: OutputFormat,
    line_number: Option<u64>,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "code": error.code().as_str(),
                "error": error.to_string(),
                "line": line_number,
                "status": "error",
            });
            serde_json::to_writer(&mut *writer, &value)?;
            writeln!(writer)
        }
        OutputFormat::Text => {
            let message = error.detailed_message();
            match line_number {
                Some(line) => writeln!(writer, "ERROR (line {}): {}", line, message),
                None => writeln!(writer, "ERROR: {}", message),
            }
        }
    }
}

/// Write every rejected transcript of a load report
pub fn output_load_report<W: Write>(
    writer: &mut W,
    report: &LoadReport,
    format: OutputFormat,
) -> io::Result<()> {
    for rejected in &report.rejected {
        output_error_with_context(writer, &rejected.error, format, Some(rejected.line))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RejectedTranscript;
    use crate::query::MappingStatus;

    fn g2t_not_aligned() -> QueryResult {
        QueryResult {
            direction: Direction::G2T,
            transcript_id: None,
            transcript_coord: None,
            chromosome: Some("CHR1".to_string()),
            genome_coord: Some(12),
            status: MappingStatus::NotAligned,
        }
    }

    #[test]
    fn test_output_result_text_g2t() {
        let mut buffer = Vec::new();
        output_result(&mut buffer, &g2t_not_aligned(), OutputFormat::Text).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "CHR1:12 -> ?\tNOT_ALIGNED\n");
    }

    #[test]
    fn test_output_result_json() {
        let mut buffer = Vec::new();
        output_result(&mut buffer, &g2t_not_aligned(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["direction"], "G2T");
        assert_eq!(value["status"], "NOT_ALIGNED");
        assert_eq!(value["genome_coord"], 12);
        assert!(value["transcript_coord"].is_null());
    }

    #[test]
    fn test_output_error_json() {
        let mut buffer = Vec::new();
        let error = FerroError::malformed_row(7, "missing Genome_Coord");
        output_error_with_context(&mut buffer, &error, OutputFormat::Json, Some(7)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["code"], "E1201");
        assert_eq!(value["line"], 7);
    }

    #[test]
    fn test_output_load_report() {
        let report = LoadReport {
            loaded: 1,
            rejected: vec![RejectedTranscript {
                line: 3,
                id: "TR2".to_string(),
                error: FerroError::DuplicateTranscript {
                    id: "TR2".to_string(),
                },
            }],
        };
        let mut buffer = Vec::new();
        output_load_report(&mut buffer, &report, OutputFormat::Text).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("line 3"));
        assert!(text.contains("Duplicate transcript: TR2"));
    }
}
