//! CIGAR operation string decoding
//!
//! Only the three operations that describe a transcript-to-reference
//! alignment are supported: `M` (match), `I` (insertion in the transcript)
//! and `D` (deletion from the transcript). Clipping, padding and skipped
//! reference (`S`, `H`, `P`, `N`, `=`, `X`) are rejected.

use std::fmt;
use std::str::FromStr;

use nom::character::complete::{anychar, digit1};

use crate::error::FerroError;

/// Kind of a single alignment operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Transcript and genome bases aligned one to one (`M`)
    Match,
    /// Transcript bases with no genomic counterpart (`I`)
    Insertion,
    /// Genomic bases with no transcript counterpart (`D`)
    Deletion,
}

impl OpKind {
    /// Map a CIGAR letter to an operation kind
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'M' => Some(OpKind::Match),
            'I' => Some(OpKind::Insertion),
            'D' => Some(OpKind::Deletion),
            _ => None,
        }
    }

    /// The CIGAR letter for this operation
    pub fn as_char(&self) -> char {
        match self {
            OpKind::Match => 'M',
            OpKind::Insertion => 'I',
            OpKind::Deletion => 'D',
        }
    }

    /// Whether the operation advances the transcript cursor
    pub fn consumes_transcript(&self) -> bool {
        matches!(self, OpKind::Match | OpKind::Insertion)
    }

    /// Whether the operation advances the genome cursor
    pub fn consumes_genome(&self) -> bool {
        matches!(self, OpKind::Match | OpKind::Deletion)
    }
}

/// A single (length, operation) token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlignmentOp {
    pub kind: OpKind,
    /// Always at least 1
    pub len: u64,
}

impl AlignmentOp {
    pub fn new(kind: OpKind, len: u64) -> Self {
        Self { kind, len }
    }
}

impl fmt::Display for AlignmentOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len, self.kind.as_char())
    }
}

/// A decoded CIGAR string: operations in reference (left-to-right) order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cigar(Vec<AlignmentOp>);

impl Cigar {
    pub fn new(ops: Vec<AlignmentOp>) -> Self {
        Self(ops)
    }

    pub fn ops(&self) -> &[AlignmentOp] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AlignmentOp> {
        self.0.iter()
    }

    /// Number of transcript bases (sum of `M` and `I` lengths)
    pub fn transcript_len(&self) -> u64 {
        self.consumed(OpKind::consumes_transcript)
    }

    /// Number of reference bases spanned (sum of `M` and `D` lengths)
    pub fn genome_len(&self) -> u64 {
        self.consumed(OpKind::consumes_genome)
    }

    fn consumed(&self, consumes: impl Fn(&OpKind) -> bool) -> u64 {
        self.0
            .iter()
            .filter(|op| consumes(&op.kind))
            .fold(0u64, |acc, op| acc.saturating_add(op.len))
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.0 {
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}

impl FromStr for Cigar {
    type Err = FerroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cigar(s)
    }
}

impl<'a> IntoIterator for &'a Cigar {
    type Item = &'a AlignmentOp;
    type IntoIter = std::slice::Iter<'a, AlignmentOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Decode a CIGAR string into its operations.
///
/// Surrounding whitespace is ignored. Every token must be a positive decimal
/// length followed by one of `M`, `I`, `D`.
///
/// # Examples
///
/// ```
/// use ferro_txmap::alignment::{parse_cigar, AlignmentOp, OpKind};
///
/// let cigar = parse_cigar("5M2D3M").unwrap();
/// assert_eq!(
///     cigar.ops(),
///     &[
///         AlignmentOp::new(OpKind::Match, 5),
///         AlignmentOp::new(OpKind::Deletion, 2),
///         AlignmentOp::new(OpKind::Match, 3),
///     ]
/// );
/// assert!(parse_cigar("5X").is_err());
/// ```
pub fn parse_cigar(cigar: &str) -> Result<Cigar, FerroError> {
    let body = cigar.trim();
    let lead = cigar.len() - cigar.trim_start().len();
    if body.is_empty() {
        return Err(FerroError::malformed_cigar(
            cigar,
            0,
            "empty operation string",
        ));
    }

    let mut ops = Vec::new();
    let mut rest = body;
    while !rest.is_empty() {
        let pos = lead + body.len() - rest.len();

        let (after_len, digits) = digit1::<&str, nom::error::Error<&str>>(rest)
            .map_err(|_| FerroError::malformed_cigar(cigar, pos, "expected operation length"))?;
        let len: u64 = digits
            .parse()
            .map_err(|_| FerroError::malformed_cigar(cigar, pos, "operation length overflows"))?;
        if len == 0 {
            return Err(FerroError::malformed_cigar(
                cigar,
                pos,
                "operation length must be positive",
            ));
        }

        let op_pos = pos + digits.len();
        let (after_op, letter) = anychar::<&str, nom::error::Error<&str>>(after_len).map_err(|_| {
            FerroError::malformed_cigar(cigar, op_pos, "missing operation after length")
        })?;
        let kind = OpKind::from_char(letter).ok_or_else(|| {
            FerroError::malformed_cigar(
                cigar,
                op_pos,
                format!("unsupported operation '{}'", letter),
            )
        })?;

        ops.push(AlignmentOp::new(kind, len));
        rest = after_op;
    }

    Ok(Cigar(ops))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceSpan;

    fn op(kind: OpKind, len: u64) -> AlignmentOp {
        AlignmentOp::new(kind, len)
    }

    #[test]
    fn test_parse_simple() {
        let cigar = parse_cigar("5M2D3M").unwrap();
        assert_eq!(
            cigar.ops(),
            &[
                op(OpKind::Match, 5),
                op(OpKind::Deletion, 2),
                op(OpKind::Match, 3)
            ]
        );

        let cigar = parse_cigar("4M1I4M").unwrap();
        assert_eq!(
            cigar.ops(),
            &[
                op(OpKind::Match, 4),
                op(OpKind::Insertion, 1),
                op(OpKind::Match, 4)
            ]
        );
    }

    #[test]
    fn test_parse_documented_example() {
        let cigar = parse_cigar("8M7D6M2I2M11D7M").unwrap();
        assert_eq!(cigar.len(), 7);
        assert_eq!(cigar.transcript_len(), 8 + 6 + 2 + 2 + 7);
        assert_eq!(cigar.genome_len(), 8 + 7 + 6 + 2 + 11 + 7);
    }

    #[test]
    fn test_parse_multi_digit_and_leading_zero() {
        let cigar = parse_cigar("120M05I").unwrap();
        assert_eq!(
            cigar.ops(),
            &[op(OpKind::Match, 120), op(OpKind::Insertion, 5)]
        );
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let cigar = parse_cigar("  3M \n").unwrap();
        assert_eq!(cigar.ops(), &[op(OpKind::Match, 3)]);
    }

    #[test]
    fn test_unsupported_operation() {
        let err = parse_cigar("5X").unwrap_err();
        match err {
            FerroError::MalformedOperationString { span, msg, .. } => {
                assert_eq!(span, SourceSpan::point(1));
                assert!(msg.contains("'X'"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        for bad in ["10S5M", "5M3N2M", "4=", "5M1H", "5m"] {
            assert!(parse_cigar(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(parse_cigar("").is_err());
        assert!(parse_cigar("   ").is_err());
        assert!(parse_cigar("M5").is_err());
        assert!(parse_cigar("5M2").is_err());
        assert!(parse_cigar("5M 2D").is_err());
        assert!(parse_cigar("0M").is_err());
        assert!(parse_cigar("-3M").is_err());
        assert!(parse_cigar("99999999999999999999999M").is_err());
    }

    #[test]
    fn test_error_position_accounts_for_leading_whitespace() {
        let err = parse_cigar("  5M2Q").unwrap_err();
        match err {
            FerroError::MalformedOperationString { span, .. } => assert_eq!(span.start, 5),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_display_round_trips_canonical_form() {
        let cigar: Cigar = "8M7D6M2I2M11D7M".parse().unwrap();
        assert_eq!(cigar.to_string(), "8M7D6M2I2M11D7M");
    }

    #[test]
    fn test_op_kind_consumption() {
        assert!(OpKind::Match.consumes_transcript());
        assert!(OpKind::Match.consumes_genome());
        assert!(OpKind::Insertion.consumes_transcript());
        assert!(!OpKind::Insertion.consumes_genome());
        assert!(!OpKind::Deletion.consumes_transcript());
        assert!(OpKind::Deletion.consumes_genome());
    }
}
