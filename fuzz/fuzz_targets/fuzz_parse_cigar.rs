//! Fuzz target for the CIGAR parser and index builder
//!
//! Any string that parses must either build an index or fail with an error;
//! neither step may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

use ferro_txmap::{parse_cigar, CoordinateIndex, Strand};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if input.len() > 1000 {
            return;
        }

        if let Ok(cigar) = parse_cigar(input) {
            for strand in [Strand::Forward, Strand::Reverse] {
                if let Ok(index) = CoordinateIndex::build(0, strand, &cigar) {
                    let _ = index.transcript_to_genome(0);
                    let _ = index.genome_to_transcript(index.genomic_end().saturating_sub(1));
                }
            }
        }
    }
});
