//! Fuzz target for the query table reader
//!
//! Arbitrary bytes are read as a query file in small chunks. Malformed rows
//! must come back as row errors, never as panics.

#![no_main]

use libfuzzer_sys::fuzz_target;

use ferro_txmap::io::{QuerySource, TsvQuerySource};

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }

    let Ok(mut source) = TsvQuerySource::new(data, "fuzz") else {
        return;
    };
    while let Ok(Some(_rows)) = source.read_chunk(3) {}
});
