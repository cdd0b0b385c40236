#![no_main]

use libfuzzer_sys::fuzz_target;
use timeprobe::instrument::{Instrumenter, ProbePlacement};
use timeprobe::syntax::SourceUnit;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Whatever parses must instrument into source that parses again
        if SourceUnit::parse(input).is_ok() {
            for placement in [ProbePlacement::Prologue, ProbePlacement::Enclosing] {
                if let Ok(out) = Instrumenter::new(placement).instrument_source(input) {
                    assert!(SourceUnit::parse(&out.source).is_ok());
                }
            }
        }
    }
});
