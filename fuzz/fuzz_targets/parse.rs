#![no_main]
use libfuzzer_sys::fuzz_target;

use tzrepo::SourceParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let mut parser = SourceParser::new();
        let _ = parser.feed("europe", text);
    }
});
