#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use prodtree_pom::parse::parse_module;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_module(Path::new("fuzz/m/pom.xml"), text, Path::new("fuzz"));
    }
});
