#![no_main]

use gomorph::{parse_pipeline, transform_sources, TransformOptions};
use gomorph_syntax::{parse_str, print_file};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(src) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(ast) = parse_str(src) else {
        return;
    };

    // printing is a fixed point after one round trip
    let printed = print_file(&ast);
    let reparsed = parse_str(&printed).expect("printed output parses");
    assert_eq!(print_file(&reparsed), printed);

    // passes may reject a file, never panic on it
    let passes = parse_pipeline("all").unwrap();
    let _ = transform_sources(&[("fuzz.go", src)], passes, TransformOptions::default(), Vec::new());
});
