#![no_main]
use libfuzzer_sys::fuzz_target;
use namefix::codec::{CodeTable, TERMINATOR};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let mut diags = Vec::new();
    let table = CodeTable::parse(&text, &mut diags);
    assert!(!table.contains(TERMINATOR));

    let reverse = table.reverse(&mut diags);
    assert!(reverse.len() <= table.len());
});
