#![no_main]
use libfuzzer_sys::fuzz_target;
use namefix::patch::CmfDocument;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let Ok(doc) = CmfDocument::parse(&text) else {
        return;
    };

    // Anything accepted must survive a write/parse cycle unchanged.
    let reparsed = CmfDocument::parse(&doc.to_string()).expect("written CMF must parse");
    assert_eq!(reparsed.record_count(), doc.record_count());

    let mut image = vec![0u8; 4096];
    let _ = doc.apply_to(&mut image);
});
