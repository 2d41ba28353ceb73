#![no_main]
use libfuzzer_sys::fuzz_target;
use namefix::codec::{CodeTable, Ignore, MAX_NAME_BYTES, NameDecoder, encode_name};

fuzz_target!(|data: &[u8]| {
    // First half: table codes (odd entries two-byte), second half: image.
    let split = data.len() / 2;
    let (keys, image) = data.split_at(split);
    let table: CodeTable = keys
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| {
            let code = match pair {
                [lo, hi] if i % 2 == 1 => u16::from_le_bytes([*lo, *hi]),
                [b, ..] => u16::from(*b),
                [] => 0,
            };
            (code, char::from_u32(0x4E00 + i as u32).unwrap_or('?'))
        })
        .collect();

    for offset in 0..image.len().min(8) as u64 {
        let decoded = NameDecoder::new(&table).decode_detailed(image, offset, &mut Ignore);
        assert!(decoded.bytes_read <= MAX_NAME_BYTES + 1);

        let reverse = table.reverse(&mut Ignore);
        let encoded = encode_name(&decoded.record, &reverse, &mut Ignore);
        assert_eq!(encoded.codes.is_empty(), decoded.record.text.is_empty());
    }
});
