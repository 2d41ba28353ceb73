// Code sequences to positional byte writes.

use std::fmt;

/// Codes a single name slot can hold, whatever their byte width.
pub const NAME_CODE_LIMIT: usize = 8;

/// Largest offset a CMF `_L` line can address (the top nibble selects the
/// write width).
pub const MAX_OFFSET: u64 = 0x0FFF_FFFF;

/// One byte written at an absolute image offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchRecord {
    pub offset: u64,
    pub value: u8,
}

impl PatchRecord {
    pub fn new(offset: u64, value: u8) -> Self {
        Self { offset, value }
    }
}

/// CMF 8-bit write line: `_L 0x0OOOOOOO 0x000000VV`.
impl fmt::Display for PatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_L 0x0{:07X} 0x{:08X}", self.offset, self.value)
    }
}

/// Append writes for up to `NAME_CODE_LIMIT` codes of `codes` at `base_offset`.
///
/// One-byte codes take one record, two-byte codes take two (low byte first).
/// When any code is written a terminator record follows.  Returns the number
/// of codes consumed so callers can window longer sequences over several
/// slots.
pub fn emit_name(codes: &[u16], base_offset: u64, out: &mut Vec<PatchRecord>) -> usize {
    let count = codes.len().min(NAME_CODE_LIMIT);
    let mut offset = base_offset;

    for &code in &codes[..count] {
        if code <= 0xFF {
            out.push(PatchRecord::new(offset, code as u8));
            offset += 1;
        } else {
            let [low, high] = code.to_le_bytes();
            out.push(PatchRecord::new(offset, low));
            out.push(PatchRecord::new(offset + 1, high));
            offset += 2;
        }
    }

    if count > 0 {
        out.push(PatchRecord::new(offset, 0));
    }
    count
}

/// Emit `codes` as a single group, returning the records and codes consumed.
pub fn name_records(codes: &[u16], base_offset: u64) -> (Vec<PatchRecord>, usize) {
    let mut out = Vec::with_capacity(codes.len().min(NAME_CODE_LIMIT) * 2 + 1);
    let consumed = emit_name(codes, base_offset, &mut out);
    (out, consumed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(records: &[PatchRecord]) -> Vec<u8> {
        records.iter().map(|r| r.value).collect()
    }

    fn offsets(records: &[PatchRecord]) -> Vec<u64> {
        records.iter().map(|r| r.offset).collect()
    }

    #[test]
    fn empty_input_emits_nothing() {
        let (records, consumed) = name_records(&[], 0x100);
        assert!(records.is_empty());
        assert_eq!(consumed, 0);
    }

    #[test]
    fn single_bytes_then_terminator() {
        let (records, consumed) = name_records(&[0x41, 0x42], 0x100);
        assert_eq!(consumed, 2);
        assert_eq!(values(&records), vec![0x41, 0x42, 0x00]);
        assert_eq!(offsets(&records), vec![0x100, 0x101, 0x102]);
    }

    #[test]
    fn two_byte_split_is_little_endian() {
        let (records, consumed) = name_records(&[0x1234], 0x10);
        assert_eq!(consumed, 1);
        assert_eq!(values(&records), vec![0x34, 0x12, 0x00]);
        assert_eq!(offsets(&records), vec![0x10, 0x11, 0x12]);
    }

    #[test]
    fn encoded_terminator_is_written_like_any_code() {
        // Encoder output already ends in 0; the emitter adds its own.
        let (records, consumed) = name_records(&[0x41, 0x3F, 0x00], 0);
        assert_eq!(consumed, 3);
        assert_eq!(values(&records), vec![0x41, 0x3F, 0x00, 0x00]);
    }

    #[test]
    fn exactly_eight_codes() {
        let codes = [0x41u16; 8];
        let (records, consumed) = name_records(&codes, 0);
        assert_eq!(consumed, 8);
        assert_eq!(records.len(), 9);
        assert_eq!(records.last(), Some(&PatchRecord::new(8, 0)));
    }

    #[test]
    fn nine_codes_leave_one() {
        let codes = [0x0201u16; 9];
        let mut out = Vec::new();
        let consumed = emit_name(&codes, 0, &mut out);
        assert_eq!(consumed, 8);
        // 8 two-byte codes plus one terminator.
        assert_eq!(out.len(), 17);
        assert_eq!(out.last(), Some(&PatchRecord::new(16, 0)));

        let consumed = emit_name(&codes[consumed..], 0x80, &mut out);
        assert_eq!(consumed, 1);
        assert_eq!(out.len(), 20);
    }

    #[test]
    fn emit_appends() {
        let mut out = vec![PatchRecord::new(0, 0xAA)];
        emit_name(&[0x41], 5, &mut out);
        assert_eq!(offsets(&out), vec![0, 5, 6]);
    }

    #[test]
    fn record_line_format() {
        assert_eq!(
            PatchRecord::new(0x2D4CBC, 0x41).to_string(),
            "_L 0x02D4CBC 0x00000041"
        );
        assert_eq!(
            PatchRecord::new(0, 0).to_string(),
            "_L 0x00000000 0x00000000"
        );
    }
}
