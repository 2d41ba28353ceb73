// Name encoder: text to codes under a replacement table.

use std::collections::HashMap;

use super::code_table::{ReverseTable, TERMINATOR};
use super::diag::{Diagnostic, DiagnosticSink};
use super::record::NameRecord;

/// Code written for characters the replacement table cannot express.
pub const SUBSTITUTE_CODE: u16 = 0x3F;

/// Character recorded in place of an unencodable one.
pub const SUBSTITUTE_CHAR: char = '?';

/// Glyph-to-code lookup used by the encoder.
pub trait Encoding {
    fn code_for(&self, ch: char) -> Option<u16>;
}

impl Encoding for ReverseTable {
    fn code_for(&self, ch: char) -> Option<u16> {
        self.get(ch)
    }
}

impl Encoding for HashMap<char, u16> {
    fn code_for(&self, ch: char) -> Option<u16> {
        self.get(&ch).copied()
    }
}

/// Re-encode `name.text` with `encoding`.
///
/// Characters mapped to the terminator code are dropped; unmapped characters
/// become `SUBSTITUTE_CODE` / `SUBSTITUTE_CHAR`.  A non-empty result ends
/// with a terminator code that has no counterpart in `text`.
pub fn encode_name<E, D>(name: &NameRecord, encoding: &E, sink: &mut D) -> NameRecord
where
    E: Encoding + ?Sized,
    D: DiagnosticSink,
{
    let mut out = NameRecord::new();
    if name.text.is_empty() {
        return out;
    }

    for ch in name.text.chars() {
        match encoding.code_for(ch) {
            Some(TERMINATOR) => {
                sink.report(Diagnostic::InvalidEncodedCode {
                    ch,
                    code: TERMINATOR,
                });
            }
            Some(code) => out.push(code, ch),
            None => {
                sink.report(Diagnostic::MissingEncodingForCharacter { ch });
                out.push(SUBSTITUTE_CODE, SUBSTITUTE_CHAR);
            }
        }
    }

    if !out.codes.is_empty() {
        out.codes.push(TERMINATOR);
    }
    out
}
