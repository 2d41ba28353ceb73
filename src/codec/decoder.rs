// Name decoder: variable-width byte stream to text.
//
// Codes are either one byte or two bytes (little-endian).  The stream does
// not say which, so the decoder probes: a byte that is a one-byte code is
// taken as such; otherwise it waits for the next byte and looks up the
// combined two-byte code.  A failed two-byte probe ends the name.

use super::code_table::{CodeTable, TERMINATOR};
use super::diag::{Diagnostic, DiagnosticSink};
use super::record::{ImageSource, NameRecord};

/// Bytes of resolved codes after which decoding stops even without a
/// terminator.  Guards against reading garbage from corrupt images.
pub const MAX_NAME_BYTES: usize = 32;

/// How a decode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// A terminator byte was read.
    Terminated,
    /// `MAX_NAME_BYTES` were resolved without a terminator.
    Bounded,
    /// The image ended first.
    EndOfImage,
    /// A two-byte code did not resolve; the record ends with a sentinel 0.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeState {
    /// No byte pending; the next byte is tried as a one-byte code.
    ProbingSingle,
    /// `low` did not resolve alone; the next byte completes a two-byte code.
    ProbingDouble { low: u8 },
}

/// Result of `NameDecoder::decode_detailed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedName {
    pub record: NameRecord,
    pub outcome: DecodeOutcome,
    /// Bytes read from the image, terminator included.
    pub bytes_read: usize,
}

/// Decodes names from an image with a fixed code table.
#[derive(Debug, Clone, Copy)]
pub struct NameDecoder<'t> {
    table: &'t CodeTable,
}

impl<'t> NameDecoder<'t> {
    pub fn new(table: &'t CodeTable) -> Self {
        Self { table }
    }

    /// Decode the name starting at `offset`.
    pub fn decode<S, D>(&self, image: &S, offset: u64, sink: &mut D) -> NameRecord
    where
        S: ImageSource + ?Sized,
        D: DiagnosticSink,
    {
        self.decode_detailed(image, offset, sink).record
    }

    /// Decode the name starting at `offset`, also reporting how it ended.
    pub fn decode_detailed<S, D>(&self, image: &S, offset: u64, sink: &mut D) -> DecodedName
    where
        S: ImageSource + ?Sized,
        D: DiagnosticSink,
    {
        let mut record = NameRecord::new();
        let mut state = ProbeState::ProbingSingle;
        let mut consumed = 0usize;
        let mut bytes_read = 0usize;

        let outcome = loop {
            if consumed >= MAX_NAME_BYTES {
                break DecodeOutcome::Bounded;
            }

            let pos = offset + bytes_read as u64;
            let Some(byte) = image.byte_at(pos) else {
                break DecodeOutcome::EndOfImage;
            };
            bytes_read += 1;

            if byte == 0 {
                break DecodeOutcome::Terminated;
            }

            state = match state {
                ProbeState::ProbingSingle => {
                    let code = u16::from(byte);
                    match self.table.get(code) {
                        Some(ch) => {
                            record.push(code, ch);
                            consumed += 1;
                            ProbeState::ProbingSingle
                        }
                        None => ProbeState::ProbingDouble { low: byte },
                    }
                }
                ProbeState::ProbingDouble { low } => {
                    let code = u16::from_le_bytes([low, byte]);
                    match self.table.get(code) {
                        Some(ch) => {
                            record.push(code, ch);
                            consumed += 2;
                            ProbeState::ProbingSingle
                        }
                        None => {
                            sink.report(Diagnostic::UnresolvableTwoByteCode {
                                offset: pos - 1,
                                code,
                            });
                            record.codes.push(TERMINATOR);
                            break DecodeOutcome::Error;
                        }
                    }
                }
            };
        };

        DecodedName {
            record,
            outcome,
            bytes_read,
        }
    }
}

/// Decode one name at `offset` with `table`.
pub fn decode_name<S, D>(image: &S, offset: u64, table: &CodeTable, sink: &mut D) -> NameRecord
where
    S: ImageSource + ?Sized,
    D: DiagnosticSink,
{
    NameDecoder::new(table).decode(image, offset, sink)
}
