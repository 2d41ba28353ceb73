// Name codec: code tables, decoding and re-encoding.
//
// # Modules
//
// - `code_table`  Text table loader, forward and reverse maps
// - `record`      NameRecord and the ImageSource trait
// - `decoder`     Variable-width byte stream to NameRecord
// - `encoder`     NameRecord to codes under a replacement table
// - `diag`        Non-fatal diagnostics and their sinks

pub mod code_table;
pub mod decoder;
pub mod diag;
pub mod encoder;
pub mod record;

pub use code_table::{CodeTable, ReverseTable, TERMINATOR};
pub use decoder::{DecodeOutcome, DecodedName, MAX_NAME_BYTES, NameDecoder, decode_name};
pub use diag::{Diagnostic, DiagnosticSink, Ignore, LogSink};
pub use encoder::{Encoding, SUBSTITUTE_CHAR, SUBSTITUTE_CODE, encode_name};
pub use record::{ImageSource, NameRecord};
