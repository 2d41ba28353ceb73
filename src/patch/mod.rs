// Patch output: positional byte writes and the CMF text format.
//
// - `emitter`  Code sequences to PatchRecords, windowed per name slot
// - `cmf`      CMF document model, writer, parser and in-memory apply

pub mod cmf;
pub mod emitter;

pub use cmf::{CmfDocument, CmfError, CmfHeader, CmfSection, LINE_END};
pub use emitter::{MAX_OFFSET, NAME_CODE_LIMIT, PatchRecord, emit_name, name_records};
