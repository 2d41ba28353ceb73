// Slot orchestration and file-level helpers.
//
// The codec works on in-memory images and tables.  This module walks a
// `SlotLayout` over an image, runs each name through decode / encode /
// emit, and wraps the whole pipeline with buffered file I/O.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::codec::{
    CodeTable, DecodeOutcome, DiagnosticSink, Encoding, ImageSource, LogSink, NameDecoder,
    NameRecord, TERMINATOR, encode_name,
};
use crate::layout::{LayoutError, Slot, SlotLayout};
use crate::patch::{CmfDocument, CmfError, CmfHeader, LINE_END, NAME_CODE_LIMIT, emit_name};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal errors.  Codec problems are diagnostics, never errors.
#[derive(Debug, Error)]
pub enum NamefixError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("patch error: {0}")]
    Cmf(#[from] CmfError),
    #[error("no present slot can take probe codes (stopped at code #{start})")]
    NoProgress { start: usize },
    #[error("output file exists, use -f to overwrite: {}", .0.display())]
    OutputExists(PathBuf),
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Section label of the name patch.
pub const DEFAULT_SECTION_LABEL: &str = "Fix Name";

/// What to write and where names live.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub layout: SlotLayout,
    pub header: CmfHeader,
    pub section_label: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            layout: SlotLayout::default(),
            header: CmfHeader::default(),
            section_label: DEFAULT_SECTION_LABEL.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reading names
// ---------------------------------------------------------------------------

/// A decoded name and where it came from.
#[derive(Debug, Clone)]
pub struct SlotName {
    pub slot: Slot,
    /// Presence byte == 1, for slots that carry one.
    pub present: Option<bool>,
    pub name: NameRecord,
    pub outcome: DecodeOutcome,
}

fn is_present<S: ImageSource + ?Sized>(image: &S, slot: &Slot) -> Option<bool> {
    slot.presence_offset.map(|o| image.byte_at(o) == Some(1))
}

/// Decode every slot of `layout`.
pub fn read_names<S, D>(
    image: &S,
    layout: &SlotLayout,
    table: &CodeTable,
    sink: &mut D,
) -> Result<Vec<SlotName>, LayoutError>
where
    S: ImageSource + ?Sized,
    D: DiagnosticSink,
{
    let decoder = NameDecoder::new(table);
    Ok(layout
        .slots()?
        .into_iter()
        .map(|slot| {
            let decoded = decoder.decode_detailed(image, slot.name_offset, sink);
            SlotName {
                present: is_present(image, &slot),
                slot,
                name: decoded.record,
                outcome: decoded.outcome,
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ConvertedName {
    pub slot: Slot,
    pub original: NameRecord,
    pub converted: NameRecord,
    /// Whether a patch group was written for this slot.
    pub written: bool,
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub names: Vec<ConvertedName>,
    pub document: CmfDocument,
}

/// Decode every slot with `decode`, re-encode with `encode` and collect the
/// writes into one CMF section.  Slots whose new name is empty get no writes.
pub fn convert_names<S, E, D>(
    image: &S,
    opts: &ConvertOptions,
    decode: &CodeTable,
    encode: &E,
    sink: &mut D,
) -> Result<Conversion, LayoutError>
where
    S: ImageSource + ?Sized,
    E: Encoding + ?Sized,
    D: DiagnosticSink,
{
    let mut document = CmfDocument::new(opts.header.clone());
    let section = document.section(opts.section_label.clone());
    let mut names = Vec::new();

    for read in read_names(image, &opts.layout, decode, sink)? {
        let converted = encode_name(&read.name, encode, sink);
        let written = !converted.codes.is_empty();

        if written {
            let mut group = Vec::new();
            let consumed = emit_name(&converted.codes, read.slot.name_offset, &mut group);
            if converted.codes[consumed..].iter().any(|&c| c != TERMINATOR) {
                log::warn!(
                    "{}: {:?} is longer than {NAME_CODE_LIMIT} codes, truncated",
                    read.slot.kind,
                    converted.text
                );
            }
            log::info!(
                "{}: {:?} [{}] -> {:?} [{}]",
                read.slot.kind,
                read.name.text,
                read.name.codes_hex(),
                converted.text,
                converted.codes_hex()
            );
            section.push_group(group);
        } else {
            log::debug!("{}: empty, skipped", read.slot.kind);
        }

        names.push(ConvertedName {
            slot: read.slot,
            original: read.name,
            converted,
            written,
        });
    }

    Ok(Conversion { names, document })
}

// ---------------------------------------------------------------------------
// Glyph probing
// ---------------------------------------------------------------------------

/// One probe CMF: codes `start..end` of the probed table, spread over the
/// present member slots eight at a time.
#[derive(Debug, Clone)]
pub struct ProbeBatch {
    pub start: usize,
    pub end: usize,
    pub file_name: String,
    pub document: CmfDocument,
}

/// Split `codes` into batches that fill every present slot.
///
/// Writing a batch into the game shows each code's glyph in a roster name,
/// which is how a table is checked against what the game really renders.
pub fn probe_batches<S>(
    image: &S,
    layout: &SlotLayout,
    codes: &[u16],
    header: &CmfHeader,
) -> Result<Vec<ProbeBatch>, NamefixError>
where
    S: ImageSource + ?Sized,
{
    let targets: Vec<Slot> = layout
        .slots()?
        .into_iter()
        .filter(|slot| is_present(image, slot) == Some(true))
        .collect();

    let mut batches = Vec::new();
    let mut start = 0;
    while start < codes.len() {
        let mut document = CmfDocument::new(header.clone());
        let section = document.section(format!("{DEFAULT_SECTION_LABEL} Batch {start}"));

        let mut pos = start;
        for slot in &targets {
            if pos >= codes.len() {
                break;
            }
            let mut group = Vec::new();
            pos += emit_name(&codes[pos..], slot.name_offset, &mut group);
            section.push_group(group);
        }

        if pos == start {
            return Err(NamefixError::NoProgress { start });
        }

        log::debug!("probe batch {start}..{pos} over {} slots", targets.len());
        batches.push(ProbeBatch {
            start,
            end: pos,
            file_name: format!("{}_NameFix_{start}.CMF", header.id),
            document,
        });
        start = pos;
    }

    Ok(batches)
}

/// Human-readable list of which code went into which probe slot.
pub fn compare_list(batches: &[ProbeBatch], table: &CodeTable) -> String {
    let mut out = String::new();
    for batch in batches {
        out.push_str(LINE_END);
        out.push_str(&batch.file_name);
        out.push_str(LINE_END);
        for (n, code) in table.codes()[batch.start..batch.end].iter().enumerate() {
            if n % NAME_CODE_LIMIT == 0 {
                let _ = write!(out, "//Char {}-------------{LINE_END}", n / NAME_CODE_LIMIT + 1);
            }
            let glyph = table.get(*code).unwrap_or(char::REPLACEMENT_CHARACTER);
            let _ = write!(out, "{code:X}={glyph}{LINE_END}");
        }
    }
    out
}

/// UTF-16LE with a byte-order mark, the encoding compare lists are read in.
pub fn utf16le_bytes(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + text.len() * 2);
    bytes.extend_from_slice(&[0xFF, 0xFE]);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

/// Summary of `convert_file`.
#[derive(Debug, Clone, Default)]
pub struct ConvertStats {
    pub image_size: u64,
    pub slots: usize,
    pub written: usize,
    pub records: usize,
    pub warnings: usize,
    pub errors: usize,
}

/// Load a code table; invalid UTF-8 is replaced rather than rejected.
pub fn load_table<D: DiagnosticSink>(path: &Path, sink: &mut D) -> Result<CodeTable, NamefixError> {
    let bytes = fs::read(path)?;
    let table = CodeTable::parse(&String::from_utf8_lossy(&bytes), sink);
    log::debug!("{}: {} codes", path.display(), table.len());
    Ok(table)
}

pub fn load_layout(path: &Path) -> Result<SlotLayout, NamefixError> {
    let text = fs::read_to_string(path)?;
    Ok(SlotLayout::from_json(&text)?)
}

fn write_document(document: &CmfDocument, path: &Path) -> Result<(), NamefixError> {
    let mut writer = BufWriter::new(File::create(path)?);
    document.write_to(&mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Convert the names of `image_path` from `decode_table` to `encode_table`,
/// writing the CMF patch to `output`.
pub fn convert_file(
    image_path: &Path,
    decode_table: &Path,
    encode_table: &Path,
    output: &Path,
    opts: &ConvertOptions,
) -> Result<(Conversion, ConvertStats), NamefixError> {
    let mut sink = LogSink::default();
    let decode = load_table(decode_table, &mut sink)?;
    let encode = load_table(encode_table, &mut sink)?.reverse(&mut sink);
    let image = fs::read(image_path)?;

    let conversion = convert_names(&image, opts, &decode, &encode, &mut sink)?;
    write_document(&conversion.document, output)?;

    let stats = ConvertStats {
        image_size: image.len() as u64,
        slots: conversion.names.len(),
        written: conversion.names.iter().filter(|n| n.written).count(),
        records: conversion.document.record_count(),
        warnings: sink.warnings,
        errors: sink.errors,
    };
    Ok((conversion, stats))
}

/// Write one CMF per probe batch into `out_dir` plus the compare list.
/// Unless `force` is set, nothing is written when any of those files
/// already exists.  Returns the batches written.
pub fn probe_file(
    image_path: &Path,
    table_path: &Path,
    out_dir: &Path,
    compare_name: &str,
    opts: &ConvertOptions,
    force: bool,
) -> Result<Vec<ProbeBatch>, NamefixError> {
    let table = load_table(table_path, &mut LogSink::default())?;
    let image = fs::read(image_path)?;

    let batches = probe_batches(&image, &opts.layout, &table.codes(), &opts.header)?;
    let compare_path = out_dir.join(compare_name);
    if !force {
        let existing = batches
            .iter()
            .map(|b| out_dir.join(&b.file_name))
            .chain(std::iter::once(compare_path.clone()))
            .find(|p| p.exists());
        if let Some(path) = existing {
            return Err(NamefixError::OutputExists(path));
        }
    }

    for batch in &batches {
        write_document(&batch.document, &out_dir.join(&batch.file_name))?;
    }
    fs::write(&compare_path, utf16le_bytes(&compare_list(&batches, &table)))?;
    Ok(batches)
}

/// Apply a CMF patch to a copy of `image_path`, writing the result to
/// `output`.  Returns the number of bytes written.
pub fn apply_file(image_path: &Path, cmf_path: &Path, output: &Path) -> Result<usize, NamefixError> {
    let document = CmfDocument::parse(&fs::read_to_string(cmf_path)?)?;
    let mut image = fs::read(image_path)?;
    let written = document.apply_to(&mut image)?;
    fs::write(output, &image)?;
    Ok(written)
}
