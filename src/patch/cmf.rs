// CMF cheat/patch text format.
//
// A CMF file is a header followed by sections of 8-bit write lines:
//
//     _S ULJM-05753
//     _G Tactics Ogre PSP Chinese NameFix
//
//     _C0 Fix Name
//     _L 0x02D4CBC 0x00000041
//     _L 0x02D4CBD 0x00000000
//
// `_C0` opens a section (the digit is the default on/off state), and a
// blank line closes each group of writes.  The first hex digit of an `_L`
// address selects the write width; only 8-bit writes (`0`) are produced or
// accepted here.

use std::fmt;
use std::io::{self, Write};

use thiserror::Error;

use super::emitter::PatchRecord;

/// Line terminator used when writing CMF text.
pub const LINE_END: &str = "\r\n";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CmfError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: write outside of a `_C` section")]
    RecordOutsideSection { line: usize },
    #[error("line {line}: unsupported write width {width:#X} (only 8-bit writes)")]
    UnsupportedWidth { line: usize, width: u32 },
    #[error("line {line}: value {value:#X} does not fit in a byte")]
    ValueTooWide { line: usize, value: u32 },
    #[error("missing `_S` header line")]
    MissingHeader,
    #[error("write at {offset:#X} is outside the image ({len:#X} bytes)")]
    OffsetOutOfRange { offset: u64, len: u64 },
}

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

/// Patch-set identity written in the `_S` / `_G` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmfHeader {
    pub id: String,
    pub description: String,
}

impl Default for CmfHeader {
    fn default() -> Self {
        Self {
            id: "ULJM-05753".to_string(),
            description: "Tactics Ogre PSP Chinese NameFix".to_string(),
        }
    }
}

/// A `_C` section: a label and groups of writes, one group per name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmfSection {
    pub label: String,
    pub enabled: bool,
    pub groups: Vec<Vec<PatchRecord>>,
}

impl CmfSection {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: false,
            groups: Vec::new(),
        }
    }

    /// Add a group; empty groups are not kept.
    pub fn push_group(&mut self, group: Vec<PatchRecord>) {
        if !group.is_empty() {
            self.groups.push(group);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmfDocument {
    pub header: CmfHeader,
    pub sections: Vec<CmfSection>,
}

impl CmfDocument {
    pub fn new(header: CmfHeader) -> Self {
        Self {
            header,
            sections: Vec::new(),
        }
    }

    /// Open a new section and return it for filling.
    pub fn section(&mut self, label: impl Into<String>) -> &mut CmfSection {
        self.sections.push(CmfSection::new(label));
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    /// Every write in document order.
    pub fn records(&self) -> impl Iterator<Item = &PatchRecord> + '_ {
        self.sections
            .iter()
            .flat_map(|s| s.groups.iter())
            .flat_map(|g| g.iter())
    }

    pub fn record_count(&self) -> usize {
        self.records().count()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "{self}")
    }

    /// Apply every write to `image`.  Nothing is written unless every
    /// offset is in range.  Returns the number of bytes written.
    pub fn apply_to(&self, image: &mut [u8]) -> Result<usize, CmfError> {
        let len = image.len() as u64;
        if let Some(r) = self.records().find(|r| r.offset >= len) {
            return Err(CmfError::OffsetOutOfRange {
                offset: r.offset,
                len,
            });
        }
        let mut written = 0;
        for r in self.records() {
            image[r.offset as usize] = r.value;
            written += 1;
        }
        Ok(written)
    }

    /// Parse CMF text.  Accepts `\n` and `\r\n` line endings.
    pub fn parse(text: &str) -> Result<Self, CmfError> {
        let mut id = None;
        let mut description = String::new();
        let mut sections: Vec<CmfSection> = Vec::new();
        let mut group: Vec<PatchRecord> = Vec::new();

        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = raw.trim_end();

            if line.is_empty() {
                if let Some(section) = sections.last_mut() {
                    section.push_group(std::mem::take(&mut group));
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix("_S") {
                id = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("_G") {
                description = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("_C") {
                if let Some(section) = sections.last_mut() {
                    section.push_group(std::mem::take(&mut group));
                }
                let mut chars = rest.chars();
                let enabled = match chars.next() {
                    Some('0') => false,
                    Some(d) if d.is_ascii_digit() => true,
                    _ => {
                        return Err(CmfError::Syntax {
                            line: line_no,
                            message: format!("bad section line {line:?}"),
                        });
                    }
                };
                let mut section = CmfSection::new(chars.as_str().trim());
                section.enabled = enabled;
                sections.push(section);
            } else if let Some(rest) = line.strip_prefix("_L") {
                if sections.is_empty() {
                    return Err(CmfError::RecordOutsideSection { line: line_no });
                }
                group.push(parse_write(rest, line_no)?);
            } else {
                return Err(CmfError::Syntax {
                    line: line_no,
                    message: format!("unknown directive {line:?}"),
                });
            }
        }

        if let Some(section) = sections.last_mut() {
            section.push_group(group);
        }

        Ok(Self {
            header: CmfHeader {
                id: id.ok_or(CmfError::MissingHeader)?,
                description,
            },
            sections,
        })
    }
}

impl fmt::Display for CmfDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_S {}{LINE_END}", self.header.id)?;
        write!(f, "_G {}{LINE_END}", self.header.description)?;
        f.write_str(LINE_END)?;
        for section in &self.sections {
            write!(
                f,
                "_C{} {}{LINE_END}",
                u8::from(section.enabled),
                section.label
            )?;
            for group in &section.groups {
                for record in group {
                    write!(f, "{record}{LINE_END}")?;
                }
                f.write_str(LINE_END)?;
            }
        }
        Ok(())
    }
}

fn parse_hex(token: &str, line: usize) -> Result<u32, CmfError> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u32::from_str_radix(digits, 16).map_err(|e| CmfError::Syntax {
        line,
        message: format!("bad hex {token:?}: {e}"),
    })
}

fn parse_write(rest: &str, line: usize) -> Result<PatchRecord, CmfError> {
    let mut tokens = rest.split_whitespace();
    let (Some(addr), Some(value), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(CmfError::Syntax {
            line,
            message: "expected `_L <address> <value>`".to_string(),
        });
    };

    let addr = parse_hex(addr, line)?;
    let width = addr >> 28;
    if width != 0 {
        return Err(CmfError::UnsupportedWidth { line, width });
    }
    let value = parse_hex(value, line)?;
    let value = u8::try_from(value).map_err(|_| CmfError::ValueTooWide { line, value })?;

    Ok(PatchRecord::new(u64::from(addr), value))
}
