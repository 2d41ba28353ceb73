// Character code tables.
//
// A table maps 1- or 2-byte codes to glyphs.  Tables are loaded from plain
// text, one rule per line:
//
//     // comment
//     41\tA          tab-separated
//     8140=　        or `=`-separated
//     0A8C\t*X       multi-character values carry a marker before the glyph
//
// Keys above 0xFF are written in image byte order, so they are byte-swapped
// on load to match the decoder's little-endian `low + high * 256` combination.

use std::collections::HashMap;

use super::diag::{Diagnostic, DiagnosticSink};

/// End-of-name marker in images and in encoded code sequences.
pub const TERMINATOR: u16 = 0;

/// Forward mapping from code to glyph.
///
/// Iteration follows first-insertion order; a key whose glyph is replaced
/// keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct CodeTable {
    entries: Vec<(u16, char)>,
    index: HashMap<u16, usize>,
}

impl CodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a table from text, reporting skipped or replaced lines to `sink`.
    pub fn parse<D: DiagnosticSink>(text: &str, sink: &mut D) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut table = Self::new();

        for (i, line) in text.lines().enumerate() {
            let line_no = i + 1;
            let Some((key, value)) = split_rule(line) else {
                continue;
            };

            let code = match parse_key(key) {
                Some(TERMINATOR) => {
                    sink.report(Diagnostic::ReservedTerminatorCode { line: line_no });
                    continue;
                }
                Some(code) => code,
                None => {
                    sink.report(Diagnostic::MalformedTableKey {
                        line: line_no,
                        key: key.to_string(),
                    });
                    continue;
                }
            };

            let ch = glyph(value);
            if let Some(old) = table.insert(code, ch) {
                sink.report(Diagnostic::DuplicateTableKey {
                    line: line_no,
                    code,
                    old,
                    new: ch,
                });
            }
        }

        table
    }

    /// Insert or replace a mapping, returning the replaced glyph.
    ///
    /// The terminator code is never stored.
    pub fn insert(&mut self, code: u16, ch: char) -> Option<char> {
        if code == TERMINATOR {
            return None;
        }
        match self.index.get(&code) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot].1, ch)),
            None => {
                self.index.insert(code, self.entries.len());
                self.entries.push((code, ch));
                None
            }
        }
    }

    pub fn get(&self, code: u16) -> Option<char> {
        self.index.get(&code).map(|&slot| self.entries[slot].1)
    }

    pub fn contains(&self, code: u16) -> bool {
        self.index.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(code, glyph)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, char)> + '_ {
        self.entries.iter().copied()
    }

    /// All codes in insertion order.
    pub fn codes(&self) -> Vec<u16> {
        self.entries.iter().map(|&(code, _)| code).collect()
    }

    /// Build the glyph-to-code direction of this table.
    pub fn reverse<D: DiagnosticSink>(&self, sink: &mut D) -> ReverseTable {
        ReverseTable::build(self, sink)
    }
}

impl FromIterator<(u16, char)> for CodeTable {
    fn from_iter<I: IntoIterator<Item = (u16, char)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (code, ch) in iter {
            table.insert(code, ch);
        }
        table
    }
}

/// Reverse mapping from glyph to code.  The first code seen for a glyph wins.
#[derive(Debug, Clone, Default)]
pub struct ReverseTable {
    map: HashMap<char, u16>,
}

impl ReverseTable {
    pub fn build<D: DiagnosticSink>(table: &CodeTable, sink: &mut D) -> Self {
        let mut map = HashMap::with_capacity(table.len());
        for (code, ch) in table.iter() {
            if code == TERMINATOR {
                continue;
            }
            match map.get(&ch) {
                Some(&kept) => sink.report(Diagnostic::DuplicateReverseValue {
                    ch,
                    kept,
                    dropped: code,
                }),
                None => {
                    map.insert(ch, code);
                }
            }
        }
        Self { map }
    }

    pub fn get(&self, ch: char) -> Option<u16> {
        self.map.get(&ch).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Line parsing
// ---------------------------------------------------------------------------

/// Split a rule line into `(key, value)`, or `None` if the line carries no rule.
fn split_rule(line: &str) -> Option<(&str, &str)> {
    if line.starts_with("//") {
        return None;
    }
    let (key, value) = line.split_once('\t').or_else(|| line.split_once('='))?;
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Parse a hex key, byte-swapping two-byte literals into lookup order.
fn parse_key(key: &str) -> Option<u16> {
    let code = u16::from_str_radix(key.trim(), 16).ok()?;
    Some(if code > 0xFF { code.swap_bytes() } else { code })
}

/// The glyph of a value field: index 1 when a marker precedes it, else index 0.
fn glyph(value: &str) -> char {
    let mut chars = value.chars();
    let first = chars.next().unwrap_or(char::REPLACEMENT_CHARACTER);
    chars.next().unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::diag::Ignore;

    fn parse(text: &str) -> (CodeTable, Vec<Diagnostic>) {
        let mut diags: Vec<Diagnostic> = Vec::new();
        let table = CodeTable::parse(text, &mut diags);
        (table, diags)
    }

    #[test]
    fn tab_and_equals_delimiters() {
        let (t, diags) = parse("41\tA\n42=B\n");
        assert!(diags.is_empty());
        assert_eq!(t.get(0x41), Some('A'));
        assert_eq!(t.get(0x42), Some('B'));
    }

    #[test]
    fn tab_wins_over_equals() {
        let (t, _) = parse("43\t=\n");
        assert_eq!(t.get(0x43), Some('='));
    }

    #[test]
    fn comments_and_junk_are_skipped() {
        let (t, diags) = parse("// 41\tA\nno delimiter\n\t\n44\t\n=Z\n45\tE\n");
        assert!(diags.is_empty());
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(0x45), Some('E'));
    }

    #[test]
    fn two_byte_keys_are_byte_swapped() {
        let (t, _) = parse("0102\tX\n");
        assert_eq!(t.get(0x0201), Some('X'));
        assert!(!t.contains(0x0102));
    }

    #[test]
    fn one_byte_keys_keep_their_value() {
        let (t, _) = parse("0042\tB\n");
        assert_eq!(t.get(0x42), Some('B'));
    }

    #[test]
    fn marker_prefixed_values_take_second_char() {
        let (t, _) = parse("41\t*A\n42\tB\n43\tXYZ\n");
        assert_eq!(t.get(0x41), Some('A'));
        assert_eq!(t.get(0x42), Some('B'));
        assert_eq!(t.get(0x43), Some('Y'));
    }

    #[test]
    fn multibyte_glyphs_are_chars_not_bytes() {
        let (t, _) = parse("8140\t名\n8240\t*前\n");
        assert_eq!(t.get(0x4081), Some('名'));
        assert_eq!(t.get(0x4082), Some('前'));
    }

    #[test]
    fn duplicate_key_last_write_wins() {
        let (t, diags) = parse("41\tA\n42\tB\n41\tC\n");
        assert_eq!(t.get(0x41), Some('C'));
        assert_eq!(t.codes(), vec![0x41, 0x42]);
        assert_eq!(
            diags,
            vec![Diagnostic::DuplicateTableKey {
                line: 3,
                code: 0x41,
                old: 'A',
                new: 'C',
            }]
        );
    }

    #[test]
    fn terminator_code_is_never_stored() {
        let (t, diags) = parse("00\tN\n0000=M\n41\tA\n");
        assert!(!t.contains(0));
        assert_eq!(t.len(), 1);
        assert_eq!(
            diags,
            vec![
                Diagnostic::ReservedTerminatorCode { line: 1 },
                Diagnostic::ReservedTerminatorCode { line: 2 },
            ]
        );
    }

    #[test]
    fn malformed_keys_are_reported_and_skipped() {
        let (t, diags) = parse("zz\tA\n12345\tB\n 41 \tC\n");
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(0x41), Some('C'));
        assert_eq!(diags.len(), 2);
        assert!(matches!(&diags[0], Diagnostic::MalformedTableKey { line: 1, key } if key == "zz"));
    }

    #[test]
    fn crlf_and_bom_are_tolerated() {
        let (t, _) = parse("\u{feff}41\tA\r\n42\tB\r\n");
        assert_eq!(t.get(0x41), Some('A'));
        assert_eq!(t.get(0x42), Some('B'));
    }

    #[test]
    fn reverse_first_write_wins() {
        let (t, _) = parse("41\tA\n61\tA\n42\tB\n");
        let mut diags: Vec<Diagnostic> = Vec::new();
        let rev = t.reverse(&mut diags);
        assert_eq!(rev.get('A'), Some(0x41));
        assert_eq!(rev.get('B'), Some(0x42));
        assert_eq!(rev.len(), 2);
        assert_eq!(
            diags,
            vec![Diagnostic::DuplicateReverseValue {
                ch: 'A',
                kept: 0x41,
                dropped: 0x61,
            }]
        );
    }

    #[test]
    fn reverse_follows_insertion_order_after_replacement() {
        // 0x41 is inserted first, then replaced; it still precedes 0x42.
        let (t, _) = parse("41\tA\n42\tB\n41\tB\n");
        let rev = t.reverse(&mut Ignore);
        assert_eq!(rev.get('B'), Some(0x41));
        assert_eq!(rev.get('A'), None);
    }

    #[test]
    fn insert_ignores_terminator() {
        let mut t = CodeTable::new();
        assert_eq!(t.insert(TERMINATOR, 'x'), None);
        assert!(t.is_empty());
    }

    #[test]
    fn collect_from_pairs() {
        let t: CodeTable = [(0x41, 'A'), (0x0201, 'X')].into_iter().collect();
        assert_eq!(t.iter().collect::<Vec<_>>(), vec![(0x41, 'A'), (0x0201, 'X')]);
    }
}
