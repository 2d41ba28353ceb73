// Codec diagnostics.
//
// Every problem the codec runs into is recoverable: the table loader skips
// or overwrites, the decoder ends the record early, the encoder drops or
// substitutes a character.  Each such event is handed to a caller-supplied
// `DiagnosticSink` instead of being printed, so the codec stays a pure
// function of its inputs.

use thiserror::Error;

/// A non-fatal event reported while loading tables or converting names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// A table line reused a code; the newer character replaced the older one.
    #[error("{old} replaced by {new} in {code:#X} (line {line})")]
    DuplicateTableKey {
        line: usize,
        code: u16,
        old: char,
        new: char,
    },

    /// Two codes map to the same character; the first mapping is kept.
    #[error("duplicated value {ch}: keeping {kept:#X}, dropping {dropped:#X}")]
    DuplicateReverseValue { ch: char, kept: u16, dropped: u16 },

    /// A table key is not a 16-bit hexadecimal number.
    #[error("malformed key {key:?} (line {line})")]
    MalformedTableKey { line: usize, key: String },

    /// A table key parsed to the reserved terminator code 0.
    #[error("code 0 is reserved for the terminator (line {line})")]
    ReservedTerminatorCode { line: usize },

    /// Two pending bytes did not resolve to any table entry.
    #[error("wrong code {code:#06X} at {offset:#X}")]
    UnresolvableTwoByteCode { offset: u64, code: u16 },

    /// A character resolved to a code that cannot be written.
    #[error("invalid code {code} for {ch}")]
    InvalidEncodedCode { ch: char, code: u16 },

    /// The replacement table has no code for a character.
    #[error("cannot find code for {ch}")]
    MissingEncodingForCharacter { ch: char },
}

impl Diagnostic {
    /// Whether the event loses information from a name (as opposed to a
    /// table-level collision that only affects which glyph wins).
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::UnresolvableTwoByteCode { .. }
                | Self::InvalidEncodedCode { .. }
                | Self::MissingEncodingForCharacter { .. }
        )
    }
}

/// Receives diagnostics from the codec.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Collects diagnostics in order.
impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn report(&mut self, diagnostic: Diagnostic) {
        (**self).report(diagnostic);
    }
}

/// Discards every diagnostic.
pub struct Ignore;

impl DiagnosticSink for Ignore {
    fn report(&mut self, _diagnostic: Diagnostic) {}
}

/// Forwards diagnostics to the `log` facade and keeps per-level counts.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink {
    pub warnings: usize,
    pub errors: usize,
}

impl DiagnosticSink for LogSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.errors += 1;
            log::error!("{diagnostic}");
        } else {
            self.warnings += 1;
            log::warn!("{diagnostic}");
        }
    }
}
