// Decoded names and the images they are read from.

/// A name as parallel code and text sequences.
///
/// Decoder output holds the codes consumed from the image (plus a single
/// trailing sentinel 0 when decoding failed).  Encoder output holds the
/// replacement codes followed by the terminator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameRecord {
    pub codes: Vec<u16>,
    pub text: String,
}

impl NameRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the record carries no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub(super) fn push(&mut self, code: u16, ch: char) {
        self.codes.push(code);
        self.text.push(ch);
    }

    /// Codes rendered as space-separated hex, for reports.
    pub fn codes_hex(&self) -> String {
        self.codes
            .iter()
            .map(|code| format!("{code:02X}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Random-access byte image (a memory dump or save file).
pub trait ImageSource {
    /// The byte at absolute `offset`, or `None` past the end of the image.
    fn byte_at(&self, offset: u64) -> Option<u8>;
}

impl ImageSource for [u8] {
    fn byte_at(&self, offset: u64) -> Option<u8> {
        usize::try_from(offset).ok().and_then(|i| self.get(i).copied())
    }
}

impl ImageSource for Vec<u8> {
    fn byte_at(&self, offset: u64) -> Option<u8> {
        self.as_slice().byte_at(offset)
    }
}
