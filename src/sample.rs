//! [`Sample`]: the bounded, reproducible slice of a file used for every
//! structural decision the sniffer makes.

/// A joined multi-line string plus the line numbers it was drawn from.
///
/// Two samples built from identical `(start, amount, skips)` over the same
/// stream are byte-for-byte equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sample {
    pub text: String,
    pub line_numbers: Vec<usize>,
}

impl Sample {
    pub const fn new(text: String, line_numbers: Vec<usize>) -> Self {
        Self { text, line_numbers }
    }

    pub fn is_empty(&self) -> bool {
        self.line_numbers.is_empty()
    }

    /// Splits `text` back into its constituent lines, normalizing CRLF/CR to
    /// LF first so callers never have to special-case line endings.
    pub fn lines(&self) -> Vec<String> {
        normalize_line_endings(&self.text)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Normalizes CRLF and bare CR line endings to LF.
pub fn normalize_line_endings(text: &str) -> std::borrow::Cow<'_, str> {
    if !text.contains('\r') {
        return std::borrow::Cow::Borrowed(text);
    }
    std::borrow::Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}
