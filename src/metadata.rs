//! [`Header`] and [`Metadata`]: the two immutable records the sniffer derives
//! to describe a file's structural layout.

/// The zero-based line number of a physical line inside the file.
pub type LineNo = usize;

/// An immutable record describing where the header row lives, if any.
///
/// `names` never contains embedded spaces (they are replaced with `_`), and
/// once set on a [`crate::reader::Reader`] is stable for its lifetime.
/// Uniqueness of `names` is not enforced here; a caller that needs it should
/// inspect `names` itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// The line the header physically occupies, or `None` if synthesised /
    /// supplied by the caller.
    pub line: Option<LineNo>,
    pub names: Vec<String>,
    pub source: Option<String>,
}

impl Header {
    pub fn new(line: Option<LineNo>, names: Vec<String>, source: Option<String>) -> Self {
        let names = names
            .into_iter()
            .map(|n| n.replace(' ', "_"))
            .collect();
        Self {
            line,
            names,
            source,
        }
    }

    /// Synthesises `Column_0..Column_{n-1}` when no header line was found.
    pub fn synthesize(width: usize) -> Self {
        let names = (0..width).map(|i| format!("Column_{i}")).collect();
        Self::new(None, names, None)
    }

    /// True when two or more names collide, which would make a name-keyed
    /// row map lossy. The core does not reject this; it is a warning the
    /// caller may act on.
    pub fn has_duplicate_names(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        !self.names.iter().all(|n| seen.insert(n))
    }
}

/// An immutable record describing the preamble bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// `(start, end)`. `start` is always 0. `end` is inclusive; `None` means
    /// no metadata block was detected.
    pub lines: (LineNo, Option<LineNo>),
    pub source: Option<String>,
}

impl Metadata {
    pub const fn new(lines: (LineNo, Option<LineNo>), source: Option<String>) -> Self {
        Self { lines, source }
    }

    pub const fn none() -> Self {
        Self {
            lines: (0, None),
            source: None,
        }
    }

    pub const fn end(&self) -> Option<LineNo> {
        self.lines.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_replaces_embedded_spaces() {
        let h = Header::new(Some(0), vec!["group name".to_string()], None);
        assert_eq!(h.names, vec!["group_name".to_string()]);
    }

    #[test]
    fn synthesized_header_has_no_line() {
        let h = Header::synthesize(3);
        assert_eq!(h.line, None);
        assert_eq!(h.names, vec!["Column_0", "Column_1", "Column_2"]);
    }

    #[test]
    fn detects_duplicate_names() {
        let h = Header::new(None, vec!["a".to_string(), "a".to_string()], None);
        assert!(h.has_duplicate_names());
    }

    #[test]
    fn metadata_none_has_no_end() {
        assert_eq!(Metadata::none().end(), None);
    }
}
