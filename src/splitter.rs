//! The injected line splitter: turns one raw line into fields, reporting
//! raggedness against an expected width.
//!
//! Built on top of the `csv` crate the same way this codebase's own table
//! parser is (delimiter/quote configured per dialect, `flexible(true)` so a
//! short or long line doesn't abort the read), rather than a hand-rolled
//! character scanner.

use crate::dialect::Dialect;

/// The outcome of splitting one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitResult {
    pub fields: Vec<String>,
    /// Fields beyond the expected width, already dropped from `fields`.
    pub surplus: Vec<String>,
    /// True when `fields` has fewer entries than the expected width.
    pub short: bool,
}

/// Splits `line` per `dialect`, padding or trimming against `expected_width`
/// when given. With no expected width, `surplus` is always empty and `short`
/// is always false (there is nothing to compare against).
pub fn split(line: &str, dialect: &Dialect, expected_width: Option<usize>) -> SplitResult {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(dialect.delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .quote(dialect.quote as u8);
    if let Some(escape) = dialect.escape {
        builder.escape(Some(escape as u8));
    }

    let mut reader = builder.from_reader(line.as_bytes());
    let mut record = csv::StringRecord::new();
    let mut fields: Vec<String> = match reader.read_record(&mut record) {
        Ok(true) => record.iter().map(str::to_string).collect(),
        _ => line
            .split(dialect.delimiter)
            .map(str::to_string)
            .collect(),
    };

    match expected_width {
        Some(width) if fields.len() > width => {
            let surplus = fields.split_off(width);
            SplitResult {
                fields,
                surplus,
                short: false,
            }
        }
        Some(width) => SplitResult {
            short: fields.len() < width,
            fields,
            surplus: Vec::new(),
        },
        None => SplitResult {
            fields,
            surplus: Vec::new(),
            short: false,
        },
    }
}
