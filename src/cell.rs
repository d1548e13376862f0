//! Cell parsing: string -> typed [`Cell`], plus the date/time/datetime format
//! catalogues used for format discovery.
//!
//! Format discovery (`find_format`) is linear in the catalogue and is meant to
//! run only during sniffing, once per column; per-row decoding passes the
//! discovered format in as a hint so the catalogue is never re-scanned.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::sync::LazyLock;

/// A single decoded field value.
///
/// Equality and ordering are only meaningful within a variant; comparing
/// across variants is treated as a failure signal by the tabulator (see
/// [`crate::tabulator`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Integer(i64),
    Float(f64),
    Complex(f64, f64),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Complex(re, im) => {
                if *im >= 0.0 {
                    write!(f, "{re}+{im}j")
                } else {
                    write!(f, "{re}{im}j")
                }
            }
            Self::Date(v) => write!(f, "{v}"),
            Self::Time(v) => write!(f, "{v}"),
            Self::DateTime(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

impl PartialOrd for Cell {
    /// `None` when the two cells are not the same variant: cross-variant
    /// comparison is a failure signal, not an error, and callers (notably the
    /// tabulator's permissive comparison) decide what to do with `None`.
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a.partial_cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Integer(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Date(a), Self::Date(b)) => a.partial_cmp(b),
            (Self::Time(a), Self::Time(b)) => a.partial_cmp(b),
            (Self::DateTime(a), Self::DateTime(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// The coarse bucket `classify` sorts a raw string into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Numeric,
    Date,
    Time,
    DateTime,
    Text,
}

/// The full variant tag, as committed by column-type inference
/// ([`crate::sniffer::Sniffer::types`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Integer,
    Float,
    Complex,
    Date,
    Time,
    DateTime,
    Text,
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Complex => "complex",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::Text => "text",
        };
        f.write_str(s)
    }
}

impl CellKind {
    const fn coarsen(self) -> Classification {
        match self {
            Self::Integer | Self::Float | Self::Complex => Classification::Numeric,
            Self::Date => Classification::Date,
            Self::Time => Classification::Time,
            Self::DateTime => Classification::DateTime,
            Self::Text => Classification::Text,
        }
    }
}

/// A (variant, format) pair handed to [`convert`] to skip format discovery at
/// decode time.
pub type Hint = (CellKind, Option<String>);

/// Builds the date format catalogue: month-token x separator x year-token,
/// both month-first and day-first orderings. 3 x 4 x 2 x 2 = 48 entries.
pub fn date_formats() -> &'static [String] {
    static CATALOGUE: LazyLock<Vec<String>> = LazyLock::new(|| {
        let months = ['m', 'b', 'B'];
        let separators = [' ', '/', '-', '.'];
        let years = ['Y', 'y'];
        let mut fmts = Vec::with_capacity(48);
        for mth in months {
            for sep in separators {
                for yr in years {
                    fmts.push(format!("%{mth}{sep}%d{sep}%{yr}"));
                    fmts.push(format!("%d{sep}%{mth}{sep}%{yr}"));
                }
            }
        }
        fmts
    });
    &CATALOGUE
}

/// Builds the time format catalogue. The 24-hour (`%H`) branch never pairs
/// with `%p`; the 12-hour (`%I`) branch emits both a space and a no-space
/// placement of `%p`. 3 + 6 = 9 entries.
pub fn time_formats() -> &'static [String] {
    static CATALOGUE: LazyLock<Vec<String>> = LazyLock::new(|| {
        let microsecs = ["", ":%f", ".%f"];
        let mut fmts = Vec::with_capacity(9);
        for micro in microsecs {
            fmts.push(format!("%H:%M:%S{micro}"));
        }
        for micro in microsecs {
            fmts.push(format!("%I:%M:%S{micro}%p"));
            fmts.push(format!("%I:%M:%S{micro} %p"));
        }
        fmts
    });
    &CATALOGUE
}

/// Builds the datetime format catalogue as the Cartesian product of
/// `date_formats() x time_formats()`, joined by a single space.
pub fn datetime_formats() -> &'static [String] {
    static CATALOGUE: LazyLock<Vec<String>> = LazyLock::new(|| {
        let dates = date_formats();
        let times = time_formats();
        let mut fmts = Vec::with_capacity(dates.len() * times.len());
        for date in dates {
            for time in times {
                fmts.push(format!("{date} {time}"));
            }
        }
        fmts
    });
    &CATALOGUE
}

/// Returns the first catalogue entry that parses `s` exactly, or `None`.
pub fn find_date_format(s: &str) -> Option<&'static str> {
    date_formats()
        .iter()
        .find(|fmt| NaiveDate::parse_from_str(s, fmt).is_ok())
        .map(String::as_str)
}

pub fn find_time_format(s: &str) -> Option<&'static str> {
    // Cheap guard before the linear format scan: every format needs at least
    // two ':' separators (HH:MM:SS at minimum).
    if s.bytes().filter(|&b| b == b':').count() < 2 {
        return None;
    }
    time_formats()
        .iter()
        .find(|fmt| NaiveTime::parse_from_str(s, fmt).is_ok())
        .map(String::as_str)
}

pub fn find_datetime_format(s: &str) -> Option<&'static str> {
    datetime_formats()
        .iter()
        .find(|fmt| NaiveDateTime::parse_from_str(s, fmt).is_ok())
        .map(String::as_str)
}

/// Parses a complex-number literal such as `3+4j`, `-2.5j`, or `1e3-2j`.
/// Requires an imaginary marker (`i` or `j`); a bare real number is not
/// complex under this policy.
fn parse_complex(s: &str) -> Option<(f64, f64)> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    let last = trimmed.as_bytes()[trimmed.len() - 1];
    if !matches!(last, b'i' | b'j' | b'I' | b'J') {
        return None;
    }
    let body = &trimmed[..trimmed.len() - 1];

    // Scan from the end for a +/- that splits real and imaginary parts,
    // skipping one that's part of a scientific-notation exponent.
    let bytes = body.as_bytes();
    let mut split = None;
    for i in (1..bytes.len()).rev() {
        let c = bytes[i];
        if (c == b'+' || c == b'-') && !matches!(bytes[i - 1], b'e' | b'E') {
            split = Some(i);
            break;
        }
    }

    match split {
        Some(idx) => {
            let re_part = &body[..idx];
            let im_part = &body[idx..];
            let re: f64 = if re_part.is_empty() {
                0.0
            } else {
                re_part.parse().ok()?
            };
            let im_str = match im_part {
                "+" => "1",
                "-" => "-1",
                other => other,
            };
            let im: f64 = im_str.parse().ok()?;
            Some((re, im))
        }
        None => {
            let im_str = if body.is_empty() { "1" } else { body };
            let im: f64 = im_str.parse().ok()?;
            Some((0.0, im))
        }
    }
}

fn is_numeric(s: &str) -> bool {
    let t = s.trim();
    !t.is_empty()
        && (parse_complex(t).is_some() || t.parse::<f64>().is_ok() || t.parse::<i64>().is_ok())
}

/// Coarse classification used by structural detection (header/metadata
/// boundary heuristics only need to know "is this numeric", not which
/// numeric subtype).
pub fn classify(s: &str) -> Classification {
    detect_kind(s).coarsen()
}

/// Full variant-tag detection, used by column-type inference.
pub fn detect_kind(s: &str) -> CellKind {
    let t = s.trim();
    if t.is_empty() {
        return CellKind::Text;
    }
    if parse_complex(t).is_some() {
        return CellKind::Complex;
    }
    if t.contains('.') || t.contains('e') || t.contains('E') {
        if t.parse::<f64>().is_ok() {
            return CellKind::Float;
        }
    } else if t.parse::<i64>().is_ok() {
        return CellKind::Integer;
    } else if t.parse::<f64>().is_ok() {
        return CellKind::Float;
    }
    if find_date_format(t).is_some() {
        return CellKind::Date;
    }
    if find_time_format(t).is_some() {
        return CellKind::Time;
    }
    if find_datetime_format(t).is_some() {
        return CellKind::DateTime;
    }
    CellKind::Text
}

fn auto_convert(s: &str) -> Cell {
    let t = s.trim();
    if let Some((re, im)) = parse_complex(t) {
        return Cell::Complex(re, im);
    }
    let looks_float = t.contains('.') || t.contains('e') || t.contains('E');
    if !looks_float {
        if let Ok(i) = t.parse::<i64>() {
            return Cell::Integer(i);
        }
    }
    if let Ok(f) = t.parse::<f64>() {
        return Cell::Float(f);
    }
    if let Some(fmt) = find_date_format(t) {
        if let Ok(d) = NaiveDate::parse_from_str(t, fmt) {
            return Cell::Date(d);
        }
    }
    if let Some(fmt) = find_time_format(t) {
        if let Ok(time) = NaiveTime::parse_from_str(t, fmt) {
            return Cell::Time(time);
        }
    }
    if let Some(fmt) = find_datetime_format(t) {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Cell::DateTime(dt);
        }
    }
    Cell::Text(s.to_string())
}

/// Converts a raw field string into a [`Cell`]. Never fails: a hint that
/// doesn't parse, or no hint at all, falls back to auto-classification and
/// ultimately to `Cell::Text`.
pub fn convert(s: &str, hint: Option<&Hint>) -> Cell {
    if let Some((kind, fmt)) = hint {
        let t = s.trim();
        let hinted = match kind {
            CellKind::Integer => t.parse::<i64>().ok().map(Cell::Integer),
            CellKind::Float => t.parse::<f64>().ok().map(Cell::Float),
            CellKind::Complex => parse_complex(t).map(|(re, im)| Cell::Complex(re, im)),
            CellKind::Date => fmt
                .as_deref()
                .and_then(|f| NaiveDate::parse_from_str(t, f).ok())
                .map(Cell::Date),
            CellKind::Time => fmt
                .as_deref()
                .and_then(|f| NaiveTime::parse_from_str(t, f).ok())
                .map(Cell::Time),
            CellKind::DateTime => fmt
                .as_deref()
                .and_then(|f| NaiveDateTime::parse_from_str(t, f).ok())
                .map(Cell::DateTime),
            CellKind::Text => Some(Cell::Text(s.to_string())),
        };
        if let Some(cell) = hinted {
            return cell;
        }
    }
    auto_convert(s)
}

/// `is_numeric` as used by the structural sniffer: a cell is stringed-numeric
/// if it can parse as int, float, or complex.
pub fn is_stringed_numeric(s: &str) -> bool {
    is_numeric(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_numeric_variants() {
        assert_eq!(detect_kind("42"), CellKind::Integer);
        assert_eq!(detect_kind("-7"), CellKind::Integer);
        assert_eq!(detect_kind("3.14"), CellKind::Float);
        assert_eq!(detect_kind("1e5"), CellKind::Float);
        assert_eq!(detect_kind("3+4j"), CellKind::Complex);
        assert_eq!(detect_kind("4j"), CellKind::Complex);
        assert_eq!(detect_kind("-2.5j"), CellKind::Complex);
    }

    #[test]
    fn classifies_temporal_variants() {
        assert_eq!(detect_kind("2023-01-15"), CellKind::Date);
        assert_eq!(detect_kind("01/15/2023"), CellKind::Date);
        assert_eq!(detect_kind("11:03:29"), CellKind::Time);
        assert_eq!(detect_kind("11:03:29.009209"), CellKind::Time);
        assert_eq!(detect_kind("2023-01-15 11:03:29"), CellKind::DateTime);
    }

    #[test]
    fn falls_back_to_text() {
        assert_eq!(detect_kind("hello"), CellKind::Text);
        assert_eq!(detect_kind(""), CellKind::Text);
        assert_eq!(detect_kind("-"), CellKind::Text);
    }

    #[test]
    fn hinted_convert_falls_back_silently_on_mismatch() {
        let hint = (CellKind::Integer, None);
        let cell = convert("-", Some(&hint));
        assert_eq!(cell, Cell::Text("-".to_string()));
    }

    #[test]
    fn hinted_convert_uses_format_when_it_parses() {
        let hint = (CellKind::Date, Some("%Y-%m-%d".to_string()));
        let cell = convert("2023-01-15", Some(&hint));
        assert_eq!(cell, Cell::Date(NaiveDate::from_ymd_opt(2023, 1, 15).unwrap()));
    }

    #[test]
    fn time_format_rejects_pairing_h_with_p() {
        for fmt in time_formats() {
            assert!(!(fmt.contains("%H") && fmt.contains("%p")));
        }
    }

    #[test]
    fn date_format_count_matches_contract() {
        assert_eq!(date_formats().len(), 48);
    }

    #[test]
    fn time_format_count_matches_contract() {
        assert_eq!(time_formats().len(), 9);
    }

    #[test]
    fn format_round_trip() {
        let fmt = "%Y-%m-%d";
        let d = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let s = d.format(fmt).to_string();
        let hint = (CellKind::Date, Some(fmt.to_string()));
        assert_eq!(convert(&s, Some(&hint)), Cell::Date(d));
    }

    #[test]
    fn equality_cross_variant_is_false_not_panic() {
        assert_ne!(Cell::Integer(4), Cell::Text("4".to_string()));
    }

    #[test]
    fn ordering_cross_variant_is_none() {
        assert_eq!(
            Cell::Integer(4).partial_cmp(&Cell::Text("4".to_string())),
            None
        );
    }

    #[test]
    fn is_stringed_numeric_accepts_common_shapes() {
        assert!(is_stringed_numeric("42"));
        assert!(is_stringed_numeric("-3.5"));
        assert!(is_stringed_numeric("2j"));
        assert!(!is_stringed_numeric("hello"));
        assert!(!is_stringed_numeric(""));
    }
}
