//! The [`Sniffer`]: owns a bounded, parametrised sample of the file and
//! derives dialect, header, metadata, and column types from it.

use std::cell::RefCell;
use std::io::{BufReader, Read, Seek};
use std::rc::Rc;

use crate::cell::{self, CellKind};
use crate::dialect::{self, Dialect};
use crate::error::{Result, TabbedError};
use crate::metadata::{Header, Metadata};
use crate::sample::Sample;
use crate::streaming;

const DEFAULT_AMOUNT: usize = 100;
const DEFAULT_POLL: usize = 5;

pub(crate) type SharedStream<R> = Rc<RefCell<BufReader<R>>>;

/// Owns the sample window and the structural inferences drawn from it.
pub struct Sniffer<R> {
    stream: SharedStream<R>,
    line_count: usize,
    start: usize,
    amount: usize,
    skips: Vec<usize>,
    sample: Sample,
    dialect: Dialect,
    dialect_ambiguous: bool,
}

impl<R: Read + Seek> Sniffer<R> {
    /// Wraps a fresh stream. Computes `line_count` once and draws the first
    /// sample starting at line 0.
    pub fn new(stream: R) -> Result<Self> {
        let shared: SharedStream<R> = Rc::new(RefCell::new(BufReader::new(stream)));
        Self::from_shared(shared)
    }

    pub(crate) fn from_shared(stream: SharedStream<R>) -> Result<Self> {
        let line_count = streaming::count_lines(&mut *stream.borrow_mut())?;
        let mut sniffer = Self {
            stream,
            line_count,
            start: 0,
            amount: DEFAULT_AMOUNT,
            skips: Vec::new(),
            sample: Sample::default(),
            dialect: Dialect::default(),
            dialect_ambiguous: false,
        };
        sniffer.resample()?;
        Ok(sniffer)
    }

    fn resample(&mut self) -> Result<()> {
        let (text, line_numbers) = streaming::read_window(
            &mut *self.stream.borrow_mut(),
            self.start,
            self.amount,
            &self.skips,
        )?;
        self.sample = Sample::new(text, line_numbers);
        match dialect::detect_dialect(&self.sample.text) {
            Some(dialect) => {
                self.dialect = dialect;
                self.dialect_ambiguous = false;
            }
            None => self.dialect_ambiguous = true,
        }
        Ok(())
    }

    pub const fn line_count(&self) -> usize {
        self.line_count
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn amount(&self) -> usize {
        self.amount
    }

    pub fn skips(&self) -> &[usize] {
        &self.skips
    }

    pub const fn sample(&self) -> &Sample {
        &self.sample
    }

    pub const fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn dialect_mut(&mut self) -> &mut Dialect {
        &mut self.dialect
    }

    /// True when no candidate delimiter converged on a consistent field
    /// count and `dialect()` is holding the default fallback rather than a
    /// detected one. A structural-ambiguity warning, surfaced as data rather
    /// than raised, per the caller-provided-delimiter escape hatch.
    pub const fn dialect_ambiguous(&self) -> bool {
        self.dialect_ambiguous
    }

    /// Sets the sample's starting line, clamped to `line_count - 1`, and
    /// re-materialises the sample.
    pub fn set_start(&mut self, start: usize) -> Result<&mut Self> {
        self.start = start.min(self.line_count.saturating_sub(1));
        self.resample()?;
        Ok(self)
    }

    /// Sets the sample's row budget, clamped to `line_count - start`, and
    /// re-materialises the sample.
    pub fn set_amount(&mut self, amount: usize) -> Result<&mut Self> {
        self.amount = amount.min(self.line_count.saturating_sub(self.start));
        self.resample()?;
        Ok(self)
    }

    /// Sets absolute line numbers to exclude from the sample, and
    /// re-materialises the sample.
    pub fn set_skips(&mut self, skips: Vec<usize>) -> Result<&mut Self> {
        self.skips = skips;
        self.resample()?;
        Ok(self)
    }

    /// Splits the sample's joined text at line terminators, strips a
    /// trailing delimiter if present, splits each line on the chosen
    /// delimiter, and strips double-quote characters from each field.
    pub fn rows(&self, delimiter: Option<char>) -> Vec<Vec<String>> {
        let delim = delimiter.unwrap_or(self.dialect.delimiter);
        self.sample
            .lines()
            .into_iter()
            .map(|line| {
                let line = line.strip_suffix(delim).map_or(line.clone(), str::to_string);
                line.split(delim)
                    .map(|field| field.replace('"', ""))
                    .collect::<Vec<String>>()
            })
            .collect()
    }

    /// Header detection, §4.3.1.
    pub fn header(&self, delimiter: Option<char>) -> Header {
        let rows = self.rows(delimiter);
        let nums = &self.sample.line_numbers;
        let Some(last) = rows.last() else {
            return Header::synthesize(0);
        };
        let last_numeric_bearing = last.iter().any(|c| cell::is_stringed_numeric(c));

        let found = if last_numeric_bearing {
            header_case_a(&rows, last.len())
        } else {
            header_case_b(&rows, last.len())
        };

        match found {
            Some(idx) => Header::new(Some(nums[idx]), rows[idx].clone(), None),
            None => Header::synthesize(last.len()),
        }
    }

    /// Metadata detection, §4.3.2.
    pub fn metadata(&self, header: &Header, delimiter: Option<char>) -> Metadata {
        if let Some(header_line) = header.line {
            let end = header_line.checked_sub(1);
            return Metadata::new((0, end), Some(format!("lines 0..{header_line}")));
        }

        let rows = self.rows(delimiter);
        let Some(last) = rows.last() else {
            return Metadata::none();
        };
        let numeric_flags: Vec<bool> = last.iter().map(|c| cell::is_stringed_numeric(c)).collect();
        let all_numeric = !numeric_flags.is_empty() && numeric_flags.iter().all(|&b| b);
        let any_numeric = numeric_flags.iter().any(|&b| b);

        let mislen = mislengthed(&rows, last.len());
        let disjoint = disjoint_from_tail(&rows);
        let nonnum = nonnumeric(&rows);

        let end = if all_numeric {
            max_opt(mislen, nonnum)
        } else if any_numeric {
            max_opt(max_opt(mislen, disjoint), nonnum)
        } else {
            max_opt(mislen, disjoint)
        };

        match end {
            Some(idx) => Metadata::new((0, Some(self.sample.line_numbers[idx])), None),
            None => Metadata::none(),
        }
    }

    /// Column-type inference over the last `poll` sampled rows, §4.3.3.
    /// Returns one `(kind, format)` per column plus an `inconsistent` flag.
    pub fn types(&self, poll: usize) -> (Vec<(CellKind, Option<String>)>, bool) {
        let poll = if poll == 0 { DEFAULT_POLL } else { poll };
        let rows = self.rows(None);
        let tail: Vec<&Vec<String>> = rows.iter().rev().take(poll).collect();
        if tail.is_empty() {
            return (Vec::new(), false);
        }
        let width = tail.iter().map(|r| r.len()).max().unwrap_or(0);
        let mut inconsistent = false;
        let mut result = Vec::with_capacity(width);

        for col in 0..width {
            let mut kinds: Vec<CellKind> = Vec::new();
            let mut formats: Vec<Option<String>> = Vec::new();
            for row in &tail {
                let Some(raw) = row.get(col) else { continue };
                let kind = cell::detect_kind(raw);
                let fmt = match kind {
                    CellKind::Date => cell::find_date_format(raw).map(str::to_string),
                    CellKind::Time => cell::find_time_format(raw).map(str::to_string),
                    CellKind::DateTime => cell::find_datetime_format(raw).map(str::to_string),
                    _ => None,
                };
                kinds.push(kind);
                formats.push(fmt);
            }
            if kinds.windows(2).any(|w| w[0] != w[1]) {
                inconsistent = true;
            }
            let kind = most_common(&kinds).unwrap_or(CellKind::Text);
            let format = if matches!(kind, CellKind::Date | CellKind::Time | CellKind::DateTime) {
                most_common_format(&kinds, &formats, kind)
            } else {
                None
            };
            result.push((kind, format));
        }
        (result, inconsistent)
    }
}

fn max_opt(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (None, None) => None,
    }
}

fn header_case_a(rows: &[Vec<String>], last_len: usize) -> Option<usize> {
    rows.iter()
        .enumerate()
        .rev()
        .skip(1)
        .find(|(_, row)| {
            row.len() == last_len
                && !row.is_empty()
                && row.iter().all(|c| !c.is_empty())
                && !row.iter().any(|c| cell::is_stringed_numeric(c))
        })
        .map(|(idx, _)| idx)
}

fn header_case_b(rows: &[Vec<String>], last_len: usize) -> Option<usize> {
    let n = rows.len();
    for idx in (0..n.saturating_sub(1)).rev() {
        let row = &rows[idx];
        if row.is_empty() || row.iter().any(|s| s.is_empty()) {
            continue;
        }
        let disjoint = (idx + 1..n).all(|j| {
            let later = &rows[j];
            !row.iter().any(|c| later.contains(c))
        });
        if disjoint {
            return if row.len() == last_len { Some(idx) } else { None };
        }
    }
    None
}

fn mislengthed(rows: &[Vec<String>], last_len: usize) -> Option<usize> {
    rows.iter()
        .enumerate()
        .rev()
        .find(|(_, row)| row.len() != last_len)
        .map(|(idx, _)| idx)
}

fn disjoint_from_tail(rows: &[Vec<String>]) -> Option<usize> {
    let n = rows.len();
    (0..n.saturating_sub(1)).rev().find(|&idx| {
        let row = &rows[idx];
        (idx + 1..n).all(|j| {
            let later = &rows[j];
            !row.iter().any(|c| later.contains(c))
        })
    })
}

fn nonnumeric(rows: &[Vec<String>]) -> Option<usize> {
    rows.iter()
        .enumerate()
        .rev()
        .find(|(_, row)| {
            !row.is_empty()
                && row.iter().all(|c| !c.is_empty())
                && !row.iter().any(|c| cell::is_stringed_numeric(c))
        })
        .map(|(idx, _)| idx)
}

fn most_common(kinds: &[CellKind]) -> Option<CellKind> {
    use foldhash::{HashMap, HashMapExt};
    let mut counts: HashMap<CellKind, usize> = HashMap::new();
    for &k in kinds {
        *counts.entry(k).or_insert(0) += 1;
    }
    counts.into_iter().max_by_key(|&(_, c)| c).map(|(k, _)| k)
}

fn most_common_format(
    kinds: &[CellKind],
    formats: &[Option<String>],
    wanted: CellKind,
) -> Option<String> {
    let catalogue: &[String] = match wanted {
        CellKind::Date => cell::date_formats(),
        CellKind::Time => cell::time_formats(),
        CellKind::DateTime => cell::datetime_formats(),
        _ => return None,
    };
    use foldhash::HashMapExt;
    let mut counts: foldhash::HashMap<&str, usize> = foldhash::HashMap::new();
    for (kind, fmt) in kinds.iter().zip(formats) {
        if *kind == wanted {
            if let Some(f) = fmt {
                *counts.entry(f.as_str()).or_insert(0) += 1;
            }
        }
    }
    let best_count = counts.values().copied().max()?;
    catalogue
        .iter()
        .find(|f| counts.get(f.as_str()).copied().unwrap_or(0) == best_count)
        .cloned()
}

// Validate construction eagerly for invalid explicit input, mirroring the
// hard-error taxonomy for invalid config (used by Reader's header setter).
pub(crate) fn validate_explicit_header(names: &[String], expected_width: usize) -> Result<()> {
    if names.len() != expected_width {
        return Err(TabbedError::InvalidConfig(format!(
            "explicit header has {} names but the sample is {} fields wide",
            names.len(),
            expected_width
        )));
    }
    Ok(())
}
