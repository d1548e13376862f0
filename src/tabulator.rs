//! The tabulator: a composable row-predicate pipeline plus column
//! projection, applied to every decoded row during a read.

use indexmap::IndexMap;
use regex::Regex;

use crate::cell::Cell;

/// One column's predicate, as resolved from a keyword argument shape
/// (§4.4). Replaces runtime kwarg-shape sniffing with an explicit
/// discriminated union fixed at construction time.
#[derive(Clone)]
pub enum TabSpec {
    /// `< > <= >= == !=`, one or two subcomparisons joined by `and`/`or`.
    Comparison(String),
    Equality(Cell),
    Membership(Vec<Cell>),
    Regex(Regex),
    /// A caller-supplied predicate over `(row, column name)`.
    Calling(std::rc::Rc<dyn Fn(&IndexMap<String, Cell>, &str) -> bool>),
}

impl std::fmt::Debug for TabSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TabSpec::Comparison(s) => f.debug_tuple("Comparison").field(s).finish(),
            TabSpec::Equality(c) => f.debug_tuple("Equality").field(c).finish(),
            TabSpec::Membership(v) => f.debug_tuple("Membership").field(v).finish(),
            TabSpec::Regex(r) => f.debug_tuple("Regex").field(r).finish(),
            TabSpec::Calling(_) => f.debug_tuple("Calling").field(&"<fn>").finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Op {
    fn apply(self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Op::Lt => ord == Less,
            Op::Le => ord != Greater,
            Op::Gt => ord == Greater,
            Op::Ge => ord != Less,
            Op::Eq => ord == Equal,
            Op::Ne => ord != Equal,
        }
    }
}

/// Splits a single comparison clause like `"> 4.5"` into its operator and
/// operand text. Longest-operator-first so `>=` is not mistaken for `>`.
fn split_operator(clause: &str) -> Option<(Op, &str)> {
    const OPS: [(&str, Op); 6] = [
        ("<=", Op::Le),
        (">=", Op::Ge),
        ("==", Op::Eq),
        ("!=", Op::Ne),
        ("<", Op::Lt),
        (">", Op::Gt),
    ];
    let trimmed = clause.trim();
    for (token, op) in OPS {
        if let Some(rest) = trimmed.strip_prefix(token) {
            return Some((op, rest.trim()));
        }
    }
    None
}

fn evaluate_comparison(spec: &str, value: &Cell, permissive: bool) -> bool {
    let spec = spec.trim();
    let parts: Vec<(&str, bool)> = if let Some(idx) = spec.find(" and ") {
        vec![(&spec[..idx], true), (&spec[idx + 5..], true)]
    } else if let Some(idx) = spec.find(" or ") {
        vec![(&spec[..idx], false), (&spec[idx + 4..], false)]
    } else {
        vec![(spec, true)]
    };

    let results: Vec<bool> = parts
        .iter()
        .map(|(clause, _)| evaluate_single_comparison(clause, value, permissive))
        .collect();

    if parts.len() == 1 {
        return results[0];
    }
    let is_and = parts[0].1;
    if is_and {
        results.iter().all(|&r| r)
    } else {
        results.iter().any(|&r| r)
    }
}

fn evaluate_single_comparison(clause: &str, value: &Cell, permissive: bool) -> bool {
    let Some((op, operand_text)) = split_operator(clause) else {
        return permissive;
    };
    let operand = crate::cell::convert(operand_text, None);
    match value.partial_cmp(&operand) {
        Some(ord) => op.apply(ord),
        None => permissive,
    }
}

/// One resolved predicate bound to a column name.
#[derive(Clone)]
pub struct Tab {
    pub column: String,
    pub spec: TabSpecResolved,
}

#[derive(Clone)]
pub enum TabSpecResolved {
    Comparison(String),
    Equality(Cell),
    Membership(Vec<Cell>),
    Regex(Regex),
    Calling(std::rc::Rc<dyn Fn(&IndexMap<String, Cell>, &str) -> bool>),
}

impl std::fmt::Debug for TabSpecResolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Comparison(s) => write!(f, "Comparison({s:?})"),
            Self::Equality(c) => write!(f, "Equality({c:?})"),
            Self::Membership(v) => write!(f, "Membership({v:?})"),
            Self::Regex(r) => write!(f, "Regex({r})"),
            Self::Calling(_) => write!(f, "Calling(..)"),
        }
    }
}

impl std::fmt::Debug for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tab")
            .field("column", &self.column)
            .field("spec", &self.spec)
            .finish()
    }
}

/// What columns a read surfaces, and in what order.
#[derive(Debug, Clone)]
pub enum Columns {
    All,
    Names(Vec<String>),
    Indices(Vec<usize>),
    Pattern(Regex),
}

/// Given a decoded row, decides whether it survives and which columns (in
/// which order) to surface. Built once per `Reader::tab` call; reused for
/// every row of the subsequent read.
#[derive(Debug, Clone)]
pub struct Tabulator {
    tabs: Vec<Tab>,
    projection: Vec<String>,
    /// Controls how a type-incompatible comparison or membership operand is
    /// treated: `true` keeps the row instead of aborting, per §4.4.
    permissive: bool,
}

impl Tabulator {
    /// Builds a tabulator that accepts every row and projects every column
    /// in `header_names` order: the reset state after a header change.
    pub fn identity(header_names: &[String]) -> Self {
        Self {
            tabs: Vec::new(),
            projection: header_names.to_vec(),
            permissive: true,
        }
    }

    /// Builds a tabulator from column predicates and a projection spec,
    /// resolving `Columns` against the known header names.
    pub fn new(
        header_names: &[String],
        tabs: impl IntoIterator<Item = (String, TabSpec)>,
        columns: Columns,
    ) -> crate::error::Result<Self> {
        let mut resolved = Vec::new();
        for (column, spec) in tabs {
            if !header_names.contains(&column) {
                return Err(crate::error::TabbedError::InvalidConfig(format!(
                    "no such column: '{column}'"
                )));
            }
            let spec = match spec {
                TabSpec::Comparison(s) => TabSpecResolved::Comparison(s),
                TabSpec::Equality(c) => TabSpecResolved::Equality(c),
                TabSpec::Membership(v) => TabSpecResolved::Membership(v),
                TabSpec::Regex(r) => TabSpecResolved::Regex(r),
                TabSpec::Calling(f) => TabSpecResolved::Calling(f),
            };
            resolved.push(Tab { column, spec });
        }

        let projection = match columns {
            Columns::All => header_names.to_vec(),
            Columns::Names(names) => {
                for name in &names {
                    if !header_names.contains(name) {
                        return Err(crate::error::TabbedError::InvalidConfig(format!(
                            "no such column: '{name}'"
                        )));
                    }
                }
                names
            }
            Columns::Indices(indices) => indices
                .into_iter()
                .map(|i| {
                    header_names.get(i).cloned().ok_or_else(|| {
                        crate::error::TabbedError::InvalidConfig(format!(
                            "column index {i} out of range"
                        ))
                    })
                })
                .collect::<crate::error::Result<Vec<String>>>()?,
            Columns::Pattern(re) => header_names
                .iter()
                .filter(|n| re.is_match(n))
                .cloned()
                .collect(),
        };

        Ok(Self {
            tabs: resolved,
            projection,
            permissive: true,
        })
    }

    /// Evaluates all row tabs (logical conjunction) and, if every one
    /// passes, returns the projected row in projection order. `None` means
    /// rejected.
    pub fn evaluate(&self, row: &IndexMap<String, Cell>) -> Option<IndexMap<String, Cell>> {
        for tab in &self.tabs {
            let Some(value) = row.get(&tab.column) else {
                continue;
            };
            let passes = match &tab.spec {
                TabSpecResolved::Comparison(spec) => {
                    evaluate_comparison(spec, value, self.permissive)
                }
                TabSpecResolved::Equality(expected) => {
                    value.partial_cmp(expected) == Some(std::cmp::Ordering::Equal)
                }
                TabSpecResolved::Membership(values) => values.iter().any(|v| {
                    value.partial_cmp(v) == Some(std::cmp::Ordering::Equal)
                }),
                TabSpecResolved::Regex(re) => re.is_match(&value.to_string()),
                TabSpecResolved::Calling(f) => f(row, &tab.column),
            };
            if !passes {
                return None;
            }
        }

        let mut projected = IndexMap::new();
        for name in &self.projection {
            if let Some(value) = row.get(name) {
                projected.insert(name.clone(), value.clone());
            }
        }
        Some(projected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Cell)]) -> IndexMap<String, Cell> {
        pairs.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn header() -> Vec<String> {
        vec!["name".to_string(), "count".to_string(), "score".to_string()]
    }

    #[test]
    fn identity_accepts_everything_in_header_order() {
        let tab = Tabulator::identity(&header());
        let r = row(&[
            ("name", Cell::Text("a".into())),
            ("count", Cell::Integer(4)),
            ("score", Cell::Float(1.5)),
        ]);
        let out = tab.evaluate(&r).unwrap();
        assert_eq!(
            out.keys().cloned().collect::<Vec<_>>(),
            vec!["name", "count", "score"]
        );
    }

    #[test]
    fn compound_and_comparison() {
        let tabs = vec![("count".to_string(), TabSpec::Comparison("> 2 and < 10".to_string()))];
        let tab = Tabulator::new(&header(), tabs, Columns::All).unwrap();
        let accepted = row(&[
            ("name", Cell::Text("a".into())),
            ("count", Cell::Integer(4)),
            ("score", Cell::Float(1.5)),
        ]);
        let rejected = row(&[
            ("name", Cell::Text("a".into())),
            ("count", Cell::Integer(20)),
            ("score", Cell::Float(1.5)),
        ]);
        assert!(tab.evaluate(&accepted).is_some());
        assert!(tab.evaluate(&rejected).is_none());
    }

    #[test]
    fn equality_matches_parsed_numeric_keyword() {
        let tabs = vec![(
            "count".to_string(),
            TabSpec::Equality(crate::cell::convert("4", None)),
        )];
        let tab = Tabulator::new(&header(), tabs, Columns::All).unwrap();
        let r = row(&[
            ("name", Cell::Text("a".into())),
            ("count", Cell::Integer(4)),
            ("score", Cell::Float(1.5)),
        ]);
        assert!(tab.evaluate(&r).is_some());
    }

    #[test]
    fn regex_projection_coerces_non_text_via_display() {
        let tabs = vec![(
            "count".to_string(),
            TabSpec::Regex(Regex::new(r"^4\d*$").unwrap()),
        )];
        let tab = Tabulator::new(&header(), tabs, Columns::Names(vec!["name".to_string()])).unwrap();
        let r = row(&[
            ("name", Cell::Text("a".into())),
            ("count", Cell::Integer(42)),
            ("score", Cell::Float(1.5)),
        ]);
        let out = tab.evaluate(&r).unwrap();
        assert_eq!(out.keys().cloned().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn permissive_keeps_row_on_incompatible_comparison() {
        let tabs = vec![("name".to_string(), TabSpec::Comparison("> 4".to_string()))];
        let tab = Tabulator::new(&header(), tabs, Columns::All).unwrap();
        let r = row(&[
            ("name", Cell::Text("abc".into())),
            ("count", Cell::Integer(4)),
            ("score", Cell::Float(1.5)),
        ]);
        assert!(tab.evaluate(&r).is_some());
    }

    #[test]
    fn membership_checks_any_match() {
        let tabs = vec![(
            "name".to_string(),
            TabSpec::Membership(vec![
                Cell::Text("a".into()),
                Cell::Text("b".into()),
            ]),
        )];
        let tab = Tabulator::new(&header(), tabs, Columns::All).unwrap();
        let hit = row(&[
            ("name", Cell::Text("b".into())),
            ("count", Cell::Integer(1)),
            ("score", Cell::Float(1.0)),
        ]);
        let miss = row(&[
            ("name", Cell::Text("z".into())),
            ("count", Cell::Integer(1)),
            ("score", Cell::Float(1.0)),
        ]);
        assert!(tab.evaluate(&hit).is_some());
        assert!(tab.evaluate(&miss).is_none());
    }

    #[test]
    fn empty_tabs_with_projection_accepts_all_and_projects() {
        let tab = Tabulator::new(&header(), Vec::new(), Columns::Names(vec!["score".to_string()]))
            .unwrap();
        let r = row(&[
            ("name", Cell::Text("a".into())),
            ("count", Cell::Integer(4)),
            ("score", Cell::Float(1.5)),
        ]);
        let out = tab.evaluate(&r).unwrap();
        assert_eq!(out.keys().cloned().collect::<Vec<_>>(), vec!["score"]);
    }

    #[test]
    fn unknown_column_in_tabs_is_invalid_config() {
        let tabs = vec![("nope".to_string(), TabSpec::Equality(Cell::Integer(1)))];
        assert!(Tabulator::new(&header(), tabs, Columns::All).is_err());
    }
}
