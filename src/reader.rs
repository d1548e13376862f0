//! The reader: wires sniffer, dialect, and tabulator together into a lazy,
//! chunked walk over the data section.

use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::io::{BufRead, Read, Seek, SeekFrom};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::cell::{self, Cell, CellKind};
use crate::dialect::Dialect;
use crate::error::{Result, TabbedError};
use crate::metadata::{Header, Metadata};
use crate::sniffer::{SharedStream, Sniffer};
use crate::splitter;
use crate::streaming;
use crate::tabulator::{Columns, TabSpec, Tabulator};

/// Soft-failure accumulator, readable after a read sequence is exhausted.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    pub casting: Vec<String>,
    pub ragged: Vec<String>,
}

impl ErrorLog {
    fn clear(&mut self) {
        self.casting.clear();
        self.ragged.clear();
    }
}

/// Which absolute lines a read should include, overriding `start` bounds.
#[derive(Debug, Clone)]
pub enum Indices {
    Range { start: usize, stop: usize, step: usize },
    List(Vec<usize>),
}

impl Indices {
    fn contains(&self, l: usize) -> bool {
        match self {
            Self::Range { start, stop, step } => {
                *step > 0 && l >= *start && l < *stop && (l - start) % step == 0
            }
            Self::List(list) => list.contains(&l),
        }
    }

    /// True once `l` has moved past every remaining candidate, letting the
    /// reader stop scanning a large file early.
    fn past_end(&self, l: usize) -> bool {
        match self {
            Self::Range { stop, .. } => l >= *stop,
            Self::List(list) => list.last().is_some_and(|&last| l > last),
        }
    }

    fn start_hint(&self) -> Option<usize> {
        match self {
            Self::Range { start, .. } => Some(*start),
            Self::List(list) => list.first().copied(),
        }
    }
}

/// Options accepted by [`Reader::read`].
#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub start: Option<usize>,
    pub skips: Vec<usize>,
    pub indices: Option<Indices>,
    pub chunksize: usize,
    pub skip_empty: bool,
    pub poll: usize,
    pub raise_ragged: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            start: None,
            skips: Vec::new(),
            indices: None,
            chunksize: 200_000,
            skip_empty: true,
            poll: 5,
            raise_ragged: false,
        }
    }
}

/// An explicit header change directive, §4.5.
pub enum HeaderSpec {
    /// Re-sniff one physical line at this offset and adopt it.
    Line(usize),
    /// Adopt these names directly; must match the sampled width.
    Names(Vec<String>),
    /// Re-adopt the sniffer's current header.
    Reset,
}

/// Ties a bounded sample window, structural inference, and a row/column
/// filter together into a single streaming entry point.
pub struct Reader<R> {
    stream: SharedStream<R>,
    sniffer: Sniffer<R>,
    header: Header,
    metadata: Metadata,
    tabulator: Tabulator,
    tabulator_has_predicates: bool,
    errors: Rc<RefCell<ErrorLog>>,
}

impl<R: Read + Seek> Reader<R> {
    pub fn new(stream: R) -> Result<Self> {
        let shared: SharedStream<R> = Rc::new(RefCell::new(std::io::BufReader::new(stream)));
        let sniffer = Sniffer::from_shared(shared.clone())?;
        let header = sniffer.header(None);
        let metadata = sniffer.metadata(&header, None);
        let tabulator = Tabulator::identity(&header.names);
        Ok(Self {
            stream: shared,
            sniffer,
            header,
            metadata,
            tabulator,
            tabulator_has_predicates: false,
            errors: Rc::new(RefCell::new(ErrorLog::default())),
        })
    }

    pub const fn header(&self) -> &Header {
        &self.header
    }

    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub const fn tabulator(&self) -> &Tabulator {
        &self.tabulator
    }

    pub const fn sniffer(&self) -> &Sniffer<R> {
        &self.sniffer
    }

    pub fn dialect(&self) -> &Dialect {
        self.sniffer.dialect()
    }

    pub fn dialect_mut(&mut self) -> &mut Dialect {
        self.sniffer.dialect_mut()
    }

    pub fn errors(&self) -> Ref<'_, ErrorLog> {
        self.errors.borrow()
    }

    fn autostart(&self) -> usize {
        if let Some(h) = self.header.line {
            h + 1
        } else if let Some(e) = self.metadata.end() {
            e + 1
        } else {
            0
        }
    }

    /// Adopts a new header. Always resets the tabulator to identity;
    /// returns whether the previous tabulator carried predicates, so the
    /// caller can warn without this library printing anything itself.
    pub fn set_header(&mut self, spec: HeaderSpec) -> Result<bool> {
        let had_predicates = self.tabulator_has_predicates;
        self.header = match spec {
            HeaderSpec::Line(line) => {
                let mut stream = self.stream.borrow_mut();
                streaming::advance_to_line(&mut *stream, line)?;
                let mut buf = String::new();
                stream.read_line(&mut buf)?;
                stream.seek(SeekFrom::Start(0))?;
                drop(stream);
                let trimmed = buf.trim_end_matches(['\n', '\r']);
                let split = splitter::split(trimmed, self.sniffer.dialect(), None);
                Header::new(Some(line), split.fields, None)
            }
            HeaderSpec::Names(names) => {
                crate::sniffer::validate_explicit_header(&names, self.header.names.len())?;
                Header::new(None, names, None)
            }
            HeaderSpec::Reset => self.sniffer.header(None),
        };
        self.metadata = self.sniffer.metadata(&self.header, None);
        self.tabulator = Tabulator::identity(&self.header.names);
        self.tabulator_has_predicates = false;
        Ok(had_predicates)
    }

    /// Reconstructs the tabulator from column predicates and a projection.
    pub fn tab(&mut self, columns: Columns, tabs: Vec<(String, TabSpec)>) -> Result<()> {
        self.tabulator_has_predicates = !tabs.is_empty();
        self.tabulator = Tabulator::new(&self.header.names, tabs, columns)?;
        Ok(())
    }

    /// Begins a lazy, chunked read of the data section.
    pub fn read(&mut self, options: ReadOptions) -> Result<ReadChunks<R>> {
        self.errors.borrow_mut().clear();
        let (col_types, _inconsistent) = self.sniffer.types(options.poll);
        let autostart = self.autostart();

        let s0 = match &options.indices {
            Some(indices) => indices.start_hint().unwrap_or(autostart),
            None => {
                let s = options.start.unwrap_or(autostart);
                if s < autostart {
                    return Err(TabbedError::InvalidConfig(format!(
                        "start {s} precedes autostart {autostart}"
                    )));
                }
                s
            }
        };

        {
            let mut stream = self.stream.borrow_mut();
            streaming::advance_to_line(&mut *stream, s0)?;
        }

        Ok(ReadChunks {
            stream: self.stream.clone(),
            cursor: s0,
            fifo: Vec::new(),
            done: false,
            header_names: self.header.names.clone(),
            dialect: self.sniffer.dialect().clone(),
            col_types,
            tabulator: self.tabulator.clone(),
            errors: self.errors.clone(),
            skips: options.skips.into_iter().collect(),
            indices: options.indices,
            chunksize: options.chunksize.max(1),
            skip_empty: options.skip_empty,
            raise_ragged: options.raise_ragged,
        })
    }

    /// Non-streaming preview: the first `count` rows starting `start` past
    /// autostart, collected eagerly.
    pub fn peek(&mut self, start: usize, count: usize) -> Result<Vec<IndexMap<String, Cell>>> {
        let autostart = self.autostart();
        let indices = Indices::Range {
            start: autostart + start,
            stop: autostart + start + count,
            step: 1,
        };
        let options = ReadOptions {
            indices: Some(indices),
            ..ReadOptions::default()
        };
        let chunks = self.read(options)?;
        let mut rows = Vec::new();
        for chunk in chunks {
            rows.extend(chunk?);
        }
        Ok(rows)
    }

    /// Releases the input stream. Consumes the reader.
    pub fn close(self) {}
}

/// The lazy sequence [`Reader::read`] returns. Owns the stream cursor, the
/// output FIFO, the polled type table, the tabulator, and the error-log
/// handle — the full suspended state between chunk emissions, per §5.
pub struct ReadChunks<R> {
    stream: SharedStream<R>,
    cursor: usize,
    fifo: Vec<IndexMap<String, Cell>>,
    done: bool,
    header_names: Vec<String>,
    dialect: Dialect,
    col_types: Vec<(CellKind, Option<String>)>,
    tabulator: Tabulator,
    errors: Rc<RefCell<ErrorLog>>,
    skips: HashSet<usize>,
    indices: Option<Indices>,
    chunksize: usize,
    skip_empty: bool,
    raise_ragged: bool,
}

impl<R: Read + Seek> ReadChunks<R> {
    fn finish(&mut self) -> Vec<IndexMap<String, Cell>> {
        self.done = true;
        let _ = self.stream.borrow_mut().seek(SeekFrom::Start(0));
        std::mem::take(&mut self.fifo)
    }

    fn process_line(&mut self, raw_line: &str) {
        let l = self.cursor;
        if self.skips.contains(&l) {
            return;
        }
        if let Some(indices) = &self.indices {
            if !indices.contains(l) {
                return;
            }
        }

        let width = self.header_names.len();
        let split = splitter::split(raw_line, &self.dialect, Some(width));

        if self.skip_empty && split.fields.iter().all(String::is_empty) {
            return;
        }

        if !split.surplus.is_empty() || split.short {
            self.errors
                .borrow_mut()
                .ragged
                .push(format!("Unexpected line length on row {l}"));
        }

        let mut row = IndexMap::with_capacity(width);
        for (idx, name) in self.header_names.iter().enumerate() {
            let raw = split.fields.get(idx).cloned().unwrap_or_default();
            let hint = self.col_types.get(idx);
            let value = cell::convert(&raw, hint);
            if let Some((kind, _)) = hint {
                if *kind != CellKind::Text && matches!(value, Cell::Text(_)) {
                    self.errors
                        .borrow_mut()
                        .casting
                        .push(format!("line={l}, column='{name}'"));
                }
            }
            row.insert(name.clone(), value);
        }

        if let Some(projected) = self.tabulator.evaluate(&row) {
            self.fifo.push(projected);
        }
    }
}

impl<R: Read + Seek> Iterator for ReadChunks<R> {
    type Item = Result<Vec<IndexMap<String, Cell>>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if self.fifo.len() >= self.chunksize {
                let chunk = self.fifo.drain(..self.chunksize).collect();
                return Some(Ok(chunk));
            }

            if let Some(indices) = &self.indices {
                if indices.past_end(self.cursor) {
                    return Some(Ok(self.finish()));
                }
            }

            let mut buf = String::new();
            let read = {
                let mut stream = self.stream.borrow_mut();
                stream.read_line(&mut buf)
            };
            match read {
                Ok(0) => return Some(Ok(self.finish())),
                Ok(_) => {
                    let line = buf.trim_end_matches(['\n', '\r']).to_string();
                    let had_ragged_before = self.errors.borrow().ragged.len();
                    self.process_line(&line);
                    if self.raise_ragged
                        && self.errors.borrow().ragged.len() > had_ragged_before
                    {
                        self.done = true;
                        let _ = self.stream.borrow_mut().seek(SeekFrom::Start(0));
                        return Some(Err(TabbedError::InvalidConfig(format!(
                            "ragged line at row {}",
                            self.cursor
                        ))));
                    }
                    self.cursor += 1;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(TabbedError::from(e)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader_for(data: &str) -> Reader<Cursor<Vec<u8>>> {
        Reader::new(Cursor::new(data.as_bytes().to_vec())).unwrap()
    }

    fn drain(chunks: ReadChunks<Cursor<Vec<u8>>>) -> Vec<IndexMap<String, Cell>> {
        chunks.flat_map(|c| c.unwrap()).collect()
    }

    #[test]
    fn reads_all_rows_with_synthesized_header() {
        let mut reader = reader_for("meta line 1\nmeta line 2\n1,2,3\n4,5,6\n7,8,9\n");
        let rows = drain(reader.read(ReadOptions::default()).unwrap());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["Column_0"], Cell::Integer(1));
    }

    #[test]
    fn line_ordering_and_chunk_shape() {
        let mut data = String::from("id,val\n");
        for i in 0..7 {
            data.push_str(&format!("{i},{i}\n"));
        }
        let mut reader = reader_for(&data);
        let chunks: Vec<Vec<IndexMap<String, Cell>>> = reader
            .read(ReadOptions {
                chunksize: 3,
                ..ReadOptions::default()
            })
            .unwrap()
            .map(|c| c.unwrap())
            .collect();
        assert_eq!(chunks[0].len(), 3);
        assert_eq!(chunks[1].len(), 3);
        assert_eq!(chunks[2].len(), 1);
    }

    #[test]
    fn skips_are_excluded() {
        let mut reader = reader_for("id,val\n0,0\n1,1\n2,2\n3,3\n");
        let rows = drain(
            reader
                .read(ReadOptions {
                    skips: vec![2],
                    ..ReadOptions::default()
                })
                .unwrap(),
        );
        let ids: Vec<i64> = rows
            .iter()
            .map(|r| match r["id"] {
                Cell::Integer(i) => i,
                _ => panic!("expected integer"),
            })
            .collect();
        assert_eq!(ids, vec![0, 1, 3]);
    }

    #[test]
    fn ragged_lines_are_logged() {
        let mut reader = reader_for("a,b,c\n1,2,3\n1,2,3,4\n1,2\n");
        reader.set_header(HeaderSpec::Line(0)).unwrap();
        let rows = drain(reader.read(ReadOptions::default()).unwrap());
        assert_eq!(rows.len(), 3);
        assert_eq!(reader.errors().ragged.len(), 2);
    }

    #[test]
    fn casting_fallback_is_logged() {
        let mut reader = reader_for("a,b\n1,2\n3,4\n5,6\n-,8\n");
        let rows = drain(reader.read(ReadOptions::default()).unwrap());
        assert_eq!(rows.last().unwrap()["a"], Cell::Text("-".to_string()));
        assert_eq!(reader.errors().casting.len(), 1);
    }

    #[test]
    fn compound_comparison_filters_rows() {
        let mut data = String::from("count\n");
        for c in [22, 2, 13, 15, 4, 19, 4, 21, 5, 24, 18, 1] {
            data.push_str(&format!("{c}\n"));
        }
        let mut reader = reader_for(&data);
        reader
            .tab(
                Columns::All,
                vec![(
                    "count".to_string(),
                    TabSpec::Comparison(">=4 and <18".to_string()),
                )],
            )
            .unwrap();
        let rows = drain(reader.read(ReadOptions::default()).unwrap());
        let counts: Vec<i64> = rows
            .iter()
            .map(|r| match r["count"] {
                Cell::Integer(i) => i,
                _ => panic!("expected integer"),
            })
            .collect();
        assert_eq!(counts, vec![13, 15, 4, 4, 5]);
    }

    #[test]
    fn header_change_resets_tabulator_and_reports_predicates() {
        let mut reader = reader_for("a,b\n1,2\n3,4\n");
        reader
            .tab(Columns::All, vec![("a".to_string(), TabSpec::Equality(Cell::Integer(1)))])
            .unwrap();
        let had_predicates = reader.set_header(HeaderSpec::Reset).unwrap();
        assert!(had_predicates);
        let rows = drain(reader.read(ReadOptions::default()).unwrap());
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn empty_data_section_yields_one_empty_chunk() {
        let mut reader = reader_for("a,b,c\n");
        reader.set_header(HeaderSpec::Line(0)).unwrap();
        let chunks: Vec<Vec<IndexMap<String, Cell>>> = reader
            .read(ReadOptions::default())
            .unwrap()
            .map(|c| c.unwrap())
            .collect();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_empty());
    }

    #[test]
    fn indices_range_a_a_yields_nothing() {
        let mut reader = reader_for("a,b\n1,2\n3,4\n5,6\n");
        let rows = drain(
            reader
                .read(ReadOptions {
                    indices: Some(Indices::Range {
                        start: 1,
                        stop: 1,
                        step: 1,
                    }),
                    ..ReadOptions::default()
                })
                .unwrap(),
        );
        assert!(rows.is_empty());
        assert!(reader.errors().casting.is_empty());
        assert!(reader.errors().ragged.is_empty());
    }

    #[test]
    fn start_precedes_autostart_is_invalid_config() {
        let mut reader = reader_for("a,b\n1,2\n3,4\n");
        let err = reader.read(ReadOptions {
            start: Some(0),
            ..ReadOptions::default()
        });
        assert!(matches!(err, Err(TabbedError::InvalidConfig(_))));
    }

    #[test]
    fn rewind_makes_reader_reusable() {
        let mut reader = reader_for("a,b\n1,2\n3,4\n");
        let first = drain(reader.read(ReadOptions::default()).unwrap());
        let second = drain(reader.read(ReadOptions::default()).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn peek_previews_without_consuming_full_read_semantics() {
        let mut reader = reader_for("a,b\n1,2\n3,4\n5,6\n7,8\n");
        let rows = reader.peek(0, 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["a"], Cell::Integer(1));
    }
}
