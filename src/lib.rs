//! tabbed: a lazy, chunked reader for irregular delimited text files.
//!
//! Files in the wild routinely skip the RFC 4180 script: a free-form
//! metadata preamble up top, a header row that may or may not exist, and a
//! data section mixing numeric, date/time, and textual cells. This crate
//! infers that structure from a bounded sample, then streams the data
//! section as fixed-size chunks of named, typed rows, with declarative
//! row/column filtering applied inline.
//!
//! # Quick start
//!
//! ```no_run
//! use tabbed::{Reader, ReadOptions};
//! use std::fs::File;
//!
//! let file = File::open("data.csv").unwrap();
//! let mut reader = Reader::new(file).unwrap();
//!
//! for chunk in reader.read(ReadOptions::default()).unwrap() {
//!     for row in chunk.unwrap() {
//!         println!("{:?}", row);
//!     }
//! }
//! println!("{} casting warnings", reader.errors().casting.len());
//! ```
//!
//! # Filtering
//!
//! ```no_run
//! use tabbed::{Reader, ReadOptions, Columns, TabSpec};
//! use std::fs::File;
//!
//! let mut reader = Reader::new(File::open("data.csv").unwrap()).unwrap();
//! reader
//!     .tab(
//!         Columns::Names(vec!["group".into(), "count".into()]),
//!         vec![("count".to_string(), TabSpec::Comparison(">= 4 and < 18".to_string()))],
//!     )
//!     .unwrap();
//! let rows: Vec<_> = reader
//!     .read(ReadOptions::default())
//!     .unwrap()
//!     .flat_map(|chunk| chunk.unwrap())
//!     .collect();
//! ```

mod cell;
mod dialect;
mod error;
mod metadata;
mod reader;
mod sample;
mod sniffer;
mod splitter;
mod streaming;
mod tabulator;
mod tum;

pub use cell::{Cell, CellKind, Classification};
pub use dialect::Dialect;
pub use error::{Result, TabbedError};
pub use metadata::{Header, LineNo, Metadata};
pub use reader::{ErrorLog, HeaderSpec, Indices, ReadChunks, ReadOptions, Reader};
pub use sample::Sample;
pub use sniffer::Sniffer;
pub use tabulator::{Columns, Tab, TabSpec, Tabulator};
