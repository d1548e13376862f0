//! Low-level line-at-a-time helpers shared by [`crate::sniffer::Sniffer`]
//! and [`crate::reader::Reader`] over any `R: Read + Seek`.
//!
//! Every helper here starts by seeking to offset 0: the input stream
//! contract (see SPEC_FULL.md §6) only guarantees forward line reads plus
//! absolute rewind-to-zero, never arbitrary seeks, so "go to line N" is
//! always implemented as "rewind, then skip N lines".

use std::io::{self, BufRead, Seek, SeekFrom};

/// Counts the lines in the stream by a single forward pass, then rewinds.
pub fn count_lines<R: BufRead + Seek>(reader: &mut R) -> io::Result<usize> {
    reader.seek(SeekFrom::Start(0))?;
    let mut count = 0usize;
    let mut buf = String::new();
    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        count += 1;
    }
    reader.seek(SeekFrom::Start(0))?;
    Ok(count)
}

/// Rewinds to line 0, then discards lines until positioned at the start of
/// absolute line `n`. Leaves the cursor there (does not rewind again).
pub fn advance_to_line<R: BufRead + Seek>(reader: &mut R, n: usize) -> io::Result<()> {
    reader.seek(SeekFrom::Start(0))?;
    let mut buf = String::new();
    for _ in 0..n {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
    }
    Ok(())
}

/// Builds a sample window: starting at absolute line `start`, collects up to
/// `amount` non-skipped lines, returning the joined text (one line per
/// entry, newline-terminated) and the absolute line numbers collected.
/// Leaves the stream rewound to offset 0 when done, matching the Sniffer's
/// exclusive ownership of its sample (the Reader never shares a cursor
/// position with a Sniffer resample).
pub fn read_window<R: BufRead + Seek>(
    reader: &mut R,
    start: usize,
    amount: usize,
    skips: &[usize],
) -> io::Result<(String, Vec<usize>)> {
    reader.seek(SeekFrom::Start(0))?;
    let mut text = String::new();
    let mut line_numbers = Vec::new();
    let mut buf = String::new();
    let mut lineno = 0usize;
    while line_numbers.len() < amount {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        if lineno >= start && !skips.contains(&lineno) {
            let trimmed = buf.trim_end_matches(['\n', '\r']);
            text.push_str(trimmed);
            text.push('\n');
            line_numbers.push(lineno);
        }
        lineno += 1;
    }
    reader.seek(SeekFrom::Start(0))?;
    Ok((text, line_numbers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    #[test]
    fn counts_lines_and_rewinds() {
        let mut reader = BufReader::new(Cursor::new(b"a\nb\nc\n".to_vec()));
        assert_eq!(count_lines(&mut reader).unwrap(), 3);
        let mut first = String::new();
        reader.read_line(&mut first).unwrap();
        assert_eq!(first, "a\n");
    }

    #[test]
    fn read_window_skips_requested_lines() {
        let mut reader = BufReader::new(Cursor::new(b"0\n1\n2\n3\n4\n".to_vec()));
        let (text, nums) = read_window(&mut reader, 1, 10, &[2]).unwrap();
        assert_eq!(nums, vec![1, 3, 4]);
        assert_eq!(text, "1\n3\n4\n");
    }

    #[test]
    fn read_window_clamps_to_available_lines() {
        let mut reader = BufReader::new(Cursor::new(b"0\n1\n".to_vec()));
        let (_, nums) = read_window(&mut reader, 0, 100, &[]).unwrap();
        assert_eq!(nums, vec![0, 1]);
    }
}
