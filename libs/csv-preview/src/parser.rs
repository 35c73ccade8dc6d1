use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::PreviewError;
use crate::sniff::{UTF8_BOM, latin1};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Drop spaces that follow a delimiter, so `a, b` yields `b`.
    pub trim_initial_space: bool,
    /// Stop once this many data rows have been kept.
    pub max_rows: Option<usize>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            trim_initial_space: true,
            max_rows: None,
        }
    }
}

/// Header and data rows of a parsed file, every cell as text.
///
/// Every row in `rows` has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Data rows dropped because their field count did not match the header.
    pub skipped_rows: usize,
}

/// Parses the file at `path` with a fixed delimiter.
///
/// The first record is the header. Malformed rows are skipped rather than
/// failing the parse, and an empty file yields an empty table.
pub fn parse(path: &Path, delimiter: u8, options: ParseOptions) -> Result<Table, PreviewError> {
    let file = File::open(path).map_err(|err| PreviewError::io(path, err))?;
    parse_reader(file, delimiter, options)
}

pub fn parse_reader<R: Read>(
    mut input: R,
    delimiter: u8,
    options: ParseOptions,
) -> Result<Table, PreviewError> {
    let mut raw = Vec::new();
    input.read_to_end(&mut raw).map_err(csv::Error::from)?;
    let raw = raw.strip_prefix(UTF8_BOM).unwrap_or(&raw[..]);

    let (text, dropped) = clean_input(raw, delimiter, options.trim_initial_space);
    read_table(&text, &dropped, delimiter, options)
}

/// Tokenizes `text`. `dropped` holds the offsets at which corrupt lines were
/// cut out; those that fall inside the consumed input count as skipped rows.
fn read_table(
    text: &[u8],
    dropped: &[usize],
    delimiter: u8,
    options: ParseOptions,
) -> Result<Table, PreviewError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text);
    let mut record = csv::ByteRecord::new();

    if !reader.read_byte_record(&mut record)? {
        return Ok(Table::default());
    }

    let mut table = Table {
        headers: normalize_headers(record.iter().map(decode_cell).collect()),
        ..Table::default()
    };

    if options.max_rows == Some(0) {
        return Ok(table);
    }

    let mut line = 1;
    let mut stopped_early = false;
    while reader.read_byte_record(&mut record)? {
        line += 1;
        if record.len() != table.headers.len() {
            tracing::trace!(
                "Skipping row {}: {} fields, expected {}",
                line,
                record.len(),
                table.headers.len()
            );
            table.skipped_rows += 1;
            continue;
        }

        table.rows.push(record.iter().map(decode_cell).collect());
        if options.max_rows.is_some_and(|max| table.rows.len() >= max) {
            stopped_early = true;
            break;
        }
    }

    let consumed = reader.position().byte();
    table.skipped_rows += dropped
        .iter()
        .filter(|&&at| !stopped_early || (at as u64) < consumed)
        .count();

    Ok(table)
}

fn decode_cell(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(text) => text.to_string(),
        Err(_) => latin1(raw),
    }
}

/// Where a record sits relative to quoting, as the csv tokenizer sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    LineStart,
    AfterDelimiter,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

impl FieldState {
    fn next(self, byte: u8, delimiter: u8) -> Self {
        use FieldState::*;

        let line_end = byte == b'\n' || byte == b'\r';
        match self {
            LineStart | AfterDelimiter => match byte {
                b'"' => Quoted,
                b if b == delimiter => AfterDelimiter,
                _ if line_end => LineStart,
                _ => Unquoted,
            },
            Unquoted | QuoteInQuoted if byte == delimiter => AfterDelimiter,
            Unquoted | QuoteInQuoted if line_end => LineStart,
            Unquoted => Unquoted,
            Quoted if byte == b'"' => QuoteInQuoted,
            Quoted => Quoted,
            QuoteInQuoted if byte == b'"' => Quoted,
            QuoteInQuoted => Unquoted,
        }
    }

    fn in_quotes(self) -> bool {
        matches!(self, FieldState::Quoted | FieldState::QuoteInQuoted)
    }
}

/// Drops spaces that directly follow a delimiter outside of quotes.
///
/// This has to happen before tokenizing: in ` "a, b"` the leading space
/// keeps the reader from treating the field as quoted, and the embedded
/// delimiter would split it.
fn skip_initial_space(raw: &[u8], delimiter: u8) -> Vec<u8> {
    let mut state = FieldState::LineStart;
    let mut kept = Vec::with_capacity(raw.len());
    for &byte in raw {
        if state == FieldState::AfterDelimiter && byte == b' ' {
            continue;
        }
        state = state.next(byte, delimiter);
        kept.push(byte);
    }
    kept
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenQuote {
    /// First byte of the record holding the quote.
    record_start: usize,
    /// Offset of the opening quote itself.
    quote: usize,
}

/// Finds a quote that is opened and never closed before the end of `text`.
fn unclosed_quote(text: &[u8], delimiter: u8) -> Option<OpenQuote> {
    let mut state = FieldState::LineStart;
    let mut record_start = 0;
    let mut open = None;
    for (idx, &byte) in text.iter().enumerate() {
        let next = state.next(byte, delimiter);
        if next == FieldState::Quoted && !state.in_quotes() {
            open = Some(OpenQuote {
                record_start,
                quote: idx,
            });
        }
        if next == FieldState::LineStart && byte == b'\n' {
            record_start = idx + 1;
        }
        state = next;
    }
    open.filter(|_| state == FieldState::Quoted)
}

/// Prepares raw bytes for the tokenizer.
///
/// Spaces after delimiters are dropped when `trim` is set, and records whose
/// opening quote is never closed are cut out. Left alone, such a quote makes
/// the tokenizer read the rest of the file into a single cell. The record is
/// removed up to the end of the physical line holding the quote and parsing
/// resumes on the next line. A stray quote in the header only loses the quote
/// character. Returns the cleaned text and the offsets at which records were
/// removed.
fn clean_input(raw: &[u8], delimiter: u8, trim: bool) -> (Vec<u8>, Vec<usize>) {
    let mut text = raw.to_vec();
    let mut dropped = Vec::new();
    // `from` always sits at a record boundary; nothing before it changes again
    let mut from = 0;
    loop {
        if trim {
            let tail = skip_initial_space(&text[from..], delimiter);
            text.truncate(from);
            text.extend_from_slice(&tail);
        }

        let Some(open) = unclosed_quote(&text[from..], delimiter) else {
            break;
        };
        let record_start = from + open.record_start;
        let quote = from + open.quote;
        if record_start == 0 {
            text.remove(quote);
            continue;
        }

        let line_end = text[quote..]
            .iter()
            .position(|&byte| byte == b'\n')
            .map_or(text.len(), |idx| quote + idx + 1);
        tracing::trace!(
            "Dropping record at byte {} with an unclosed quote",
            record_start
        );
        text.drain(record_start..line_end);
        dropped.push(record_start);
        from = record_start;
    }
    (text, dropped)
}

/// Names empty headers `Unnamed: <idx>` and suffixes repeats with `.1`, `.2`, ...
fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let name = if name.trim().is_empty() {
                format!("Unnamed: {}", idx)
            } else {
                name
            };
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name
            } else {
                format!("{}.{}", name, count)
            };
            *count += 1;
            unique
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(text: &str, delimiter: u8) -> Table {
        parse_reader(text.as_bytes(), delimiter, ParseOptions::default()).unwrap()
    }

    #[test]
    fn first_record_is_header() {
        let table = parse_str("id,name\n1,Alice\n2,Bob\n", b',');
        assert_eq!(table.headers, vec!["id", "name"]);
        assert_eq!(
            table.rows,
            vec![vec!["1", "Alice"], vec!["2", "Bob"]]
        );
        assert_eq!(table.skipped_rows, 0);
    }

    #[test]
    fn skips_rows_with_wrong_field_count() {
        let table = parse_str("a;b\n1;2\n3;4;5\n6\n7;8\n", b';');
        assert_eq!(table.rows, vec![vec!["1", "2"], vec!["7", "8"]]);
        assert_eq!(table.skipped_rows, 2);
    }

    #[test]
    fn trims_space_after_delimiter() {
        let table = parse_str("a, b\n1, 2\n", b',');
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows, vec![vec!["1", "2"]]);
    }

    #[test]
    fn keeps_spaces_when_trimming_is_off() {
        let options = ParseOptions {
            trim_initial_space: false,
            max_rows: None,
        };
        let table = parse_reader("a, b\n1, 2\n".as_bytes(), b',', options).unwrap();
        assert_eq!(table.headers, vec!["a", " b"]);
    }

    #[test]
    fn unquotes_field_after_trimmed_space() {
        let table = parse_str("name, city\nx, \"Oslo, Norway\"\n", b',');
        assert_eq!(table.rows, vec![vec!["x", "Oslo, Norway"]]);
    }

    #[test]
    fn quoted_fields_may_span_lines() {
        let table = parse_str("id,note\n1,\"two\nlines\"\n2,plain\n", b',');
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], "two\nlines");
    }

    #[test]
    fn unclosed_quote_drops_only_its_line() {
        let table = parse_str("id,name\n1,\"Alice\n2,Bob\n3,Carol\n", b',');
        assert_eq!(table.rows, vec![vec!["2", "Bob"], vec!["3", "Carol"]]);
        assert_eq!(table.skipped_rows, 1);
    }

    #[test]
    fn closed_multiline_quote_survives_a_later_unclosed_one() {
        let table = parse_str("a;b\n1;\"x\ny\"\n2;\"z\n3;w\n", b';');
        assert_eq!(table.rows, vec![vec!["1", "x\ny"], vec!["3", "w"]]);
        assert_eq!(table.skipped_rows, 1);
    }

    #[test]
    fn unclosed_quote_after_trimmed_space() {
        let table = parse_str("a, b\n1, \"x\n2, y\n", b',');
        assert_eq!(table.rows, vec![vec!["2", "y"]]);
        assert_eq!(table.skipped_rows, 1);
    }

    #[test]
    fn stray_quote_in_header_is_removed() {
        let table = parse_str("id,\"name\n1,Alice\n", b',');
        assert_eq!(table.headers, vec!["id", "name"]);
        assert_eq!(table.rows, vec![vec!["1", "Alice"]]);
    }

    #[test]
    fn drops_past_the_row_limit_are_not_counted() {
        let options = ParseOptions {
            max_rows: Some(1),
            ..ParseOptions::default()
        };
        let table = parse_reader("n,m\n1,2\n3,\"4\n5,6\n".as_bytes(), b',', options).unwrap();
        assert_eq!(table.rows, vec![vec!["1", "2"]]);
        assert_eq!(table.skipped_rows, 0);
    }

    #[test]
    fn empty_input_is_empty_table() {
        assert_eq!(parse_str("", b','), Table::default());
    }

    #[test]
    fn bom_is_removed_from_first_header() {
        let table = parse_str("\u{feff}id,name\n1,a\n", b',');
        assert_eq!(table.headers, vec!["id", "name"]);
    }

    #[test]
    fn latin1_cells_are_decoded() {
        let table = parse_reader(&b"ville\nQu\xe9bec\n"[..], b',', ParseOptions::default()).unwrap();
        assert_eq!(table.rows, vec![vec!["Québec"]]);
    }

    #[test]
    fn headers_are_normalized() {
        let table = parse_str("a,,a,a\n1,2,3,4\n", b',');
        assert_eq!(table.headers, vec!["a", "Unnamed: 1", "a.1", "a.2"]);
    }

    #[test]
    fn max_rows_stops_early() {
        let options = ParseOptions {
            max_rows: Some(2),
            ..ParseOptions::default()
        };
        let table = parse_reader("n\n1\n2\n3\n4\n".as_bytes(), b',', options).unwrap();
        assert_eq!(table.rows, vec![vec!["1"], vec!["2"]]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = parse(Path::new("/definitely/not/here.csv"), b',', ParseOptions::default())
            .unwrap_err();
        assert!(matches!(err, PreviewError::NotFound(_)));
    }
}
