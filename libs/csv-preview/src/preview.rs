use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::error::PreviewError;
use crate::parser::{ParseOptions, Table, parse};
use crate::sniff::{SAMPLE_SIZE, SniffOptions, decode_text, detect, sniff};

/// Rows returned by a preview when the caller does not ask for a limit.
pub const DEFAULT_MAX_ROWS: i64 = 200;

/// Delimiters tried in order once detection has given up.
const FALLBACK_DELIMITERS: [u8; 4] = [b';', b',', b'\t', b'|'];

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvPreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl From<Table> for CsvPreview {
    fn from(table: Table) -> Self {
        Self {
            headers: table.headers,
            rows: table.rows,
        }
    }
}

/// Builds a preview of the delimited file at `path`.
///
/// Only a missing file is an error. Anything else degrades: the delimiter is
/// sniffed from a sample, then detected over the whole file, then guessed from
/// a fixed list, and as a last resort the best partial result is returned.
/// `max_rows` of zero or less returns every row.
pub fn preview(path: impl AsRef<Path>, max_rows: i64) -> Result<CsvPreview, PreviewError> {
    let path = path.as_ref();
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(PreviewError::NotFound(path.to_path_buf())),
        Err(err) => return Err(PreviewError::io(path, err)),
    }

    let limit = usize::try_from(max_rows).ok().filter(|&max| max > 0);
    let mut cascade = Cascade::new(path, limit);

    let sample = read_sample(path)?;
    if sample.len() < SAMPLE_SIZE && decode_text(&sample).trim().is_empty() {
        tracing::debug!("{} is blank", path.display());
        return Ok(CsvPreview::default());
    }

    if let Some(delimiter) = sniff(&sample) {
        if let Some(table) = cascade.attempt(delimiter, "sniffed")? {
            return Ok(table.into());
        }
    }

    match fs::read(path) {
        Ok(bytes) => {
            if let Some(delimiter) = detect(&decode_text(&bytes), SniffOptions::FULL) {
                if let Some(table) = cascade.attempt(delimiter, "full-file detection")? {
                    return Ok(table.into());
                }
            }
        }
        Err(err) => {
            let err = PreviewError::io(path, err);
            if matches!(err, PreviewError::NotFound(_)) {
                return Err(err);
            }
            tracing::debug!("Full read failed, continuing with fallbacks: {}", err);
        }
    }

    for delimiter in FALLBACK_DELIMITERS {
        if let Some(table) = cascade.attempt(delimiter, "fallback")? {
            return Ok(table.into());
        }
    }

    Ok(cascade.into_best_effort())
}

fn read_sample(path: &Path) -> Result<Vec<u8>, PreviewError> {
    let file = File::open(path).map_err(|err| PreviewError::io(path, err))?;
    let mut sample = Vec::with_capacity(SAMPLE_SIZE);
    file.take(SAMPLE_SIZE as u64)
        .read_to_end(&mut sample)
        .map_err(|err| PreviewError::io(path, err))?;
    Ok(sample)
}

/// Parse attempts of a single preview. Each delimiter is parsed at most once.
struct Cascade<'a> {
    path: &'a Path,
    limit: Option<usize>,
    tried: Vec<u8>,
    rejected: Vec<(u8, Table)>,
}

impl<'a> Cascade<'a> {
    fn new(path: &'a Path, limit: Option<usize>) -> Self {
        Self {
            path,
            limit,
            tried: Vec::with_capacity(FALLBACK_DELIMITERS.len()),
            rejected: Vec::new(),
        }
    }

    /// Returns the table when parsing with `delimiter` gives an acceptable result.
    fn attempt(&mut self, delimiter: u8, step: &str) -> Result<Option<Table>, PreviewError> {
        if self.tried.contains(&delimiter) {
            return Ok(None);
        }
        self.tried.push(delimiter);

        let options = ParseOptions {
            max_rows: self.limit,
            ..ParseOptions::default()
        };
        let table = match parse(self.path, delimiter, options) {
            Ok(table) => table,
            Err(err @ PreviewError::NotFound(_)) => return Err(err),
            Err(err) => {
                tracing::debug!("Parsing with {:?} failed: {}", char::from(delimiter), err);
                return Ok(None);
            }
        };

        if is_acceptable(&table) {
            tracing::debug!(
                "Preview of {} uses {:?} ({}): {} columns, {} rows, {} skipped",
                self.path.display(),
                char::from(delimiter),
                step,
                table.headers.len(),
                table.rows.len(),
                table.skipped_rows
            );
            return Ok(Some(table));
        }

        tracing::debug!(
            "Rejected {:?} ({}): {} columns, {} rows, {} skipped",
            char::from(delimiter),
            step,
            table.headers.len(),
            table.rows.len(),
            table.skipped_rows
        );
        self.rejected.push((delimiter, table));
        Ok(None)
    }

    fn into_best_effort(mut self) -> CsvPreview {
        let best = self
            .rejected
            .iter()
            .enumerate()
            .filter(|(_, (_, table))| table.headers.len() > 1)
            .max_by(|(a_idx, (_, a)), (b_idx, (_, b))| {
                a.rows.len().cmp(&b.rows.len()).then(b_idx.cmp(a_idx))
            })
            .map(|(idx, _)| idx)
            .or_else(|| self.rejected.iter().position(|&(delimiter, _)| delimiter == b','));

        match best {
            Some(idx) => {
                let (delimiter, table) = self.rejected.swap_remove(idx);
                tracing::debug!(
                    "No acceptable parse for {}, returning best effort with {:?}",
                    self.path.display(),
                    char::from(delimiter)
                );
                table.into()
            }
            None => {
                tracing::warn!(
                    "Could not parse {} with any delimiter, returning an empty preview",
                    self.path.display()
                );
                CsvPreview::default()
            }
        }
    }
}

/// More than one column and no more skipped rows than kept ones.
fn is_acceptable(table: &Table) -> bool {
    table.headers.len() > 1 && table.skipped_rows <= table.rows.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: usize, rows: usize, skipped_rows: usize) -> Table {
        Table {
            headers: (0..columns).map(|idx| format!("c{}", idx)).collect(),
            rows: vec![vec![String::new(); columns]; rows],
            skipped_rows,
        }
    }

    #[test]
    fn acceptance_needs_columns_and_mostly_good_rows() {
        assert!(is_acceptable(&table(2, 3, 0)));
        assert!(is_acceptable(&table(2, 3, 3)));
        assert!(is_acceptable(&table(2, 0, 0)));
        assert!(!is_acceptable(&table(1, 10, 0)));
        assert!(!is_acceptable(&table(3, 1, 2)));
    }

    #[test]
    fn best_effort_prefers_most_rows_then_earliest() {
        let path = Path::new("unused.csv");
        let mut cascade = Cascade::new(path, None);
        cascade.rejected = vec![
            (b';', table(2, 1, 5)),
            (b',', table(1, 9, 0)),
            (b'\t', table(3, 4, 6)),
            (b'|', table(2, 4, 7)),
        ];
        assert_eq!(cascade.into_best_effort().headers.len(), 3);
    }

    #[test]
    fn best_effort_falls_back_to_comma() {
        let path = Path::new("unused.csv");
        let mut cascade = Cascade::new(path, None);
        cascade.rejected = vec![(b';', table(1, 2, 0)), (b',', table(1, 7, 0))];
        assert_eq!(cascade.into_best_effort().rows.len(), 7);
    }

    #[test]
    fn best_effort_without_results_is_empty() {
        let cascade = Cascade::new(Path::new("unused.csv"), None);
        assert_eq!(cascade.into_best_effort(), CsvPreview::default());
    }
}
