//! Delimiter sniffing, tolerant parsing and bounded previews of uploaded
//! delimited text files.
//!
//! [`preview`] is the entry point used by the API. [`sniff`] and [`parse`]
//! are exposed for callers that want a single stage of the pipeline.

mod error;
mod parser;
mod preview;
mod sniff;

pub use error::PreviewError;
pub use parser::{ParseOptions, Table, parse, parse_reader};
pub use preview::{CsvPreview, DEFAULT_MAX_ROWS, preview};
pub use sniff::{CANDIDATE_DELIMITERS, SAMPLE_SIZE, SniffOptions, decode_text, detect, sniff};
