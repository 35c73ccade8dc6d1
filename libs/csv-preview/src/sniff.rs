use std::borrow::Cow;
use std::collections::HashMap;

/// Bytes read from the head of a file for delimiter detection.
pub const SAMPLE_SIZE: usize = 128 * 1024;

/// Delimiters considered by detection, in tie-break order.
pub const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

pub(crate) const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SniffOptions {
    /// Records inspected per candidate, `None` inspects all of them.
    pub max_records: Option<usize>,
    /// Share of records that must agree on the field count.
    pub min_consistency: f64,
}

impl SniffOptions {
    /// Strict settings for a sample taken from the head of a file.
    pub const SAMPLE: SniffOptions = SniffOptions {
        max_records: Some(200),
        min_consistency: 0.9,
    };

    /// Looser settings used when the whole file is available.
    pub const FULL: SniffOptions = SniffOptions {
        max_records: None,
        min_consistency: 0.5,
    };
}

/// Guesses the field delimiter of a file from a prefix of its bytes.
///
/// A sample of exactly [`SAMPLE_SIZE`] bytes is treated as truncated and its
/// trailing partial line is left out. Returns `None` when no candidate splits
/// the sample consistently.
pub fn sniff(sample: &[u8]) -> Option<u8> {
    let decoded = decode_text(sample);
    let text = if sample.len() >= SAMPLE_SIZE {
        complete_lines(&decoded)
    } else {
        decoded.as_ref()
    };

    let detected = detect(text, SniffOptions::SAMPLE);
    tracing::debug!("Sniffed delimiter: {:?}", detected.map(char::from));
    detected
}

/// Decodes bytes as UTF-8 without a byte-order mark, falling back to Latin-1.
///
/// Never fails. A multi-byte sequence cut off at the very end keeps its
/// valid prefix instead of forcing the Latin-1 fallback.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(err) if err.error_len().is_none() => {
            Cow::Borrowed(std::str::from_utf8(&bytes[..err.valid_up_to()]).unwrap_or_default())
        }
        Err(_) => Cow::Owned(latin1(bytes)),
    }
}

pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Picks the candidate delimiter with the most consistent field count.
pub fn detect(text: &str, options: SniffOptions) -> Option<u8> {
    let mut best: Option<(f64, u8)> = None;

    for delimiter in CANDIDATE_DELIMITERS {
        let Some(consistency) = consistency(text, delimiter, options.max_records) else {
            continue;
        };
        tracing::trace!(
            "Delimiter {:?} consistency {:.2}",
            char::from(delimiter),
            consistency
        );

        if consistency < options.min_consistency {
            continue;
        }
        match best {
            Some((current, _)) if current >= consistency => {}
            _ => best = Some((consistency, delimiter)),
        }
    }

    best.map(|(_, delimiter)| delimiter)
}

/// Share of records whose field count equals the most common field count.
///
/// `None` when the most common count is a single field, i.e. the delimiter
/// does not split the text at all.
fn consistency(text: &str, delimiter: u8, max_records: Option<usize>) -> Option<f64> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut field_counts: HashMap<usize, usize> = HashMap::new();
    let mut total = 0usize;
    for record in reader.byte_records() {
        let Ok(record) = record else {
            break;
        };
        *field_counts.entry(record.len()).or_insert(0) += 1;
        total += 1;
        if max_records.is_some_and(|max| total >= max) {
            break;
        }
    }

    let (&fields, &agreeing) = field_counts
        .iter()
        .max_by_key(|&(&fields, &records)| (records, fields))?;
    if fields < 2 {
        return None;
    }

    Some(agreeing as f64 / total as f64)
}

/// Drops the trailing line of a truncated sample.
fn complete_lines(text: &str) -> &str {
    match text.rfind('\n') {
        Some(idx) if idx + 1 < text.len() => &text[..=idx],
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_candidate() {
        assert_eq!(sniff(b"a,b,c\n1,2,3\n4,5,6\n"), Some(b','));
        assert_eq!(sniff(b"a\tb\tc\n1\t2\t3\n"), Some(b'\t'));
        assert_eq!(sniff(b"a;b;c\n1;2;3\n"), Some(b';'));
        assert_eq!(sniff(b"a|b|c\n1|2|3\n"), Some(b'|'));
    }

    #[test]
    fn decimal_commas_do_not_fool_detection() {
        let sample = b"price;qty\n1,50;2\n3,25;10\n12,00;1\n";
        assert_eq!(sniff(sample), Some(b';'));
    }

    #[test]
    fn quoted_delimiters_are_ignored() {
        let sample = b"name,city\n\"Smith; John\",Oslo\n\"Doe; Jane\",Bergen\n";
        assert_eq!(sniff(sample), Some(b','));
    }

    #[test]
    fn single_column_has_no_delimiter() {
        assert_eq!(sniff(b"name\nAlice\nBob\n"), None);
        assert_eq!(sniff(b""), None);
    }

    #[test]
    fn inconsistent_sample_is_rejected() {
        let sample = b"a,b\n1,2,3\n4\n5,6,7,8\n";
        assert_eq!(sniff(sample), None);
    }

    #[test]
    fn full_options_tolerate_a_bad_line() {
        let text = "id,name\n1,Alice\n2,Bob,extra\n3,Carol\n";
        assert_eq!(detect(text, SniffOptions::SAMPLE), None);
        assert_eq!(detect(text, SniffOptions::FULL), Some(b','));
    }

    #[test]
    fn decode_strips_bom() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFid,name"), "id,name");
    }

    #[test]
    fn decode_falls_back_to_latin1() {
        assert_eq!(decode_text(b"caf\xe9 cr\xe8me"), "café crème");
    }

    #[test]
    fn decode_keeps_prefix_of_cut_sequence() {
        // "é" is 0xC3 0xA9 in UTF-8; the sample ends after the first byte
        assert_eq!(decode_text(b"ab\xC3"), "ab");
    }

    #[test]
    fn partial_trailing_line_is_dropped() {
        assert_eq!(complete_lines("a;b\n1;2\n3;"), "a;b\n1;2\n");
        assert_eq!(complete_lines("a;b\n1;2\n"), "a;b\n1;2\n");
        assert_eq!(complete_lines("a;b"), "a;b");
    }
}
