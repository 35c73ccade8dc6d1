use std::io::Write;

use csv_preview::{CsvPreview, DEFAULT_MAX_ROWS, PreviewError, preview};
use tempfile::NamedTempFile;

fn write_csv(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

fn numbered_rows(delimiter: char, count: usize) -> String {
    let mut text = format!("id{d}name{d}score\n", d = delimiter);
    for idx in 1..=count {
        text.push_str(&format!("{idx}{d}user{idx}{d}{}\n", idx * 10, d = delimiter));
    }
    text
}

#[test]
fn previews_every_candidate_delimiter() {
    for delimiter in [',', '\t', ';', '|'] {
        for bom in [false, true] {
            let mut bytes = if bom { b"\xEF\xBB\xBF".to_vec() } else { Vec::new() };
            bytes.extend_from_slice(numbered_rows(delimiter, 5).as_bytes());
            let file = write_csv(&bytes);

            let result = preview(file.path(), DEFAULT_MAX_ROWS).unwrap();
            assert_eq!(
                result.headers,
                vec!["id", "name", "score"],
                "delimiter {:?}, bom {}",
                delimiter,
                bom
            );
            assert_eq!(result.rows.len(), 5);
            assert_eq!(result.rows[4], vec!["5", "user5", "50"]);
        }
    }
}

#[test]
fn round_trip_example() {
    let file = write_csv(b"id,name\n1,Alice\n2,Bob");
    let result = preview(file.path(), DEFAULT_MAX_ROWS).unwrap();
    assert_eq!(
        result,
        CsvPreview {
            headers: vec!["id".into(), "name".into()],
            rows: vec![
                vec!["1".into(), "Alice".into()],
                vec!["2".into(), "Bob".into()],
            ],
        }
    );
}

#[test]
fn malformed_line_is_skipped() {
    let file = write_csv(b"id,name\n1,Alice\n2,Bob,oops\n3,Carol\n4,Dave\n");
    let result = preview(file.path(), DEFAULT_MAX_ROWS).unwrap();
    assert_eq!(result.headers, vec!["id", "name"]);
    assert_eq!(
        result.rows,
        vec![vec!["1", "Alice"], vec!["3", "Carol"], vec!["4", "Dave"]]
    );
}

#[test]
fn unclosed_quote_only_costs_its_own_line() {
    let file = write_csv(b"id,name\n1,\"Alice\n2,Bob\n3,Carol\n4,Dave\n");
    let result = preview(file.path(), DEFAULT_MAX_ROWS).unwrap();
    assert_eq!(result.headers, vec!["id", "name"]);
    assert_eq!(
        result.rows,
        vec![vec!["2", "Bob"], vec!["3", "Carol"], vec!["4", "Dave"]]
    );

    let file = write_csv(b"id;name\n1;Alice\n2;\"Bob\n3;Carol\n4;Dave\n5;Eve\n");
    let result = preview(file.path(), DEFAULT_MAX_ROWS).unwrap();
    assert_eq!(result.headers, vec!["id", "name"]);
    assert_eq!(
        result.rows,
        vec![
            vec!["1", "Alice"],
            vec!["3", "Carol"],
            vec!["4", "Dave"],
            vec!["5", "Eve"],
        ]
    );
}

#[test]
fn empty_and_blank_files_give_empty_preview() {
    for bytes in [&b""[..], b"\xEF\xBB\xBF", b"  \n\n\t\n"] {
        let file = write_csv(bytes);
        assert_eq!(preview(file.path(), DEFAULT_MAX_ROWS).unwrap(), CsvPreview::default());
    }
}

#[test]
fn missing_path_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = preview(dir.path().join("gone.csv"), DEFAULT_MAX_ROWS).unwrap_err();
    assert!(matches!(err, PreviewError::NotFound(_)));
}

#[test]
fn directory_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = preview(dir.path(), DEFAULT_MAX_ROWS).unwrap_err();
    assert!(matches!(err, PreviewError::NotFound(_)));
}

#[test]
fn max_rows_truncates() {
    let file = write_csv(numbered_rows(',', 10).as_bytes());
    assert_eq!(preview(file.path(), 3).unwrap().rows.len(), 3);
    assert_eq!(preview(file.path(), 0).unwrap().rows.len(), 10);
    assert_eq!(preview(file.path(), -1).unwrap().rows.len(), 10);
    assert_eq!(preview(file.path(), 50).unwrap().rows.len(), 10);
}

#[test]
fn semicolons_with_decimal_commas() {
    let file = write_csv(b"product;price\nbread;2,50\nmilk;1,25\ncheese;12,00\n");
    let result = preview(file.path(), DEFAULT_MAX_ROWS).unwrap();
    assert_eq!(result.headers, vec!["product", "price"]);
    assert_eq!(result.rows[0], vec!["bread", "2,50"]);
    assert_eq!(result.rows.len(), 3);
}

#[test]
fn spaces_after_delimiter_are_trimmed() {
    let file = write_csv(b"city, country\nOslo, Norway\n\"Paris\", \"France, EU\"\n");
    let result = preview(file.path(), DEFAULT_MAX_ROWS).unwrap();
    assert_eq!(result.headers, vec!["city", "country"]);
    assert_eq!(
        result.rows,
        vec![vec!["Oslo", "Norway"], vec!["Paris", "France, EU"]]
    );
}

#[test]
fn latin1_file_is_readable() {
    let file = write_csv(b"ville;pays\nQu\xe9bec;Canada\nOrl\xe9ans;France\n");
    let result = preview(file.path(), DEFAULT_MAX_ROWS).unwrap();
    assert_eq!(result.rows[0], vec!["Québec", "Canada"]);
    assert_eq!(result.rows[1], vec!["Orléans", "France"]);
}

#[test]
fn single_column_file_is_still_previewed() {
    let file = write_csv(b"name\nAlice\nBob\n");
    let result = preview(file.path(), DEFAULT_MAX_ROWS).unwrap();
    assert_eq!(result.headers, vec!["name"]);
    assert_eq!(result.rows, vec![vec!["Alice"], vec!["Bob"]]);
}

#[test]
fn duplicate_and_empty_headers_are_renamed() {
    let file = write_csv(b"x,x,\n1,2,3\n");
    let result = preview(file.path(), DEFAULT_MAX_ROWS).unwrap();
    assert_eq!(result.headers, vec!["x", "x.1", "Unnamed: 2"]);
}

#[test]
fn quoted_delimiters_stay_in_cell() {
    let file = write_csv(b"name,address\n\"Doe, Jane\",\"1 Main St, Springfield\"\n");
    let result = preview(file.path(), DEFAULT_MAX_ROWS).unwrap();
    assert_eq!(
        result.rows,
        vec![vec!["Doe, Jane", "1 Main St, Springfield"]]
    );
}

#[test]
fn mostly_broken_file_returns_best_effort() {
    // header has two columns, most rows have three
    let file = write_csv(b"a,b\n1,2,3\n4,5,6\n7,8\n9,10,11\n");
    let result = preview(file.path(), DEFAULT_MAX_ROWS).unwrap();
    assert_eq!(result.headers, vec!["a", "b"]);
    assert_eq!(result.rows, vec![vec!["7", "8"]]);
}
