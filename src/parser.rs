use crate::config::ParserConfig;
use crate::error::{PipelineError, Result};
use crate::record::{RawRow, COLUMNS};

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use std::fs;
use std::io::Cursor;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    /// Invalid byte sequences were replaced with U+FFFD.
    Lossy,
}

/// Reads the whole input; the handle is closed before this returns.
pub fn read_input(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|source| PipelineError::InputUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

pub fn decode(bytes: Vec<u8>) -> (String, Encoding) {
    let bytes = if bytes.starts_with(UTF8_BOM) {
        bytes[UTF8_BOM.len()..].to_vec()
    } else {
        bytes
    };

    match String::from_utf8(bytes) {
        Ok(text) => (text, Encoding::Utf8),
        Err(e) => {
            let valid_up_to = e.utf8_error().valid_up_to();
            tracing::warn!(valid_up_to, "Input is not valid UTF-8, decoding with replacement characters");
            let text = String::from_utf8_lossy(e.as_bytes()).into_owned();
            (text, Encoding::Lossy)
        }
    }
}

/// Lazily yields one `RawRow` per non-blank data line.
pub struct RawRows {
    records: StringRecordsIntoIter<Cursor<Vec<u8>>>,
}

impl Iterator for RawRows {
    type Item = RawRow;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let result = self.records.next()?;
            match result {
                Ok(record) => {
                    if is_blank(&record) {
                        continue;
                    }
                    return Some(to_raw_row(&record));
                }
                Err(e) => {
                    let line = e.position().map(|p| p.line() as usize).unwrap_or(0);
                    tracing::warn!(line, error = %e, "Unreadable row");
                    return Some(RawRow {
                        line,
                        fields: Vec::new(),
                        malformed: true,
                    });
                }
            }
        }
    }
}

pub struct ParsedInput {
    pub encoding: Encoding,
    pub rows: RawRows,
}

pub fn parse_bytes(bytes: Vec<u8>, config: &ParserConfig) -> Result<ParsedInput> {
    let delimiter = config.delimiter_byte()?;
    let (text, encoding) = decode(bytes);

    let rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(config.has_headers)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(Cursor::new(text.into_bytes()));

    Ok(ParsedInput {
        encoding,
        rows: RawRows {
            records: rdr.into_records(),
        },
    })
}

fn is_blank(record: &StringRecord) -> bool {
    record.len() <= 1 && record.iter().all(|field| field.is_empty())
}

fn to_raw_row(record: &StringRecord) -> RawRow {
    let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
    RawRow {
        line,
        fields: record.iter().map(str::to_string).collect(),
        malformed: record.len() != COLUMNS.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(input: &[u8], has_headers: bool) -> Vec<RawRow> {
        let config = ParserConfig {
            has_headers,
            ..ParserConfig::default()
        };
        parse_bytes(input.to_vec(), &config).unwrap().rows.collect()
    }

    #[test]
    fn test_splits_fields_and_numbers_lines() {
        let input = b"transaction_id|region|amount|product_id|timestamp\n\
T1|North|250.00|P100|2024-01-05\n\
T2|South|75.00|P200|2024-01-06\n";

        let rows = rows(input, true);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].fields, vec!["T1", "North", "250.00", "P100", "2024-01-05"]);
        assert!(!rows[0].malformed);
        assert_eq!(rows[1].line, 3);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let input = b"T1|North|250.00|P100|2024-01-05\n\n   \nT2|South|75.00|P200|2024-01-06\n";

        let rows = rows(input, false);

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| !r.malformed));
        assert_eq!(rows[1].line, 4);
    }

    #[test]
    fn test_wrong_column_count_is_marked() {
        let input = b"T1|North|250.00\nT2|South|75.00|P200|2024-01-06|extra\n||||||\n";

        let rows = rows(input, false);

        assert_eq!(rows.len(), 3);
        assert!(rows[2].malformed);
        assert!(rows[0].malformed);
        assert_eq!(rows[0].fields.len(), 3);
        assert!(rows[1].malformed);
        assert_eq!(rows[1].fields.len(), 6);
    }

    #[test]
    fn test_fields_are_trimmed_and_quotes_kept() {
        let input = b"  T1 | North |\"250.00\"| P100 |2024-01-05\r\n";

        let rows = rows(input, false);

        assert_eq!(rows[0].fields, vec!["T1", "North", "\"250.00\"", "P100", "2024-01-05"]);
    }

    #[test]
    fn test_invalid_utf8_falls_back_to_lossy() {
        let input = b"T1|M\xFCnchen|250.00|P100|2024-01-05\n".to_vec();

        let parsed = parse_bytes(input, &ParserConfig { has_headers: false, ..ParserConfig::default() }).unwrap();
        assert_eq!(parsed.encoding, Encoding::Lossy);

        let rows: Vec<_> = parsed.rows.collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields[1], "M\u{FFFD}nchen");
    }

    #[test]
    fn test_bom_is_stripped() {
        let (text, encoding) = decode(b"\xEF\xBB\xBFT1|North".to_vec());
        assert_eq!(encoding, Encoding::Utf8);
        assert_eq!(text, "T1|North");
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = read_input("definitely_missing_sales.txt");
        match result {
            Err(PipelineError::InputUnavailable { path, .. }) => {
                assert_eq!(path.to_str(), Some("definitely_missing_sales.txt"));
            }
            _ => panic!("Expected InputUnavailable error"),
        }
    }
}
