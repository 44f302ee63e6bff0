//! Delimited-table adapter / 表格文件读取
//!
//! Delimiter is sniffed from a leading sample; detection failure falls back to comma.
//! First row is the header, every following row is one record.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use super::{decode_lossy, DecodedReader, FormatAdapter, RecordIter};
use crate::error::{Result, SearchError};
use crate::search::schema::Record;

/// Candidates in tie-break order
const CANDIDATES: [u8; 5] = [b',', b';', b'\t', b'|', b':'];
const DEFAULT_DELIMITER: u8 = b',';
/// Lines looked at while sniffing
const SNIFF_LINES: usize = 32;

#[derive(Debug, Clone)]
pub struct DelimitedAdapter {
    sniff_bytes: usize,
}

impl Default for DelimitedAdapter {
    fn default() -> Self {
        Self::new(10 * 1024)
    }
}

impl DelimitedAdapter {
    pub fn new(sniff_bytes: usize) -> Self {
        Self { sniff_bytes: sniff_bytes.max(1) }
    }

    /// Pick the delimiter from the file's leading bytes
    fn delimiter_for(&self, path: &Path) -> Result<u8> {
        let mut head = Vec::with_capacity(self.sniff_bytes + 1);
        File::open(path)
            .and_then(|f| f.take(self.sniff_bytes as u64 + 1).read_to_end(&mut head))
            .map_err(|e| SearchError::io(path, e))?;

        let text = decode_lossy(&head, true);
        Ok(match sniff_delimiter(leading_sample(&text, self.sniff_bytes)) {
            Some(d) => {
                tracing::debug!("Sniffed delimiter {:?} for {:?}", d as char, path);
                d
            }
            None => {
                tracing::debug!("Could not sniff delimiter for {:?}, using default dialect", path);
                DEFAULT_DELIMITER
            }
        })
    }
}

impl FormatAdapter for DelimitedAdapter {
    fn open(&self, path: &Path) -> Result<RecordIter> {
        let delimiter = self.delimiter_for(path)?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(DecodedReader::open(path)?);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| SearchError::csv(path, e))?
            .iter()
            .map(str::to_string)
            .collect();

        let source: Arc<Path> = Arc::from(path);
        let err_path = source.clone();

        Ok(Box::new(reader.into_records().map(move |row| {
            let row = row.map_err(|e| SearchError::csv(&err_path, e))?;
            let fields = row
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    let key = headers
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| format!("column_{}", i + 1));
                    (key, value.to_string())
                })
                .collect();
            Ok(Record::fields(source.clone(), fields))
        })))
    }

    fn name(&self) -> &'static str {
        "delimited"
    }
}

/// First `max_bytes` of text, cut back to the last complete line when truncated
fn leading_sample(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let sample = &text[..end];
    match sample.rfind('\n') {
        Some(pos) if pos > 0 => &sample[..pos],
        _ => sample,
    }
}

/// Guess the delimiter: it must occur in the header line and keep the same
/// unquoted count on a strict majority of sampled lines. Best score wins.
pub fn sniff_delimiter(sample: &str) -> Option<u8> {
    let lines: Vec<&str> = sample
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    if lines.is_empty() {
        return None;
    }

    let mut best: Option<(u8, usize)> = None;

    for &candidate in CANDIDATES.iter() {
        let header_count = count_unquoted(lines[0], candidate);
        if header_count == 0 {
            continue;
        }

        let score = lines
            .iter()
            .filter(|l| count_unquoted(l, candidate) == header_count)
            .count();

        if score * 2 <= lines.len() {
            continue;
        }

        if best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }

    best.map(|(d, _)| d)
}

/// Occurrences of `delimiter` outside double quotes
fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for &b in line.as_bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}
