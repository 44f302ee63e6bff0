//! JSON / NDJSON adapter / JSON 文件读取
//!
//! The first value is read from a decoded stream. Content after it, or input that ends
//! inside it, switches to line-delimited reading; other syntax errors fail the file.
//! Only a whole document is held in memory, NDJSON is streamed line by line.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::{DecodedLines, DecodedReader, FormatAdapter, RecordIter};
use crate::error::{Result, SearchError};
use crate::search::schema::Record;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAdapter;

/// Outcome of the whole-document attempt
#[derive(Debug)]
enum Document {
    Whole(Value),
    LineDelimited,
    Invalid(String),
}

impl FormatAdapter for JsonAdapter {
    fn open(&self, path: &Path) -> Result<RecordIter> {
        match parse_document(DecodedReader::open(path)?) {
            Document::Whole(value) => {
                let source: Arc<Path> = Arc::from(path);
                let records: Vec<Result<Record>> = top_level_objects(value)
                    .into_iter()
                    .map(|fields| Ok(Record::fields(source.clone(), fields)))
                    .collect();
                Ok(Box::new(records.into_iter()))
            }
            Document::LineDelimited => {
                tracing::debug!("{:?} is not a single JSON document, reading as NDJSON", path);
                line_records(path)
            }
            Document::Invalid(message) => Err(SearchError::parse(path, message)),
        }
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

fn parse_document(reader: DecodedReader) -> Document {
    let mut stream = serde_json::Deserializer::from_reader(reader).into_iter::<Value>();

    match stream.next() {
        None => Document::Whole(Value::Null),
        // anything after the first value, even garbage, means line-delimited
        Some(Ok(value)) => match stream.next() {
            None => Document::Whole(value),
            Some(_) => Document::LineDelimited,
        },
        Some(Err(e)) if e.is_eof() => Document::LineDelimited,
        Some(Err(e)) => Document::Invalid(e.to_string()),
    }
}

/// Streamed NDJSON records; bad lines are skipped
fn line_records(path: &Path) -> Result<RecordIter> {
    let lines = DecodedLines::open(path)?;
    let source = lines.source();

    Ok(Box::new(lines.flat_map(move |line| -> Vec<Result<Record>> {
        match line {
            Ok(line) => objects_in_line(&line)
                .into_iter()
                .map(|fields| Ok(Record::fields(source.clone(), fields)))
                .collect(),
            Err(e) => vec![Err(e)],
        }
    })))
}

/// Objects on one line; a line that does not parse cleanly yields nothing
fn objects_in_line(line: &str) -> Vec<Vec<(String, String)>> {
    if line.trim().is_empty() {
        return Vec::new();
    }

    let values: std::result::Result<Vec<Value>, _> =
        serde_json::Deserializer::from_str(line).into_iter::<Value>().collect();

    match values {
        Ok(values) => values
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(object_fields(map)),
                _ => None,
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn top_level_objects(value: Value) -> Vec<Vec<(String, String)>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(object_fields(map)),
                _ => None,
            })
            .collect(),
        Value::Object(map) => vec![object_fields(map)],
        _ => Vec::new(),
    }
}

fn object_fields(map: Map<String, Value>) -> Vec<(String, String)> {
    map.into_iter().map(|(k, v)| (k, value_text(v))).collect()
}

/// Strings verbatim, everything else as JSON text
fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
