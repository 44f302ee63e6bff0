//! Plain-text adapter: one record per line

use std::path::Path;

use super::{DecodedLines, FormatAdapter, RecordIter};
use crate::error::Result;
use crate::search::schema::Record;

#[derive(Debug, Clone, Copy, Default)]
pub struct TextAdapter;

impl FormatAdapter for TextAdapter {
    fn open(&self, path: &Path) -> Result<RecordIter> {
        let lines = DecodedLines::open(path)?;
        let source = lines.source();

        Ok(Box::new(lines.map(move |line| {
            line.map(|l| Record::line(source.clone(), l.trim_end().to_string()))
        })))
    }

    fn name(&self) -> &'static str {
        "text"
    }
}
