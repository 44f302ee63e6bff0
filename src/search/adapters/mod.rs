//! Format adapters - one reader per flat file format / 文件格式适配器
//!
//! Every adapter turns one file into a single-pass sequence of records.
//! Decoding is permissive: a leading BOM is removed and undecodable bytes are dropped.

pub mod delimited;
pub mod json;
pub mod text;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use encoding_rs::UTF_8;

use super::schema::{FileFormat, Record};
use crate::error::{Result, SearchError};

pub use delimited::DelimitedAdapter;
pub use json::JsonAdapter;
pub use text::TextAdapter;

/// Lazy, finite, non-restartable record stream
pub type RecordIter = Box<dyn Iterator<Item = Result<Record>> + Send>;

/// Reader capability shared by all flat formats / 读取能力接口
pub trait FormatAdapter: Send + Sync {
    /// Open a file and stream its records in natural order
    fn open(&self, path: &Path) -> Result<RecordIter>;

    /// Adapter name for logs
    fn name(&self) -> &'static str;
}

/// The flat-file adapters, selected by file format / 适配器集合
#[derive(Debug, Clone, Default)]
pub struct AdapterSet {
    delimited: DelimitedAdapter,
    json: JsonAdapter,
    text: TextAdapter,
}

impl AdapterSet {
    pub fn new(sniff_bytes: usize) -> Self {
        Self {
            delimited: DelimitedAdapter::new(sniff_bytes),
            json: JsonAdapter,
            text: TextAdapter,
        }
    }

    /// None for relational files, which go through the store instead
    pub fn for_format(&self, format: FileFormat) -> Option<&dyn FormatAdapter> {
        match format {
            FileFormat::Delimited => Some(&self.delimited),
            FileFormat::Json => Some(&self.json),
            FileFormat::Text => Some(&self.text),
            FileFormat::Sqlite => None,
        }
    }
}

/// Decode UTF-8, optionally removing a BOM, dropping invalid bytes
pub fn decode_lossy(bytes: &[u8], strip_bom: bool) -> String {
    let (text, had_errors) = if strip_bom {
        UTF_8.decode_with_bom_removal(bytes)
    } else {
        UTF_8.decode_without_bom_handling(bytes)
    };

    if had_errors {
        text.chars().filter(|&c| c != char::REPLACEMENT_CHARACTER).collect()
    } else {
        text.into_owned()
    }
}

/// Streamed decoded lines without their terminator / 流式逐行读取
pub struct DecodedLines {
    reader: BufReader<File>,
    buf: Vec<u8>,
    first: bool,
    path: Arc<Path>,
}

impl DecodedLines {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| SearchError::io(path, e))?;
        Ok(Self {
            reader: BufReader::with_capacity(256 * 1024, file),
            buf: Vec::new(),
            first: true,
            path: Arc::from(path),
        })
    }

    pub fn source(&self) -> Arc<Path> {
        self.path.clone()
    }
}

impl Iterator for DecodedLines {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                let mut end = self.buf.len();
                while end > 0 && matches!(self.buf[end - 1], b'\n' | b'\r') {
                    end -= 1;
                }
                let line = decode_lossy(&self.buf[..end], self.first);
                self.first = false;
                Some(Ok(line))
            }
            Err(e) => Some(Err(SearchError::io(&self.path, e))),
        }
    }
}

/// `DecodedLines` re-joined with `\n`, for parsers that want a byte stream
pub struct DecodedReader {
    lines: DecodedLines,
    pending: Vec<u8>,
    pos: usize,
}

impl DecodedReader {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            lines: DecodedLines::open(path)?,
            pending: Vec::new(),
            pos: 0,
        })
    }
}

impl Read for DecodedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.pending.len() {
            match self.lines.next() {
                None => return Ok(0),
                Some(Ok(line)) => {
                    self.pending = line.into_bytes();
                    self.pending.push(b'\n');
                    self.pos = 0;
                }
                Some(Err(e)) => return Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
            }
        }

        let n = buf.len().min(self.pending.len() - self.pos);
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_decode_drops_bom_and_bad_bytes() {
        let bytes = b"\xEF\xBB\xBFab\xFFc";
        assert_eq!(decode_lossy(bytes, true), "abc");
        assert_eq!(decode_lossy(b"\xEF\xBB\xBFx", false), "\u{FEFF}x");
    }

    #[test]
    fn test_decoded_lines_strip_terminators() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"\xEF\xBB\xBFone\r\ntwo\n\nthree").unwrap();
        drop(f);

        let lines: Vec<String> = DecodedLines::open(&path).unwrap().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["one", "two", "", "three"]);
    }

    #[test]
    fn test_decoded_reader_streams_clean_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        std::fs::write(&path, b"\xEF\xBB\xBF[\"iv\xFFan\",\r\n 1]").unwrap();

        let mut reader = DecodedReader::open(&path).unwrap();
        let mut small = [0u8; 3];
        let mut out = Vec::new();
        loop {
            let n = reader.read(&mut small).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&small[..n]);
        }
        assert_eq!(String::from_utf8(out).unwrap(), "[\"ivan\",\n 1]\n");
    }

    #[test]
    fn test_sqlite_has_no_flat_adapter() {
        let set = AdapterSet::default();
        assert!(set.for_format(FileFormat::Sqlite).is_none());
        assert_eq!(set.for_format(FileFormat::Json).map(|a| a.name()), Some("json"));
    }
}
