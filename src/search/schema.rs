//! Search schema definitions / 搜索数据模型
//!
//! Query, Record and the result wrappers passed between adapters, the matcher and the aggregator.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// How multiple terms combine / 多关键词组合方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// OR of substrings / 任一命中
    Any,
    /// AND of substrings, each term may hit a different field / 全部命中
    All,
    /// Whole-field equality, single term only / 精确匹配
    Exact,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Any => write!(f, "ANY"),
            SearchMode::All => write!(f, "ALL"),
            SearchMode::Exact => write!(f, "EXACT"),
        }
    }
}

/// Immutable search query / 搜索查询
///
/// Terms are stored lower-cased; blank terms are dropped at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    terms: Vec<String>,
    mode: SearchMode,
}

impl Query {
    pub fn new<I, S>(terms: I, mode: SearchMode) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms: Vec<String> = terms
            .into_iter()
            .filter(|t| !t.as_ref().trim().is_empty())
            .map(|t| t.as_ref().to_lowercase())
            .collect();

        if terms.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        Ok(Self { terms, mode })
    }

    /// Single-term substring query / 单关键词查询
    pub fn any(term: &str) -> Result<Self> {
        Self::new([term], SearchMode::Any)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Exact mode is only satisfiable with exactly one term
    pub fn is_satisfiable(&self) -> bool {
        self.mode != SearchMode::Exact || self.terms.len() == 1
    }
}

/// Storage classification / 存储类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Relational,
    Flat,
}

impl StorageKind {
    /// Short label used in console headers
    pub fn label(&self) -> &'static str {
        match self {
            StorageKind::Relational => "DB",
            StorageKind::Flat => "RAW",
        }
    }
}

/// On-disk encoding of a data file / 文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Delimited,
    Json,
    Text,
    Sqlite,
}

impl FileFormat {
    /// Classify by extension, None for unsupported files / 按扩展名识别
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" | "tsv" => Some(FileFormat::Delimited),
            "json" | "ndjson" | "jsonl" => Some(FileFormat::Json),
            "txt" | "sql" | "log" => Some(FileFormat::Text),
            "db" | "sqlite" | "sqlite3" => Some(FileFormat::Sqlite),
            _ => None,
        }
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            FileFormat::Sqlite => StorageKind::Relational,
            _ => StorageKind::Flat,
        }
    }
}

/// A file handed to the coordinator / 待搜索文件
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataFile {
    pub path: PathBuf,
    pub format: FileFormat,
}

impl DataFile {
    pub fn new(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self { path: path.into(), format }
    }

    /// Build from path, None when the extension is unsupported
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let format = FileFormat::from_path(&path)?;
        Some(Self { path, format })
    }

    pub fn kind(&self) -> StorageKind {
        self.format.kind()
    }

    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }
}

/// Base name of a path for display / 文件名
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Record payload / 记录内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordBody {
    /// Field name to value, in source order
    Fields(Vec<(String, String)>),
    /// One text line
    Line(String),
}

/// One normalized unit of searchable data / 统一记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Provenance only, never identity
    pub source: Arc<Path>,
    /// Set for relational sources
    pub origin_table: Option<String>,
    pub body: RecordBody,
}

impl Record {
    pub fn fields(source: Arc<Path>, fields: Vec<(String, String)>) -> Self {
        Self { source, origin_table: None, body: RecordBody::Fields(fields) }
    }

    pub fn line(source: Arc<Path>, line: String) -> Self {
        Self { source, origin_table: None, body: RecordBody::Line(line) }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.origin_table = Some(table.into());
        self
    }

    /// Values in source order; the line itself for unstructured records
    pub fn values(&self) -> Vec<&str> {
        match &self.body {
            RecordBody::Fields(fields) => fields.iter().map(|(_, v)| v.as_str()).collect(),
            RecordBody::Line(line) => vec![line.as_str()],
        }
    }
}

/// A record that satisfied the query / 命中结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub record: Record,
}

impl MatchResult {
    pub fn source(&self) -> &Path {
        &self.record.source
    }
}

impl From<Record> for MatchResult {
    fn from(record: Record) -> Self {
        Self { record }
    }
}

/// Deferred match plus its comparison string / 延迟输出条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub result: MatchResult,
    pub comparison: String,
}

impl ReportEntry {
    pub fn new(result: MatchResult) -> Self {
        let comparison = comparison_string(&result.record);
        Self { result, comparison }
    }

    /// Character count of the comparison string
    pub fn comparison_len(&self) -> usize {
        self.comparison.chars().count()
    }
}

/// Field values trimmed and space-joined, or the raw line
pub fn comparison_string(record: &Record) -> String {
    match &record.body {
        RecordBody::Fields(fields) => fields
            .iter()
            .map(|(_, v)| v.trim())
            .collect::<Vec<_>>()
            .join(" "),
        RecordBody::Line(line) => line.clone(),
    }
}
