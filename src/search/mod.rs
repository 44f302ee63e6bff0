//! Search module - multi-format record search / 搜索模块
//!
//! Architecture / 架构：
//! - adapters: one reader per flat format, all producing `Record`s
//! - store: SQLite stores, queried through translated SQL
//! - matcher: the single match predicate every path agrees with
//! - coordinator: sequential stores, parallel flat files
//! - aggregator: per-file and global output thresholds
//!
//! Call direction: CLI → Coordinator → (Store | Adapter → Matcher) → Aggregator

pub mod adapters;
pub mod aggregator;
pub mod coordinator;
pub mod discovery;
pub mod matcher;
pub mod output;
pub mod render;
pub mod report;
pub mod schema;
pub mod sql;
pub mod store;

pub use aggregator::{FinalDecision, Thresholds};
pub use coordinator::{SearchCoordinator, SearchSummary};
pub use discovery::discover;
pub use output::{ConsoleOutput, SearchOutput};
pub use report::{ReportWriter, TextReportWriter};
pub use schema::{DataFile, FileFormat, MatchResult, Query, Record, RecordBody, ReportEntry, SearchMode, StorageKind};
