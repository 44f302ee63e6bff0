//! Consolidated report persistence / 汇总报告写入

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::Local;
use rand::Rng;

use super::render::render_data;
use super::schema::{display_name, ReportEntry};
use crate::error::{Result, SearchError};

const ENTRY_SEPARATOR_WIDTH: usize = 100;

/// Receives the deferred set when the global gate chooses persistence
pub trait ReportWriter: Send + Sync {
    /// Write every entry, return the path written
    fn persist(&self, entries: &[ReportEntry]) -> Result<PathBuf>;
}

/// Plain UTF-8 text report in a directory created on demand / 文本报告
#[derive(Debug, Clone)]
pub struct TextReportWriter {
    dir: PathBuf,
    global_threshold: usize,
}

impl TextReportWriter {
    pub fn new(dir: impl Into<PathBuf>, global_threshold: usize) -> Self {
        Self { dir: dir.into(), global_threshold }
    }

    /// Full report text
    pub fn render(&self, entries: &[ReportEntry]) -> String {
        let mut out = String::new();
        let separator = "=".repeat(ENTRY_SEPARATOR_WIDTH);

        let _ = writeln!(
            out,
            "=== CONSOLIDATED REPORT: deferred results over {} characters (total length) ===",
            self.global_threshold
        );
        let _ = writeln!(out, "Total entries: {}", entries.len());
        let _ = writeln!(out, "Created: {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"));

        for entry in entries {
            let _ = writeln!(out, "{}", separator);
            let _ = writeln!(out, "FOUND IN FILE: {}", display_name(entry.result.source()));
            let _ = writeln!(out, "Entry length (for checking): {} characters\n", entry.comparison_len());
            let _ = writeln!(out, "{}", render_data(&entry.result));
            out.push('\n');
        }

        out
    }
}

impl ReportWriter for TextReportWriter {
    fn persist(&self, entries: &[ReportEntry]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| SearchError::Report(format!("cannot create {:?}: {}", self.dir, e)))?;

        let path = self.dir.join(format!("report_{}.txt", random_suffix()));
        std::fs::write(&path, self.render(entries))
            .map_err(|e| SearchError::Report(format!("cannot write {:?}: {}", path, e)))?;

        tracing::info!("Report with {} entries written to {:?}", entries.len(), path);
        Ok(path)
    }
}

/// 8 random alphanumerics
fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::schema::{MatchResult, Record};
    use std::sync::Arc;

    fn entries() -> Vec<ReportEntry> {
        let src: Arc<Path> = Arc::from(Path::new("db/people.csv"));
        vec![
            ReportEntry::new(MatchResult::from(Record::fields(
                src.clone(),
                vec![("name".into(), "Ivan".into()), ("phone".into(), "7999".into())],
            ))),
            ReportEntry::new(MatchResult::from(Record::line(Arc::from(Path::new("leak.txt")), "ivan:1".into()))),
        ]
    }

    #[test]
    fn test_report_layout() {
        let text = TextReportWriter::new("reports", 4000).render(&entries());

        assert!(text.starts_with("=== CONSOLIDATED REPORT: deferred results over 4000 characters"));
        assert!(text.contains("Total entries: 2\n"));
        assert!(text.contains("FOUND IN FILE: people.csv\nEntry length (for checking): 9 characters\n\n[ name: ] Ivan\n[ phone: ] 7999\n"));
        assert!(text.contains("[ Match: ] ivan:1\n"));
        assert_eq!(text.matches(&"=".repeat(100)).count(), 2);
    }

    #[test]
    fn test_persist_creates_dir_and_unique_name() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TextReportWriter::new(dir.path().join("nested/reports"), 4000);

        let path = writer.persist(&entries()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("report_") && name.ends_with(".txt"));
        assert_eq!(name.len(), "report_".len() + 8 + ".txt".len());
        assert!(std::fs::read_to_string(&path).unwrap().contains("Total entries: 2"));
    }
}
