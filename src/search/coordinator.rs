//! Search coordinator - dual-path execution / 搜索调度
//!
//! 特性：
//! - SQLite 数据库按顺序逐个查询（SQL 翻译，已有索引，无需并发）
//! - 平面文件使用线程池并行扫描，每个任务独占一个文件
//! - 单个文件失败只影响该文件，不中断整个搜索
//!
//! Results stay grouped by file until the aggregator has seen them.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use super::adapters::AdapterSet;
use super::aggregator::{gate_file, Accumulator, FileOutcome, FinalDecision, Thresholds};
use super::matcher::matches;
use super::output::SearchOutput;
use super::report::{ReportWriter, TextReportWriter};
use super::schema::{DataFile, MatchResult, Query, StorageKind};
use super::store::search_store;
use crate::config::AppConfig;
use crate::error::{Result, SearchError};

/// What one search did / 搜索摘要
#[derive(Debug, Clone, Default)]
pub struct SearchSummary {
    /// Shown immediately plus deferred
    pub total_matches: usize,
    pub shown_immediately: usize,
    /// Deferred entries printed after the global gate
    pub deferred_displayed: usize,
    /// Deferred entries written to the report
    pub persisted: usize,
    pub report_path: Option<PathBuf>,
    /// Files that failed and contributed nothing
    pub failed_files: Vec<PathBuf>,
    pub elapsed: Duration,
}

/// One flat file's scan result, as sent back by a worker
type FlatOutcome = (DataFile, Result<Vec<MatchResult>>);

pub struct SearchCoordinator {
    thresholds: Thresholds,
    max_workers: Option<usize>,
    adapters: Arc<AdapterSet>,
    writer: Box<dyn ReportWriter>,
}

impl SearchCoordinator {
    pub fn new(thresholds: Thresholds, writer: Box<dyn ReportWriter>) -> Self {
        Self {
            thresholds,
            max_workers: None,
            adapters: Arc::new(AdapterSet::default()),
            writer,
        }
    }

    /// Coordinator with thresholds, workers and report directory from config
    pub fn from_config(config: &AppConfig) -> Self {
        let writer = TextReportWriter::new(config.get_reports_dir(), config.search.global_threshold);
        Self::new(config.thresholds(), Box::new(writer))
            .with_max_workers(config.search.max_workers)
            .with_adapters(AdapterSet::new(config.search.sniff_bytes))
    }

    pub fn with_max_workers(mut self, max_workers: Option<usize>) -> Self {
        self.max_workers = max_workers.filter(|&n| n > 0);
        self
    }

    pub fn with_adapters(mut self, adapters: AdapterSet) -> Self {
        self.adapters = Arc::new(adapters);
        self
    }

    /// Pool size for `flat_files` files: never more threads than files
    pub fn worker_count(&self, flat_files: usize) -> usize {
        let available = self.max_workers.unwrap_or_else(num_cpus::get).max(1);
        available.min(flat_files)
    }

    /// Run one search over `files` / 执行搜索
    pub async fn run(&self, query: &Query, files: &[DataFile], output: &mut dyn SearchOutput) -> SearchSummary {
        let started = Instant::now();
        let (relational, flat): (Vec<DataFile>, Vec<DataFile>) = files
            .iter()
            .cloned()
            .partition(|f| f.kind() == StorageKind::Relational);

        let workers = self.worker_count(flat.len());
        tracing::info!(
            "Searching {} stores and {} flat files, mode {}, {} terms",
            relational.len(),
            flat.len(),
            query.mode(),
            query.terms().len()
        );
        if !query.is_satisfiable() {
            tracing::debug!("Exact mode with several terms can match nothing");
        }
        output.banner(relational.len(), flat.len(), workers);

        let mut acc = Accumulator::new();
        let mut failed_files = Vec::new();

        // 数据库：顺序执行
        for file in &relational {
            let results = match search_store(&file.path, query).await {
                Ok((results, skipped)) => {
                    for note in &skipped {
                        output.advisory(&format!("SQLite {}: {}", file.file_name(), note));
                    }
                    results
                }
                Err(e) => {
                    tracing::warn!("Store {:?} failed: {}", file.path, e);
                    output.advisory(&format!("SQLite error in {}: {}", file.file_name(), e));
                    failed_files.push(file.path.clone());
                    Vec::new()
                }
            };
            self.settle(file, results, &mut acc, output);
        }
        if !relational.is_empty() {
            tracing::info!("Store search finished");
        }

        // 平面文件：并行扫描，全部完成后再逐个过阈值
        if !flat.is_empty() {
            let adapters = self.adapters.clone();
            let shared_query = Arc::new(query.clone());
            let submitted = flat.clone();

            let outcomes = tokio::task::spawn_blocking(move || scan_parallel(adapters, shared_query, flat, workers))
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("Flat scan task aborted: {}", e);
                    submitted
                        .into_iter()
                        .map(|file| (file, Err(SearchError::Pool(e.to_string()))))
                        .collect()
                });

            tracing::info!("Parallel scan finished, processing results");
            for (file, outcome) in outcomes {
                let results = match outcome {
                    Ok(results) => results,
                    Err(e) => {
                        tracing::warn!("Scan of {:?} failed: {}", file.path, e);
                        output.advisory(&format!("File {} failed: {}", file.file_name(), e));
                        failed_files.push(file.path.clone());
                        Vec::new()
                    }
                };
                self.settle(&file, results, &mut acc, output);
            }
        }

        let total_matches = acc.total_matches();
        let shown_immediately = acc.shown();
        output.finished(started.elapsed(), total_matches, acc.deferred(), acc.estimate(&self.thresholds));

        let mut summary = SearchSummary {
            total_matches,
            shown_immediately,
            failed_files,
            ..Default::default()
        };

        match acc.finish(&self.thresholds) {
            FinalDecision::Nothing => {}
            FinalDecision::Display { entries, .. } => {
                output.deferred_shown(&entries, self.thresholds.global);
                summary.deferred_displayed = entries.len();
            }
            FinalDecision::Persist { entries, estimate } => {
                output.deferred_persisting(estimate, self.thresholds.global);
                match self.writer.persist(&entries) {
                    Ok(path) => {
                        output.report_persisted(&path, entries.len());
                        summary.persisted = entries.len();
                        summary.report_path = Some(path);
                    }
                    Err(e) => {
                        // 报告写入失败时退回到终端输出，结果不丢失
                        tracing::error!("Report persistence failed: {}", e);
                        output.advisory(&format!("Could not save the report ({}), printing instead", e));
                        output.deferred_shown(&entries, self.thresholds.global);
                        summary.deferred_displayed = entries.len();
                    }
                }
            }
        }

        summary.elapsed = started.elapsed();
        tracing::info!(
            "Search done in {:.2}s: {} matches, {} failed files",
            summary.elapsed.as_secs_f64(),
            summary.total_matches,
            summary.failed_files.len()
        );
        summary
    }

    /// Per-file gate for one finished file, then hand the outcome to the accumulator
    fn settle(&self, file: &DataFile, results: Vec<MatchResult>, acc: &mut Accumulator, output: &mut dyn SearchOutput) {
        let outcome = gate_file(results, &self.thresholds);
        tracing::debug!("{}: {} matches", file.file_name(), outcome.match_count());

        match &outcome {
            FileOutcome::Empty => {}
            FileOutcome::Immediate { results, blocks, .. } => output.file_shown(file, results, blocks),
            FileOutcome::Deferred { rendered_len, .. } => {
                output.file_deferred(file, *rendered_len, self.thresholds.per_file)
            }
        }
        acc.absorb(outcome);
    }
}

/// Adapter + matcher over one flat file, in the file's natural order / 扫描单个文件
pub fn scan_file(adapters: &AdapterSet, query: &Query, file: &DataFile) -> Result<Vec<MatchResult>> {
    let adapter = adapters
        .for_format(file.format)
        .ok_or_else(|| SearchError::parse(&file.path, "not a flat file"))?;

    tracing::debug!("Scanning {:?} with the {} adapter", file.path, adapter.name());

    let mut results = Vec::new();
    for record in adapter.open(&file.path)? {
        let record = record?;
        if matches(query, &record) {
            results.push(MatchResult::from(record));
        }
    }
    Ok(results)
}

/// Fan flat files out over a bounded pool, collected in completion order.
/// Blocks until every task has reported.
fn scan_parallel(adapters: Arc<AdapterSet>, query: Arc<Query>, files: Vec<DataFile>, workers: usize) -> Vec<FlatOutcome> {
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("scan-{}", i))
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!("Cannot start worker pool ({}), scanning sequentially", e);
            return files
                .into_iter()
                .map(|file| {
                    let outcome = isolated_scan(&adapters, &query, &file);
                    (file, outcome)
                })
                .collect();
        }
    };

    let (tx, rx) = mpsc::channel::<FlatOutcome>();
    for file in files {
        let tx = tx.clone();
        let adapters = adapters.clone();
        let query = query.clone();

        pool.spawn(move || {
            let outcome = isolated_scan(&adapters, &query, &file);
            // receiver lives until every sender is gone
            let _ = tx.send((file, outcome));
        });
    }
    drop(tx);

    rx.into_iter().collect()
}

/// `scan_file` with panics turned into errors
fn isolated_scan(adapters: &AdapterSet, query: &Query, file: &DataFile) -> Result<Vec<MatchResult>> {
    panic::catch_unwind(AssertUnwindSafe(|| scan_file(adapters, query, file)))
        .unwrap_or_else(|_| Err(SearchError::Pool(format!("worker panicked while scanning {:?}", file.path))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::schema::{FileFormat, ReportEntry, SearchMode};
    use parking_lot::Mutex;
    use std::path::Path;

    #[derive(Default)]
    struct Recorder {
        shown: Vec<(String, usize)>,
        deferred_files: Vec<String>,
        advisories: Vec<String>,
        deferred_printed: usize,
    }

    impl SearchOutput for Recorder {
        fn banner(&mut self, _: usize, _: usize, _: usize) {}
        fn file_shown(&mut self, file: &DataFile, results: &[MatchResult], _: &[String]) {
            self.shown.push((file.file_name(), results.len()));
        }
        fn file_deferred(&mut self, file: &DataFile, _: usize, _: usize) {
            self.deferred_files.push(file.file_name());
        }
        fn advisory(&mut self, message: &str) {
            self.advisories.push(message.to_string());
        }
        fn finished(&mut self, _: Duration, _: usize, _: usize, _: usize) {}
        fn deferred_shown(&mut self, entries: &[ReportEntry], _: usize) {
            self.deferred_printed += entries.len();
        }
        fn deferred_persisting(&mut self, _: usize, _: usize) {}
        fn report_persisted(&mut self, _: &Path, _: usize) {}
    }

    /// Writer that always fails
    struct Unwritable;

    impl ReportWriter for Unwritable {
        fn persist(&self, _: &[ReportEntry]) -> Result<PathBuf> {
            Err(SearchError::Report("disk full".into()))
        }
    }

    /// Writer that keeps entries in memory
    #[derive(Default)]
    struct Capture(Arc<Mutex<Vec<ReportEntry>>>);

    impl ReportWriter for Capture {
        fn persist(&self, entries: &[ReportEntry]) -> Result<PathBuf> {
            self.0.lock().extend_from_slice(entries);
            Ok(PathBuf::from("memory"))
        }
    }

    fn write(dir: &Path, name: &str, content: &str) -> DataFile {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        DataFile::from_path(path).unwrap()
    }

    #[test]
    fn test_worker_count_bounded_by_files() {
        let c = SearchCoordinator::new(Thresholds::default(), Box::new(Unwritable)).with_max_workers(Some(8));
        assert_eq!(c.worker_count(3), 3);
        assert_eq!(c.worker_count(20), 8);
        assert_eq!(c.worker_count(0), 0);
    }

    #[test]
    fn test_scan_file_keeps_natural_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "a.txt", "ivan 1\noleg\nIVAN 2\nivan 3\n");
        let hits = scan_file(&AdapterSet::default(), &Query::any("ivan").unwrap(), &file).unwrap();
        let lines: Vec<&str> = hits.iter().map(|h| h.record.values()[0]).collect();
        assert_eq!(lines, vec!["ivan 1", "IVAN 2", "ivan 3"]);
    }

    #[test]
    fn test_parallel_scan_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write(dir.path(), "a.txt", "ivan\n"),
            write(dir.path(), "broken.json", "}{ not json"),
            DataFile::new(dir.path().join("gone.csv"), FileFormat::Delimited),
            write(dir.path(), "b.csv", "name\nIvan\nOleg\n"),
        ];

        let outcomes = scan_parallel(
            Arc::new(AdapterSet::default()),
            Arc::new(Query::any("ivan").unwrap()),
            files,
            3,
        );

        assert_eq!(outcomes.len(), 4);
        for (file, outcome) in outcomes {
            match file.file_name().as_str() {
                "a.txt" | "b.csv" => assert_eq!(outcome.unwrap().len(), 1),
                _ => assert!(outcome.is_err()),
            }
        }
    }

    #[tokio::test]
    async fn test_small_files_shown_large_deferred() {
        let dir = tempfile::tempdir().unwrap();
        let big: String = (0..30).map(|i| format!("ivan row {}\n", i)).collect();
        let files = vec![write(dir.path(), "small.txt", "ivan\n"), write(dir.path(), "big.txt", &big)];

        let captured = Capture::default();
        let store = captured.0.clone();
        let coordinator = SearchCoordinator::new(Thresholds::default(), Box::new(captured));
        let mut out = Recorder::default();
        let summary = coordinator.run(&Query::any("ivan").unwrap(), &files, &mut out).await;

        assert_eq!(out.shown, vec![("small.txt".to_string(), 1)]);
        assert_eq!(out.deferred_files, vec!["big.txt".to_string()]);
        assert_eq!(summary.total_matches, 31);
        assert_eq!(summary.shown_immediately + summary.deferred_displayed + summary.persisted, 31);
        assert_eq!(store.lock().len(), summary.persisted);
    }

    #[tokio::test]
    async fn test_failed_report_falls_back_to_console() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![write(dir.path(), "a.txt", "ivan 1\nivan 2\n")];
        let thresholds = Thresholds { per_file: 0, global: 0, entry_overhead: 150 };
        let coordinator = SearchCoordinator::new(thresholds, Box::new(Unwritable));

        let mut out = Recorder::default();
        let summary = coordinator.run(&Query::new(["IVAN"], SearchMode::Any).unwrap(), &files, &mut out).await;

        assert_eq!(summary.persisted, 0);
        assert_eq!(summary.deferred_displayed, 2);
        assert_eq!(out.deferred_printed, 2);
        assert_eq!(out.advisories.len(), 1);
    }

    #[tokio::test]
    async fn test_skipped_tables_become_advisories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("half.db");
        crate::search::store::tests::make_db(
            &path,
            &[
                "CREATE TABLE good (name TEXT)",
                "INSERT INTO good VALUES ('ivan')",
                "CREATE INDEX good_name ON good (name)",
                "CREATE TABLE ghost (name TEXT)",
                "PRAGMA writable_schema = ON",
                "UPDATE sqlite_master SET rootpage = (SELECT rootpage FROM sqlite_master WHERE name = 'good_name') WHERE name = 'ghost'",
            ],
        )
        .await;
        let files = vec![DataFile::new(path, FileFormat::Sqlite)];

        let coordinator = SearchCoordinator::new(Thresholds::default(), Box::new(Capture::default()));
        let mut out = Recorder::default();
        let summary = coordinator.run(&Query::any("ivan").unwrap(), &files, &mut out).await;

        assert_eq!(summary.total_matches, 1);
        assert!(summary.failed_files.is_empty());
        assert_eq!(out.advisories.len(), 1);
        assert!(out.advisories[0].contains("half.db"));
        assert!(out.advisories[0].contains("ghost"));
    }
}
