//! Console side effects of a search / 控制台输出
//!
//! The coordinator only talks to `SearchOutput`; `ConsoleOutput` prints to stdout
//! while logs go to stderr.

use std::path::Path;
use std::time::Duration;

use super::render::{render_deferred_block, SEPARATOR_WIDTH};
use super::schema::{DataFile, MatchResult, ReportEntry};

const RULE_WIDTH: usize = 50;

pub trait SearchOutput: Send {
    /// Before any file is searched
    fn banner(&mut self, relational: usize, flat: usize, workers: usize);

    /// A file passed the per-file gate; `blocks[i]` renders `results[i]`
    fn file_shown(&mut self, file: &DataFile, results: &[MatchResult], blocks: &[String]);

    /// A file exceeded the per-file gate
    fn file_deferred(&mut self, file: &DataFile, rendered_len: usize, threshold: usize);

    /// Non-fatal problem worth telling the operator
    fn advisory(&mut self, message: &str);

    /// All files done, before the global gate output
    fn finished(&mut self, elapsed: Duration, total_matches: usize, deferred: usize, estimate: usize);

    /// Deferred entries fit the global limit and are printed
    fn deferred_shown(&mut self, entries: &[ReportEntry], threshold: usize);

    /// Deferred entries go to a report file
    fn deferred_persisting(&mut self, estimate: usize, threshold: usize);

    fn report_persisted(&mut self, path: &Path, count: usize);
}

/// stdout printer / 终端输出
#[derive(Debug, Default)]
pub struct ConsoleOutput;

impl SearchOutput for ConsoleOutput {
    fn banner(&mut self, relational: usize, flat: usize, workers: usize) {
        println!("{}", "-".repeat(RULE_WIDTH));
        println!("Found: {} DB stores and {} RAW files.", relational, flat);
        if relational > 0 {
            println!(" Running indexed search in {} DB stores.", relational);
        }
        if flat > 0 {
            println!(" Running parallel scan of {} RAW files with {} workers.", flat, workers);
        }
    }

    fn file_shown(&mut self, file: &DataFile, results: &[MatchResult], blocks: &[String]) {
        println!("\n--- {} file {} (found: {}) ---", file.kind().label(), file.file_name(), results.len());
        for block in blocks {
            print!("{}", block);
        }
    }

    fn file_deferred(&mut self, file: &DataFile, rendered_len: usize, threshold: usize) {
        println!("\n--- {} file {} ---", file.kind().label(), file.file_name());
        println!(
            "[NOTICE] Output from this file ({} characters) exceeds the console limit ({}).",
            rendered_len, threshold
        );
        println!("Its matches will appear in the consolidated report at the end of the search.");
        println!("{}", "-".repeat(RULE_WIDTH));
    }

    fn advisory(&mut self, message: &str) {
        println!(" ! {}", message);
    }

    fn finished(&mut self, elapsed: Duration, total_matches: usize, deferred: usize, estimate: usize) {
        println!("{}", "-".repeat(RULE_WIDTH));
        println!(
            "Search finished in {:.2} seconds. Matches (shown + deferred): {}",
            elapsed.as_secs_f64(),
            total_matches
        );

        if deferred == 0 {
            if total_matches > 0 {
                println!("All results were shown.");
            }
            return;
        }

        println!("Deferred results: {}", deferred);
        println!("Estimated report length: {} characters.", estimate);
    }

    fn deferred_shown(&mut self, entries: &[ReportEntry], threshold: usize) {
        println!("\n[NOTICE] Deferred results fit the overall limit ({} characters), printing:", threshold);
        for entry in entries {
            println!("{}", render_deferred_block(&entry.result));
        }
        println!("\n--- End of deferred results ---");
    }

    fn deferred_persisting(&mut self, estimate: usize, threshold: usize) {
        println!(
            "[NOTICE] Deferred report ({} characters) exceeds the limit ({}).",
            estimate, threshold
        );
        println!("All deferred results will be saved to one report.");
    }

    fn report_persisted(&mut self, path: &Path, count: usize) {
        let rule = "=".repeat(SEPARATOR_WIDTH / 2);
        println!("\n{}", rule);
        println!(" Saved {} results to the consolidated report.", count);
        println!("   {}", path.display());
        println!("{}", rule);
    }
}
