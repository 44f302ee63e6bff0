//! Tiered result aggregation / 分级结果汇总
//!
//! Two decision points per search:
//! - per-file gate: a file whose rendered output fits `per_file` is shown at once,
//!   otherwise all of its matches are deferred;
//! - global gate: deferred entries are printed when the estimated report fits
//!   `global`, otherwise handed to the report writer.
//!
//! Everything here is pure; console and disk effects live in the coordinator.

use super::render::{render_block, rendered_len};
use super::schema::{MatchResult, ReportEntry};

/// Output limits in rendered characters / 输出阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// T1
    pub per_file: usize,
    /// T2
    pub global: usize,
    /// Framing allowance per deferred entry
    pub entry_overhead: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            per_file: 500,
            global: 4000,
            entry_overhead: 150,
        }
    }
}

/// Result of the per-file gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// No matches, nothing to print
    Empty,
    /// Show these blocks now
    Immediate {
        results: Vec<MatchResult>,
        blocks: Vec<String>,
        rendered_len: usize,
    },
    /// Too long for the console, carried to the global gate
    Deferred {
        entries: Vec<ReportEntry>,
        rendered_len: usize,
    },
}

impl FileOutcome {
    /// Matches this outcome accounts for
    pub fn match_count(&self) -> usize {
        match self {
            FileOutcome::Empty => 0,
            FileOutcome::Immediate { results, .. } => results.len(),
            FileOutcome::Deferred { entries, .. } => entries.len(),
        }
    }
}

/// Per-file gate: `<= per_file` is shown immediately / 单文件阈值判断
pub fn gate_file(results: Vec<MatchResult>, thresholds: &Thresholds) -> FileOutcome {
    if results.is_empty() {
        return FileOutcome::Empty;
    }

    let total = results.len();
    let blocks: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, r)| render_block(i + 1, total, r))
        .collect();
    let length: usize = blocks.iter().map(|b| rendered_len(b)).sum();

    if length <= thresholds.per_file {
        FileOutcome::Immediate { results, blocks, rendered_len: length }
    } else {
        FileOutcome::Deferred {
            entries: results.into_iter().map(ReportEntry::new).collect(),
            rendered_len: length,
        }
    }
}

/// Decision of the global gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalDecision {
    /// Nothing was deferred
    Nothing,
    /// Print deferred entries, no file
    Display { entries: Vec<ReportEntry>, estimate: usize },
    /// Write deferred entries to a report
    Persist { entries: Vec<ReportEntry>, estimate: usize },
}

/// Running state of one search invocation / 汇总状态
#[derive(Debug, Default)]
pub struct Accumulator {
    pending: Vec<ReportEntry>,
    running_len: usize,
    shown: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one file's outcome into the running state
    pub fn absorb(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Empty => {}
            FileOutcome::Immediate { results, .. } => self.shown += results.len(),
            FileOutcome::Deferred { entries, .. } => {
                self.running_len += entries.iter().map(ReportEntry::comparison_len).sum::<usize>();
                self.pending.extend(entries);
            }
        }
    }

    pub fn shown(&self) -> usize {
        self.shown
    }

    pub fn deferred(&self) -> usize {
        self.pending.len()
    }

    /// Shown plus deferred
    pub fn total_matches(&self) -> usize {
        self.shown + self.pending.len()
    }

    /// Comparison lengths plus per-entry overhead / 报告长度估算
    pub fn estimate(&self, thresholds: &Thresholds) -> usize {
        self.running_len + self.pending.len() * thresholds.entry_overhead
    }

    /// Global gate: `<= global` is displayed, otherwise persisted
    pub fn finish(self, thresholds: &Thresholds) -> FinalDecision {
        if self.pending.is_empty() {
            return FinalDecision::Nothing;
        }

        let estimate = self.estimate(thresholds);
        if estimate <= thresholds.global {
            FinalDecision::Display { entries: self.pending, estimate }
        } else {
            FinalDecision::Persist { entries: self.pending, estimate }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::schema::Record;
    use std::path::Path;
    use std::sync::Arc;

    fn line(text: &str) -> MatchResult {
        MatchResult::from(Record::line(Arc::from(Path::new("db/leak.txt")), text.to_string()))
    }

    fn single_block_len(r: &MatchResult) -> usize {
        rendered_len(&render_block(1, 1, r))
    }

    #[test]
    fn test_empty_file_is_empty_outcome() {
        assert_eq!(gate_file(Vec::new(), &Thresholds::default()), FileOutcome::Empty);
    }

    #[test]
    fn test_per_file_boundary_is_inclusive() {
        let r = line("ivan:79990001122");
        let len = single_block_len(&r);

        let at = Thresholds { per_file: len, ..Thresholds::default() };
        assert!(matches!(
            gate_file(vec![r.clone()], &at),
            FileOutcome::Immediate { rendered_len, .. } if rendered_len == len
        ));

        let under = Thresholds { per_file: len - 1, ..Thresholds::default() };
        match gate_file(vec![r], &under) {
            FileOutcome::Deferred { entries, rendered_len } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(rendered_len, len);
            }
            other => panic!("expected deferral, got {:?}", other),
        }
    }

    #[test]
    fn test_deferral_is_all_or_nothing_per_file() {
        let results: Vec<MatchResult> = (0..20).map(|i| line(&format!("row {}", i))).collect();
        let outcome = gate_file(results, &Thresholds::default());
        assert_eq!(outcome.match_count(), 20);
        assert!(matches!(outcome, FileOutcome::Deferred { .. }));
    }

    #[test]
    fn test_global_boundary_display_or_persist() {
        let r = line("x".repeat(100).as_str());
        let thresholds = |global| Thresholds { per_file: 0, global, entry_overhead: 150 };

        let mut acc = Accumulator::new();
        acc.absorb(gate_file(vec![r.clone()], &thresholds(0)));
        assert_eq!(acc.estimate(&thresholds(0)), 250);
        assert!(matches!(acc.finish(&thresholds(250)), FinalDecision::Display { estimate: 250, .. }));

        let mut acc = Accumulator::new();
        acc.absorb(gate_file(vec![r], &thresholds(0)));
        match acc.finish(&thresholds(249)) {
            FinalDecision::Persist { entries, estimate } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(estimate, 250);
            }
            other => panic!("expected persistence, got {:?}", other),
        }
    }

    #[test]
    fn test_every_match_counted_once() {
        let t = Thresholds::default();
        let mut acc = Accumulator::new();
        acc.absorb(gate_file(vec![line("short")], &t));
        acc.absorb(gate_file((0..10).map(|i| line(&format!("long {}", i))).collect(), &t));
        acc.absorb(gate_file(Vec::new(), &t));

        assert_eq!(acc.shown(), 1);
        assert_eq!(acc.deferred(), 10);
        assert_eq!(acc.total_matches(), 11);
        match acc.finish(&t) {
            FinalDecision::Display { entries, .. } => assert_eq!(entries.len(), 10),
            other => panic!("expected display, got {:?}", other),
        }
    }

    #[test]
    fn test_nothing_deferred() {
        let mut acc = Accumulator::new();
        acc.absorb(gate_file(vec![line("a")], &Thresholds::default()));
        assert_eq!(acc.finish(&Thresholds::default()), FinalDecision::Nothing);
    }
}
