//! Human-readable match rendering / 结果渲染
//!
//! The same text is printed to the console and measured by the per-file gate.

use super::schema::{display_name, MatchResult, RecordBody};

pub const SEPARATOR_WIDTH: usize = 80;

/// `[ key: ] value` lines, or `[ Match: ] line`
pub fn render_data(result: &MatchResult) -> String {
    match &result.record.body {
        RecordBody::Fields(fields) => fields
            .iter()
            .map(|(k, v)| format!("[ {}: ] {}", k, v))
            .collect::<Vec<_>>()
            .join("\n"),
        RecordBody::Line(line) => format!("[ Match: ] {}", line),
    }
}

/// Display block for match `index` (1-based) of `total` in one file
pub fn render_block(index: usize, total: usize, result: &MatchResult) -> String {
    let separator = "=".repeat(SEPARATOR_WIDTH);
    let table = result
        .record
        .origin_table
        .as_ref()
        .map(|t| format!("Table: {}\n", t))
        .unwrap_or_default();

    format!(
        "\n{sep}\n[{index}/{total}] Match in file: \"{name}\"\n{table}{sep}\n{data}\n{sep}\n",
        sep = separator,
        index = index,
        total = total,
        name = display_name(result.source()),
        table = table,
        data = render_data(result),
    )
}

/// Block for a match shown after the global gate
pub fn render_deferred_block(result: &MatchResult) -> String {
    let separator = "=".repeat(SEPARATOR_WIDTH);
    format!(
        "\n{sep}\n[DEFERRED] Match in file: \"{name}\"\n{sep}\n{data}\n{sep}\n",
        sep = separator,
        name = display_name(result.source()),
        data = render_data(result),
    )
}

/// Character count, as used by every threshold
pub fn rendered_len(text: &str) -> usize {
    text.chars().count()
}
