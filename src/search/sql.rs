//! SQL translation - clause tree plus renderer / 查询翻译
//!
//! A query becomes one WHERE predicate per table: every term turns into an OR over all
//! columns, terms then combine with AND (All) or OR (Any). Exact uses trimmed equality.
//!
//! SQLite folds and trims ASCII only. `candidates` widens the predicate with every row
//! that holds a non-ASCII byte, and the store re-checks all rows with the matcher, so
//! SQL only narrows and never decides alone.

use super::schema::{Query, SearchMode};

/// Escape character used in every rendered LIKE
const LIKE_ESCAPE: char = '\\';

/// GLOB pattern hit by any value holding a character outside 0x01..=0x7F
pub const NON_ASCII_GLOB: &str = "*[^\u{1}-\u{7f}]*";

/// Predicate tree / 条件树
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Like { column: String, pattern: String },
    Eq { column: String, value: String },
    Glob { column: String, pattern: String },
    And(Vec<Clause>),
    Or(Vec<Clause>),
}

impl Clause {
    /// Render to SQL text and positional parameters
    pub fn render(&self) -> (String, Vec<String>) {
        let mut sql = String::new();
        let mut params = Vec::new();
        self.render_into(&mut sql, &mut params);
        (sql, params)
    }

    fn render_into(&self, sql: &mut String, params: &mut Vec<String>) {
        match self {
            Clause::Like { column, pattern } => {
                sql.push_str(&format!("{} LIKE ? ESCAPE '{}'", quote_ident(column), LIKE_ESCAPE));
                params.push(pattern.clone());
            }
            Clause::Eq { column, value } => {
                // char(9..=13): the ASCII whitespace str::trim strips
                sql.push_str(&format!(
                    "TRIM(CAST({} AS TEXT), ' ' || char(9, 10, 11, 12, 13)) = ? COLLATE NOCASE",
                    quote_ident(column)
                ));
                params.push(value.clone());
            }
            Clause::Glob { column, pattern } => {
                sql.push_str(&format!("{} GLOB ?", quote_ident(column)));
                params.push(pattern.clone());
            }
            Clause::And(children) => Self::render_group(children, " AND ", sql, params),
            Clause::Or(children) => Self::render_group(children, " OR ", sql, params),
        }
    }

    fn render_group(children: &[Clause], joiner: &str, sql: &mut String, params: &mut Vec<String>) {
        sql.push('(');
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                sql.push_str(joiner);
            }
            child.render_into(sql, params);
        }
        sql.push(')');
    }
}

/// Quote an SQLite identifier / 标识符转义
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Make `%`, `_` and the escape char literal inside a LIKE pattern
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Build the predicate for one table, None when nothing can match
pub fn translate(query: &Query, columns: &[String]) -> Option<Clause> {
    if columns.is_empty() || !query.is_satisfiable() {
        return None;
    }

    if query.mode() == SearchMode::Exact {
        let value = query.terms()[0].trim().to_string();
        return Some(Clause::Or(
            columns
                .iter()
                .map(|c| Clause::Eq { column: c.clone(), value: value.clone() })
                .collect(),
        ));
    }

    let per_term: Vec<Clause> = query
        .terms()
        .iter()
        .map(|term| {
            let pattern = format!("%{}%", escape_like(term));
            Clause::Or(
                columns
                    .iter()
                    .map(|c| Clause::Like { column: c.clone(), pattern: pattern.clone() })
                    .collect(),
            )
        })
        .collect();

    Some(match query.mode() {
        SearchMode::All => Clause::And(per_term),
        _ => Clause::Or(per_term),
    })
}

/// Predicate for the rows worth handing to the matcher: the translated query OR any
/// column holding non-ASCII text
pub fn candidates(query: &Query, columns: &[String]) -> Option<Clause> {
    let predicate = translate(query, columns)?;
    let non_ascii = columns
        .iter()
        .map(|c| Clause::Glob { column: c.clone(), pattern: NON_ASCII_GLOB.to_string() })
        .collect();
    Some(Clause::Or(vec![predicate, Clause::Or(non_ascii)]))
}

/// Full SELECT for one table; values are projected as text in column order
pub fn select_statement(table: &str, columns: &[String], predicate: Option<&Clause>) -> (String, Vec<String>) {
    let projection = columns
        .iter()
        .map(|c| format!("CAST({0} AS TEXT) AS {0}", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!("SELECT {} FROM {}", projection, quote_ident(table));
    let mut params = Vec::new();

    if let Some(clause) = predicate {
        let (where_sql, where_params) = clause.render();
        sql.push_str(" WHERE ");
        sql.push_str(&where_sql);
        params = where_params;
    }

    (sql, params)
}
