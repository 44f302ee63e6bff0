//! SQLite store - relational adapter and translated search / SQLite 数据源
//!
//! 特性：
//! - 只读打开，每个数据库独立连接（不与其他任务共享）
//! - 自动枚举用户表和列
//! - 每个表一条查询，LIKE + ESCAPE 转义
//!
//! Tables that cannot be read are skipped and reported back to the caller; a store that
//! cannot be opened fails as a whole.

use std::path::Path;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};

use super::adapters::decode_lossy;
use super::matcher::matches;
use super::schema::{MatchResult, Query, Record};
use super::sql::{candidates, select_statement, Clause};
use crate::error::{Result, SearchError};

/// One open SQLite file
pub struct SqliteStore {
    db: Pool<Sqlite>,
    path: Arc<Path>,
}

impl SqliteStore {
    /// Open read-only; a missing file is an error, never created
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| SearchError::sqlite(path, e))?;

        Ok(Self { db, path: Arc::from(path) })
    }

    /// 关闭数据库连接池 / Close database connection pool
    pub async fn close(&self) {
        self.db.close().await;
    }

    /// User tables in catalog order / 用户表
    pub async fn tables(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(&self.db)
            .await
            .map_err(|e| SearchError::sqlite(&self.path, e))?;

        Ok(rows
            .into_iter()
            .map(|(name,)| name)
            .filter(|name| !name.starts_with("sqlite_"))
            .collect())
    }

    /// Column names of one table / 表的列名
    pub async fn columns(&self, table: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info(?)")
            .bind(table)
            .fetch_all(&self.db)
            .await
            .map_err(|e| SearchError::sqlite(&self.path, e))?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Tables paired with their columns; unreadable or empty schemas land in `skipped`
    async fn readable_tables(&self, skipped: &mut Vec<String>) -> Result<Vec<(String, Vec<String>)>> {
        let mut out = Vec::new();
        for table in self.tables().await? {
            match self.columns(&table).await {
                Ok(columns) if columns.is_empty() => {
                    tracing::warn!("Table {} in {:?} has no columns, skipped", table, self.path);
                    skipped.push(format!("table {} has no columns, skipped", table));
                }
                Ok(columns) => out.push((table, columns)),
                Err(e) => {
                    tracing::warn!("Cannot read schema of table {}: {}", table, e);
                    skipped.push(format!("table {} skipped, schema unreadable: {}", table, e));
                }
            }
        }
        Ok(out)
    }

    /// Run one SELECT and turn rows into records tagged with the table
    async fn fetch_table(&self, table: &str, columns: &[String], predicate: Option<&Clause>) -> Result<Vec<Record>> {
        let (sql, params) = select_statement(table, columns, predicate);

        let mut query = sqlx::query(&sql);
        for param in params {
            query = query.bind(param);
        }

        let rows = query
            .fetch_all(&self.db)
            .await
            .map_err(|e| SearchError::sqlite(&self.path, e))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let mut fields = Vec::with_capacity(columns.len());
            for (i, column) in columns.iter().enumerate() {
                let raw: Option<Vec<u8>> = row
                    .try_get(i)
                    .map_err(|e| SearchError::sqlite(&self.path, e))?;
                let value = raw.map(|b| decode_lossy(&b, false)).unwrap_or_default();
                fields.push((column.clone(), value));
            }
            records.push(Record::fields(self.path.clone(), fields).with_table(table));
        }

        Ok(records)
    }

    /// Every row of every readable table (relational adapter)
    pub async fn scan(&self) -> Result<StoreRows> {
        let mut out = StoreRows::default();
        for (table, columns) in self.readable_tables(&mut out.skipped).await? {
            match self.fetch_table(&table, &columns, None).await {
                Ok(rows) => out.records.extend(rows),
                Err(e) => {
                    tracing::warn!("Cannot read table {}: {}", table, e);
                    out.skipped.push(format!("table {} skipped: {}", table, e));
                }
            }
        }
        Ok(out)
    }

    /// Matching rows of every table, one query per table
    pub async fn search(&self, query: &Query) -> Result<StoreRows> {
        let mut out = StoreRows::default();
        for (table, columns) in self.readable_tables(&mut out.skipped).await? {
            let Some(predicate) = candidates(query, &columns) else {
                continue;
            };

            match self.fetch_table(&table, &columns, Some(&predicate)).await {
                Ok(rows) => {
                    let fetched = rows.len();
                    out.records.extend(rows.into_iter().filter(|r| matches(query, r)));
                    tracing::debug!("Table {}: {} candidates, {} matches total", table, fetched, out.records.len());
                }
                Err(e) => {
                    tracing::warn!("Query on table {} failed: {}", table, e);
                    out.skipped.push(format!("table {} skipped: {}", table, e));
                }
            }
        }
        Ok(out)
    }
}

/// Rows read from one store plus a note per table that could not be read
#[derive(Debug, Default)]
pub struct StoreRows {
    pub records: Vec<Record>,
    pub skipped: Vec<String>,
}

/// Open, search and close one store / 搜索单个数据库
pub async fn search_store(path: &Path, query: &Query) -> Result<(Vec<MatchResult>, Vec<String>)> {
    let store = SqliteStore::open(path).await?;
    let result = store.search(query).await;
    store.close().await;
    let rows = result?;
    Ok((rows.records.into_iter().map(MatchResult::from).collect(), rows.skipped))
}
