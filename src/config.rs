//! Application configuration module / 应用配置模块
//!
//! Manages configuration loaded from config.json (path given by `--config`)
//! Creates default config file on first run / 首次运行时创建默认配置文件

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, SearchError};
use crate::search::aggregator::Thresholds;

/// Global configuration instance / 全局配置实例
static CONFIG: OnceCell<Arc<RwLock<AppConfig>>> = OnceCell::new();

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Data source configuration / 数据源配置
    #[serde(default)]
    pub data: DataConfig,
    /// Search configuration / 搜索配置
    #[serde(default)]
    pub search: SearchConfig,
}

/// Data source configuration / 数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Folder scanned for data files / 数据文件目录
    pub data_dir: String,
    /// Folder that receives persisted reports / 报告目录
    pub reports_dir: String,
}

/// Search configuration / 搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Per-file output limit in characters / 单文件输出上限
    pub per_file_threshold: usize,
    /// Deferred report limit in characters / 汇总输出上限
    pub global_threshold: usize,
    /// Framing allowance added per deferred entry / 每条记录的额外开销
    pub entry_overhead: usize,
    /// Worker cap for flat files, None means available parallelism / 并发上限
    #[serde(default)]
    pub max_workers: Option<usize>,
    /// Bytes sampled for delimiter detection / 分隔符探测采样字节数
    pub sniff_bytes: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: "db".to_string(),
            reports_dir: "reports".to_string(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            per_file_threshold: 500,
            global_threshold: 4000,
            entry_overhead: 150,
            max_workers: None,
            sniff_bytes: 10 * 1024,
        }
    }
}

impl AppConfig {
    /// Get the data directory path / 获取数据目录路径
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.data_dir)
    }

    /// Get the reports directory path / 获取报告目录路径
    pub fn get_reports_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.reports_dir)
    }

    /// Aggregator limits / 聚合阈值
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            per_file: self.search.per_file_threshold,
            global: self.search.global_threshold,
            entry_overhead: self.search.entry_overhead,
        }
    }
}

/// Load configuration from `path`, creating it with defaults if missing / 加载配置文件，不存在则创建默认配置
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        let config = AppConfig::default();
        save_config(path, &config)?;
        tracing::info!("Created default configuration at {:?}", path);
        return Ok(config);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| SearchError::Config(format!("Failed to read {:?}: {}", path, e)))?;
    let config: AppConfig = serde_json::from_str(&content)
        .map_err(|e| SearchError::Config(format!("Failed to parse {:?}: {}", path, e)))?;

    tracing::info!("Loaded configuration from {:?}", path);
    Ok(config)
}

/// Save configuration to `path` / 保存配置到文件
pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| SearchError::Config(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path, content)
        .map_err(|e| SearchError::Config(format!("Failed to write {:?}: {}", path, e)))
}

/// Load `path` into the process-wide config; only the first call succeeds / 初始化全局配置
pub fn init_config(path: &Path) -> Result<AppConfig> {
    let config = load_config(path)?;
    CONFIG
        .set(Arc::new(RwLock::new(config.clone())))
        .map_err(|_| SearchError::Config("Config already initialized".to_string()))?;
    Ok(config)
}

fn shared() -> Result<&'static Arc<RwLock<AppConfig>>> {
    CONFIG
        .get()
        .ok_or_else(|| SearchError::Config("Config not initialized".to_string()))
}

/// Apply in-memory overrides (command-line flags); the file is left untouched
pub fn update_config(apply: impl FnOnce(&mut AppConfig)) -> Result<()> {
    apply(&mut *shared()?.write());
    Ok(())
}

/// Read-only snapshot of the current config / 获取当前配置的只读快照
pub fn config() -> Result<AppConfig> {
    Ok(shared()?.read().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_limits() {
        let t = AppConfig::default().thresholds();
        assert_eq!(t.per_file, 500);
        assert_eq!(t.global, 4000);
        assert_eq!(t.entry_overhead, 150);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"search": {"per_file_threshold": 10, "global_threshold": 20, "entry_overhead": 0, "sniff_bytes": 64}}"#)
                .unwrap();
        assert_eq!(cfg.search.per_file_threshold, 10);
        assert_eq!(cfg.search.max_workers, None);
        assert_eq!(cfg.data.data_dir, "db");
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let cfg = load_config(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.search.global_threshold, 4000);

        let mut changed = cfg.clone();
        changed.search.max_workers = Some(2);
        changed.data.reports_dir = "out".into();
        save_config(&path, &changed).unwrap();

        let reread = load_config(&path).unwrap();
        assert_eq!(reread.search.max_workers, Some(2));
        assert_eq!(reread.get_reports_dir(), PathBuf::from("out"));
    }

    #[test]
    fn test_unparsable_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_config(&path), Err(SearchError::Config(_))));
    }

    #[test]
    fn test_global_needs_init() {
        // tests never initialize the process-wide config
        assert!(matches!(config(), Err(SearchError::Config(_))));
        assert!(update_config(|c| c.search.global_threshold = 1).is_err());
    }
}
