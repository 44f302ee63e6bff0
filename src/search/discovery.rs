//! Data folder discovery / 数据文件发现

use std::path::Path;

use super::schema::DataFile;
use crate::error::{Result, SearchError};

/// Supported regular files directly inside `dir`, sorted by path
pub fn discover(dir: &Path) -> Result<Vec<DataFile>> {
    let entries = std::fs::read_dir(dir).map_err(|e| SearchError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SearchError::io(dir, e))?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        match DataFile::from_path(&path) {
            Some(file) => files.push(file),
            None => tracing::debug!("Skipping unsupported file {:?}", path),
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::info!("Discovered {} data files in {:?}", files.len(), dir);
    Ok(files)
}

/// Keep files whose base name is in `names`; empty `names` keeps everything
pub fn select(files: Vec<DataFile>, names: &[String]) -> Vec<DataFile> {
    if names.is_empty() {
        return files;
    }
    files
        .into_iter()
        .filter(|f| names.iter().any(|n| *n == f.file_name()))
        .collect()
}
