use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::repositories::{RepositoryError, RepositoryResult};

pub const APP_DIR: &str = "chatdesk";

/// `<config dir>/chatdesk/<file_name>`
pub fn config_file_path(file_name: &str) -> RepositoryResult<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| RepositoryError::InitializationError {
        message: "Cannot determine config directory".into(),
    })?;
    Ok(config_dir.join(APP_DIR).join(file_name))
}

/// Read a JSON document; a missing file yields `T::default()` (first run).
pub async fn read_json_or_default<T>(path: &Path) -> RepositoryResult<T>
where
    T: DeserializeOwned + Default,
{
    if !tokio::fs::try_exists(path).await? {
        return Ok(T::default());
    }

    let contents = tokio::fs::read_to_string(path).await?;
    let value = serde_json::from_str(&contents)?;
    Ok(value)
}

/// Write a JSON document atomically using temp file + rename.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> RepositoryResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(value)?;

    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, json).await?;
    tokio::fs::rename(&temp_path, path).await?;

    Ok(())
}
