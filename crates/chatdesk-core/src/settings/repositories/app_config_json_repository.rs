use std::path::PathBuf;

use tracing::debug;

use super::json_file::{config_file_path, read_json_or_default};
use crate::repositories::RepositoryResult;
use crate::settings::models::AppConfig;

/// Reads `chatdesk/config.json`; environment variables win over the file.
pub struct AppConfigJsonRepository {
    file_path: PathBuf,
}

impl AppConfigJsonRepository {
    /// Create repository with XDG-compliant path
    pub fn new() -> RepositoryResult<Self> {
        Ok(Self {
            file_path: config_file_path("config.json")?,
        })
    }

    /// Create repository with custom path (for testing)
    pub fn with_path(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub async fn load(&self) -> RepositoryResult<AppConfig> {
        let config: AppConfig = read_json_or_default(&self.file_path).await?;
        let config = config.with_env_overrides();
        debug!(
            path = %self.file_path.display(),
            api_base_url = %config.api_base_url,
            bucket = %config.user_bucket,
            "Loaded app config"
        );
        Ok(config)
    }
}
