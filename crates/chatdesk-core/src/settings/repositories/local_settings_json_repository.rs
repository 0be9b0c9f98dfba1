use std::path::PathBuf;

use super::json_file::{config_file_path, read_json_or_default, write_json_atomic};
use super::local_settings_repository::LocalSettingsRepository;
use crate::repositories::{BoxFuture, RepositoryResult};
use crate::settings::models::LocalSettings;

pub struct LocalSettingsJsonRepository {
    file_path: PathBuf,
}

impl LocalSettingsJsonRepository {
    /// Create repository with XDG-compliant path
    pub fn new() -> RepositoryResult<Self> {
        Ok(Self {
            file_path: config_file_path("local_settings.json")?,
        })
    }

    /// Create repository with custom path (for testing)
    pub fn with_path(file_path: PathBuf) -> Self {
        Self { file_path }
    }
}

impl LocalSettingsRepository for LocalSettingsJsonRepository {
    fn load(&self) -> BoxFuture<'static, RepositoryResult<LocalSettings>> {
        let path = self.file_path.clone();
        Box::pin(async move { read_json_or_default(&path).await })
    }

    fn save(&self, settings: LocalSettings) -> BoxFuture<'static, RepositoryResult<()>> {
        let path = self.file_path.clone();
        Box::pin(async move { write_json_atomic(&path, &settings).await })
    }
}
