use crate::repositories::{BoxFuture, RepositoryResult};
use crate::settings::models::LocalSettings;

pub trait LocalSettingsRepository: Send + Sync + 'static {
    /// Load local settings from storage
    fn load(&self) -> BoxFuture<'static, RepositoryResult<LocalSettings>>;

    /// Save local settings to storage
    fn save(&self, settings: LocalSettings) -> BoxFuture<'static, RepositoryResult<()>>;
}
