use std::sync::Arc;

use parking_lot::Mutex;

use super::local_settings_repository::LocalSettingsRepository;
use crate::repositories::{BoxFuture, RepositoryResult};
use crate::settings::models::LocalSettings;

/// In-memory local settings
/// Useful for testing and development
#[derive(Clone, Default)]
pub struct InMemoryLocalSettingsRepository {
    settings: Arc<Mutex<LocalSettings>>,
}

impl InMemoryLocalSettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: LocalSettings) -> Self {
        Self {
            settings: Arc::new(Mutex::new(settings)),
        }
    }

    pub fn current(&self) -> LocalSettings {
        self.settings.lock().clone()
    }
}

impl LocalSettingsRepository for InMemoryLocalSettingsRepository {
    fn load(&self) -> BoxFuture<'static, RepositoryResult<LocalSettings>> {
        let settings = self.settings.clone();
        Box::pin(async move { Ok(settings.lock().clone()) })
    }

    fn save(&self, settings: LocalSettings) -> BoxFuture<'static, RepositoryResult<()>> {
        let store = self.settings.clone();
        Box::pin(async move {
            *store.lock() = settings;
            Ok(())
        })
    }
}
