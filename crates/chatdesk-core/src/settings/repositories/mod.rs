pub mod app_config_json_repository;
pub mod in_memory_local_settings_repository;
pub mod json_file;
pub mod local_settings_json_repository;
pub mod local_settings_repository;

pub use app_config_json_repository::AppConfigJsonRepository;
pub use in_memory_local_settings_repository::InMemoryLocalSettingsRepository;
pub use local_settings_json_repository::LocalSettingsJsonRepository;
pub use local_settings_repository::LocalSettingsRepository;
