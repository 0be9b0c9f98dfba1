pub mod app_config;
pub mod local_settings;
pub mod models_store;

pub use app_config::AppConfig;
pub use local_settings::LocalSettings;
pub use models_store::{FunctionStatus, Model, ModelFeatures, ModelKind, ModelsState};
