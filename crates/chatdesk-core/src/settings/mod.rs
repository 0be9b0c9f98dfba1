pub mod actions;
pub mod controllers;
pub mod models;
pub mod repositories;

pub use actions::ModelsAction;
pub use models::{AppConfig, LocalSettings, ModelsState};
