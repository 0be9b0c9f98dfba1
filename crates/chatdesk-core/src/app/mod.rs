pub mod action;
pub mod controller;
pub mod error_collector_layer;
pub mod error_store;
pub mod events;
pub mod folder_ops;
pub mod logging;
pub mod services;
pub mod state;

pub use action::Action;
pub use controller::{AppController, EpicContext, Previous};
pub use error_store::{ErrorEntry, ErrorLevel, ErrorStore};
pub use events::{AppEvent, Notification, NotificationLevel};
pub use logging::init_tracing;
pub use services::Services;
pub use state::AppState;
