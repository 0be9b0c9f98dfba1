//! Headless state engine of a multi-model AI chat client.
//!
//! [`AppController`] owns the [`AppState`] and runs a single dispatch loop:
//! every [`Action`] is reduced into the state, broadcast to subscribers and
//! then handed to the controllers of its slice, which talk to the backend and
//! dispatch the follow-up actions.

pub mod app;
pub mod conversations;
pub mod entities;
pub mod prompts;
pub mod publications;
pub mod repositories;
pub mod services;
pub mod settings;

pub use app::{
    Action, AppController, AppEvent, AppState, EpicContext, Notification, NotificationLevel,
    Services, init_tracing,
};
pub use entities::{ApiKind, EntityId, Folder, FolderPath};
