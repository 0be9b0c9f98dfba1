pub mod actions;
pub mod controllers;
pub mod models;
pub mod template;

pub use actions::PromptAction;
pub use models::{Prompt, PromptPatch, PromptsState};
