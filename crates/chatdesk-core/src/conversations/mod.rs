pub mod actions;
pub mod controllers;
pub mod models;
pub mod services;

pub use actions::ConversationAction;
pub use models::{Conversation, ConversationsState, Message};
