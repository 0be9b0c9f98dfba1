use super::action::Action;

pub const CONFLICT_MESSAGE: &str =
    "The item was changed or already exists on the server. Please refresh the page.";
pub const COMPARE_REJECTED_MESSAGE: &str =
    "Incorrect conversation was chosen for comparison. Please choose another one.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A toast for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Everything observers of the store can react to.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// An action was reduced; the state already reflects it.
    Action(Action),
    Notification(Notification),
    /// The backend rejected the session; the host should re-authenticate.
    AuthRequired,
}
