pub mod conversation;
pub mod conversations_store;
pub mod message;

pub use conversation::{
    Conversation, ConversationMode, ConversationPatch, PlaybackState, ReplayState,
};
pub use conversations_store::ConversationsState;
pub use message::{
    Attachment, CustomContent, Message, MessageDelta, MessagePatch, MessageSettings, ModelRef,
    Rating, Role, Stage, StageStatus,
};
