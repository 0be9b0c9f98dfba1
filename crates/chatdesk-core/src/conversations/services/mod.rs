pub mod chat_service;
pub mod chat_stream;

pub use chat_service::{ChatMessage, ChatRequest, ChatService};
pub use chat_stream::{ChatStreamError, ChunkDecoder, DeltaStream, decode_chat_stream};
