use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::conversations::models::MessageDelta;

/// Byte that terminates every serialized delta on the wire.
pub const CHUNK_TERMINATOR: u8 = 0;

pub const SERVER_ERROR_MESSAGE: &str = "Error happened during answering. Please try again later.";
pub const TIMEOUT_ERROR_MESSAGE: &str = "Server is taking too long to respond. Please try again later.";

/// How a send cycle ended when it did not complete normally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChatStreamError {
    /// The session's cancellation token fired. Not reported to the user.
    #[error("Stream aborted")]
    Aborted,

    #[error("Server is taking too long to respond. Please try again later.")]
    Timeout,

    #[error("{0}")]
    Server(String),

    #[error("{0}")]
    Client(String),

    #[error("Authorization required")]
    Unauthorized,
}

impl ChatStreamError {
    /// Text attached to the assistant message and shown in the toast.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, ChatStreamError::Aborted)
    }
}

/// Type alias for decoded chat response streams
pub type DeltaStream = BoxStream<'static, Result<MessageDelta, ChatStreamError>>;

/// Accumulates raw bytes and cuts them into terminator-delimited JSON deltas.
///
/// No framing beyond the terminator is assumed: a delta may span any number of
/// network chunks and one chunk may carry several deltas.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    buffer: Vec<u8>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes; returns every delta completed by them, in arrival order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<MessageDelta, ChatStreamError>> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == CHUNK_TERMINATOR) {
            let segment: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(delta) = parse_segment(&segment[..segment.len() - 1]) {
                out.push(delta);
            }
        }
        out
    }

    /// Parse whatever is left once the body ended without a final terminator.
    pub fn finish(self) -> Option<Result<MessageDelta, ChatStreamError>> {
        parse_segment(&self.buffer)
    }
}

fn parse_segment(segment: &[u8]) -> Option<Result<MessageDelta, ChatStreamError>> {
    let text = String::from_utf8_lossy(segment);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let parsed = serde_json::from_str::<MessageDelta>(text).map_err(|e| {
        warn!(error = %e, "Failed to parse chat chunk");
        ChatStreamError::Client(format!("Invalid chunk from server: {e}"))
    });
    Some(parsed.and_then(|delta| match delta.error_message {
        Some(message) => Err(ChatStreamError::Server(message)),
        None => Ok(delta),
    }))
}

enum Next<E> {
    Cancelled,
    TimedOut,
    Item(Option<Result<Bytes, E>>),
}

/// Decode a byte stream into deltas with a per-chunk idle timeout and cancellation.
///
/// The stream ends after the first error; cancellation yields
/// [`ChatStreamError::Aborted`].
pub fn decode_chat_stream<S, E>(
    bytes: S,
    idle_timeout: Duration,
    cancel: CancellationToken,
) -> DeltaStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut bytes = Box::pin(bytes);
        let mut decoder = ChunkDecoder::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => Next::Cancelled,
                item = tokio::time::timeout(idle_timeout, bytes.next()) => match item {
                    Ok(item) => Next::Item(item),
                    Err(_) => Next::TimedOut,
                },
            };

            match next {
                Next::Cancelled => {
                    debug!("Chat stream cancelled");
                    yield Err(ChatStreamError::Aborted);
                    return;
                }
                Next::TimedOut => {
                    warn!(timeout_secs = idle_timeout.as_secs(), "Chat stream idle timeout");
                    yield Err(ChatStreamError::Timeout);
                    return;
                }
                Next::Item(None) => break,
                Next::Item(Some(Err(e))) => {
                    yield Err(ChatStreamError::Client(e.to_string()));
                    return;
                }
                Next::Item(Some(Ok(chunk))) => {
                    for delta in decoder.push(&chunk) {
                        let failed = delta.is_err();
                        yield delta;
                        if failed {
                            return;
                        }
                    }
                }
            }
        }

        if let Some(delta) = decoder.finish() {
            yield delta;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn frame(json: &str) -> Vec<u8> {
        let mut bytes = json.as_bytes().to_vec();
        bytes.push(CHUNK_TERMINATOR);
        bytes
    }

    #[test]
    fn test_decoder_handles_split_and_batched_chunks() {
        let mut decoder = ChunkDecoder::new();
        let mut wire = frame(r#"{"content":"Hel"}"#);
        wire.extend(frame(r#"{"content":"lo"}"#));

        let (first, rest) = wire.split_at(7);
        assert!(decoder.push(first).is_empty());
        let deltas: Vec<_> = decoder.push(rest).into_iter().map(Result::unwrap).collect();

        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].content.as_deref(), Some("Hel"));
        assert_eq!(deltas[1].content.as_deref(), Some("lo"));
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_decoder_error_message_chunk_is_server_error() {
        let mut decoder = ChunkDecoder::new();
        let out = decoder.push(&frame(r#"{"errorMessage":"model overloaded"}"#));
        assert_eq!(
            out,
            vec![Err(ChatStreamError::Server("model overloaded".into()))]
        );
    }

    #[test]
    fn test_decoder_finish_parses_unterminated_tail() {
        let mut decoder = ChunkDecoder::new();
        assert!(decoder.push(br#"{"content":"tail"}"#).is_empty());
        let tail = decoder.finish().unwrap().unwrap();
        assert_eq!(tail.content.as_deref(), Some("tail"));
    }

    #[tokio::test]
    async fn test_stream_decodes_in_order() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from(frame(r#"{"content":"a"}"#))),
            Ok(Bytes::from(frame(r#"{"content":"b","responseId":"r1"}"#))),
        ];
        let deltas: Vec<_> = decode_chat_stream(
            stream::iter(chunks),
            Duration::from_secs(5),
            CancellationToken::new(),
        )
        .collect()
        .await;

        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[1].as_ref().unwrap().response_id.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_stream_cancelled_before_data() {
        let token = CancellationToken::new();
        token.cancel();
        let deltas: Vec<_> = decode_chat_stream(
            stream::pending::<Result<Bytes, std::io::Error>>(),
            Duration::from_secs(5),
            token,
        )
        .collect()
        .await;
        assert_eq!(deltas, vec![Err(ChatStreamError::Aborted)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_idle_timeout() {
        let deltas: Vec<_> = decode_chat_stream(
            stream::pending::<Result<Bytes, std::io::Error>>(),
            Duration::from_secs(120),
            CancellationToken::new(),
        )
        .collect()
        .await;
        assert_eq!(deltas, vec![Err(ChatStreamError::Timeout)]);
    }
}
