use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::chat_stream::{ChatStreamError, DeltaStream, SERVER_ERROR_MESSAGE, decode_chat_stream};
use crate::conversations::models::{Conversation, CustomContent, Message, ModelRef, Role};
use crate::services::ApiClient;
use crate::services::api_client::error_message_from_body;
use crate::settings::models::ModelFeatures;

/// Message as sent to the chat endpoint: role, content and custom content only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_content: Option<CustomContent>,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            custom_content: message.custom_content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub model: ModelRef,
    pub messages: Vec<ChatMessage>,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_addons: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_model: Option<ModelRef>,
}

impl ChatRequest {
    /// Build the request for the conversation's current state.
    ///
    /// Settings the model does not support fall back to `default_temperature`
    /// and no addons. The trailing empty assistant placeholder is not sent.
    pub fn from_conversation(
        conversation: &Conversation,
        features: &ModelFeatures,
        default_temperature: f32,
    ) -> Self {
        let mut history: &[Message] = &conversation.messages;
        if let Some((last, rest)) = history.split_last() {
            if last.is_empty_placeholder() {
                history = rest;
            }
        }

        let prompt = (features.system_prompt && !conversation.prompt.is_empty())
            .then(|| conversation.prompt.clone());
        let temperature = if features.temperature {
            conversation.temperature
        } else {
            default_temperature
        };
        let selected_addons = if features.addons {
            conversation.selected_addons.clone()
        } else {
            Vec::new()
        };

        Self {
            model: conversation.model.clone(),
            messages: history.iter().map(ChatMessage::from).collect(),
            id: conversation.id.encode(),
            prompt,
            temperature: Some(temperature),
            selected_addons: Some(selected_addons),
            assistant_model: conversation
                .assistant_model_id
                .as_ref()
                .map(|id| ModelRef::new(id.clone())),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RateRequest<'a> {
    response_id: &'a str,
    model_id: &'a str,
    id: &'a str,
    value: bool,
}

/// Chat completion and rating endpoints.
#[derive(Clone)]
pub struct ChatService {
    api: ApiClient,
}

impl ChatService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Start a chat completion and return its decoded delta stream.
    ///
    /// `idle_timeout` bounds the wait for the response head, an error body and
    /// every chunk; `cancel` aborts any of them.
    pub async fn stream_chat(
        &self,
        request: &ChatRequest,
        idle_timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<DeltaStream, ChatStreamError> {
        debug!(conversation_id = %request.id, model = %request.model.id, "Starting chat stream");
        let send = self
            .api
            .streaming_request(Method::POST, "chat")
            .json(request)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatStreamError::Aborted),
            result = tokio::time::timeout(idle_timeout, send) => match result {
                Err(_) => return Err(ChatStreamError::Timeout),
                Ok(Err(e)) => return Err(ChatStreamError::Client(e.to_string())),
                Ok(Ok(response)) => response,
            },
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ChatStreamError::Unauthorized);
        }
        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ChatStreamError::Aborted),
                result = tokio::time::timeout(idle_timeout, response.text()) => match result {
                    Err(_) => return Err(ChatStreamError::Timeout),
                    Ok(body) => body.unwrap_or_default(),
                },
            };
            let message =
                error_message_from_body(&body).unwrap_or_else(|| SERVER_ERROR_MESSAGE.to_string());
            warn!(status = status.as_u16(), message = %message, "Chat request rejected");
            return Err(ChatStreamError::Server(message));
        }

        Ok(decode_chat_stream(
            response.bytes_stream(),
            idle_timeout,
            cancel,
        ))
    }

    pub async fn rate(
        &self,
        conversation_id: &str,
        model_id: &str,
        response_id: &str,
        value: bool,
    ) -> crate::services::ApiResult<()> {
        self.api
            .post(
                "rate",
                &RateRequest {
                    response_id,
                    model_id,
                    id: conversation_id,
                    value,
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::time::Instant;

    use super::*;
    use crate::entities::{ApiKind, EntityId, FolderPath};

    /// Answers with an error head and a truncated body, then goes silent.
    fn stalled_error_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut socket, _)) = listener.accept() {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request);
                let _ = socket.write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\n\
                      content-type: application/json\r\n\
                      content-length: 64\r\n\r\n{\"mess",
                );
                let _ = socket.flush();
                std::thread::sleep(Duration::from_secs(10));
            }
        });
        format!("http://{addr}")
    }

    fn request() -> ChatRequest {
        ChatRequest::from_conversation(&conversation(), &ModelFeatures::default(), 1.0)
    }

    fn conversation() -> Conversation {
        let id = EntityId::new(FolderPath::root(ApiKind::Conversations, "b"), "chat");
        let mut conv = Conversation::new(id, ModelRef::new("gpt-4"), 0.3);
        conv.prompt = "be brief".into();
        conv.selected_addons = vec!["search".into()];
        conv.messages = vec![
            Message::user("hi"),
            Message::assistant_placeholder(ModelRef::new("gpt-4")),
        ];
        conv
    }

    #[test]
    fn test_request_excludes_placeholder_and_keeps_supported_settings() {
        let features = ModelFeatures {
            system_prompt: true,
            temperature: true,
            addons: true,
            attachments: false,
        };
        let request = ChatRequest::from_conversation(&conversation(), &features, 1.0);

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.prompt.as_deref(), Some("be brief"));
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.selected_addons, Some(vec!["search".to_string()]));
        assert_eq!(request.id, "conversations/b/chat");
    }

    #[test]
    fn test_request_falls_back_for_unsupported_settings() {
        let features = ModelFeatures {
            system_prompt: false,
            temperature: false,
            addons: false,
            attachments: false,
        };
        let request = ChatRequest::from_conversation(&conversation(), &features, 1.0);

        assert_eq!(request.prompt, None);
        assert_eq!(request.temperature, Some(1.0));
        assert_eq!(request.selected_addons, Some(vec![]));

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("selectedAddons").is_some());
        assert!(json.get("prompt").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_stalled_error_body_times_out() {
        let api = ApiClient::new(stalled_error_server(), Duration::from_secs(30)).unwrap();
        let service = ChatService::new(api);

        let started = Instant::now();
        let result = service
            .stream_chat(&request(), Duration::from_millis(300), CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ChatStreamError::Timeout)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_stalled_error_body() {
        let api = ApiClient::new(stalled_error_server(), Duration::from_secs(30)).unwrap();
        let service = ChatService::new(api);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = service
            .stream_chat(&request(), Duration::from_secs(30), cancel)
            .await;

        assert!(matches!(result, Err(ChatStreamError::Aborted)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
