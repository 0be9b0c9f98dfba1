use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::EpicContext;
use crate::conversations::ConversationAction;
use crate::conversations::models::{Conversation, ConversationPatch, Message, Rating};
use crate::conversations::services::{ChatRequest, ChatStreamError};
use crate::entities::EntityId;
use crate::entities::naming::{
    DEFAULT_CONVERSATION_NAME, is_default_name, name_from_first_message, unique_name,
};
use crate::settings::actions::ModelsAction;

const SAVE_FAILED_MESSAGE: &str = "Failed to save conversation.";

/// Start a send session over every selected conversation.
pub fn send_messages(ctx: &EpicContext, message: &Message, delete_count: usize) {
    ctx.dispatch(ConversationAction::CreateAbortController(
        CancellationToken::new(),
    ));
    let ids = ctx.read(|s| s.conversations.selected_ids.clone());
    for id in ids {
        ctx.dispatch(ConversationAction::SendMessage {
            id,
            message: message.clone(),
            delete_count,
            active_replay_index: None,
        });
    }
}

/// Id an unsaved conversation is stored under once it has its first exchange.
///
/// A default name is replaced by one derived from the first message.
fn promoted_id(ctx: &EpicContext, id: &EntityId, message: &Message) -> Option<EntityId> {
    if !id.is_local() {
        return None;
    }
    ctx.read(|s| {
        let conversation = s.conversations.conversation(id)?;
        let first_exchange = conversation.messages.iter().filter(|m| m.is_user()).count() == 1;
        let name = if first_exchange && is_default_name(&conversation.name, DEFAULT_CONVERSATION_NAME) {
            name_from_first_message(&message.content)
        } else {
            conversation.name.clone()
        };

        let target = id.promoted(s.conversations.bucket());
        let taken: Vec<String> = s
            .conversations
            .conversations
            .iter()
            .filter(|c| c.folder_id() == target.folder() && &c.id != id)
            .map(|c| c.name.clone())
            .collect();
        Some(target.with_name(unique_name(&name, taken.iter().map(String::as_str))))
    })
}

/// The exchange is already in the state. An unsaved conversation is stored under
/// its promoted id before the answer is requested.
pub fn send_message(ctx: &EpicContext, id: &EntityId, message: &Message) {
    let Some(new_id) = promoted_id(ctx, id, message) else {
        ctx.dispatch(ConversationAction::StreamMessage { id: id.clone() });
        return;
    };

    let Some(previous) = ctx.read(|s| s.conversations.conversation(id).cloned()) else {
        return;
    };
    let patch = ConversationPatch {
        id: Some(new_id.clone()),
        ..ConversationPatch::default()
    };
    let mut body = previous.clone();
    patch.apply(&mut body);
    ctx.dispatch(ConversationAction::UpdateConversationSuccess {
        id: id.clone(),
        conversation: patch,
    });

    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        match ctx.services().conversations.create(body).await {
            Ok(stored) => {
                info!(id = %stored.encode(), "Conversation stored");
                ctx.dispatch(ConversationAction::SaveConversationSuccess { id: new_id.clone() });
                ctx.dispatch(ConversationAction::StreamMessage { id: new_id });
            }
            Err(e) => {
                warn!(id = %new_id.encode(), error = ?e, "Failed to store new conversation");
                ctx.report(&e, SAVE_FAILED_MESSAGE);
                let local_id = previous.id.clone();
                ctx.dispatch(ConversationAction::UpdateConversationFail {
                    id: new_id,
                    previous: Box::new(previous),
                });
                ctx.dispatch(ConversationAction::StreamMessageFail {
                    id: local_id,
                    error: ChatStreamError::Client(SAVE_FAILED_MESSAGE.to_string()),
                });
            }
        }
    });
}

/// Stream the answer for the conversation's trailing placeholder, then persist it.
pub fn stream_message(ctx: &EpicContext, id: &EntityId) {
    let prepared = ctx.read(|s| {
        let conversation = s.conversations.conversation(id)?;
        let features = s.models.features(&conversation.model.id);
        let request =
            ChatRequest::from_conversation(conversation, &features, ctx.config().default_temperature);
        Some((
            request,
            conversation.model.id.clone(),
            s.conversations.abort_scope.clone(),
        ))
    });
    let Some((request, model_id, cancel)) = prepared else {
        return;
    };

    let id = id.clone();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        match run_stream(&ctx, &id, &request, cancel).await {
            Ok(()) => {
                debug!(id = %id.encode(), "Stream finished");
                ctx.dispatch(ConversationAction::StreamMessageSuccess { id: id.clone() });
                ctx.dispatch(ModelsAction::UpdateRecentModels { model_id });
            }
            Err(ChatStreamError::Aborted) => {
                debug!(id = %id.encode(), "Stream aborted");
                ctx.dispatch(ConversationAction::StreamMessageAborted { id: id.clone() });
            }
            Err(error) => {
                warn!(id = %id.encode(), error = %error, "Stream failed");
                if error == ChatStreamError::Unauthorized {
                    ctx.auth_required();
                }
                ctx.notify_error(error.user_message());
                ctx.dispatch(ConversationAction::StreamMessageFail {
                    id: id.clone(),
                    error,
                });
            }
        }
        ctx.dispatch(ConversationAction::SaveConversation { id });
    });
}

async fn run_stream(
    ctx: &EpicContext,
    id: &EntityId,
    request: &ChatRequest,
    cancel: CancellationToken,
) -> Result<(), ChatStreamError> {
    let mut deltas = ctx
        .services()
        .chat
        .stream_chat(request, ctx.config().stream_idle_timeout(), cancel)
        .await?;
    while let Some(delta) = deltas.next().await {
        ctx.dispatch(ConversationAction::MergeMessage {
            id: id.clone(),
            chunk: delta?,
        });
    }
    Ok(())
}

/// Cancel every stream of the current session; a running replay pauses.
pub fn stop_streaming(ctx: &EpicContext) {
    let (scope, replaying) = ctx.read(|s| {
        (
            s.conversations.abort_scope.clone(),
            s.conversations
                .selected_conversations()
                .iter()
                .any(|c| c.is_replay()),
        )
    });
    scope.cancel();
    if replaying {
        ctx.dispatch(ConversationAction::StopReplayConversation);
    }
}

/// Resend the last user message of every selected conversation, dropping what followed it.
pub fn regenerate(ctx: &EpicContext) {
    let resends: Vec<(EntityId, Message, usize)> = ctx.read(|s| {
        s.conversations
            .selected_conversations()
            .into_iter()
            .filter(|c| !c.is_message_streaming)
            .filter_map(last_user_turn)
            .collect()
    });
    if resends.is_empty() {
        return;
    }

    ctx.dispatch(ConversationAction::CreateAbortController(
        CancellationToken::new(),
    ));
    for (id, message, delete_count) in resends {
        ctx.dispatch(ConversationAction::SendMessage {
            id,
            message,
            delete_count,
            active_replay_index: None,
        });
    }
}

fn last_user_turn(conversation: &Conversation) -> Option<(EntityId, Message, usize)> {
    let index = conversation.messages.iter().rposition(Message::is_user)?;
    let mut message = conversation.messages[index].clone();
    message.settings = None;
    Some((
        conversation.id.clone(),
        message,
        conversation.messages.len() - index,
    ))
}

/// Send the rating for an answer; the optimistic value is rolled back on failure.
pub fn rate(
    ctx: &EpicContext,
    id: &EntityId,
    message_index: usize,
    rating: Option<Rating>,
    previous: Option<Conversation>,
) {
    let previous_rating = previous
        .as_ref()
        .and_then(|c| c.messages.get(message_index))
        .and_then(|m| m.like);
    let target = ctx.read(|s| {
        let conversation = s.conversations.conversation(id)?;
        let message = conversation.messages.get(message_index)?;
        let model_id = message
            .model
            .as_ref()
            .map(|m| m.id.clone())
            .unwrap_or_else(|| conversation.model.id.clone());
        Some((model_id, message.response_id.clone()))
    });
    let Some((model_id, response_id)) = target else {
        return;
    };

    let (Some(rating), Some(response_id)) = (rating, response_id) else {
        ctx.dispatch(ConversationAction::RateMessageSuccess {
            id: id.clone(),
            message_index,
        });
        ctx.dispatch(ConversationAction::SaveConversation { id: id.clone() });
        return;
    };

    let id = id.clone();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let result = ctx
            .services()
            .chat
            .rate(&id.encode(), &model_id, &response_id, rating.as_bool())
            .await;
        match result {
            Ok(()) => {
                ctx.dispatch(ConversationAction::RateMessageSuccess {
                    id: id.clone(),
                    message_index,
                });
                ctx.dispatch(ConversationAction::SaveConversation { id });
            }
            Err(e) => {
                warn!(id = %id.encode(), error = ?e, "Failed to rate message");
                if e.is_unauthorized() {
                    ctx.auth_required();
                }
                ctx.notify_error("Failed to rate the message.");
                ctx.dispatch(ConversationAction::RateMessageFail {
                    id,
                    message_index,
                    previous: previous_rating,
                });
            }
        }
    });
}
