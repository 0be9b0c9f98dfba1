use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::conversation_controller::load_body;
use crate::app::{AppState, EpicContext};
use crate::conversations::ConversationAction;
use crate::conversations::models::{
    Conversation, ConversationMode, ConversationPatch, Message, PlaybackState, ReplayState,
};
use crate::entities::naming::{PLAYBACK_NAME_PREFIX, REPLAY_NAME_PREFIX, unique_name};
use crate::entities::{ApiKind, EntityId, FolderPath};
use crate::prompts::template::has_unresolved_variables;

enum ReplayStep {
    End,
    NeedsVariables,
    Send {
        message: Message,
        index: usize,
        delete_count: usize,
        replay_as_is: bool,
        scope_cancelled: bool,
    },
}

/// Load the sources, then build unsaved copies named `<prefix> <name>` with `mode` derived
/// from each source. Returns nothing when no source could be loaded.
async fn load_copies(
    ctx: &EpicContext,
    ids: &[EntityId],
    prefix: &str,
    mode: impl Fn(&Conversation) -> (ConversationMode, Option<Message>),
) -> Vec<Conversation> {
    let mut sources = Vec::with_capacity(ids.len());
    for id in ids {
        match load_body(ctx, id).await {
            Ok(source) => sources.push(source),
            Err(e) => ctx.report(&e, &format!("Failed to load conversation {}.", id.name())),
        }
    }

    ctx.read(|s: &AppState| {
        let local_root = FolderPath::local_root(ApiKind::Conversations);
        let mut taken = s.conversations.names_in_folder(&s.conversations.root_folder());
        taken.extend(s.conversations.names_in_folder(&local_root));

        sources
            .iter()
            .map(|source| {
                let name = unique_name(
                    &format!("{prefix} {}", source.name),
                    taken.iter().map(String::as_str),
                );
                taken.push(name.clone());

                let mut copy = Conversation::new(
                    EntityId::new(local_root.clone(), name),
                    source.model.clone(),
                    source.temperature,
                );
                copy.apply_settings(&source.settings());
                let (mode, first) = mode(source);
                if let Some(settings) = first.as_ref().and_then(|m| m.settings.as_ref()) {
                    copy.apply_settings(settings);
                }
                copy.mode = mode;
                copy
            })
            .collect()
    })
}

/// Copy each conversation and resend its user messages one at a time.
pub fn start_replay(ctx: &EpicContext, ids: &[EntityId], replay_as_is: bool) {
    let ids = ids.to_vec();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let copies = load_copies(&ctx, &ids, REPLAY_NAME_PREFIX, |source| {
            let stack: Vec<Message> = source
                .messages
                .iter()
                .filter(|m| m.is_user())
                .cloned()
                .collect();
            let first = replay_as_is.then(|| stack.first().cloned()).flatten();
            (
                ConversationMode::Replay(ReplayState::new(stack, replay_as_is)),
                first,
            )
        })
        .await;
        if copies.is_empty() {
            return;
        }

        info!(count = copies.len(), replay_as_is, "Starting replay");
        let copy_ids: Vec<EntityId> = copies.iter().map(|c| c.id.clone()).collect();
        ctx.dispatch(ConversationAction::AddConversations {
            conversations: copies,
            select: true,
        });
        ctx.dispatch(ConversationAction::CreateAbortController(
            CancellationToken::new(),
        ));
        for id in copy_ids {
            ctx.dispatch(ConversationAction::ReplayConversation {
                id,
                is_restart: false,
            });
        }
    });
}

/// Send the message under the replay cursor, or finish the replay.
pub fn replay_step(ctx: &EpicContext, id: &EntityId, is_restart: bool) {
    let step = ctx.read(|s| {
        let conversation = s.conversations.conversation(id)?;
        let replay = conversation.replay()?;
        if replay.is_finished() {
            return Some(ReplayStep::End);
        }
        let message = replay.current()?.clone();
        if has_unresolved_variables(&message.content) {
            return Some(ReplayStep::NeedsVariables);
        }
        let delete_count = if is_restart
            && conversation
                .messages
                .last()
                .is_some_and(Message::is_assistant)
        {
            2
        } else {
            0
        };
        Some(ReplayStep::Send {
            message,
            index: replay.active_replay_index,
            delete_count,
            replay_as_is: replay.replay_as_is,
            scope_cancelled: s.conversations.abort_scope.is_cancelled(),
        })
    });

    match step {
        None => {}
        Some(ReplayStep::End) => {
            info!(id = %id.encode(), "Replay finished");
            ctx.dispatch(ConversationAction::EndReplayConversation { id: id.clone() });
        }
        Some(ReplayStep::NeedsVariables) => {
            debug!(id = %id.encode(), "Replay waits for template variables");
            ctx.dispatch(ConversationAction::ReplayRequiresVariables { id: id.clone() });
        }
        Some(ReplayStep::Send {
            mut message,
            index,
            delete_count,
            replay_as_is,
            scope_cancelled,
        }) => {
            if scope_cancelled {
                ctx.dispatch(ConversationAction::CreateAbortController(
                    CancellationToken::new(),
                ));
            }
            match (replay_as_is, message.settings.take()) {
                (true, Some(settings)) => {
                    ctx.dispatch(ConversationAction::UpdateConversationSuccess {
                        id: id.clone(),
                        conversation: ConversationPatch::settings(&settings),
                    });
                    message.settings = Some(settings);
                }
                _ => message.settings = None,
            }
            ctx.dispatch(ConversationAction::SendMessage {
                id: id.clone(),
                message,
                delete_count,
                active_replay_index: Some(index),
            });
        }
    }
}

/// Called after a step finished: once nothing streams and the replay is not
/// paused, every conversation waiting for its next step advances together.
pub fn advance_replays(ctx: &EpicContext) {
    let ready: Vec<EntityId> = ctx.read(|s| {
        let conversations = &s.conversations;
        if conversations.is_replay_paused || conversations.is_any_streaming() {
            return Vec::new();
        }
        conversations
            .conversations
            .iter()
            .filter(|c| c.replay().is_some_and(|r| r.awaiting_next))
            .map(|c| c.id.clone())
            .collect()
    });
    if ready.is_empty() {
        return;
    }

    ctx.dispatch(ConversationAction::CreateAbortController(
        CancellationToken::new(),
    ));
    for id in ready {
        ctx.dispatch(ConversationAction::ReplayConversation {
            id,
            is_restart: false,
        });
    }
}

/// Cancel whatever the current session is running: streams or a pending playback step.
pub fn abort_session(ctx: &EpicContext) {
    ctx.read(|s| s.conversations.abort_scope.clone()).cancel();
}

/// Copy each conversation for step-by-step presentation of its recorded messages.
pub fn start_playback(ctx: &EpicContext, ids: &[EntityId]) {
    let ids = ids.to_vec();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        let copies = load_copies(&ctx, &ids, PLAYBACK_NAME_PREFIX, |source| {
            (
                ConversationMode::Playback(PlaybackState::new(source.messages.clone())),
                source.messages.first().cloned(),
            )
        })
        .await;
        if copies.is_empty() {
            return;
        }

        info!(count = copies.len(), "Starting playback");
        ctx.dispatch(ConversationAction::AddConversations {
            conversations: copies,
            select: true,
        });
    });
}

/// The reducer pushed the next recorded pair; reveal the answer after the step delay.
pub fn playback_next(ctx: &EpicContext) {
    let pending: Vec<EntityId> = ctx.read(|s| {
        s.conversations
            .selected_conversations()
            .into_iter()
            .filter(|c| c.is_playback() && c.is_message_streaming)
            .map(|c| c.id.clone())
            .collect()
    });
    if pending.is_empty() {
        return;
    }

    let token = CancellationToken::new();
    ctx.dispatch(ConversationAction::CreateAbortController(token.clone()));
    let delay = ctx.config().playback_step_delay();
    let task_ctx = ctx.clone();
    ctx.spawn(async move {
        let ctx = task_ctx;
        tokio::select! {
            _ = token.cancelled() => debug!("Playback step cancelled"),
            _ = tokio::time::sleep(delay) => {
                for id in pending {
                    ctx.dispatch(ConversationAction::PlaybackNextMessageEnd { id });
                }
            }
        }
    });
}
