use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use super::models::{Conversation, ConversationPatch, Message, MessageDelta, MessagePatch, Rating};
use super::services::ChatStreamError;
use crate::entities::{EntityId, Folder, FolderPath, IdRemap};

/// Every transition of the conversation slice.
///
/// Some variants only trigger work in the controller (the reducer ignores
/// them); their results come back as the matching `*Success` / `*Fail`.
#[derive(Debug, Clone)]
pub enum ConversationAction {
    Init,
    InitFoldersAndConversations,
    InitSuccess {
        folders: Vec<Folder>,
        conversations: Vec<Conversation>,
    },
    InitFail {
        message: String,
    },

    SelectConversations {
        ids: Vec<EntityId>,
    },
    UploadConversationsByIds {
        ids: Vec<EntityId>,
    },
    UploadConversationsByIdsSuccess {
        conversations: Vec<Conversation>,
        failed_ids: Vec<EntityId>,
    },
    AddConversations {
        conversations: Vec<Conversation>,
        select: bool,
    },
    /// Empty `names` creates one conversation with the next default name.
    CreateNewConversations {
        names: Vec<String>,
    },
    CreateNewConversationSuccess {
        conversations: Vec<Conversation>,
    },
    DuplicateConversation {
        id: EntityId,
    },

    UpdateConversation {
        id: EntityId,
        values: ConversationPatch,
    },
    UpdateConversationSuccess {
        id: EntityId,
        conversation: ConversationPatch,
    },
    /// Roll back to `previous`; `id` is the id the conversation currently has.
    UpdateConversationFail {
        id: EntityId,
        previous: Box<Conversation>,
    },
    SaveConversation {
        id: EntityId,
    },
    SaveConversationSuccess {
        id: EntityId,
    },
    SaveConversationFail {
        id: EntityId,
        message: String,
    },

    DeleteConversations {
        ids: Vec<EntityId>,
        suppress_notice: bool,
    },
    DeleteConversationsComplete {
        ids: Vec<EntityId>,
    },

    /// Install a fresh cancellation scope for the next send session.
    CreateAbortController(CancellationToken),

    /// Send `message` to every selected conversation.
    SendMessages {
        message: Message,
        delete_count: usize,
    },
    SendMessage {
        id: EntityId,
        message: Message,
        delete_count: usize,
        active_replay_index: Option<usize>,
    },
    StreamMessage {
        id: EntityId,
    },
    MergeMessage {
        id: EntityId,
        chunk: MessageDelta,
    },
    StreamMessageSuccess {
        id: EntityId,
    },
    StreamMessageAborted {
        id: EntityId,
    },
    StreamMessageFail {
        id: EntityId,
        error: ChatStreamError,
    },
    StopStreamMessage,
    UpdateMessage {
        id: EntityId,
        message_index: usize,
        values: MessagePatch,
    },
    DeleteMessage {
        id: EntityId,
        index: usize,
    },
    /// Resend the last user message of every selected conversation.
    RegenerateMessage,
    RateMessage {
        id: EntityId,
        message_index: usize,
        rating: Option<Rating>,
    },
    RateMessageSuccess {
        id: EntityId,
        message_index: usize,
    },
    RateMessageFail {
        id: EntityId,
        message_index: usize,
        previous: Option<Rating>,
    },
    ClearConversationMessages {
        id: EntityId,
    },

    ReplayConversations {
        ids: Vec<EntityId>,
        replay_as_is: bool,
    },
    ReplayConversation {
        id: EntityId,
        is_restart: bool,
    },
    ReplayRequiresVariables {
        id: EntityId,
    },
    StopReplayConversation,
    ResumeReplayWithVariables {
        id: EntityId,
        values: HashMap<String, String>,
    },
    EndReplayConversation {
        id: EntityId,
    },

    PlaybackConversations {
        ids: Vec<EntityId>,
    },
    PlaybackNextMessageStart,
    PlaybackNextMessageEnd {
        id: EntityId,
    },
    PlaybackPrevMessage,
    PlaybackStop,
    PlaybackCancel,

    SelectForCompare {
        id: EntityId,
    },
    SelectForCompareCompleted {
        conversation: Box<Conversation>,
    },
    SelectForCompareFail,

    CreateFolder {
        parent: Option<FolderPath>,
        name: Option<String>,
    },
    RenameFolder {
        id: FolderPath,
        name: String,
    },
    MoveFolder {
        id: FolderPath,
        parent: FolderPath,
    },
    DeleteFolder {
        id: FolderPath,
    },
    /// Rewrite folder and conversation ids in one step (rename/move and their rollback).
    ApplyIdRemap {
        remap: IdRemap,
    },
    UploadFoldersSuccess {
        folders: Vec<Folder>,
    },
    ToggleFolderCollapse {
        id: FolderPath,
    },

    SetChosenConversations {
        ids: Vec<EntityId>,
    },
    SetChosenFolders {
        ids: Vec<FolderPath>,
    },
    ResetChosen,
    DeleteChosen,
}
