use tokio_util::sync::CancellationToken;

use super::conversation::{Conversation, ConversationMode, ConversationPatch};
use super::message::{Message, Rating};
use crate::conversations::actions::ConversationAction;
use crate::entities::folders::{self, apply_folder_remap, merge_folders};
use crate::entities::naming::{self, DEFAULT_FOLDER_NAME};
use crate::entities::{ApiKind, EntityId, Folder, FolderPath, IdRemap, LoadStatus};
use crate::prompts::template;

/// State of the conversation slice. Written only by [`ConversationsState::reduce`].
#[derive(Debug, Clone)]
pub struct ConversationsState {
    pub conversations: Vec<Conversation>,
    pub folders: Vec<Folder>,
    /// Insertion ordered, never contains duplicates. Two ids means compare mode.
    pub selected_ids: Vec<EntityId>,
    pub selected_loaded: bool,
    pub status: LoadStatus,
    pub chosen_conversation_ids: Vec<EntityId>,
    pub chosen_folder_ids: Vec<FolderPath>,
    pub collapsed_folder_ids: Vec<FolderPath>,
    /// Cancels every stream started in the current send session.
    pub abort_scope: CancellationToken,
    pub is_replay_paused: bool,
    pub is_replay_requires_variables: bool,
    pub compare_loading: bool,
    bucket: String,
}

impl ConversationsState {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            conversations: Vec::new(),
            folders: Vec::new(),
            selected_ids: Vec::new(),
            selected_loaded: false,
            status: LoadStatus::NotLoaded,
            chosen_conversation_ids: Vec::new(),
            chosen_folder_ids: Vec::new(),
            collapsed_folder_ids: Vec::new(),
            abort_scope: CancellationToken::new(),
            is_replay_paused: false,
            is_replay_requires_variables: false,
            compare_loading: false,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Root folder of the user's own conversations.
    pub fn root_folder(&self) -> FolderPath {
        FolderPath::root(ApiKind::Conversations, self.bucket.clone())
    }

    pub fn conversation(&self, id: &EntityId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.id == id)
    }

    pub fn conversation_mut(&mut self, id: &EntityId) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| &c.id == id)
    }

    pub fn selected_conversations(&self) -> Vec<&Conversation> {
        self.selected_ids
            .iter()
            .filter_map(|id| self.conversation(id))
            .collect()
    }

    pub fn is_compare_mode(&self) -> bool {
        self.selected_ids.len() == 2
    }

    pub fn is_any_streaming(&self) -> bool {
        self.conversations.iter().any(|c| c.is_message_streaming)
    }

    /// Names of conversations directly inside `folder`.
    pub fn names_in_folder(&self, folder: &FolderPath) -> Vec<String> {
        self.conversations
            .iter()
            .filter(|c| c.folder_id() == folder)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn folder(&self, id: &FolderPath) -> Option<&Folder> {
        self.folders.iter().find(|f| &f.id == id)
    }

    /// Every conversation under `folder` at any depth.
    pub fn conversations_in_folder(&self, folder: &FolderPath) -> Vec<&Conversation> {
        folders::entities_in_folder(&self.conversations, folder)
    }

    pub fn reduce(&mut self, action: &ConversationAction) {
        use ConversationAction as A;

        match action {
            A::Init => self.status = LoadStatus::Loading,
            A::InitSuccess {
                folders,
                conversations,
            } => {
                merge_folders(&mut self.folders, folders.iter().cloned());
                for conversation in conversations {
                    self.merge_header(conversation.clone());
                }
                self.status = LoadStatus::Loaded;
            }
            A::InitFail { .. } => self.status = LoadStatus::Failed,

            A::SelectConversations { ids } => {
                self.selected_ids = dedupe(ids);
                self.selected_loaded = false;
            }
            A::UploadConversationsByIds { ids } => {
                for conversation in self.conversations.iter_mut().filter(|c| ids.contains(&c.id)) {
                    if conversation.status != LoadStatus::Loaded {
                        conversation.status = LoadStatus::Loading;
                    }
                }
            }
            A::UploadConversationsByIdsSuccess {
                conversations,
                failed_ids,
            } => {
                for conversation in conversations {
                    let mut loaded = conversation.clone();
                    loaded.status = LoadStatus::Loaded;
                    self.upsert(loaded);
                }
                for conversation in self
                    .conversations
                    .iter_mut()
                    .filter(|c| failed_ids.contains(&c.id))
                {
                    conversation.status = LoadStatus::Failed;
                }
                self.selected_loaded = self.selection_settled();
            }
            A::AddConversations {
                conversations,
                select,
            } => {
                self.add_conversations(conversations);
                if *select {
                    let ids: Vec<EntityId> = conversations.iter().map(|c| c.id.clone()).collect();
                    self.selected_ids = dedupe(&ids);
                    self.selected_loaded = true;
                }
            }
            A::CreateNewConversationSuccess { conversations } => {
                self.add_conversations(conversations);
                let ids: Vec<EntityId> = conversations.iter().map(|c| c.id.clone()).collect();
                self.selected_ids = dedupe(&ids);
                self.selected_loaded = true;
            }
            A::UpdateConversation { id, values } => {
                // Identity changes wait for the controller to derive the new id.
                let optimistic = ConversationPatch {
                    id: None,
                    name: None,
                    folder: None,
                    ..values.clone()
                };
                if let Some(conversation) = self.conversation_mut(id) {
                    optimistic.apply(conversation);
                }
            }
            A::UpdateConversationSuccess { id, conversation } => {
                if let Some(existing) = self.conversation_mut(id) {
                    conversation.apply(existing);
                    existing.touch();
                }
                if let Some(new_id) = &conversation.id {
                    if new_id != id {
                        self.remap_entity(id, new_id);
                    }
                }
            }
            A::UpdateConversationFail { id, previous } => {
                let restored = previous.as_ref().clone();
                let previous_id = restored.id.clone();
                match self.conversations.iter_mut().find(|c| &c.id == id) {
                    Some(slot) => *slot = restored,
                    None => self.conversations.push(restored),
                }
                if &previous_id != id {
                    self.conversations
                        .retain(|c| &c.id != id || c.id == previous_id);
                    self.remap_entity(id, &previous_id);
                }
            }
            A::SaveConversationSuccess { id } => {
                // The backend creates folders implicitly once something is stored in them.
                let folder = id.folder().clone();
                for f in self.folders.iter_mut().filter(|f| f.id.contains(&folder)) {
                    f.temporary = false;
                }
            }
            A::DeleteConversationsComplete { ids } => {
                self.conversations.retain(|c| !ids.contains(&c.id));
                self.selected_ids.retain(|id| !ids.contains(id));
                self.chosen_conversation_ids.retain(|id| !ids.contains(id));
            }
            A::CreateAbortController(token) => self.abort_scope = token.clone(),

            A::SendMessage {
                id,
                message,
                delete_count,
                active_replay_index,
            } => {
                if let Some(conversation) = self.conversation_mut(id) {
                    append_exchange(conversation, message, *delete_count);
                    if let (Some(index), Some(replay)) =
                        (active_replay_index, conversation.replay_mut())
                    {
                        replay.active_replay_index = *index;
                        replay.awaiting_next = false;
                        replay.is_error = false;
                    }
                }
            }
            A::MergeMessage { id, chunk } => {
                if let Some(last) = self
                    .conversation_mut(id)
                    .and_then(|c| c.messages.last_mut())
                    .filter(|m| m.is_assistant())
                {
                    last.merge_delta(chunk);
                }
            }
            A::StreamMessageSuccess { id } => {
                if let Some(conversation) = self.conversation_mut(id) {
                    conversation.is_message_streaming = false;
                    if let Some(replay) = conversation.replay_mut() {
                        replay.awaiting_next = true;
                    }
                }
            }
            A::StreamMessageAborted { id } => {
                if let Some(conversation) = self.conversation_mut(id) {
                    conversation.is_message_streaming = false;
                }
            }
            A::StreamMessageFail { id, error } => {
                let mut replay_failed = false;
                if let Some(conversation) = self.conversation_mut(id) {
                    conversation.is_message_streaming = false;
                    if let Some(last) = conversation.messages.last_mut() {
                        last.error_message = Some(error.user_message());
                    }
                    if let Some(replay) = conversation.replay_mut() {
                        replay.is_error = true;
                        replay.awaiting_next = false;
                        replay_failed = true;
                    }
                }
                if replay_failed {
                    self.is_replay_paused = true;
                }
            }
            A::UpdateMessage {
                id,
                message_index,
                values,
            } => {
                if let Some(message) = self
                    .conversation_mut(id)
                    .and_then(|c| c.messages.get_mut(*message_index))
                {
                    values.apply(message);
                }
            }
            A::DeleteMessage { id, index } => {
                if let Some(conversation) = self.conversation_mut(id) {
                    delete_message_pair(&mut conversation.messages, *index);
                }
            }
            A::RateMessage {
                id,
                message_index,
                rating,
            } => self.set_rating(id, *message_index, *rating),
            A::RateMessageFail {
                id,
                message_index,
                previous,
            } => self.set_rating(id, *message_index, *previous),
            A::ClearConversationMessages { id } => {
                if let Some(conversation) = self.conversation_mut(id) {
                    conversation.messages.clear();
                    conversation.mode = ConversationMode::Normal;
                }
            }

            A::ReplayConversation { id, is_restart } => {
                self.is_replay_paused = false;
                self.is_replay_requires_variables = false;
                if let Some(replay) = self.conversation_mut(id).and_then(|c| c.replay_mut()) {
                    // A finished step moves the cursor; a restart re-runs the current one.
                    if replay.awaiting_next && !is_restart {
                        replay.active_replay_index += 1;
                    }
                    replay.is_error = false;
                    replay.awaiting_next = false;
                }
            }
            A::ReplayRequiresVariables { .. } => {
                self.is_replay_requires_variables = true;
                self.is_replay_paused = true;
            }
            A::StopReplayConversation => self.is_replay_paused = true,
            A::ResumeReplayWithVariables { id, values } => {
                if let Some(replay) = self.conversation_mut(id).and_then(|c| c.replay_mut()) {
                    let index = replay.active_replay_index;
                    if let Some(message) = replay.replay_user_messages_stack.get_mut(index) {
                        message.content = template::apply_variables(&message.content, values);
                    }
                }
                self.is_replay_requires_variables = false;
            }
            A::EndReplayConversation { id } => {
                if let Some(conversation) = self.conversation_mut(id) {
                    if conversation.is_replay() {
                        conversation.mode = ConversationMode::Normal;
                    }
                }
                if !self.conversations.iter().any(Conversation::is_replay) {
                    self.is_replay_paused = false;
                    self.is_replay_requires_variables = false;
                }
            }

            A::PlaybackNextMessageStart => {
                for id in self.selected_ids.clone() {
                    if let Some(conversation) = self.conversation_mut(&id) {
                        playback_step_start(conversation);
                    }
                }
            }
            A::PlaybackNextMessageEnd { id } => {
                if let Some(conversation) = self.conversation_mut(id) {
                    playback_step_end(conversation);
                }
            }
            A::PlaybackPrevMessage => {
                for id in self.selected_ids.clone() {
                    if let Some(conversation) = self.conversation_mut(&id) {
                        playback_step_back(conversation);
                    }
                }
            }
            A::PlaybackCancel => {
                for id in self.selected_ids.clone() {
                    if let Some(conversation) = self.conversation_mut(&id) {
                        cancel_pending_step(conversation);
                    }
                }
            }
            A::PlaybackStop => {
                for id in self.selected_ids.clone() {
                    if let Some(conversation) = self.conversation_mut(&id) {
                        cancel_pending_step(conversation);
                        if conversation.is_playback() {
                            conversation.mode = ConversationMode::Normal;
                        }
                    }
                }
            }

            A::SelectForCompare { .. } => self.compare_loading = true,
            A::SelectForCompareCompleted { conversation } => {
                self.compare_loading = false;
                let mut candidate = conversation.as_ref().clone();
                candidate.status = LoadStatus::Loaded;
                let candidate_id = candidate.id.clone();
                self.upsert(candidate);
                let mut selection: Vec<EntityId> = self.selected_ids.iter().take(1).cloned().collect();
                selection.push(candidate_id);
                self.selected_ids = dedupe(&selection);
                self.selected_loaded = true;
            }
            A::SelectForCompareFail => self.compare_loading = false,

            A::CreateFolder { parent, name } => {
                let parent = parent.clone().unwrap_or_else(|| self.root_folder());
                let siblings: Vec<String> = folders::child_folders(&self.folders, &parent)
                    .iter()
                    .map(|f| f.name.clone())
                    .collect();
                let name = match name.as_deref().map(naming::prepare_entity_name) {
                    Some(name) if !name.is_empty() => {
                        naming::unique_name(&name, siblings.iter().map(String::as_str))
                    }
                    _ => naming::next_default_name(
                        DEFAULT_FOLDER_NAME,
                        siblings.iter().map(String::as_str),
                        0,
                    ),
                };
                self.folders.push(Folder::temporary(parent.child(name)));
            }
            A::DeleteFolder { id } => {
                self.folders.retain(|f| !id.contains(&f.id));
                self.chosen_folder_ids.retain(|f| !id.contains(f));
                self.collapsed_folder_ids.retain(|f| !id.contains(f));
            }
            A::ApplyIdRemap { remap } => self.apply_remap(remap),
            A::UploadFoldersSuccess { folders } => {
                merge_folders(&mut self.folders, folders.iter().cloned());
            }
            A::ToggleFolderCollapse { id } => {
                if let Some(pos) = self.collapsed_folder_ids.iter().position(|f| f == id) {
                    self.collapsed_folder_ids.remove(pos);
                } else {
                    self.collapsed_folder_ids.push(id.clone());
                }
            }

            A::SetChosenConversations { ids } => self.chosen_conversation_ids = dedupe(ids),
            A::SetChosenFolders { ids } => self.chosen_folder_ids = dedupe(ids),
            A::ResetChosen => {
                self.chosen_conversation_ids.clear();
                self.chosen_folder_ids.clear();
            }

            A::InitFoldersAndConversations
            | A::CreateNewConversations { .. }
            | A::DuplicateConversation { .. }
            | A::SaveConversation { .. }
            | A::SaveConversationFail { .. }
            | A::DeleteConversations { .. }
            | A::SendMessages { .. }
            | A::StreamMessage { .. }
            | A::StopStreamMessage
            | A::RegenerateMessage
            | A::RateMessageSuccess { .. }
            | A::ReplayConversations { .. }
            | A::PlaybackConversations { .. }
            | A::RenameFolder { .. }
            | A::MoveFolder { .. }
            | A::DeleteChosen => {}
        }
    }

    /// Merge semantics for explicit additions: incoming wins per id. When the batch
    /// carries a local conversation, other outstanding local ones are dropped.
    fn add_conversations(&mut self, incoming: &[Conversation]) {
        if incoming.iter().any(|c| c.id.is_local()) {
            self.conversations
                .retain(|c| !c.id.is_local() || incoming.iter().any(|i| i.id == c.id));
            let conversations = &self.conversations;
            self.selected_ids
                .retain(|id| !id.is_local() || conversations.iter().any(|c| &c.id == id));
        }
        for conversation in incoming {
            self.upsert(conversation.clone());
        }
    }

    fn upsert(&mut self, conversation: Conversation) {
        match self.conversations.iter_mut().find(|c| c.id == conversation.id) {
            Some(slot) => *slot = conversation,
            None => self.conversations.push(conversation),
        }
    }

    /// Listing headers never overwrite a body that is already resident.
    fn merge_header(&mut self, header: Conversation) {
        match self.conversations.iter_mut().find(|c| c.id == header.id) {
            Some(existing) if existing.is_loaded() => {}
            Some(slot) => *slot = header,
            None => self.conversations.push(header),
        }
    }

    fn set_rating(&mut self, id: &EntityId, index: usize, rating: Option<Rating>) {
        if let Some(message) = self
            .conversation_mut(id)
            .and_then(|c| c.messages.get_mut(index))
        {
            message.like = rating;
        }
    }

    /// Every selected conversation is resident and done loading; a failed body counts as done.
    fn selection_settled(&self) -> bool {
        self.selected_ids.iter().all(|id| {
            self.conversation(id)
                .is_some_and(|c| matches!(c.status, LoadStatus::Loaded | LoadStatus::Failed))
        })
    }

    fn remap_entity(&mut self, old: &EntityId, new: &EntityId) {
        for id in self
            .selected_ids
            .iter_mut()
            .chain(self.chosen_conversation_ids.iter_mut())
        {
            if id == old {
                *id = new.clone();
            }
        }
        self.selected_ids = dedupe(&self.selected_ids);
    }

    fn apply_remap(&mut self, remap: &IdRemap) {
        apply_folder_remap(&mut self.folders, remap);
        for conversation in &mut self.conversations {
            if let Some(new_id) = remap.entity(&conversation.id) {
                conversation.id = new_id.clone();
            }
        }
        for (old, new) in &remap.entities {
            self.remap_entity(old, new);
        }
        for folder in self
            .chosen_folder_ids
            .iter_mut()
            .chain(self.collapsed_folder_ids.iter_mut())
        {
            if let Some(new_id) = remap.folder(folder) {
                *folder = new_id.clone();
            }
        }
        // Entities may now sit in folders the tree does not know yet (rollback).
        let implied: Vec<Folder> = self
            .conversations
            .iter()
            .flat_map(|c| folders::folders_for_entity(c.folder_id()))
            .filter(|f| !f.id.is_local())
            .collect();
        for folder in implied {
            if !self.folders.iter().any(|f| f.id == folder.id) {
                self.folders.push(folder);
            }
        }
    }

    pub(crate) fn mark_shared(&mut self, ids: &[EntityId], shared: bool) {
        for conversation in self.conversations.iter_mut().filter(|c| ids.contains(&c.id)) {
            conversation.is_shared = shared;
        }
    }

    pub(crate) fn add_shared_with_me(&mut self, incoming: &[Conversation]) {
        for conversation in incoming {
            let mut shared = conversation.clone();
            shared.shared_with_me = true;
            self.merge_header(shared);
        }
    }

    pub(crate) fn remove(&mut self, ids: &[EntityId]) {
        self.reduce(&ConversationAction::DeleteConversationsComplete { ids: ids.to_vec() });
    }
}

fn dedupe<T: PartialEq + Clone>(ids: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}

/// Optimistic half of the send cycle: user message plus empty assistant placeholder.
fn append_exchange(conversation: &mut Conversation, message: &Message, delete_count: usize) {
    let keep = conversation.messages.len().saturating_sub(delete_count);
    conversation.messages.truncate(keep);

    let mut user = message.clone();
    if user.settings.is_none() {
        user.settings = Some(conversation.settings());
    }
    conversation.messages.push(user);
    conversation
        .messages
        .push(Message::assistant_placeholder(conversation.model.clone()));
    conversation.is_message_streaming = true;
    conversation.touch();
}

/// Remove a message together with its pair so no assistant answer is orphaned.
fn delete_message_pair(messages: &mut Vec<Message>, index: usize) {
    let Some(message) = messages.get(index) else {
        return;
    };
    if message.is_user() {
        let end = match messages.get(index + 1) {
            Some(next) if next.is_assistant() => index + 2,
            _ => index + 1,
        };
        messages.drain(index..end);
    } else if message.is_assistant() {
        let start = match index.checked_sub(1).and_then(|i| messages.get(i)) {
            Some(prev) if prev.is_user() => index - 1,
            _ => index,
        };
        messages.drain(start..=index);
    } else {
        messages.remove(index);
    }
}

fn playback_step_start(conversation: &mut Conversation) {
    if conversation.is_message_streaming {
        return;
    }
    let Some(playback) = conversation.playback() else {
        return;
    };
    let index = playback.active_playback_index;
    let Some(user) = playback.messages_stack.get(index).cloned() else {
        return;
    };
    let recorded_answer = playback
        .messages_stack
        .get(index + 1)
        .filter(|m| m.is_assistant())
        .cloned();

    if let Some(settings) = &user.settings {
        conversation.apply_settings(settings);
    }
    conversation.messages.push(user);
    match recorded_answer {
        Some(answer) => {
            let model = answer.model.unwrap_or_else(|| conversation.model.clone());
            conversation.messages.push(Message::assistant_placeholder(model));
            conversation.is_message_streaming = true;
        }
        None => {
            if let Some(playback) = conversation.playback_mut() {
                playback.active_playback_index += 1;
            }
        }
    }
}

fn playback_step_end(conversation: &mut Conversation) {
    if !conversation.is_message_streaming {
        return;
    }
    let Some(playback) = conversation.playback_mut() else {
        return;
    };
    let index = playback.active_playback_index;
    let Some(answer) = playback.messages_stack.get(index + 1).cloned() else {
        return;
    };
    playback.active_playback_index += 2;
    if let Some(last) = conversation.messages.last_mut() {
        *last = answer;
    }
    conversation.is_message_streaming = false;
}

fn playback_step_back(conversation: &mut Conversation) {
    if conversation.is_message_streaming {
        return;
    }
    let Some(playback) = conversation.playback_mut() else {
        return;
    };
    let index = playback.active_playback_index;
    if index == 0 {
        return;
    }
    let step = if index >= 2 && playback.messages_stack[index - 1].is_assistant() {
        2
    } else {
        1
    };
    playback.active_playback_index = index - step;
    let new_index = playback.active_playback_index;
    let settings = new_index
        .checked_sub(2)
        .and_then(|i| playback.messages_stack.get(i))
        .and_then(|m| m.settings.clone());

    let keep = conversation.messages.len().saturating_sub(step);
    conversation.messages.truncate(keep);
    if let Some(settings) = settings {
        conversation.apply_settings(&settings);
    }
}

fn cancel_pending_step(conversation: &mut Conversation) {
    if conversation.is_playback() && conversation.is_message_streaming {
        let keep = conversation.messages.len().saturating_sub(2);
        conversation.messages.truncate(keep);
        conversation.is_message_streaming = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversations::models::{
        MessageDelta, MessageSettings, ModelRef, PlaybackState, ReplayState,
    };
    use crate::conversations::services::ChatStreamError;

    fn root() -> FolderPath {
        FolderPath::root(ApiKind::Conversations, "user")
    }

    fn conv(name: &str) -> Conversation {
        Conversation::new(EntityId::new(root(), name), ModelRef::new("gpt"), 1.0)
    }

    fn local(name: &str) -> Conversation {
        Conversation::new(
            EntityId::new(FolderPath::local_root(ApiKind::Conversations), name),
            ModelRef::new("gpt"),
            1.0,
        )
    }

    fn state_with(conversations: Vec<Conversation>) -> ConversationsState {
        let mut state = ConversationsState::new("user");
        state.reduce(&ConversationAction::AddConversations {
            conversations,
            select: false,
        });
        state
    }

    #[test]
    fn test_select_dedupes_and_resets_loaded() {
        let a = conv("a");
        let mut state = state_with(vec![a.clone()]);
        state.selected_loaded = true;
        state.reduce(&ConversationAction::SelectConversations {
            ids: vec![a.id.clone(), a.id.clone()],
        });
        assert_eq!(state.selected_ids, vec![a.id.clone()]);
        assert!(!state.selected_loaded);
    }

    #[test]
    fn test_upload_outside_selection_keeps_selection_pending() {
        let (a, b) = (conv("a"), conv("b"));
        let header = |c: &Conversation| Conversation {
            status: LoadStatus::NotLoaded,
            messages: Vec::new(),
            ..c.clone()
        };
        let mut state = state_with(vec![header(&a), header(&b)]);
        state.reduce(&ConversationAction::SelectConversations {
            ids: vec![a.id.clone()],
        });

        state.reduce(&ConversationAction::UploadConversationsByIdsSuccess {
            conversations: vec![b.clone()],
            failed_ids: vec![],
        });
        assert!(!state.selected_loaded);

        state.reduce(&ConversationAction::UploadConversationsByIdsSuccess {
            conversations: vec![a.clone()],
            failed_ids: vec![],
        });
        assert!(state.selected_loaded);
    }

    #[test]
    fn test_compare_mode_only_with_two_selected() {
        let (a, b, c) = (conv("a"), conv("b"), conv("c"));
        let mut state = state_with(vec![a.clone(), b.clone(), c.clone()]);
        for (ids, expected) in [
            (vec![], false),
            (vec![a.id.clone()], false),
            (vec![a.id.clone(), b.id.clone()], true),
            (vec![a.id.clone(), b.id.clone(), c.id.clone()], false),
        ] {
            state.reduce(&ConversationAction::SelectConversations { ids });
            assert_eq!(state.is_compare_mode(), expected);
        }
    }

    #[test]
    fn test_add_local_drops_other_local_conversations() {
        let old_local = local("Conversation");
        let persisted = conv("kept");
        let mut state = state_with(vec![old_local.clone(), persisted.clone()]);
        state.selected_ids = vec![old_local.id.clone()];

        let new_local = local("Conversation 1");
        state.reduce(&ConversationAction::AddConversations {
            conversations: vec![new_local.clone()],
            select: false,
        });

        assert!(state.conversation(&old_local.id).is_none());
        assert!(state.conversation(&persisted.id).is_some());
        assert!(state.conversation(&new_local.id).is_some());
        assert!(state.selected_ids.is_empty());
    }

    #[test]
    fn test_add_merges_by_id_last_write_wins() {
        let a = conv("a");
        let mut state = state_with(vec![a.clone()]);
        let mut updated = a.clone();
        updated.prompt = "be brief".into();
        state.reduce(&ConversationAction::AddConversations {
            conversations: vec![updated],
            select: true,
        });
        assert_eq!(state.conversations.len(), 1);
        assert_eq!(state.conversations[0].prompt, "be brief");
        assert_eq!(state.selected_ids, vec![a.id]);
    }

    #[test]
    fn test_update_success_remaps_selection() {
        let a = conv("a");
        let mut state = state_with(vec![a.clone()]);
        state.selected_ids = vec![a.id.clone()];
        let new_id = a.id.with_name("renamed");

        state.reduce(&ConversationAction::UpdateConversationSuccess {
            id: a.id.clone(),
            conversation: ConversationPatch {
                id: Some(new_id.clone()),
                ..ConversationPatch::default()
            },
        });

        assert_eq!(state.selected_ids, vec![new_id.clone()]);
        assert_eq!(state.conversation(&new_id).unwrap().name, "renamed");
    }

    #[test]
    fn test_update_fail_restores_previous() {
        let a = conv("a");
        let mut state = state_with(vec![a.clone()]);
        state.selected_ids = vec![a.id.clone()];
        let new_id = a.id.with_name("moved");
        state.reduce(&ConversationAction::UpdateConversationSuccess {
            id: a.id.clone(),
            conversation: ConversationPatch {
                id: Some(new_id.clone()),
                ..ConversationPatch::default()
            },
        });

        state.reduce(&ConversationAction::UpdateConversationFail {
            id: new_id.clone(),
            previous: Box::new(a.clone()),
        });

        assert_eq!(state.conversations.len(), 1);
        assert!(state.conversation(&a.id).is_some());
        assert_eq!(state.selected_ids, vec![a.id]);
    }

    #[test]
    fn test_send_appends_pair_and_streams() {
        let mut a = conv("a");
        a.messages = vec![Message::user("hi"), Message::assistant("hello")];
        let mut state = state_with(vec![a.clone()]);

        state.reduce(&ConversationAction::SendMessage {
            id: a.id.clone(),
            message: Message::user("hello"),
            delete_count: 0,
            active_replay_index: None,
        });

        let updated = state.conversation(&a.id).unwrap();
        assert_eq!(updated.messages.len(), 4);
        assert!(updated.is_message_streaming);
        assert!(updated.messages[3].is_empty_placeholder());
        assert_eq!(
            updated.messages[2].settings.as_ref().unwrap().model_id,
            "gpt"
        );

        state.reduce(&ConversationAction::MergeMessage {
            id: a.id.clone(),
            chunk: MessageDelta::text("answer"),
        });
        state.reduce(&ConversationAction::StreamMessageSuccess { id: a.id.clone() });
        let updated = state.conversation(&a.id).unwrap();
        assert!(!updated.is_message_streaming);
        assert_eq!(updated.messages[3].content, "answer");
    }

    #[test]
    fn test_stream_fail_records_error_and_halts_replay() {
        let mut a = conv("a");
        a.mode = ConversationMode::Replay(ReplayState::new(vec![Message::user("q")], false));
        let mut state = state_with(vec![a.clone()]);
        state.reduce(&ConversationAction::SendMessage {
            id: a.id.clone(),
            message: Message::user("q"),
            delete_count: 0,
            active_replay_index: Some(0),
        });
        state.reduce(&ConversationAction::StreamMessageFail {
            id: a.id.clone(),
            error: ChatStreamError::Timeout,
        });

        let updated = state.conversation(&a.id).unwrap();
        assert!(!updated.is_message_streaming);
        assert!(updated.messages.last().unwrap().error_message.is_some());
        assert!(updated.replay().unwrap().is_error);
        assert!(state.is_replay_paused);
    }

    #[test]
    fn test_replay_advances_only_after_finished_step() {
        let mut a = conv("a");
        a.mode = ConversationMode::Replay(ReplayState::new(
            vec![Message::user("1"), Message::user("2")],
            false,
        ));
        let mut state = state_with(vec![a.clone()]);
        let replay_index = |state: &ConversationsState| {
            state.conversation(&a.id).unwrap().replay().unwrap().active_replay_index
        };

        state.reduce(&ConversationAction::ReplayConversation {
            id: a.id.clone(),
            is_restart: false,
        });
        assert_eq!(replay_index(&state), 0);

        state.reduce(&ConversationAction::SendMessage {
            id: a.id.clone(),
            message: Message::user("1"),
            delete_count: 0,
            active_replay_index: Some(0),
        });
        state.reduce(&ConversationAction::StreamMessageSuccess { id: a.id.clone() });
        state.reduce(&ConversationAction::ReplayConversation {
            id: a.id.clone(),
            is_restart: true,
        });
        assert_eq!(replay_index(&state), 0);

        state.reduce(&ConversationAction::StreamMessageSuccess { id: a.id.clone() });
        state.reduce(&ConversationAction::ReplayConversation {
            id: a.id.clone(),
            is_restart: false,
        });
        assert_eq!(replay_index(&state), 1);
        assert!(!state.is_replay_paused);
    }

    #[test]
    fn test_delete_message_keeps_pairs() {
        let mut a = conv("a");
        a.messages = vec![
            Message::user("1"),
            Message::assistant("1"),
            Message::user("2"),
            Message::assistant("2"),
        ];
        let mut state = state_with(vec![a.clone()]);

        state.reduce(&ConversationAction::DeleteMessage {
            id: a.id.clone(),
            index: 3,
        });
        let messages = &state.conversation(&a.id).unwrap().messages;
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_assistant());

        state.reduce(&ConversationAction::DeleteMessage {
            id: a.id.clone(),
            index: 0,
        });
        assert!(state.conversation(&a.id).unwrap().messages.is_empty());
    }

    #[test]
    fn test_delete_complete_prunes_selection() {
        let (a, b) = (conv("a"), conv("b"));
        let mut state = state_with(vec![a.clone(), b.clone()]);
        state.selected_ids = vec![a.id.clone(), b.id.clone()];
        state.reduce(&ConversationAction::DeleteConversationsComplete {
            ids: vec![a.id.clone()],
        });
        assert_eq!(state.selected_ids, vec![b.id]);
        assert_eq!(state.conversations.len(), 1);
    }

    #[test]
    fn test_abort_controller_is_replaced() {
        let mut state = ConversationsState::new("user");
        let old = state.abort_scope.clone();
        let fresh = CancellationToken::new();
        state.reduce(&ConversationAction::CreateAbortController(fresh.clone()));
        old.cancel();
        assert!(!state.abort_scope.is_cancelled());
        fresh.cancel();
        assert!(state.abort_scope.is_cancelled());
    }

    fn settings_for(model_id: &str) -> MessageSettings {
        MessageSettings {
            model_id: model_id.into(),
            prompt: String::new(),
            temperature: 1.0,
            selected_addons: vec![],
            assistant_model_id: None,
        }
    }

    fn playback_conversation() -> Conversation {
        let mut first = Message::user("q1");
        first.settings = Some(settings_for("m1"));
        let mut second = Message::user("q2");
        second.settings = Some(settings_for("m2"));
        let mut c = conv("pb");
        c.mode = ConversationMode::Playback(PlaybackState::new(vec![
            first,
            Message::assistant("a1"),
            second,
            Message::assistant("a2"),
        ]));
        c
    }

    #[test]
    fn test_playback_steps_forward_and_back() {
        let pb = playback_conversation();
        let mut state = state_with(vec![pb.clone()]);
        state.selected_ids = vec![pb.id.clone()];

        state.reduce(&ConversationAction::PlaybackNextMessageStart);
        let c = state.conversation(&pb.id).unwrap();
        assert!(c.is_message_streaming);
        assert_eq!(c.messages.len(), 2);
        assert_eq!(c.model.id, "m1");

        state.reduce(&ConversationAction::PlaybackNextMessageEnd { id: pb.id.clone() });
        let c = state.conversation(&pb.id).unwrap();
        assert!(!c.is_message_streaming);
        assert_eq!(c.messages[1].content, "a1");
        assert_eq!(c.playback().unwrap().active_playback_index, 2);

        state.reduce(&ConversationAction::PlaybackNextMessageStart);
        state.reduce(&ConversationAction::PlaybackNextMessageEnd { id: pb.id.clone() });
        let c = state.conversation(&pb.id).unwrap();
        assert_eq!(c.messages.len(), 4);
        assert_eq!(c.model.id, "m2");
        assert!(c.playback().unwrap().is_finished());

        state.reduce(&ConversationAction::PlaybackPrevMessage);
        let c = state.conversation(&pb.id).unwrap();
        assert_eq!(c.messages.len(), 2);
        assert_eq!(c.playback().unwrap().active_playback_index, 2);
        assert_eq!(c.model.id, "m1");
    }

    #[test]
    fn test_playback_cancel_drops_pending_pair() {
        let pb = playback_conversation();
        let mut state = state_with(vec![pb.clone()]);
        state.selected_ids = vec![pb.id.clone()];
        state.reduce(&ConversationAction::PlaybackNextMessageStart);
        state.reduce(&ConversationAction::PlaybackCancel);

        let c = state.conversation(&pb.id).unwrap();
        assert!(!c.is_message_streaming);
        assert!(c.messages.is_empty());
        assert_eq!(c.playback().unwrap().active_playback_index, 0);
    }

    #[test]
    fn test_create_folder_picks_unique_default_name() {
        let mut state = ConversationsState::new("user");
        for _ in 0..2 {
            state.reduce(&ConversationAction::CreateFolder {
                parent: None,
                name: None,
            });
        }
        let names: Vec<&str> = state.folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["New folder", "New folder 1"]);
        assert!(state.folders.iter().all(|f| f.temporary));
    }

    #[test]
    fn test_apply_remap_moves_conversations_and_selection() {
        let folder = root().child("work");
        let inside = Conversation::new(
            EntityId::new(folder.clone(), "chat"),
            ModelRef::new("gpt"),
            1.0,
        );
        let mut state = state_with(vec![inside.clone()]);
        state.folders.push(Folder::new(folder.clone()));
        state.selected_ids = vec![inside.id.clone()];

        let remap = folders::rename_folder(
            &state.folders,
            state.conversations.iter().map(|c| &c.id),
            &folder,
            "play",
        );
        state.reduce(&ConversationAction::ApplyIdRemap { remap });

        let new_id = EntityId::new(root().child("play"), "chat");
        assert!(state.conversation(&new_id).is_some());
        assert_eq!(state.selected_ids, vec![new_id]);
        assert_eq!(state.folders[0].name, "play");
    }

    #[test]
    fn test_delete_folder_removes_subtree() {
        let mut state = ConversationsState::new("user");
        let parent = root().child("a");
        state.folders = vec![
            Folder::new(parent.clone()),
            Folder::new(parent.child("b")),
            Folder::new(root().child("c")),
        ];
        state.reduce(&ConversationAction::DeleteFolder { id: parent });
        assert_eq!(state.folders.len(), 1);
    }

    #[test]
    fn test_resume_with_variables_fills_template() {
        let mut a = conv("a");
        a.mode = ConversationMode::Replay(ReplayState::new(
            vec![Message::user("Translate {{text}}")],
            false,
        ));
        let mut state = state_with(vec![a.clone()]);
        state.reduce(&ConversationAction::ReplayRequiresVariables { id: a.id.clone() });
        assert!(state.is_replay_requires_variables);

        let values = [("text".to_string(), "hola".to_string())].into_iter().collect();
        state.reduce(&ConversationAction::ResumeReplayWithVariables {
            id: a.id.clone(),
            values,
        });
        assert!(!state.is_replay_requires_variables);
        let replay = state.conversation(&a.id).unwrap().replay().unwrap();
        assert_eq!(replay.replay_user_messages_stack[0].content, "Translate hola");
    }
}
