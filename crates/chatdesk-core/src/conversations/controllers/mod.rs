pub mod conversation_controller;
pub mod message_controller;
pub mod replay_controller;

use crate::app::EpicContext;
use crate::conversations::ConversationAction;
use crate::conversations::models::Conversation;

/// Side effects of conversation actions. Runs after the action was reduced.
pub fn handle(ctx: &EpicContext, action: &ConversationAction, previous: Option<Conversation>) {
    use ConversationAction as A;
    use conversation_controller as conversations;
    use message_controller as messages;
    use replay_controller as replay;

    match action {
        A::Init | A::InitFoldersAndConversations => conversations::init(ctx),
        A::SelectConversations { ids } => conversations::upload_selected(ctx, ids),
        A::UploadConversationsByIds { ids } => conversations::upload_by_ids(ctx, ids),
        A::CreateNewConversations { names } => conversations::create_new(ctx, names),
        A::DuplicateConversation { id } => conversations::duplicate(ctx, id),
        A::UpdateConversation { id, values } => conversations::update(ctx, id, values, previous),
        A::SaveConversation { id } => conversations::save(ctx, id),
        A::DeleteConversations {
            ids,
            suppress_notice,
        } => conversations::delete(ctx, ids, *suppress_notice),
        A::DeleteChosen => conversations::delete_chosen(ctx),
        A::DeleteFolder { id } => conversations::delete_folder(ctx, id),
        A::RenameFolder { id, name } => conversations::rename_folder(ctx, id, name),
        A::MoveFolder { id, parent } => conversations::move_folder(ctx, id, parent),
        A::SelectForCompare { id } => conversations::select_for_compare(ctx, id),

        A::UpdateMessage { id, .. }
        | A::DeleteMessage { id, .. }
        | A::ClearConversationMessages { id }
        | A::EndReplayConversation { id } => {
            ctx.dispatch(A::SaveConversation { id: id.clone() })
        }

        A::SendMessages {
            message,
            delete_count,
        } => messages::send_messages(ctx, message, *delete_count),
        A::SendMessage { id, message, .. } => messages::send_message(ctx, id, message),
        A::StreamMessage { id } => messages::stream_message(ctx, id),
        A::StreamMessageSuccess { .. } => replay::advance_replays(ctx),
        A::StopStreamMessage => messages::stop_streaming(ctx),
        A::RegenerateMessage => messages::regenerate(ctx),
        A::RateMessage {
            id,
            message_index,
            rating,
        } => messages::rate(ctx, id, *message_index, *rating, previous),

        A::ReplayConversations { ids, replay_as_is } => {
            replay::start_replay(ctx, ids, *replay_as_is)
        }
        A::ReplayConversation { id, is_restart } => replay::replay_step(ctx, id, *is_restart),
        A::ResumeReplayWithVariables { id, .. } => ctx.dispatch(A::ReplayConversation {
            id: id.clone(),
            is_restart: false,
        }),
        A::StopReplayConversation | A::PlaybackStop | A::PlaybackCancel => {
            replay::abort_session(ctx)
        }
        A::PlaybackConversations { ids } => replay::start_playback(ctx, ids),
        A::PlaybackNextMessageStart => replay::playback_next(ctx),

        A::InitSuccess { .. }
        | A::InitFail { .. }
        | A::UploadConversationsByIdsSuccess { .. }
        | A::AddConversations { .. }
        | A::CreateNewConversationSuccess { .. }
        | A::UpdateConversationSuccess { .. }
        | A::UpdateConversationFail { .. }
        | A::SaveConversationSuccess { .. }
        | A::SaveConversationFail { .. }
        | A::DeleteConversationsComplete { .. }
        | A::CreateAbortController(_)
        | A::MergeMessage { .. }
        | A::StreamMessageAborted { .. }
        | A::StreamMessageFail { .. }
        | A::RateMessageSuccess { .. }
        | A::RateMessageFail { .. }
        | A::ReplayRequiresVariables { .. }
        | A::PlaybackNextMessageEnd { .. }
        | A::PlaybackPrevMessage
        | A::SelectForCompareCompleted { .. }
        | A::SelectForCompareFail
        | A::CreateFolder { .. }
        | A::ApplyIdRemap { .. }
        | A::UploadFoldersSuccess { .. }
        | A::ToggleFolderCollapse { .. }
        | A::SetChosenConversations { .. }
        | A::SetChosenFolders { .. }
        | A::ResetChosen => {}
    }
}
