mod common;

use std::collections::HashMap;
use std::time::Duration;

use chatdesk_core::app::events::COMPARE_REJECTED_MESSAGE;
use chatdesk_core::app::{Action, AppEvent};
use chatdesk_core::conversations::ConversationAction;
use chatdesk_core::conversations::models::{
    Conversation, ConversationMode, ConversationPatch, Message, ModelRef,
};
use chatdesk_core::entities::{ApiKind, EntityId, FolderPath};
use chatdesk_core::repositories::InMemoryEntityRepository;
use chatdesk_core::settings::models::LocalSettings;
use common::{
    Setup, conversation, conversation_root, expect_action, expect_notification, start, wait_for,
    wait_until,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn restoring(ids: Vec<EntityId>) -> LocalSettings {
    LocalSettings {
        selected_conversation_ids: ids,
        ..LocalSettings::default()
    }
}

/// Every chat request is answered with a single `content` delta.
async fn mount_answer(server: &MockServer, content: &str) {
    let body = format!("{{\"content\":\"{content}\"}}\0");
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.into_bytes()))
        .mount(server)
        .await;
}

fn is_conversation_action(action: &Action, pred: impl Fn(&ConversationAction) -> bool) -> bool {
    matches!(action, Action::Conversations(inner) if pred(inner))
}

#[tokio::test]
async fn test_first_message_stores_conversation_and_streams_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(
            b"{\"content\":\"Borrowing \"}\0{\"content\":\"rules.\",\"responseId\":\"r-1\"}\0"
                .to_vec(),
        ))
        .expect(1)
        .mount(&server)
        .await;
    let harness = start(server, Setup::default()).await;

    let draft = wait_for(&harness.controller, |s| {
        s.conversations.selected_ids.first().cloned()
    })
    .await;
    assert!(draft.is_local());

    harness.controller.dispatch(ConversationAction::SendMessages {
        message: Message::user("Explain ownership"),
        delete_count: 0,
    });

    let stored_id = EntityId::new(conversation_root(), "Explain ownership");
    let answer = wait_for(&harness.controller, |s| {
        let c = s.conversations.conversation(&stored_id)?;
        (!c.is_message_streaming && c.messages.len() == 2).then(|| c.messages[1].clone())
    })
    .await;
    assert_eq!(answer.content, "Borrowing rules.");
    assert_eq!(answer.response_id.as_deref(), Some("r-1"));

    let recent = wait_for(&harness.controller, |s| {
        (!s.models.recent_model_ids.is_empty()).then(|| s.models.recent_model_ids.clone())
    })
    .await;
    assert_eq!(recent, vec!["gpt-4".to_string()]);
    harness.controller.read(|s| {
        assert_eq!(s.conversations.conversations.len(), 1);
        assert_eq!(s.conversations.selected_ids, vec![stored_id.clone()]);
    });

    wait_until(|| {
        harness
            .conversations
            .stored(&stored_id)
            .filter(|c| c.messages.last().is_some_and(|m| m.content == "Borrowing rules."))
    })
    .await;
    wait_until(|| {
        let settings = harness.local_settings.current();
        (settings.selected_conversation_ids == vec![stored_id.clone()]).then_some(())
    })
    .await;
}

#[tokio::test]
async fn test_stream_error_is_reported_on_the_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(serde_json::json!({"message": "quota exceeded"})),
        )
        .mount(&server)
        .await;
    let stored = conversation(&conversation_root(), "a", 1);
    let setup = Setup {
        conversations: InMemoryEntityRepository::with_entities([
            stored.clone(),
        ]),
        local_settings: restoring(vec![stored.id.clone()]),
        ..Setup::default()
    };
    let harness = start(server, setup).await;
    let mut events = harness.controller.subscribe();

    wait_for(&harness.controller, |s| {
        s.conversations.conversation(&stored.id).filter(|c| c.is_loaded()).map(|_| ())
    })
    .await;
    harness.controller.dispatch(ConversationAction::SendMessages {
        message: Message::user("again"),
        delete_count: 0,
    });

    expect_notification(&mut events, "quota exceeded").await;
    let last = wait_for(&harness.controller, |s| {
        let c = s.conversations.conversation(&stored.id)?;
        (!c.is_message_streaming).then(|| c.messages.last().cloned()).flatten()
    })
    .await;
    assert_eq!(last.error_message.as_deref(), Some("quota exceeded"));
}

#[tokio::test]
async fn test_deleting_selected_folder_starts_new_conversation() {
    let root = conversation_root();
    let inside = conversation(&root.child("work"), "plan", 1);
    let outside = conversation(&root, "notes", 1);
    let setup = Setup {
        conversations: InMemoryEntityRepository::with_entities([
            inside.clone(),
            outside.clone(),
        ]),
        local_settings: restoring(vec![inside.id.clone()]),
        ..Setup::default()
    };
    let harness = start(MockServer::start().await, setup).await;

    wait_for(&harness.controller, |s| {
        (s.conversations.selected_ids == vec![inside.id.clone()]).then_some(())
    })
    .await;
    harness.controller.dispatch(ConversationAction::DeleteFolder {
        id: root.child("work"),
    });

    let fresh = wait_for(&harness.controller, |s| {
        let id = s.conversations.selected_ids.first()?;
        id.is_local().then(|| id.clone())
    })
    .await;
    assert_eq!(fresh.name(), "Conversation");

    wait_until(|| (!harness.conversations.contains(&inside.id)).then_some(())).await;
    assert!(harness.conversations.contains(&outside.id));
    harness.controller.read(|s| {
        assert!(s.conversations.conversation(&inside.id).is_none());
        assert!(s.conversations.folder(&root.child("work")).is_none());
    });
}

#[tokio::test]
async fn test_bulk_delete_removes_all_and_reports_failures() {
    let root = conversation_root();
    let a = conversation(&root, "a", 0);
    let b = conversation(&root, "b", 0);
    let repository =
        InMemoryEntityRepository::with_entities([a.clone(), b.clone()]);
    repository.fail_on(b.id.clone());
    let setup = Setup {
        conversations: repository,
        ..Setup::default()
    };
    let harness = start(MockServer::start().await, setup).await;
    let mut events = harness.controller.subscribe();

    wait_for(&harness.controller, |s| {
        (s.conversations.conversations.len() == 3).then_some(())
    })
    .await;
    harness.controller.dispatch(ConversationAction::DeleteConversations {
        ids: vec![a.id.clone(), b.id.clone()],
        suppress_notice: false,
    });

    expect_notification(&mut events, "An error occurred while deleting conversations: b").await;
    wait_for(&harness.controller, |s| {
        (s.conversations.conversation(&a.id).is_none() && s.conversations.conversation(&b.id).is_none())
            .then_some(())
    })
    .await;
    assert!(!harness.conversations.contains(&a.id));
    assert!(harness.conversations.contains(&b.id));
}

#[tokio::test]
async fn test_compare_rejects_conversation_with_different_length() {
    let root = conversation_root();
    let current = conversation(&root, "current", 1);
    let longer = conversation(&root, "longer", 2);
    let matching = conversation(&root, "matching", 1);
    let setup = Setup {
        conversations: InMemoryEntityRepository::with_entities([
            current.clone(),
            longer.clone(),
            matching.clone(),
        ]),
        local_settings: restoring(vec![current.id.clone()]),
        ..Setup::default()
    };
    let harness = start(MockServer::start().await, setup).await;
    let mut events = harness.controller.subscribe();

    wait_for(&harness.controller, |s| {
        s.conversations.conversation(&current.id).filter(|c| c.is_loaded()).map(|_| ())
    })
    .await;

    harness.controller.dispatch(ConversationAction::SelectForCompare {
        id: longer.id.clone(),
    });
    expect_notification(&mut events, COMPARE_REJECTED_MESSAGE).await;
    harness.controller.read(|s| {
        assert_eq!(s.conversations.selected_ids, vec![current.id.clone()]);
    });

    harness.controller.dispatch(ConversationAction::SelectForCompare {
        id: matching.id.clone(),
    });
    wait_for(&harness.controller, |s| {
        (s.conversations.selected_ids == vec![current.id.clone(), matching.id.clone()]).then_some(())
    })
    .await;
}

#[tokio::test]
async fn test_failed_first_save_restores_unsaved_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let setup = Setup::default();
    let stored_id = EntityId::new(conversation_root(), "hello");
    setup.conversations.fail_on(stored_id.clone());
    let harness = start(server, setup).await;
    let mut events = harness.controller.subscribe();

    let draft = wait_for(&harness.controller, |s| {
        s.conversations.selected_ids.first().cloned()
    })
    .await;
    harness.controller.dispatch(ConversationAction::SendMessages {
        message: Message::user("hello"),
        delete_count: 0,
    });

    expect_notification(&mut events, "Failed to save conversation.").await;
    let answer = wait_for(&harness.controller, |s| {
        let c = s.conversations.conversation(&draft)?;
        (!c.is_message_streaming).then(|| c.messages.last().cloned()).flatten()
    })
    .await;
    assert_eq!(answer.error_message.as_deref(), Some("Failed to save conversation."));
    harness.controller.read(|s| {
        assert_eq!(s.conversations.selected_ids, vec![draft.clone()]);
        assert!(s.conversations.conversation(&stored_id).is_none());
        assert_eq!(s.conversations.conversation(&draft).unwrap().name, "Conversation");
    });
    assert!(!harness.conversations.contains(&stored_id));
}

#[tokio::test]
async fn test_update_of_header_only_conversation_is_persisted() {
    let stored = conversation(&conversation_root(), "a", 1);
    let setup = Setup {
        conversations: InMemoryEntityRepository::with_entities([stored.clone()]),
        ..Setup::default()
    };
    let harness = start(MockServer::start().await, setup).await;

    wait_for(&harness.controller, |s| {
        s.conversations
            .conversation(&stored.id)
            .filter(|c| !c.is_loaded())
            .map(|_| ())
    })
    .await;
    harness.controller.dispatch(ConversationAction::UpdateConversation {
        id: stored.id.clone(),
        values: ConversationPatch {
            temperature: Some(0.2),
            ..ConversationPatch::default()
        },
    });

    let written = wait_until(|| {
        harness
            .conversations
            .stored(&stored.id)
            .filter(|c| c.temperature == 0.2)
    })
    .await;
    assert_eq!(written.messages, stored.messages);
}

#[tokio::test]
async fn test_failed_rename_restores_id_and_selection() {
    let root = conversation_root();
    let original = conversation(&root, "a", 1);
    let repository = InMemoryEntityRepository::with_entities([original.clone()]);
    let renamed = EntityId::new(root.clone(), "b");
    repository.fail_on(renamed.clone());
    let setup = Setup {
        conversations: repository,
        local_settings: restoring(vec![original.id.clone()]),
        ..Setup::default()
    };
    let harness = start(MockServer::start().await, setup).await;
    let mut events = harness.controller.subscribe();

    wait_for(&harness.controller, |s| {
        s.conversations.conversation(&original.id).filter(|c| c.is_loaded()).map(|_| ())
    })
    .await;
    harness.controller.dispatch(ConversationAction::UpdateConversation {
        id: original.id.clone(),
        values: ConversationPatch::name("b"),
    });

    expect_action(&mut events, |a| {
        is_conversation_action(a, |c| {
            matches!(c, ConversationAction::UpdateConversationFail { .. })
        })
    })
    .await;
    harness.controller.read(|s| {
        assert!(s.conversations.conversation(&renamed).is_none());
        assert_eq!(s.conversations.conversation(&original.id).unwrap().name, "a");
        assert_eq!(s.conversations.selected_ids, vec![original.id.clone()]);
    });
    assert!(harness.conversations.contains(&original.id));
    assert!(!harness.conversations.contains(&renamed));
}

#[tokio::test]
async fn test_stop_keeps_partial_answer_without_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"{\"content\":\"late\"}\0".to_vec())
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;
    let stored = conversation(&conversation_root(), "a", 1);
    let setup = Setup {
        conversations: InMemoryEntityRepository::with_entities([stored.clone()]),
        local_settings: restoring(vec![stored.id.clone()]),
        ..Setup::default()
    };
    let harness = start(server, setup).await;

    wait_for(&harness.controller, |s| {
        s.conversations.conversation(&stored.id).filter(|c| c.is_loaded()).map(|_| ())
    })
    .await;
    harness.controller.dispatch(ConversationAction::SendMessages {
        message: Message::user("long question"),
        delete_count: 0,
    });
    wait_for(&harness.controller, |s| {
        s.conversations
            .conversation(&stored.id)
            .filter(|c| c.is_message_streaming)
            .map(|_| ())
    })
    .await;

    harness.controller.dispatch(ConversationAction::StopStreamMessage);

    let answer = wait_for(&harness.controller, |s| {
        let c = s.conversations.conversation(&stored.id)?;
        (!c.is_message_streaming).then(|| c.messages.last().cloned()).flatten()
    })
    .await;
    assert!(answer.is_assistant());
    assert_eq!(answer.error_message, None);
    assert_eq!(answer.content, "");
    harness.controller.read(|s| {
        assert_eq!(s.conversations.conversation(&stored.id).unwrap().messages.len(), 4);
    });
}

#[tokio::test]
async fn test_deleting_folder_removes_local_and_persisted_contents() {
    let root = conversation_root();
    let persisted = conversation(&root.child("work"), "plan", 1);
    let unsaved = Conversation::new(
        EntityId::new(
            FolderPath::local_root(ApiKind::Conversations).child("work"),
            "draft",
        ),
        ModelRef::new("gpt-4"),
        1.0,
    );
    let setup = Setup {
        conversations: InMemoryEntityRepository::with_entities([persisted.clone()]),
        local_settings: restoring(vec![persisted.id.clone()]),
        ..Setup::default()
    };
    let harness = start(MockServer::start().await, setup).await;

    wait_for(&harness.controller, |s| {
        s.conversations.conversation(&persisted.id).filter(|c| c.is_loaded()).map(|_| ())
    })
    .await;
    harness.controller.dispatch(ConversationAction::AddConversations {
        conversations: vec![unsaved.clone()],
        select: false,
    });
    harness.controller.dispatch(ConversationAction::SelectConversations {
        ids: vec![persisted.id.clone(), unsaved.id.clone()],
    });
    wait_for(&harness.controller, |s| {
        (s.conversations.selected_ids == vec![persisted.id.clone(), unsaved.id.clone()]
            && s.conversations.selected_loaded)
            .then_some(())
    })
    .await;

    harness.controller.dispatch(ConversationAction::DeleteFolder {
        id: root.child("work"),
    });

    let fresh = wait_for(&harness.controller, |s| {
        let id = s.conversations.selected_ids.first()?;
        (id.is_local() && id != &unsaved.id).then(|| id.clone())
    })
    .await;
    assert_eq!(fresh.name(), "Conversation");
    harness.controller.read(|s| {
        assert!(s.conversations.conversation(&persisted.id).is_none());
        assert!(s.conversations.conversation(&unsaved.id).is_none());
    });
    wait_until(|| (!harness.conversations.contains(&persisted.id)).then_some(())).await;
}

#[tokio::test]
async fn test_replay_resends_every_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(b"{\"content\":\"replayed\"}\0".to_vec()),
        )
        .expect(2)
        .mount(&server)
        .await;
    let source = conversation(&conversation_root(), "src", 2);
    let setup = Setup {
        conversations: InMemoryEntityRepository::with_entities([source.clone()]),
        ..Setup::default()
    };
    let harness = start(server, setup).await;

    wait_for(&harness.controller, |s| s.conversations.conversation(&source.id).map(|_| ())).await;
    harness.controller.dispatch(ConversationAction::ReplayConversations {
        ids: vec![source.id.clone()],
        replay_as_is: false,
    });

    let replayed_id = EntityId::new(conversation_root(), "[Replay] src");
    let replayed = wait_for(&harness.controller, |s| {
        s.conversations
            .conversation(&replayed_id)
            .filter(|c| c.mode == ConversationMode::Normal && !c.is_message_streaming)
            .cloned()
    })
    .await;
    let contents: Vec<&str> = replayed.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["question 0", "replayed", "question 1", "replayed"]);
    wait_until(|| {
        harness
            .conversations
            .stored(&replayed_id)
            .filter(|c| c.messages.len() == 4)
    })
    .await;
}

#[tokio::test]
async fn test_replay_halts_on_template_variables_until_resumed() {
    let server = MockServer::start().await;
    mount_answer(&server, "ok").await;
    let mut source = conversation(&conversation_root(), "src", 0);
    source.messages = vec![
        Message::user("hello"),
        Message::assistant("hi"),
        Message::user("Greet {{name}}"),
        Message::assistant("Hello"),
    ];
    let setup = Setup {
        conversations: InMemoryEntityRepository::with_entities([source.clone()]),
        ..Setup::default()
    };
    let harness = start(server, setup).await;

    wait_for(&harness.controller, |s| s.conversations.conversation(&source.id).map(|_| ())).await;
    harness.controller.dispatch(ConversationAction::ReplayConversations {
        ids: vec![source.id.clone()],
        replay_as_is: false,
    });

    let replayed_id = EntityId::new(conversation_root(), "[Replay] src");
    wait_for(&harness.controller, |s| {
        let c = s.conversations.conversation(&replayed_id)?;
        (s.conversations.is_replay_requires_variables && c.messages.len() == 2).then_some(())
    })
    .await;
    harness.controller.read(|s| {
        assert!(s.conversations.is_replay_paused);
        assert!(s.conversations.conversation(&replayed_id).unwrap().is_replay());
    });

    harness.controller.dispatch(ConversationAction::ResumeReplayWithVariables {
        id: replayed_id.clone(),
        values: HashMap::from([("name".to_string(), "Ada".to_string())]),
    });

    let replayed = wait_for(&harness.controller, |s| {
        s.conversations
            .conversation(&replayed_id)
            .filter(|c| !c.is_replay() && !c.is_message_streaming)
            .cloned()
    })
    .await;
    let contents: Vec<&str> = replayed.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["hello", "ok", "Greet Ada", "ok"]);
}

#[tokio::test]
async fn test_playback_reveals_answer_after_step_delay() {
    let source = conversation(&conversation_root(), "src", 1);
    let setup = Setup {
        conversations: InMemoryEntityRepository::with_entities([source.clone()]),
        playback_step_delay_ms: 200,
        ..Setup::default()
    };
    let harness = start(MockServer::start().await, setup).await;
    let mut events = harness.controller.subscribe();

    wait_for(&harness.controller, |s| s.conversations.conversation(&source.id).map(|_| ())).await;
    harness.controller.dispatch(ConversationAction::PlaybackConversations {
        ids: vec![source.id.clone()],
    });
    let copy = wait_for(&harness.controller, |s| {
        let c = s.conversations.selected_conversations().into_iter().next()?;
        c.is_playback().then(|| c.id.clone())
    })
    .await;

    harness
        .controller
        .dispatch(ConversationAction::PlaybackNextMessageStart);
    expect_action(&mut events, |a| {
        is_conversation_action(a, |c| matches!(c, ConversationAction::PlaybackNextMessageStart))
    })
    .await;
    harness.controller.read(|s| {
        let c = s.conversations.conversation(&copy).unwrap();
        assert!(c.is_message_streaming);
        assert_eq!(c.messages.len(), 2);
        assert_eq!(c.messages[1].content, "");
    });

    let answer = wait_for(&harness.controller, |s| {
        let c = s.conversations.conversation(&copy)?;
        (!c.is_message_streaming).then(|| c.messages.last().cloned()).flatten()
    })
    .await;
    assert_eq!(answer.content, "answer 0");
}

#[tokio::test]
async fn test_playback_cancel_drops_pending_step() {
    let source = conversation(&conversation_root(), "src", 1);
    let setup = Setup {
        conversations: InMemoryEntityRepository::with_entities([source.clone()]),
        playback_step_delay_ms: 300,
        ..Setup::default()
    };
    let harness = start(MockServer::start().await, setup).await;

    wait_for(&harness.controller, |s| s.conversations.conversation(&source.id).map(|_| ())).await;
    harness.controller.dispatch(ConversationAction::PlaybackConversations {
        ids: vec![source.id.clone()],
    });
    let copy = wait_for(&harness.controller, |s| {
        let c = s.conversations.selected_conversations().into_iter().next()?;
        c.is_playback().then(|| c.id.clone())
    })
    .await;

    let mut events = harness.controller.subscribe();
    harness
        .controller
        .dispatch(ConversationAction::PlaybackNextMessageStart);
    wait_for(&harness.controller, |s| {
        s.conversations
            .conversation(&copy)
            .filter(|c| c.is_message_streaming)
            .map(|_| ())
    })
    .await;
    harness.controller.dispatch(ConversationAction::PlaybackCancel);

    tokio::time::sleep(Duration::from_millis(600)).await;
    while let Ok(event) = events.try_recv() {
        if let AppEvent::Action(action) = event {
            assert!(!is_conversation_action(&action, |c| {
                matches!(c, ConversationAction::PlaybackNextMessageEnd { .. })
            }));
        }
    }
    harness.controller.read(|s| {
        let c = s.conversations.conversation(&copy).unwrap();
        assert!(!c.is_message_streaming);
        assert!(c.messages.is_empty());
        assert_eq!(c.playback().unwrap().active_playback_index, 0);
    });
}
