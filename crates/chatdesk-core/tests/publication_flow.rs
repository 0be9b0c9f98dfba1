mod common;

use chatdesk_core::app::events::CONFLICT_MESSAGE;
use chatdesk_core::entities::{ApiKind, EntityId, FolderPath, ids::PUBLIC_BUCKET};
use chatdesk_core::publications::models::{PublicationRequest, PublicationResource};
use chatdesk_core::publications::{PublicationAction, PublicationStatus};
use chatdesk_core::repositories::InMemoryEntityRepository;
use common::{BUCKET, Setup, conversation, expect_notification, start, wait_for};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn public_summary() -> EntityId {
    EntityId::new(FolderPath::root(ApiKind::Conversations, PUBLIC_BUCKET), "Summary")
        .with_version("1.0")
}

fn unpublish_request(url: &str, created_at: i64) -> serde_json::Value {
    json!({
        "url": url,
        "name": url,
        "status": "PENDING",
        "createdAt": created_at,
        "resources": [{ "action": "DELETE", "targetUrl": public_summary().encode() }],
    })
}

#[tokio::test]
async fn test_duplicate_unpublish_is_blocked_before_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ops/publication/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "publications": [
                unpublish_request("publications/user/first", 1),
                unpublish_request("publications/user/second", 2),
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/ops/publication/approve"))
        .and(body_partial_json(json!({ "url": "publications/user/first" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let public_root = FolderPath::root(ApiKind::Conversations, PUBLIC_BUCKET);
    let mut published = conversation(&public_root, "Summary", 1);
    published.id = public_summary();
    let setup = Setup {
        conversations: InMemoryEntityRepository::with_entities([published]),
        ..Setup::default()
    };
    let harness = start(server, setup).await;
    let mut events = harness.controller.subscribe();

    harness.controller.dispatch(PublicationAction::UploadPublicTree);
    harness.controller.dispatch(PublicationAction::UploadPublications);
    wait_for(&harness.controller, |s| {
        (s.publications.public_entities.len() == 1 && s.publications.publications.len() == 2)
            .then_some(())
    })
    .await;

    harness.controller.dispatch(PublicationAction::ApprovePublication {
        url: "publications/user/second".into(),
    });
    expect_notification(&mut events, "Duplicated unpublishing: Summary").await;

    harness.controller.dispatch(PublicationAction::ApprovePublication {
        url: "publications/user/first".into(),
    });
    wait_for(&harness.controller, |s| {
        let first = s.publications.publication("publications/user/first")?;
        (first.status == PublicationStatus::Approved).then_some(())
    })
    .await;
    harness.controller.read(|s| {
        assert!(s.publications.public_entities.is_empty());
        assert_eq!(
            s.publications
                .publication("publications/user/second")
                .map(|p| p.status),
            Some(PublicationStatus::PendingApproval)
        );
    });
}

#[tokio::test]
async fn test_failed_publication_create_reports_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ops/publication/create"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;
    let harness = start(server, Setup::default()).await;
    let mut events = harness.controller.subscribe();

    let source = EntityId::new(FolderPath::root(ApiKind::Conversations, BUCKET), "a");
    harness.controller.dispatch(PublicationAction::CreatePublication {
        request: PublicationRequest {
            name: "Release".into(),
            target_folder: None,
            resources: vec![PublicationResource::publish(source, public_summary())],
        },
    });

    expect_notification(&mut events, CONFLICT_MESSAGE).await;
    wait_for(&harness.controller, |s| s.publications.error.clone()).await;
}
