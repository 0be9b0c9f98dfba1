use serde::{Deserialize, Serialize};

use crate::entities::EntityId;

/// Lifecycle of a publication request: draft → pending approval → approved | rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationStatus {
    #[default]
    Draft,
    #[serde(rename = "PENDING")]
    PendingApproval,
    Approved,
    Rejected,
}

impl PublicationStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, PublicationStatus::Approved | PublicationStatus::Rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceAction {
    Add,
    AddIfAbsent,
    Delete,
}

impl ResourceAction {
    pub fn is_unpublish(&self) -> bool {
        matches!(self, ResourceAction::Delete)
    }
}

/// One resource operation of a publication request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationResource {
    pub action: ResourceAction,
    /// Own entity being published; absent for unpublish requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<EntityId>,
    /// Location in the public bucket.
    pub target_url: EntityId,
}

impl PublicationResource {
    pub fn publish(source: EntityId, target: EntityId) -> Self {
        Self {
            action: ResourceAction::Add,
            source_url: Some(source),
            target_url: target,
        }
    }

    pub fn unpublish(target: EntityId) -> Self {
        Self {
            action: ResourceAction::Delete,
            source_url: None,
            target_url: target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_folder: Option<String>,
    #[serde(default)]
    pub status: PublicationStatus,
    #[serde(default)]
    pub resources: Vec<PublicationResource>,
    #[serde(default)]
    pub created_at: i64,
}

impl Publication {
    pub fn is_unpublishing(&self) -> bool {
        !self.resources.is_empty() && self.resources.iter().all(|r| r.action.is_unpublish())
    }

    pub fn targets(&self, action: ResourceAction) -> impl Iterator<Item = &EntityId> {
        self.resources
            .iter()
            .filter(move |r| r.action == action)
            .map(|r| &r.target_url)
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_folder: Option<String>,
    pub resources: Vec<PublicationResource>,
}

/// An entity of the live public tree.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicEntity {
    pub id: EntityId,
    /// The id without its version; all versions of one entity share it.
    pub version_group: EntityId,
}

impl PublicEntity {
    pub fn new(id: EntityId) -> Self {
        Self {
            version_group: id.version_group(),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publication_json() {
        let json = r#"{
            "url": "publications/u/p1",
            "name": "Share chat",
            "status": "PENDING",
            "createdAt": 10,
            "resources": [
                {"action": "DELETE", "targetUrl": "conversations/public/chat__v1"}
            ]
        }"#;
        let publication: Publication = serde_json::from_str(json).unwrap();
        assert_eq!(publication.status, PublicationStatus::PendingApproval);
        assert!(publication.is_unpublishing());
        assert_eq!(publication.resources[0].target_url.version(), Some("1"));
    }
}
