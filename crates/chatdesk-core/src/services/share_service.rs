use serde::{Deserialize, Serialize};
use tracing::info;

use super::api_client::ApiClient;
use super::error::ApiResult;
use crate::entities::EntityId;

#[derive(Debug, Serialize)]
struct ResourceRef<'a> {
    url: &'a EntityId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateShareRequest<'a> {
    invitation_type: &'static str,
    resources: Vec<ResourceRef<'a>>,
}

#[derive(Debug, Serialize)]
struct ResourcesRequest<'a> {
    resources: Vec<ResourceRef<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AcceptRequest<'a> {
    invitation_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateShareResponse {
    invitation_link: String,
}

#[derive(Debug, Deserialize)]
struct SharedResource {
    url: String,
}

#[derive(Debug, Deserialize)]
struct AcceptResponse {
    #[serde(default)]
    resources: Vec<SharedResource>,
}

fn refs(ids: &[EntityId]) -> Vec<ResourceRef<'_>> {
    ids.iter().map(|url| ResourceRef { url }).collect()
}

/// Link-based sharing of conversations and prompts.
#[derive(Clone)]
pub struct ShareService {
    api: ApiClient,
}

impl ShareService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Create an invitation for `ids`; returns the invitation link.
    pub async fn share(&self, ids: &[EntityId]) -> ApiResult<String> {
        info!(resources = ids.len(), "Creating share invitation");
        let response: CreateShareResponse = self
            .api
            .post_json(
                "ops/resource/share/create",
                &CreateShareRequest {
                    invitation_type: "link",
                    resources: refs(ids),
                },
            )
            .await?;
        Ok(response.invitation_link)
    }

    /// Accept an invitation; returns the ids now shared with the user.
    pub async fn accept(&self, invitation_id: &str) -> ApiResult<Vec<EntityId>> {
        let response: AcceptResponse = self
            .api
            .post_json("ops/resource/share/accept", &AcceptRequest { invitation_id })
            .await?;
        Ok(response
            .resources
            .into_iter()
            .filter_map(|r| EntityId::decode(&r.url).ok())
            .collect())
    }

    pub async fn revoke(&self, ids: &[EntityId]) -> ApiResult<()> {
        self.api
            .post("ops/resource/share/revoke", &ResourcesRequest { resources: refs(ids) })
            .await
    }

    pub async fn discard(&self, ids: &[EntityId]) -> ApiResult<()> {
        self.api
            .post("ops/resource/share/discard", &ResourcesRequest { resources: refs(ids) })
            .await
    }
}
