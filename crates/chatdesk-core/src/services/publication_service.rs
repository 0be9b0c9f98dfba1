use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::api_client::ApiClient;
use super::error::ApiResult;
use crate::publications::models::{Publication, PublicationRequest};

#[derive(Debug, Serialize)]
struct UrlRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct RejectRequest<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PublicationList {
    #[serde(default)]
    publications: Vec<Publication>,
}

/// Publication requests: create, list, inspect and the admin approve/reject.
#[derive(Clone)]
pub struct PublicationService {
    api: ApiClient,
}

impl PublicationService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn create(&self, request: &PublicationRequest) -> ApiResult<Publication> {
        info!(
            name = %request.name,
            resources = request.resources.len(),
            "Creating publication request"
        );
        self.api.post_json("ops/publication/create", request).await
    }

    /// Requests visible from `folder_url` (own requests or the admin's queue).
    pub async fn list(&self, folder_url: &str) -> ApiResult<Vec<Publication>> {
        let list: PublicationList = self
            .api
            .post_json("ops/publication/list", &UrlRequest { url: folder_url })
            .await?;
        debug!(count = list.publications.len(), "Fetched publications");
        Ok(list.publications)
    }

    pub async fn get(&self, url: &str) -> ApiResult<Publication> {
        self.api
            .post_json("ops/publication/get", &UrlRequest { url })
            .await
    }

    pub async fn approve(&self, url: &str) -> ApiResult<()> {
        info!(publication = %url, "Approving publication");
        self.api
            .post("ops/publication/approve", &UrlRequest { url })
            .await
    }

    pub async fn reject(&self, url: &str, comment: Option<&str>) -> ApiResult<()> {
        info!(publication = %url, "Rejecting publication");
        self.api
            .post("ops/publication/reject", &RejectRequest { url, comment })
            .await
    }
}
