use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::api_client::ApiClient;
use super::error::ApiResult;
use crate::settings::models::Model;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModelsResponse {
    List(Vec<Model>),
    Wrapped { data: Vec<Model> },
}

#[derive(Debug, Serialize)]
struct ApplicationRequest<'a> {
    url: &'a str,
}

/// Model/application catalog and application deployment.
#[derive(Clone)]
pub struct ModelsService {
    api: ApiClient,
}

impl ModelsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list_models(&self) -> ApiResult<Vec<Model>> {
        let response: ModelsResponse = self.api.get_json("models").await?;
        let models = match response {
            ModelsResponse::List(models) | ModelsResponse::Wrapped { data: models } => models,
        };
        debug!(count = models.len(), "Fetched model catalog");
        Ok(models)
    }

    pub async fn deploy(&self, id: &str) -> ApiResult<()> {
        info!(application = %id, "Deploying application");
        self.api
            .post("ops/application/deploy", &ApplicationRequest { url: id })
            .await
    }

    pub async fn undeploy(&self, id: &str) -> ApiResult<()> {
        info!(application = %id, "Undeploying application");
        self.api
            .post("ops/application/undeploy", &ApplicationRequest { url: id })
            .await
    }
}
