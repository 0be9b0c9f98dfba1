use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::api_client::ApiClient;
use super::error::{ApiError, ApiResult};
use crate::entities::{EntityId, FolderPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum NodeType {
    #[serde(rename = "ITEM")]
    Item,
    #[serde(rename = "FOLDER")]
    Folder,
}

/// One node of a listing response. Folders carry their children in `items`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNode {
    pub name: String,
    pub url: String,
    pub node_type: NodeType,
    #[serde(default)]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub items: Vec<ResourceNode>,
}

/// A listing entry with its url parsed into a typed id.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceEntry {
    Item { id: EntityId, updated_at: Option<i64> },
    Folder { id: FolderPath },
}

/// What the backend reports after a write. `url` may differ from the requested
/// id when the backend renamed the resource to avoid a collision.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl WriteReceipt {
    pub fn stored_id(&self) -> Option<EntityId> {
        self.url.as_deref().and_then(|url| EntityId::decode(url).ok())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequest<'a> {
    source_url: &'a str,
    destination_url: &'a str,
    overwrite: bool,
}

/// Persisted-resource CRUD keyed by the encoded entity id.
#[derive(Clone)]
pub struct ResourceService {
    api: ApiClient,
}

impl ResourceService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn get<T: DeserializeOwned>(&self, id: &EntityId) -> ApiResult<T> {
        self.api.get_json(&id.encode()).await
    }

    /// Write a new resource; [`ApiError::Conflict`] when the id is taken.
    pub async fn create<T: Serialize>(&self, id: &EntityId, body: &T) -> ApiResult<Option<WriteReceipt>> {
        self.api.put_json(&id.encode(), body, true).await
    }

    pub async fn update<T: Serialize>(&self, id: &EntityId, body: &T) -> ApiResult<Option<WriteReceipt>> {
        self.api.put_json(&id.encode(), body, false).await
    }

    pub async fn delete(&self, id: &EntityId) -> ApiResult<()> {
        self.api.delete(&id.encode()).await
    }

    /// Server-side move; the destination must not exist.
    pub async fn move_resource(&self, from: &EntityId, to: &EntityId) -> ApiResult<()> {
        let source = from.encode();
        let destination = to.encode();
        debug!(from = %source, to = %destination, "Moving resource");
        self.api
            .post(
                "ops/resource/move",
                &MoveRequest {
                    source_url: &source,
                    destination_url: &destination,
                    overwrite: false,
                },
            )
            .await
    }

    /// Recursive listing of `folder`. A missing folder lists as empty.
    pub async fn list(&self, folder: &FolderPath) -> ApiResult<Vec<ResourceEntry>> {
        let path = format!("{}/?recursive=true", folder.encode());
        let root: ResourceNode = match self.api.get_json(&path).await {
            Ok(root) => root,
            Err(ApiError::NotFound) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        Ok(flatten(root.items))
    }
}

/// Flatten a listing tree into typed entries, skipping urls that do not parse.
pub fn flatten(nodes: Vec<ResourceNode>) -> Vec<ResourceEntry> {
    let mut entries = Vec::new();
    let mut stack = nodes;
    while let Some(node) = stack.pop() {
        match node.node_type {
            NodeType::Item => match EntityId::decode(&node.url) {
                Ok(id) => entries.push(ResourceEntry::Item {
                    id,
                    updated_at: node.updated_at,
                }),
                Err(err) => warn!(url = %node.url, error = %err, "Skipping unparseable listing item"),
            },
            NodeType::Folder => {
                match FolderPath::decode(&node.url) {
                    Ok(id) => entries.push(ResourceEntry::Folder { id }),
                    Err(err) => {
                        warn!(url = %node.url, error = %err, "Skipping unparseable listing folder")
                    }
                }
                stack.extend(node.items);
            }
        }
    }
    entries
}
