pub mod folders;
pub mod ids;
pub mod naming;

pub use folders::{Folder, FolderItem, IdRemap, LoadStatus};
pub use ids::{ApiKind, EntityId, FolderPath, IdParseError, Locality};

use serde::{Deserialize, Serialize};

/// Publication metadata carried by entities that came from (or went to) the public bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_group: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_url: Option<String>,
    /// Pending unpublish request exists for this entity.
    #[serde(default)]
    pub is_unpublishing: bool,
}
