use super::models::{Publication, PublicationRequest};
use crate::entities::EntityId;

#[derive(Debug, Clone)]
pub enum PublicationAction {
    UploadPublications,
    UploadPublicationsSuccess {
        publications: Vec<Publication>,
    },
    UploadPublication {
        url: String,
    },
    UploadPublicationSuccess {
        publication: Publication,
    },
    /// Refresh the live public tree.
    UploadPublicTree,
    UploadPublicTreeSuccess {
        ids: Vec<EntityId>,
    },
    CreatePublication {
        request: PublicationRequest,
    },
    CreatePublicationSuccess {
        publication: Publication,
    },
    SelectPublication {
        url: Option<String>,
    },
    ApprovePublication {
        url: String,
    },
    ApprovePublicationSuccess {
        url: String,
    },
    RejectPublication {
        url: String,
    },
    RejectPublicationSuccess {
        url: String,
    },
    PublicationFail {
        message: String,
    },
}
