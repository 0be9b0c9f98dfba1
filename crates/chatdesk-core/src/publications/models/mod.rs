pub mod publication;
pub mod publications_store;

pub use publication::{
    PublicEntity, Publication, PublicationRequest, PublicationResource, PublicationStatus,
    ResourceAction,
};
pub use publications_store::PublicationsState;
