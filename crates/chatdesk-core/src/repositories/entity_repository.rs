use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::RepositoryResult;
use crate::entities::{EntityId, FolderItem, FolderPath};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An entity persisted as one document under its path-derived id.
pub trait StoredEntity:
    FolderItem + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Header-only value built from a listing entry; the body is fetched on demand.
    fn from_listing(id: EntityId, updated_at: Option<i64>) -> Self;
}

/// Result of a recursive listing: every folder below the listed one plus entity headers.
#[derive(Debug, Clone)]
pub struct Listing<E> {
    pub folders: Vec<FolderPath>,
    pub entities: Vec<E>,
}

impl<E> Default for Listing<E> {
    fn default() -> Self {
        Self {
            folders: Vec::new(),
            entities: Vec::new(),
        }
    }
}

/// Persistence for conversations and prompts.
pub trait EntityRepository<E: StoredEntity>: Send + Sync + 'static {
    /// Recursive listing of `folder`
    fn list(&self, folder: &FolderPath) -> BoxFuture<'static, RepositoryResult<Listing<E>>>;

    /// Full entity body
    fn get(&self, id: &EntityId) -> BoxFuture<'static, RepositoryResult<E>>;

    /// Store a new entity. Fails with a conflict if the id is taken; otherwise
    /// returns the id the backend stored it under, which may differ when the
    /// backend renamed it.
    fn create(&self, entity: E) -> BoxFuture<'static, RepositoryResult<EntityId>>;

    /// Overwrite the entity at its current id
    fn update(&self, entity: E) -> BoxFuture<'static, RepositoryResult<()>>;

    fn delete(&self, id: &EntityId) -> BoxFuture<'static, RepositoryResult<()>>;

    /// Relocate a stored entity without rewriting its body
    fn move_entity(&self, from: &EntityId, to: &EntityId)
    -> BoxFuture<'static, RepositoryResult<()>>;
}
