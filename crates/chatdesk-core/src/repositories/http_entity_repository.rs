use std::collections::BTreeSet;
use std::marker::PhantomData;

use tracing::debug;

use super::entity_repository::{BoxFuture, EntityRepository, Listing, StoredEntity};
use super::error::RepositoryResult;
use crate::entities::{EntityId, FolderPath};
use crate::services::{ResourceEntry, ResourceService};

/// Entity repository backed by the resource API.
pub struct HttpEntityRepository<E> {
    resources: ResourceService,
    _entity: PhantomData<fn() -> E>,
}

impl<E> HttpEntityRepository<E> {
    pub fn new(resources: ResourceService) -> Self {
        Self {
            resources,
            _entity: PhantomData,
        }
    }
}

impl<E: StoredEntity> EntityRepository<E> for HttpEntityRepository<E> {
    fn list(&self, folder: &FolderPath) -> BoxFuture<'static, RepositoryResult<Listing<E>>> {
        let resources = self.resources.clone();
        let folder = folder.clone();

        Box::pin(async move {
            let entries = resources.list(&folder).await?;
            let mut folders = BTreeSet::new();
            let mut entities = Vec::new();
            for entry in entries {
                match entry {
                    ResourceEntry::Item { id, updated_at } => {
                        entities.push(E::from_listing(id, updated_at));
                    }
                    ResourceEntry::Folder { id } => {
                        folders.insert(id);
                    }
                }
            }
            debug!(
                folder = %folder,
                folders = folders.len(),
                entities = entities.len(),
                "Listed resources"
            );
            Ok(Listing {
                folders: folders.into_iter().collect(),
                entities,
            })
        })
    }

    fn get(&self, id: &EntityId) -> BoxFuture<'static, RepositoryResult<E>> {
        let resources = self.resources.clone();
        let id = id.clone();

        Box::pin(async move {
            let mut entity: E = resources.get(&id).await?;
            // The path is authoritative; bodies written by other clients may disagree.
            entity.set_entity_id(id);
            Ok(entity)
        })
    }

    fn create(&self, entity: E) -> BoxFuture<'static, RepositoryResult<EntityId>> {
        let resources = self.resources.clone();

        Box::pin(async move {
            let id = entity.entity_id().clone();
            let receipt = resources.create(&id, &entity).await?;
            let stored = receipt.and_then(|r| r.stored_id()).unwrap_or(id);
            Ok(stored)
        })
    }

    fn update(&self, entity: E) -> BoxFuture<'static, RepositoryResult<()>> {
        let resources = self.resources.clone();

        Box::pin(async move {
            let id = entity.entity_id().clone();
            resources.update(&id, &entity).await?;
            Ok(())
        })
    }

    fn delete(&self, id: &EntityId) -> BoxFuture<'static, RepositoryResult<()>> {
        let resources = self.resources.clone();
        let id = id.clone();

        Box::pin(async move {
            resources.delete(&id).await?;
            Ok(())
        })
    }

    fn move_entity(
        &self,
        from: &EntityId,
        to: &EntityId,
    ) -> BoxFuture<'static, RepositoryResult<()>> {
        let resources = self.resources.clone();
        let from = from.clone();
        let to = to.clone();

        Box::pin(async move {
            resources.move_resource(&from, &to).await?;
            Ok(())
        })
    }
}
