use std::collections::{BTreeSet, HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use super::entity_repository::{BoxFuture, EntityRepository, Listing, StoredEntity};
use super::error::{RepositoryError, RepositoryResult};
use crate::entities::folders::parent_folder_ids;
use crate::entities::{EntityId, FolderPath};
use crate::services::ApiError;

type Store<E> = Arc<Mutex<HashMap<EntityId, E>>>;

/// In-memory entity repository
/// Useful for testing and development
pub struct InMemoryEntityRepository<E> {
    entities: Store<E>,
    failing: Arc<Mutex<HashSet<EntityId>>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for InMemoryEntityRepository<E> {
    fn clone(&self) -> Self {
        Self {
            entities: self.entities.clone(),
            failing: self.failing.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: StoredEntity> InMemoryEntityRepository<E> {
    pub fn new() -> Self {
        Self {
            entities: Arc::new(Mutex::new(HashMap::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
            _entity: PhantomData,
        }
    }

    pub fn with_entities(entities: impl IntoIterator<Item = E>) -> Self {
        let repo = Self::new();
        if let Ok(mut store) = repo.entities.lock() {
            for entity in entities {
                store.insert(entity.entity_id().clone(), entity);
            }
        }
        repo
    }

    /// Make every write or delete touching `id` fail with a server error.
    pub fn fail_on(&self, id: EntityId) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(id);
        }
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities
            .lock()
            .map(|store| store.contains_key(id))
            .unwrap_or(false)
    }

    pub fn stored(&self, id: &EntityId) -> Option<E> {
        self.entities
            .lock()
            .ok()
            .and_then(|store| store.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.entities.lock().map(|store| store.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: StoredEntity> Default for InMemoryEntityRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_error(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::InvalidData {
        message: format!("Failed to lock entities: {}", e),
    }
}

fn check_failing(failing: &Mutex<HashSet<EntityId>>, ids: &[&EntityId]) -> RepositoryResult<()> {
    let failing = failing.lock().map_err(lock_error)?;
    if ids.iter().any(|id| failing.contains(*id)) {
        return Err(RepositoryError::Api(ApiError::Server {
            status: 500,
            message: "Injected failure".into(),
        }));
    }
    Ok(())
}

impl<E: StoredEntity> EntityRepository<E> for InMemoryEntityRepository<E> {
    fn list(&self, folder: &FolderPath) -> BoxFuture<'static, RepositoryResult<Listing<E>>> {
        let entities = self.entities.clone();
        let folder = folder.clone();

        Box::pin(async move {
            let store = entities.lock().map_err(lock_error)?;
            let mut folders = BTreeSet::new();
            let mut headers = Vec::new();
            for id in store.keys().filter(|id| folder.contains(id.folder())) {
                folders.extend(
                    parent_folder_ids(id.folder())
                        .into_iter()
                        .filter(|f| folder.is_ancestor_of(f)),
                );
                headers.push(E::from_listing(id.clone(), None));
            }
            Ok(Listing {
                folders: folders.into_iter().collect(),
                entities: headers,
            })
        })
    }

    fn get(&self, id: &EntityId) -> BoxFuture<'static, RepositoryResult<E>> {
        let entities = self.entities.clone();
        let id = id.clone();

        Box::pin(async move {
            let store = entities.lock().map_err(lock_error)?;
            store
                .get(&id)
                .cloned()
                .ok_or(RepositoryError::Api(ApiError::NotFound))
        })
    }

    fn create(&self, entity: E) -> BoxFuture<'static, RepositoryResult<EntityId>> {
        let entities = self.entities.clone();
        let failing = self.failing.clone();

        Box::pin(async move {
            let id = entity.entity_id().clone();
            check_failing(&failing, &[&id])?;
            let mut store = entities.lock().map_err(lock_error)?;
            if store.contains_key(&id) {
                return Err(RepositoryError::Api(ApiError::Conflict));
            }
            store.insert(id.clone(), entity);
            Ok(id)
        })
    }

    fn update(&self, entity: E) -> BoxFuture<'static, RepositoryResult<()>> {
        let entities = self.entities.clone();
        let failing = self.failing.clone();

        Box::pin(async move {
            let id = entity.entity_id().clone();
            check_failing(&failing, &[&id])?;
            let mut store = entities.lock().map_err(lock_error)?;
            store.insert(id, entity);
            Ok(())
        })
    }

    fn delete(&self, id: &EntityId) -> BoxFuture<'static, RepositoryResult<()>> {
        let entities = self.entities.clone();
        let failing = self.failing.clone();
        let id = id.clone();

        Box::pin(async move {
            check_failing(&failing, &[&id])?;
            let mut store = entities.lock().map_err(lock_error)?;
            store
                .remove(&id)
                .map(|_| ())
                .ok_or(RepositoryError::Api(ApiError::NotFound))
        })
    }

    fn move_entity(
        &self,
        from: &EntityId,
        to: &EntityId,
    ) -> BoxFuture<'static, RepositoryResult<()>> {
        let entities = self.entities.clone();
        let failing = self.failing.clone();
        let from = from.clone();
        let to = to.clone();

        Box::pin(async move {
            check_failing(&failing, &[&from, &to])?;
            let mut store = entities.lock().map_err(lock_error)?;
            if store.contains_key(&to) {
                return Err(RepositoryError::Api(ApiError::Conflict));
            }
            let mut entity = store
                .remove(&from)
                .ok_or(RepositoryError::Api(ApiError::NotFound))?;
            entity.set_entity_id(to.clone());
            store.insert(to, entity);
            Ok(())
        })
    }
}
