use futures::future::join_all;
use tracing::warn;

use super::entity_repository::{EntityRepository, StoredEntity};
use super::error::RepositoryResult;
use crate::entities::EntityId;
use crate::services::ApiError;

/// Delete every id concurrently. Returns the ids that could not be deleted;
/// an id that is already gone counts as deleted.
pub async fn delete_all<E: StoredEntity>(
    repository: &dyn EntityRepository<E>,
    ids: &[EntityId],
) -> Vec<EntityId> {
    let results = join_all(ids.iter().map(|id| repository.delete(id))).await;
    ids.iter()
        .zip(results)
        .filter_map(|(id, result)| match result {
            Ok(()) => None,
            Err(e) if e.api_error() == Some(&ApiError::NotFound) => None,
            Err(e) => {
                warn!(id = %id.encode(), error = ?e, "Failed to delete entity");
                Some(id.clone())
            }
        })
        .collect()
}

/// Move every `(from, to)` pair concurrently. Returns the pairs that failed.
pub async fn move_all<E: StoredEntity>(
    repository: &dyn EntityRepository<E>,
    pairs: &[(EntityId, EntityId)],
) -> Vec<(EntityId, EntityId)> {
    let results = join_all(pairs.iter().map(|(from, to)| repository.move_entity(from, to))).await;
    pairs
        .iter()
        .zip(results)
        .filter_map(|(pair, result)| match result {
            Ok(()) => None,
            Err(e) => {
                warn!(from = %pair.0.encode(), to = %pair.1.encode(), error = ?e, "Failed to move entity");
                Some(pair.clone())
            }
        })
        .collect()
}

/// Store `entity` under its id, then remove the copy at `old`.
///
/// When the old copy cannot be removed the new one is deleted again so the
/// backend is left as it was.
pub async fn relocate<E: StoredEntity>(
    repository: &dyn EntityRepository<E>,
    entity: E,
    old: &EntityId,
) -> RepositoryResult<EntityId> {
    let stored = repository.create(entity).await?;
    if let Err(e) = repository.delete(old).await {
        if let Err(cleanup) = repository.delete(&stored).await {
            warn!(id = %stored.encode(), error = ?cleanup, "Failed to remove relocated copy");
        }
        return Err(e);
    }
    Ok(stored)
}
