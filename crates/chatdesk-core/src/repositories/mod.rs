pub mod batch;
pub mod entity_repository;
pub mod error;
pub mod http_entity_repository;
pub mod in_memory_entity_repository;

pub use entity_repository::{BoxFuture, EntityRepository, Listing, StoredEntity};
pub use error::{RepositoryError, RepositoryResult};
pub use http_entity_repository::HttpEntityRepository;
pub use in_memory_entity_repository::InMemoryEntityRepository;
