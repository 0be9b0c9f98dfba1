pub mod api_client;
pub mod error;
pub mod models_service;
pub mod publication_service;
pub mod resource_service;
pub mod share_service;

pub use api_client::ApiClient;
pub use error::{ApiError, ApiResult};
pub use models_service::ModelsService;
pub use publication_service::PublicationService;
pub use resource_service::{ResourceEntry, ResourceNode, ResourceService, WriteReceipt};
pub use share_service::ShareService;
