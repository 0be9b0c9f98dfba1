use std::sync::Arc;

use crate::conversations::models::Conversation;
use crate::conversations::services::ChatService;
use crate::prompts::models::Prompt;
use crate::repositories::{EntityRepository, HttpEntityRepository};
use crate::services::{
    ApiClient, ApiResult, ModelsService, PublicationService, ResourceService, ShareService,
};
use crate::settings::models::AppConfig;
use crate::settings::repositories::LocalSettingsRepository;

/// Backends the controllers talk to.
#[derive(Clone)]
pub struct Services {
    pub conversations: Arc<dyn EntityRepository<Conversation>>,
    pub prompts: Arc<dyn EntityRepository<Prompt>>,
    pub chat: ChatService,
    pub models: ModelsService,
    pub publications: PublicationService,
    pub shares: ShareService,
    pub local_settings: Arc<dyn LocalSettingsRepository>,
}

impl Services {
    /// Everything over HTTP against `config.api_base_url`.
    pub fn http(
        config: &AppConfig,
        local_settings: Arc<dyn LocalSettingsRepository>,
    ) -> ApiResult<Self> {
        let api = ApiClient::new(config.api_base_url.clone(), config.request_timeout())?;
        let resources = ResourceService::new(api.clone());
        Ok(Self::with_repositories(
            api,
            Arc::new(HttpEntityRepository::new(resources.clone())),
            Arc::new(HttpEntityRepository::new(resources)),
            local_settings,
        ))
    }

    /// HTTP services with caller-supplied entity storage.
    pub fn with_repositories(
        api: ApiClient,
        conversations: Arc<dyn EntityRepository<Conversation>>,
        prompts: Arc<dyn EntityRepository<Prompt>>,
        local_settings: Arc<dyn LocalSettingsRepository>,
    ) -> Self {
        Self {
            conversations,
            prompts,
            chat: ChatService::new(api.clone()),
            models: ModelsService::new(api.clone()),
            publications: PublicationService::new(api.clone()),
            shares: ShareService::new(api),
            local_settings,
        }
    }
}
