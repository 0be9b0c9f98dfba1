use crate::entities::{EntityId, LoadStatus};
use crate::publications::actions::PublicationAction;

use super::publication::{Publication, PublicationStatus, PublicEntity, ResourceAction};

/// Publication requests visible to the user plus the live public tree they act on.
#[derive(Debug, Clone, Default)]
pub struct PublicationsState {
    pub publications: Vec<Publication>,
    pub status: LoadStatus,
    pub public_entities: Vec<PublicEntity>,
    pub selected_publication_url: Option<String>,
    pub error: Option<String>,
}

impl PublicationsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publication(&self, url: &str) -> Option<&Publication> {
        self.publications.iter().find(|p| p.url == url)
    }

    pub fn selected_publication(&self) -> Option<&Publication> {
        self.selected_publication_url
            .as_deref()
            .and_then(|url| self.publication(url))
    }

    pub fn is_public(&self, id: &EntityId) -> bool {
        self.public_entities.iter().any(|e| &e.id == id)
    }

    pub fn reduce(&mut self, action: &PublicationAction) {
        use PublicationAction as A;

        match action {
            A::UploadPublications => self.status = LoadStatus::Loading,
            A::UploadPublicationsSuccess { publications } => {
                for publication in publications {
                    self.upsert(publication.clone());
                }
                self.status = LoadStatus::Loaded;
            }
            A::UploadPublicationSuccess { publication } => self.upsert(publication.clone()),
            A::UploadPublicTreeSuccess { ids } => {
                self.public_entities = ids.iter().cloned().map(PublicEntity::new).collect();
            }
            A::CreatePublicationSuccess { publication } => {
                let mut publication = publication.clone();
                if publication.status == PublicationStatus::Draft {
                    publication.status = PublicationStatus::PendingApproval;
                }
                self.upsert(publication);
            }
            A::SelectPublication { url } => self.selected_publication_url = url.clone(),
            A::ApprovePublicationSuccess { url } => {
                let Some(publication) = self.publications.iter_mut().find(|p| &p.url == url) else {
                    return;
                };
                publication.status = PublicationStatus::Approved;
                let resources = publication.resources.clone();
                for resource in resources {
                    let target = resource.target_url;
                    match resource.action {
                        ResourceAction::Delete => self.public_entities.retain(|e| e.id != target),
                        ResourceAction::Add | ResourceAction::AddIfAbsent => {
                            if !self.is_public(&target) {
                                self.public_entities.push(PublicEntity::new(target));
                            }
                        }
                    }
                }
            }
            A::RejectPublicationSuccess { url } => {
                if let Some(publication) = self.publications.iter_mut().find(|p| &p.url == url) {
                    publication.status = PublicationStatus::Rejected;
                }
            }
            A::PublicationFail { message } => {
                self.error = Some(message.clone());
                if self.status == LoadStatus::Loading {
                    self.status = LoadStatus::Failed;
                }
            }
            A::UploadPublication { .. }
            | A::UploadPublicTree
            | A::CreatePublication { .. }
            | A::ApprovePublication { .. }
            | A::RejectPublication { .. } => {}
        }
    }

    fn upsert(&mut self, publication: Publication) {
        match self.publications.iter_mut().find(|p| p.url == publication.url) {
            Some(slot) => *slot = publication,
            None => self.publications.push(publication),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ApiKind, FolderPath};
    use crate::publications::models::PublicationResource;

    fn public_id(name: &str, version: &str) -> EntityId {
        EntityId::new(FolderPath::root(ApiKind::Conversations, "public"), name).with_version(version)
    }

    fn publication(url: &str, resources: Vec<PublicationResource>) -> Publication {
        Publication {
            url: url.into(),
            name: url.into(),
            target_folder: None,
            status: PublicationStatus::PendingApproval,
            resources,
            created_at: 0,
        }
    }

    #[test]
    fn test_approve_publish_adds_with_version_group() {
        let own = EntityId::new(FolderPath::root(ApiKind::Conversations, "u"), "chat");
        let target = public_id("chat", "1");
        let mut state = PublicationsState::new();
        state.reduce(&PublicationAction::CreatePublicationSuccess {
            publication: publication("p1", vec![PublicationResource::publish(own, target.clone())]),
        });
        state.reduce(&PublicationAction::ApprovePublicationSuccess { url: "p1".into() });

        assert_eq!(state.publication("p1").unwrap().status, PublicationStatus::Approved);
        assert_eq!(state.public_entities.len(), 1);
        assert_eq!(state.public_entities[0].version_group, target.version_group());
    }

    #[test]
    fn test_approve_unpublish_removes_from_tree() {
        let target = public_id("chat", "1");
        let mut state = PublicationsState::new();
        state.reduce(&PublicationAction::UploadPublicTreeSuccess {
            ids: vec![target.clone()],
        });
        state.reduce(&PublicationAction::UploadPublicationsSuccess {
            publications: vec![publication("p2", vec![PublicationResource::unpublish(target.clone())])],
        });
        state.reduce(&PublicationAction::ApprovePublicationSuccess { url: "p2".into() });

        assert!(!state.is_public(&target));
    }

    #[test]
    fn test_reject_keeps_tree() {
        let target = public_id("chat", "1");
        let mut state = PublicationsState::new();
        state.reduce(&PublicationAction::UploadPublicTreeSuccess {
            ids: vec![target.clone()],
        });
        state.reduce(&PublicationAction::UploadPublicationsSuccess {
            publications: vec![publication("p3", vec![PublicationResource::unpublish(target.clone())])],
        });
        state.reduce(&PublicationAction::RejectPublicationSuccess { url: "p3".into() });

        assert_eq!(state.publication("p3").unwrap().status, PublicationStatus::Rejected);
        assert!(state.is_public(&target));
    }
}
