use std::cmp::Ordering;

use thiserror::Error;

use super::models::{PublicEntity, Publication, PublicationStatus, ResourceAction};
use crate::entities::EntityId;

/// Why a publication cannot be approved as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    /// Unpublish of resources that are already gone or already being unpublished.
    #[error("Duplicated unpublishing: {}", names.join(", "))]
    DuplicatedUnpublishing { names: Vec<String> },

    /// Publish of a version that already exists in the public tree.
    #[error("Version already published: {}", names.join(", "))]
    VersionAlreadyPublished { names: Vec<String> },
}

/// What the approval view shows for one publication.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PublicationReview {
    pub can_approve: bool,
    pub errors: Vec<ReviewError>,
    /// Public entities an approval would supersede with a newer version.
    pub superseded: Vec<EntityId>,
}

/// Review `publication` against the other requests and the live public tree.
pub fn review_publication(
    publication: &Publication,
    all: &[Publication],
    public: &[PublicEntity],
) -> PublicationReview {
    let mut errors = Vec::new();

    let duplicated: Vec<String> = sorted_names(
        publication
            .targets(ResourceAction::Delete)
            .filter(|target| {
                !public.iter().any(|e| &e.id == *target)
                    || is_unpublished_earlier(publication, target, all)
            }),
    );
    if !duplicated.is_empty() {
        errors.push(ReviewError::DuplicatedUnpublishing { names: duplicated });
    }

    let existing: Vec<String> = sorted_names(
        publication
            .targets(ResourceAction::Add)
            .filter(|target| public.iter().any(|e| &e.id == *target)),
    );
    if !existing.is_empty() {
        errors.push(ReviewError::VersionAlreadyPublished { names: existing });
    }

    let mut superseded = Vec::new();
    for resource in publication
        .resources
        .iter()
        .filter(|r| r.action != ResourceAction::Delete)
    {
        let group = resource.target_url.version_group();
        if let Some(latest) = latest_version(public, &group) {
            if compare_versions(resource.target_url.version(), latest.id.version())
                == Ordering::Greater
            {
                superseded.push(latest.id.clone());
            }
        }
    }

    PublicationReview {
        can_approve: publication.status == PublicationStatus::PendingApproval && errors.is_empty(),
        errors,
        superseded,
    }
}

/// Another pending or approved request created before this one already unpublishes `target`.
fn is_unpublished_earlier(publication: &Publication, target: &EntityId, all: &[Publication]) -> bool {
    all.iter()
        .filter(|other| other.url != publication.url)
        .filter(|other| {
            matches!(
                other.status,
                PublicationStatus::PendingApproval | PublicationStatus::Approved
            )
        })
        .filter(|other| {
            (other.created_at, other.url.as_str())
                < (publication.created_at, publication.url.as_str())
        })
        .any(|other| other.targets(ResourceAction::Delete).any(|t| t == target))
}

fn sorted_names<'a>(ids: impl Iterator<Item = &'a EntityId>) -> Vec<String> {
    let mut names: Vec<String> = ids.map(|id| id.name().to_string()).collect();
    names.sort();
    names.dedup();
    names
}

/// Highest published version within a version group.
pub fn latest_version<'a>(public: &'a [PublicEntity], group: &EntityId) -> Option<&'a PublicEntity> {
    public
        .iter()
        .filter(|e| &e.version_group == group)
        .max_by(|a, b| compare_versions(a.id.version(), b.id.version()))
}

/// Compare dotted numeric versions (`1.10` > `1.9`); a missing version sorts first.
pub fn compare_versions(a: Option<&str>, b: Option<&str>) -> Ordering {
    let parse = |v: &str| -> Vec<u64> { v.split('.').map(|p| p.parse().unwrap_or(0)).collect() };
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => parse(a).cmp(&parse(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ApiKind, FolderPath};
    use crate::publications::models::PublicationResource;

    fn public_id(name: &str, version: &str) -> EntityId {
        EntityId::new(FolderPath::root(ApiKind::Prompts, "public"), name).with_version(version)
    }

    fn request(url: &str, created_at: i64, resources: Vec<PublicationResource>) -> Publication {
        Publication {
            url: url.into(),
            name: url.into(),
            target_folder: None,
            status: PublicationStatus::PendingApproval,
            resources,
            created_at,
        }
    }

    #[test]
    fn test_duplicate_unpublish_disables_approval() {
        let target = public_id("b-prompt", "1");
        let other = public_id("a-prompt", "1");
        let public = vec![PublicEntity::new(target.clone()), PublicEntity::new(other.clone())];
        let first = request(
            "p1",
            1,
            vec![
                PublicationResource::unpublish(target.clone()),
                PublicationResource::unpublish(other.clone()),
            ],
        );
        let second = request(
            "p2",
            2,
            vec![
                PublicationResource::unpublish(target),
                PublicationResource::unpublish(other),
            ],
        );
        let all = vec![first.clone(), second.clone()];

        assert!(review_publication(&first, &all, &public).can_approve);

        let review = review_publication(&second, &all, &public);
        assert!(!review.can_approve);
        assert_eq!(
            review.errors,
            vec![ReviewError::DuplicatedUnpublishing {
                names: vec!["a-prompt".into(), "b-prompt".into()]
            }]
        );
    }

    #[test]
    fn test_unpublish_of_absent_resource_is_duplicate() {
        let target = public_id("gone", "1");
        let publication = request("p1", 1, vec![PublicationResource::unpublish(target)]);
        let review = review_publication(&publication, &[publication.clone()], &[]);
        assert!(!review.can_approve);
        assert!(matches!(
            review.errors[0],
            ReviewError::DuplicatedUnpublishing { .. }
        ));
    }

    #[test]
    fn test_new_version_supersedes_latest() {
        let own = EntityId::new(FolderPath::root(ApiKind::Prompts, "u"), "tips");
        let public = vec![
            PublicEntity::new(public_id("tips", "1.9")),
            PublicEntity::new(public_id("tips", "1.10")),
        ];
        let publication = request(
            "p1",
            1,
            vec![PublicationResource::publish(own, public_id("tips", "2.0"))],
        );
        let review = review_publication(&publication, &[], &public);
        assert!(review.can_approve);
        assert_eq!(review.superseded, vec![public_id("tips", "1.10")]);
    }

    #[test]
    fn test_rejected_request_cannot_be_approved() {
        let mut publication = request("p1", 1, vec![]);
        publication.status = PublicationStatus::Rejected;
        assert!(!review_publication(&publication, &[], &[]).can_approve);
    }
}
