use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{ApiKind, EntityId, FolderPath};

/// Upload/sync state of a folder's contents or of an entity's full body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadStatus {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: FolderPath,
    pub name: String,
    #[serde(skip)]
    pub status: LoadStatus,
    /// Created in the client and not yet backed by any persisted entity.
    #[serde(default)]
    pub temporary: bool,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default)]
    pub shared_with_me: bool,
    #[serde(default)]
    pub published_with_me: bool,
}

impl Folder {
    pub fn new(id: FolderPath) -> Self {
        let name = id.name().unwrap_or_default().to_string();
        Self {
            id,
            name,
            status: LoadStatus::NotLoaded,
            temporary: false,
            is_shared: false,
            shared_with_me: false,
            published_with_me: false,
        }
    }

    pub fn temporary(id: FolderPath) -> Self {
        Self {
            temporary: true,
            status: LoadStatus::Loaded,
            ..Self::new(id)
        }
    }

    pub fn kind(&self) -> ApiKind {
        self.id.kind()
    }

    /// Parent folder id. A top-level folder's parent is its bucket root.
    pub fn folder_id(&self) -> Option<FolderPath> {
        self.id.parent()
    }
}

/// Anything stored inside a folder tree (conversations, prompts).
pub trait FolderItem {
    fn entity_id(&self) -> &EntityId;

    /// Replace the id; implementations keep their display name in sync.
    fn set_entity_id(&mut self, id: EntityId);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FolderMoveError {
    #[error("Cannot move a folder into itself or one of its descendants")]
    IntoOwnSubtree,

    #[error("Cannot move a folder across resource kinds")]
    KindMismatch,
}

/// Old → new ids produced by renaming or moving a subtree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdRemap {
    pub folders: Vec<(FolderPath, FolderPath)>,
    pub entities: Vec<(EntityId, EntityId)>,
}

impl IdRemap {
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.entities.is_empty()
    }

    pub fn folder(&self, old: &FolderPath) -> Option<&FolderPath> {
        self.folders.iter().find(|(o, _)| o == old).map(|(_, n)| n)
    }

    pub fn entity(&self, old: &EntityId) -> Option<&EntityId> {
        self.entities.iter().find(|(o, _)| o == old).map(|(_, n)| n)
    }

    /// The inverse mapping (new → old), used to roll a failed move back.
    pub fn inverted(&self) -> IdRemap {
        IdRemap {
            folders: self
                .folders
                .iter()
                .map(|(o, n)| (n.clone(), o.clone()))
                .collect(),
            entities: self
                .entities
                .iter()
                .map(|(o, n)| (n.clone(), o.clone()))
                .collect(),
        }
    }
}

/// Direct children of `parent`.
pub fn child_folders<'a>(folders: &'a [Folder], parent: &FolderPath) -> Vec<&'a Folder> {
    folders
        .iter()
        .filter(|f| f.folder_id().as_ref() == Some(parent))
        .collect()
}

/// Every folder strictly below `root`.
pub fn descendant_folder_ids(folders: &[Folder], root: &FolderPath) -> Vec<FolderPath> {
    folders
        .iter()
        .filter(|f| root.is_ancestor_of(&f.id))
        .map(|f| f.id.clone())
        .collect()
}

/// Ancestors of `id` (outermost first), excluding the bucket root, including `id` itself.
pub fn parent_folder_ids(id: &FolderPath) -> Vec<FolderPath> {
    let mut chain = Vec::new();
    let mut current = Some(id.clone());
    while let Some(folder) = current {
        if folder.is_root() {
            break;
        }
        current = folder.parent();
        chain.push(folder);
    }
    chain.reverse();
    chain
}

pub fn is_descendant(folder: &FolderPath, ancestor: &FolderPath) -> bool {
    ancestor.is_ancestor_of(folder)
}

/// Folders implied by an entity living in `folder` (listing responses only carry items).
pub fn folders_for_entity(folder: &FolderPath) -> Vec<Folder> {
    parent_folder_ids(folder)
        .into_iter()
        .map(|id| Folder {
            status: LoadStatus::Loaded,
            ..Folder::new(id)
        })
        .collect()
}

/// Merge by id: incoming fields win, ids from both sides are kept.
pub fn merge_folders(existing: &mut Vec<Folder>, incoming: impl IntoIterator<Item = Folder>) {
    for folder in incoming {
        match existing.iter_mut().find(|f| f.id == folder.id) {
            Some(slot) => *slot = folder,
            None => existing.push(folder),
        }
    }
}

/// Entities anywhere below (or directly in) `folder`.
pub fn entities_in_folder<'a, E: FolderItem>(
    entities: impl IntoIterator<Item = &'a E>,
    folder: &FolderPath,
) -> Vec<&'a E>
where
    E: 'a,
{
    entities
        .into_iter()
        .filter(|e| folder.contains(e.entity_id().folder()))
        .collect()
}

fn relocate<'a>(
    folders: &[Folder],
    entity_ids: impl IntoIterator<Item = &'a EntityId>,
    from: &FolderPath,
    to: &FolderPath,
) -> IdRemap {
    let mut remap = IdRemap::default();
    remap.folders.push((from.clone(), to.clone()));
    for folder in folders.iter().filter(|f| from.is_ancestor_of(&f.id)) {
        if let Some(new_id) = folder.id.rebase(from, to) {
            remap.folders.push((folder.id.clone(), new_id));
        }
    }
    for id in entity_ids {
        if let Some(new_id) = id.rebase(from, to) {
            remap.entities.push((id.clone(), new_id));
        }
    }
    remap
}

/// Rename `id` to `new_name`, regenerating ids of every descendant folder and entity.
pub fn rename_folder<'a>(
    folders: &[Folder],
    entity_ids: impl IntoIterator<Item = &'a EntityId>,
    id: &FolderPath,
    new_name: &str,
) -> IdRemap {
    let target = id.renamed(new_name);
    if &target == id {
        return IdRemap::default();
    }
    relocate(folders, entity_ids, id, &target)
}

/// Move `id` (and its subtree) under `new_parent`.
pub fn move_folder<'a>(
    folders: &[Folder],
    entity_ids: impl IntoIterator<Item = &'a EntityId>,
    id: &FolderPath,
    new_parent: &FolderPath,
) -> Result<IdRemap, FolderMoveError> {
    if id.kind() != new_parent.kind() {
        return Err(FolderMoveError::KindMismatch);
    }
    if id.contains(new_parent) {
        return Err(FolderMoveError::IntoOwnSubtree);
    }
    let name = id.name().unwrap_or_default();
    let target = new_parent.child(name);
    if &target == id {
        return Ok(IdRemap::default());
    }
    Ok(relocate(folders, entity_ids, id, &target))
}

/// Apply the folder half of a remap to a folder list, keeping names in sync with ids.
pub fn apply_folder_remap(folders: &mut [Folder], remap: &IdRemap) {
    for folder in folders.iter_mut() {
        if let Some(new_id) = remap.folder(&folder.id) {
            folder.id = new_id.clone();
            folder.name = new_id.name().unwrap_or_default().to_string();
        }
    }
}
