use crate::entities::folders::{self, apply_folder_remap, merge_folders};
use crate::entities::naming::{self, DEFAULT_FOLDER_NAME};
use crate::entities::{ApiKind, EntityId, Folder, FolderPath, LoadStatus};
use crate::prompts::actions::PromptAction;

use super::prompt::Prompt;

/// State of the prompt slice. Written only by [`PromptsState::reduce`].
#[derive(Debug, Clone)]
pub struct PromptsState {
    pub prompts: Vec<Prompt>,
    pub folders: Vec<Folder>,
    pub selected_prompt_id: Option<EntityId>,
    pub status: LoadStatus,
    bucket: String,
}

impl PromptsState {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            prompts: Vec::new(),
            folders: Vec::new(),
            selected_prompt_id: None,
            status: LoadStatus::NotLoaded,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn root_folder(&self) -> FolderPath {
        FolderPath::root(ApiKind::Prompts, self.bucket.clone())
    }

    pub fn prompt(&self, id: &EntityId) -> Option<&Prompt> {
        self.prompts.iter().find(|p| &p.id == id)
    }

    pub fn selected_prompt(&self) -> Option<&Prompt> {
        self.selected_prompt_id.as_ref().and_then(|id| self.prompt(id))
    }

    pub fn names_in_folder(&self, folder: &FolderPath) -> Vec<String> {
        self.prompts
            .iter()
            .filter(|p| p.folder_id() == folder)
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn prompts_in_folder(&self, folder: &FolderPath) -> Vec<&Prompt> {
        folders::entities_in_folder(&self.prompts, folder)
    }

    pub fn reduce(&mut self, action: &PromptAction) {
        use PromptAction as A;

        match action {
            A::Init | A::RefreshPromptsTree => self.status = LoadStatus::Loading,
            A::UploadPromptsSuccess {
                folders,
                prompts,
                replace,
            } => {
                if *replace {
                    self.folders.retain(|f| f.temporary);
                    let loaded: Vec<Prompt> =
                        self.prompts.iter().filter(|p| p.is_loaded()).cloned().collect();
                    self.prompts = prompts
                        .iter()
                        .map(|p| loaded.iter().find(|l| l.id == p.id).cloned().unwrap_or_else(|| p.clone()))
                        .collect();
                    if let Some(selected) = &self.selected_prompt_id {
                        if !self.prompts.iter().any(|p| &p.id == selected) {
                            self.selected_prompt_id = None;
                        }
                    }
                } else {
                    for prompt in prompts {
                        self.merge_header(prompt.clone());
                    }
                }
                merge_folders(&mut self.folders, folders.iter().cloned());
                self.status = LoadStatus::Loaded;
            }
            A::UploadPromptsFail { .. } => self.status = LoadStatus::Failed,
            A::UploadPromptSuccess { prompt } => {
                let mut loaded = prompt.clone();
                loaded.status = LoadStatus::Loaded;
                self.upsert(loaded);
            }
            A::AddPrompts { prompts } => {
                for prompt in prompts {
                    self.upsert(prompt.clone());
                }
            }
            A::SavePromptSuccess { id } => {
                let folder = id.folder().clone();
                for f in self.folders.iter_mut().filter(|f| f.id.contains(&folder)) {
                    f.temporary = false;
                }
            }
            A::UpdatePrompt { id, values } => {
                let optimistic = values.without_identity();
                if let Some(prompt) = self.prompts.iter_mut().find(|p| &p.id == id) {
                    optimistic.apply(prompt);
                }
            }
            A::UpdatePromptSuccess { id, prompt: patch } => {
                if let Some(prompt) = self.prompts.iter_mut().find(|p| &p.id == id) {
                    patch.apply(prompt);
                }
                if let Some(new_id) = &patch.id {
                    if self.selected_prompt_id.as_ref() == Some(id) {
                        self.selected_prompt_id = Some(new_id.clone());
                    }
                }
            }
            A::UpdatePromptFail { id, previous } => {
                let restored = previous.as_ref().clone();
                let previous_id = restored.id.clone();
                self.prompts.retain(|p| &p.id != id || p.id == previous_id);
                self.upsert(restored);
                if self.selected_prompt_id.as_ref() == Some(id) {
                    self.selected_prompt_id = Some(previous_id);
                }
            }
            A::DeletePromptsComplete { ids } => {
                self.prompts.retain(|p| !ids.contains(&p.id));
                if let Some(selected) = &self.selected_prompt_id {
                    if ids.contains(selected) {
                        self.selected_prompt_id = None;
                    }
                }
            }
            A::SetSelectedPrompt { id } => self.selected_prompt_id = id.clone(),

            A::CreateFolder { parent, name } => {
                let parent = parent.clone().unwrap_or_else(|| self.root_folder());
                let siblings: Vec<String> = folders::child_folders(&self.folders, &parent)
                    .iter()
                    .map(|f| f.name.clone())
                    .collect();
                let name = match name.as_deref().map(naming::prepare_entity_name) {
                    Some(name) if !name.is_empty() => {
                        naming::unique_name(&name, siblings.iter().map(String::as_str))
                    }
                    _ => naming::next_default_name(
                        DEFAULT_FOLDER_NAME,
                        siblings.iter().map(String::as_str),
                        0,
                    ),
                };
                self.folders.push(Folder::temporary(parent.child(name)));
            }
            A::DeleteFolder { id } => self.folders.retain(|f| !id.contains(&f.id)),
            A::ApplyIdRemap { remap } => {
                apply_folder_remap(&mut self.folders, remap);
                for prompt in &mut self.prompts {
                    if let Some(new_id) = remap.entity(&prompt.id) {
                        prompt.id = new_id.clone();
                    }
                }
                if let Some(new_id) = self
                    .selected_prompt_id
                    .as_ref()
                    .and_then(|id| remap.entity(id))
                {
                    self.selected_prompt_id = Some(new_id.clone());
                }
            }

            A::CreateNewPrompt { .. }
            | A::SavePrompt { .. }
            | A::DeletePrompts { .. }
            | A::DuplicatePrompt { .. }
            | A::RenameFolder { .. }
            | A::MoveFolder { .. } => {}
        }
    }

    fn upsert(&mut self, prompt: Prompt) {
        match self.prompts.iter_mut().find(|p| p.id == prompt.id) {
            Some(slot) => *slot = prompt,
            None => self.prompts.push(prompt),
        }
    }

    fn merge_header(&mut self, header: Prompt) {
        match self.prompts.iter_mut().find(|p| p.id == header.id) {
            Some(existing) if existing.is_loaded() => {}
            Some(slot) => *slot = header,
            None => self.prompts.push(header),
        }
    }

    pub(crate) fn mark_shared(&mut self, ids: &[EntityId], shared: bool) {
        for prompt in self.prompts.iter_mut().filter(|p| ids.contains(&p.id)) {
            prompt.is_shared = shared;
        }
    }

    pub(crate) fn add_shared_with_me(&mut self, incoming: &[Prompt]) {
        for prompt in incoming {
            let mut shared = prompt.clone();
            shared.shared_with_me = true;
            self.merge_header(shared);
        }
    }

    pub(crate) fn remove(&mut self, ids: &[EntityId]) {
        self.reduce(&PromptAction::DeletePromptsComplete { ids: ids.to_vec() });
    }
}
