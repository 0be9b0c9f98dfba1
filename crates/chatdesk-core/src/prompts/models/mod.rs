pub mod prompt;
pub mod prompts_store;

pub use prompt::{Prompt, PromptPatch};
pub use prompts_store::PromptsState;
