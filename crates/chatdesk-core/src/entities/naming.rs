pub const DEFAULT_CONVERSATION_NAME: &str = "Conversation";
pub const DEFAULT_PROMPT_NAME: &str = "Prompt";
pub const DEFAULT_FOLDER_NAME: &str = "New folder";
pub const REPLAY_NAME_PREFIX: &str = "[Replay]";
pub const PLAYBACK_NAME_PREFIX: &str = "[Playback]";

pub const MAX_ENTITY_NAME_LENGTH: usize = 160;

/// Characters the backend refuses inside a path segment.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '?', '*', '"', '<', '>', '|', '\t'];

/// Pick the next free default name: `base`, then `base 1`, `base 2`...
///
/// An existing plain `base` counts as index 0. `start_index` shifts the result
/// so several entities created in one batch get distinct names.
pub fn next_default_name<'a>(
    base: &str,
    taken: impl IntoIterator<Item = &'a str>,
    start_index: usize,
) -> String {
    let prefix = format!("{base} ");
    let mut highest: Option<usize> = None;

    for name in taken {
        let index = if name == base {
            Some(0)
        } else {
            name.strip_prefix(&prefix)
                .and_then(|suffix| suffix.parse::<usize>().ok())
        };
        if let Some(index) = index {
            highest = Some(highest.map_or(index, |h| h.max(index)));
        }
    }

    let next = match highest {
        None => start_index,
        Some(h) => h + 1 + start_index,
    };

    if next == 0 {
        base.to_string()
    } else {
        format!("{prefix}{next}")
    }
}

/// Make `name` unique among `taken` by appending ` 1`, ` 2`... when needed.
pub fn unique_name<'a>(name: &str, taken: impl IntoIterator<Item = &'a str> + Clone) -> String {
    if !taken.clone().into_iter().any(|t| t == name) {
        return name.to_string();
    }
    next_default_name(name, taken, 0)
}

/// Normalise a user supplied name into something storable as a path segment.
pub fn prepare_entity_name(name: &str) -> String {
    let first_line = name.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let stripped: String = first_line
        .chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { ' ' } else { c })
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(MAX_ENTITY_NAME_LENGTH).collect();
    truncated
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

/// Name for a conversation derived from the text of its first message.
pub fn name_from_first_message(content: &str) -> String {
    let name = prepare_entity_name(content);
    if name.is_empty() {
        DEFAULT_CONVERSATION_NAME.to_string()
    } else {
        name
    }
}

/// True for `base` and `base N`.
pub fn is_default_name(name: &str, base: &str) -> bool {
    name == base
        || name
            .strip_prefix(base)
            .and_then(|rest| rest.strip_prefix(' '))
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}
