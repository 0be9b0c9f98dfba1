use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    // {{name}} or {{name|default value}}
    static ref VARIABLE_REGEX: Regex = Regex::new(r"\{\{\s*([^{}|]+?)\s*(?:\|([^{}]*))?\}\}")
        .expect("VARIABLE_REGEX pattern is valid");
}

/// A `{{name}}` placeholder inside prompt text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVariable {
    pub name: String,
    pub default: Option<String>,
}

/// Variables in order of first appearance, one entry per name.
pub fn parse_variables(content: &str) -> Vec<TemplateVariable> {
    let mut variables: Vec<TemplateVariable> = Vec::new();
    for caps in VARIABLE_REGEX.captures_iter(content) {
        let name = caps[1].to_string();
        if variables.iter().any(|v| v.name == name) {
            continue;
        }
        variables.push(TemplateVariable {
            name,
            default: caps.get(2).map(|m| m.as_str().to_string()),
        });
    }
    variables
}

/// Names of variables that have no default and therefore need a value from the user.
pub fn unresolved_variables(content: &str) -> Vec<String> {
    parse_variables(content)
        .into_iter()
        .filter(|v| v.default.is_none())
        .map(|v| v.name)
        .collect()
}

pub fn has_unresolved_variables(content: &str) -> bool {
    !unresolved_variables(content).is_empty()
}

/// Substitute `values`, falling back to each placeholder's default.
/// Placeholders with neither stay untouched.
pub fn apply_variables(content: &str, values: &HashMap<String, String>) -> String {
    VARIABLE_REGEX
        .replace_all(content, |caps: &Captures| {
            let name = &caps[1];
            match (values.get(name), caps.get(2)) {
                (Some(value), _) => value.clone(),
                (None, Some(default)) => default.as_str().to_string(),
                (None, None) => caps[0].to_string(),
            }
        })
        .into_owned()
}
