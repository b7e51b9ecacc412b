//! Environment-variable substitution: any configured value of the form
//! `${VAR}` is replaced with the supervisor process's own `VAR`, empty if unset.

use std::collections::HashMap;

pub fn resolve(environment: &HashMap<String, String>) -> HashMap<String, String> {
    environment
        .iter()
        .map(|(k, v)| (k.clone(), resolve_value(v)))
        .collect()
}

fn resolve_value(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).unwrap_or_default()
    } else {
        value.to_string()
    }
}
