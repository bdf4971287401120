//! Environment propagation into containers

use benchlet_core::EnvAllowList;
use std::collections::{BTreeMap, HashMap};

/// Placeholder printed in place of secret values
pub const REDACTED: &str = "[REDACTED]";

const SECRET_MARKERS: &[&str] = &["TOKEN", "SECRET", "PASSWORD", "API_KEY"];

/// Source of environment variable values
pub trait EnvSource: Send + Sync {
    /// Value of `name`, or `None` when unset
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the environment of the current process at call time
#[derive(Debug, Clone, Copy, Default)]
pub struct HostEnv;

impl EnvSource for HostEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Collect allow-listed variables that are set (and non-empty) in `source`
pub fn propagate(allow_list: &EnvAllowList, source: &dyn EnvSource) -> BTreeMap<String, String> {
    allow_list
        .iter()
        .filter_map(|name| {
            source
                .var(name)
                .filter(|value| !value.is_empty())
                .map(|value| (name.to_string(), value))
        })
        .collect()
}

/// Whether a variable's value must never be printed
pub fn is_secret_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    SECRET_MARKERS.iter().any(|marker| upper.contains(marker))
}

/// Value as it may appear in logs
pub fn display_value<'a>(name: &str, value: &'a str) -> &'a str {
    if is_secret_name(name) {
        REDACTED
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_only_allow_listed_variables_forwarded() {
        let allow = EnvAllowList::from_names(["GPU_MEM_UTIL"]);
        let source = host(&[("GPU_MEM_UTIL", "0.85"), ("SECRET_TOKEN", "xyz")]);

        let env = propagate(&allow, &source);
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("GPU_MEM_UTIL").map(String::as_str), Some("0.85"));
    }

    #[test]
    fn test_unset_variable_is_absent() {
        let allow = EnvAllowList::from_names(["GPU_MEM_UTIL", "SP_MAX_TOKENS"]);
        let source = host(&[("GPU_MEM_UTIL", "0.9")]);

        let env = propagate(&allow, &source);
        assert!(!env.contains_key("SP_MAX_TOKENS"));
    }

    #[test]
    fn test_empty_value_is_treated_as_unset() {
        let allow = EnvAllowList::from_names(["HF_TOKEN"]);
        let source = host(&[("HF_TOKEN", "")]);

        assert!(propagate(&allow, &source).is_empty());
    }

    #[test]
    fn test_secret_names() {
        assert!(is_secret_name("HF_TOKEN"));
        assert!(is_secret_name("openai_api_key"));
        assert!(is_secret_name("DB_PASSWORD"));
        assert!(!is_secret_name("GPU_MEM_UTIL"));
        assert_eq!(display_value("HF_TOKEN", "hf_abc"), REDACTED);
        assert_eq!(display_value("SP_TEMPERATURE", "0.5"), "0.5");
    }
}
