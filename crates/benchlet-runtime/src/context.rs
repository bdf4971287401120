//! Per-run launch context

use benchlet_core::{EnvAllowList, HostLayout, LauncherConfig};
use uuid::Uuid;

/// Everything a launch needs besides the job itself.
///
/// Built once at startup and passed by reference through dispatch and launch.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Identifier for this fleet run
    pub run_id: Uuid,
    /// Container image reference
    pub image: String,
    /// Script run inside each container; `None` opens an interactive shell
    pub script: Option<String>,
    /// Container runtime CLI
    pub runtime_binary: String,
    /// Host directories mounted into every container
    pub layout: HostLayout,
    /// Host variables allowed into containers
    pub allow_list: EnvAllowList,
}

impl RunContext {
    pub fn new(image: impl Into<String>, layout: HostLayout, allow_list: EnvAllowList) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            image: image.into(),
            script: None,
            runtime_binary: "docker".to_string(),
            layout,
            allow_list,
        }
    }

    /// Build a context from the launcher section of the settings file
    pub fn from_config(config: &LauncherConfig, layout: HostLayout, allow_list: EnvAllowList) -> Self {
        Self::new(config.image.clone(), layout, allow_list)
            .with_script(Some(config.script.clone()))
            .with_runtime_binary(config.runtime_binary.clone())
    }

    pub fn with_script(mut self, script: Option<String>) -> Self {
        self.script = script.filter(|s| !s.is_empty());
        self
    }

    pub fn with_runtime_binary(mut self, binary: impl Into<String>) -> Self {
        self.runtime_binary = binary.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let ctx = RunContext::from_config(
            &LauncherConfig::default(),
            HostLayout::default(),
            EnvAllowList::default(),
        );
        assert_eq!(ctx.script.as_deref(), Some("run_model.py"));
        assert_eq!(ctx.runtime_binary, "docker");
    }

    #[test]
    fn test_empty_script_means_interactive() {
        let ctx = RunContext::new("img", HostLayout::default(), EnvAllowList::default())
            .with_script(Some(String::new()));
        assert!(ctx.script.is_none());
    }
}
