//! Configuration types and catalog loading for benchlet

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{BenchletError, BenchletResult};
use crate::model::Model;

/// Suffix every host cache directory must end with
pub const HF_CACHE_SUFFIX: &str = ".cache/huggingface";

/// Default container image for benchmark runs
pub const DEFAULT_IMAGE: &str =
    "hyoon11/vllm-dev:20260121_43_py3.12_torch2.9_triton3.5_navi_upstream_6a09612_ubuntu24.04";

/// Default script run inside each container
pub const DEFAULT_SCRIPT: &str = "run_model.py";

/// Top-level settings file (`benchlet.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Locations of the declarative catalogs
    pub catalog: CatalogPaths,
    /// Host directories mounted into every container
    pub layout: HostLayout,
    /// Container launcher settings
    pub launcher: LauncherConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl FleetConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> BenchletResult<Self> {
        let content = read_config_file(path)?;
        toml::from_str(&content).map_err(|e| {
            BenchletError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load the given file, or fall back to defaults when no file was named
    pub fn load(path: Option<&Path>) -> BenchletResult<Self> {
        match path {
            Some(path) => {
                info!(path = %path.display(), "Loading fleet configuration");
                Self::from_file(path)
            }
            None => {
                debug!("No fleet configuration given, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Catalog file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogPaths {
    /// Device catalog (YAML, top-level `gpus` list)
    pub devices: PathBuf,
    /// Model catalog (YAML, top-level `models` list)
    pub models: PathBuf,
    /// Environment allow-list (YAML, top-level `env_vars` list)
    pub env_vars: PathBuf,
}

impl Default for CatalogPaths {
    fn default() -> Self {
        Self {
            devices: PathBuf::from(".config/gpus.yaml"),
            models: PathBuf::from(".config/models.yaml"),
            env_vars: PathBuf::from("yaml/env_vars.yaml"),
        }
    }
}

/// Host side of the six bind mounts shared by every job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostLayout {
    /// Downloaded model weights
    pub cache_dir: PathBuf,
    /// In-container scripts
    pub scripts_dir: PathBuf,
    /// Prompt configuration
    pub prompts_dir: PathBuf,
    /// Per-device, per-model logs
    pub logs_dir: PathBuf,
    /// Image resources referenced by prompts
    pub images_dir: PathBuf,
    /// Declarative configuration visible to the container
    pub yaml_dir: PathBuf,
}

impl Default for HostLayout {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./.cache/huggingface"),
            scripts_dir: PathBuf::from("./scripts/container"),
            prompts_dir: PathBuf::from("./prompts"),
            logs_dir: PathBuf::from("./.logs"),
            images_dir: PathBuf::from("./images"),
            yaml_dir: PathBuf::from("./yaml"),
        }
    }
}

impl HostLayout {
    /// Reject cache directories that do not end with `.cache/huggingface`
    pub fn validate(&self) -> BenchletResult<()> {
        validate_cache_dir(&self.cache_dir)
    }
}

/// Check the host cache directory shape
pub fn validate_cache_dir(path: &Path) -> BenchletResult<()> {
    if path.to_string_lossy().ends_with(HF_CACHE_SUFFIX) {
        Ok(())
    } else {
        Err(BenchletError::Validation(format!(
            "Huggingface cache dir invalid: {} must end with {}",
            path.display(),
            HF_CACHE_SUFFIX
        )))
    }
}

/// Container launcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Container runtime CLI (docker or a compatible binary)
    pub runtime_binary: String,
    /// Image reference
    pub image: String,
    /// Script run inside each container
    pub script: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            runtime_binary: "docker".to_string(),
            image: DEFAULT_IMAGE.to_string(),
            script: DEFAULT_SCRIPT.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Validated device and model catalogs for one run
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Enabled devices in catalog order
    pub devices: Vec<Device>,
    /// Models in catalog order
    pub models: Vec<Model>,
}

impl Catalog {
    /// Load both catalogs; disabled devices are dropped
    pub fn load(devices_path: &Path, models_path: &Path) -> BenchletResult<Self> {
        let devices = load_devices(devices_path)?;
        let models = load_models(models_path)?;

        info!(
            devices = devices.len(),
            models = models.len(),
            "Catalogs loaded"
        );

        Ok(Self { devices, models })
    }
}

#[derive(Deserialize)]
struct DeviceCatalogDocument {
    #[serde(alias = "devices")]
    gpus: Vec<Device>,
}

#[derive(Deserialize)]
struct ModelCatalogDocument {
    models: Vec<Model>,
}

#[derive(Deserialize)]
struct AllowListDocument {
    env_vars: Vec<String>,
}

/// Load the device catalog, keeping only enabled devices
pub fn load_devices(path: &Path) -> BenchletResult<Vec<Device>> {
    let content = read_config_file(path)?;
    parse_devices(&content).map_err(|e| with_path(e, path))
}

/// Parse a device catalog document, keeping only enabled devices
pub fn parse_devices(content: &str) -> BenchletResult<Vec<Device>> {
    let document: DeviceCatalogDocument = serde_yaml::from_str(content)?;

    let mut devices = Vec::with_capacity(document.gpus.len());
    for (index, device) in document.gpus.into_iter().enumerate() {
        if device.path.trim().is_empty() {
            return Err(BenchletError::Config(format!(
                "device entry {} has an empty path",
                index
            )));
        }
        if device.name.trim().is_empty() {
            return Err(BenchletError::Config(format!(
                "device entry {} ({}) has an empty name",
                index, device.path
            )));
        }
        if device.disabled {
            debug!(device = %device, "Skipping disabled device");
            continue;
        }
        devices.push(device);
    }

    Ok(devices)
}

/// Load the model catalog
pub fn load_models(path: &Path) -> BenchletResult<Vec<Model>> {
    let content = read_config_file(path)?;
    parse_models(&content).map_err(|e| with_path(e, path))
}

/// Parse a model catalog document
pub fn parse_models(content: &str) -> BenchletResult<Vec<Model>> {
    let document: ModelCatalogDocument = serde_yaml::from_str(content)?;

    if let Some(index) = document
        .models
        .iter()
        .position(|m| m.name.trim().is_empty())
    {
        return Err(BenchletError::Config(format!(
            "model entry {} has an empty name",
            index
        )));
    }

    Ok(document.models)
}

/// Names of host environment variables allowed into containers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvAllowList {
    names: Vec<String>,
}

impl EnvAllowList {
    /// Build from names; duplicates collapse onto their first occurrence
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self { names: unique }
    }

    /// Load the allow-list document
    pub fn load(path: &Path) -> BenchletResult<Self> {
        let content = read_config_file(path)?;
        Self::parse(&content).map_err(|e| with_path(e, path))
    }

    /// Parse an allow-list document
    pub fn parse(content: &str) -> BenchletResult<Self> {
        let document: AllowListDocument = serde_yaml::from_str(content)?;
        Ok(Self::from_names(document.env_vars))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn read_config_file(path: &Path) -> BenchletResult<String> {
    if !path.exists() {
        return Err(BenchletError::Config(format!(
            "{} not found",
            path.display()
        )));
    }
    std::fs::read_to_string(path).map_err(|e| {
        BenchletError::Config(format!("Failed to read {}: {}", path.display(), e))
    })
}

fn with_path(err: BenchletError, path: &Path) -> BenchletError {
    match err {
        BenchletError::Config(msg) => {
            BenchletError::Config(format!("{}: {}", path.display(), msg))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DEVICES: &str = r#"
gpus:
  - device: /dev/dri/renderD128
    name: GPU0
  - path: /dev/dri/renderD129
    name: GPU1
    disabled: false
  - device: /dev/dri/renderD130
    name: GPU2
    disabled: true
"#;

    const MODELS: &str = r#"
models:
  - name: M1
    type: text
    disabled_on: [GPU1]
  - name: M2
    kind: vision
"#;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_devices_drops_disabled() {
        let devices = parse_devices(DEVICES).unwrap();
        let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["GPU0", "GPU1"]);
    }

    #[test]
    fn test_parse_devices_missing_name() {
        let err = parse_devices("gpus:\n  - device: /dev/a\n").unwrap_err();
        assert!(matches!(err, BenchletError::Config(_)));
    }

    #[test]
    fn test_parse_devices_empty_path() {
        let err = parse_devices("gpus:\n  - path: ''\n    name: GPU0\n").unwrap_err();
        assert!(err.to_string().contains("empty path"));
    }

    #[test]
    fn test_parse_models() {
        let models = parse_models(MODELS).unwrap();
        assert_eq!(models.len(), 2);
        assert!(models[0].excluded_devices.contains("GPU1"));
        assert!(models[1].excluded_devices.is_empty());
        assert_eq!(models[1].kind, "vision");
    }

    #[test]
    fn test_parse_models_missing_name() {
        let err = parse_models("models:\n  - kind: text\n").unwrap_err();
        assert!(matches!(err, BenchletError::Config(_)));
    }

    #[test]
    fn test_parse_models_malformed_document() {
        let err = parse_models("models: [unterminated").unwrap_err();
        assert!(matches!(err, BenchletError::Config(_)));
    }

    #[test]
    fn test_catalog_load_from_files() {
        let devices = write_temp(DEVICES);
        let models = write_temp(MODELS);

        let catalog = Catalog::load(devices.path(), models.path()).unwrap();
        assert_eq!(catalog.devices.len(), 2);
        assert_eq!(catalog.models.len(), 2);
    }

    #[test]
    fn test_missing_catalog_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_devices(&dir.path().join("gpus.yaml")).unwrap_err();
        assert!(matches!(err, BenchletError::Config(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_allow_list_parse_dedups() {
        let list = EnvAllowList::parse("env_vars: [HF_TOKEN, GPU_MEM_UTIL, HF_TOKEN]").unwrap();
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["HF_TOKEN", "GPU_MEM_UTIL"]);
        assert!(list.contains("GPU_MEM_UTIL"));
        assert!(!list.contains("SECRET_TOKEN"));
    }

    #[test]
    fn test_default_fleet_config() {
        let config = FleetConfig::default();
        assert_eq!(config.catalog.devices, PathBuf::from(".config/gpus.yaml"));
        assert_eq!(config.launcher.script, "run_model.py");
        assert!(config.layout.validate().is_ok());
    }

    #[test]
    fn test_fleet_config_partial_toml() {
        let toml_str = r#"
[launcher]
image = "rocm/vllm:latest"

[layout]
logs_dir = "/var/log/benchlet"
"#;
        let config: FleetConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.launcher.image, "rocm/vllm:latest");
        assert_eq!(config.launcher.runtime_binary, "docker");
        assert_eq!(config.layout.logs_dir, PathBuf::from("/var/log/benchlet"));
        assert_eq!(config.layout.yaml_dir, PathBuf::from("./yaml"));
    }

    #[test]
    fn test_validate_cache_dir() {
        assert!(validate_cache_dir(Path::new("/data/.cache/huggingface")).is_ok());
        assert!(validate_cache_dir(Path::new("./.cache/huggingface")).is_ok());
        assert!(validate_cache_dir(Path::new("/data/.cache/huggingface/")).is_err());
        let err = validate_cache_dir(Path::new("/data/hf")).unwrap_err();
        assert!(matches!(err, BenchletError::Validation(_)));
    }
}
