//! Container invocation synthesis
//!
//! A [`ContainerInvocation`] is the fully resolved description of one
//! container launch. It is built without touching the process table, so the
//! exact argument list can be inspected and tested on its own.

use benchlet_core::{Device, HostLayout, Job};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::context::RunContext;
use crate::env::display_value;

/// Working directory inside the container
pub const CONTAINER_WORKSPACE: &str = "/workspace";
/// Model weight cache inside the container
pub const CONTAINER_HF_CACHE: &str = "/root/.cache/huggingface";
/// Control-plane device attached to every container
pub const CONTROL_DEVICE: &str = "/dev/kfd";
/// Variable carrying the device name into the container
pub const DEVICE_NAME_VAR: &str = "DEVICE_NAME";

const REQUIREMENTS_INSTALL: &str =
    "pip install --no-cache-dir -r /workspace/scripts/requirements.txt";

/// Isolation flags shared by every job
const ISOLATION_FLAGS: &[&str] = &[
    "--ipc=host",
    "--group-add",
    "video",
    "--cap-add=SYS_PTRACE",
    "--security-opt",
    "seccomp=unconfined",
    "--device",
    CONTROL_DEVICE,
    "-w",
    CONTAINER_WORKSPACE,
];

/// Host path bound onto a fixed container path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub container: PathBuf,
}

impl Mount {
    pub fn new(host: impl Into<PathBuf>, container: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
        }
    }

    fn volume_arg(&self) -> String {
        format!("{}:{}", self.host.display(), self.container.display())
    }
}

/// The six bind mounts, in launch order
pub fn standard_mounts(layout: &HostLayout) -> Vec<Mount> {
    let workspace = Path::new(CONTAINER_WORKSPACE);
    vec![
        Mount::new(&layout.cache_dir, CONTAINER_HF_CACHE),
        Mount::new(&layout.scripts_dir, workspace.join("scripts")),
        Mount::new(&layout.prompts_dir, workspace.join("prompts")),
        Mount::new(&layout.logs_dir, workspace.join("logs")),
        Mount::new(&layout.images_dir, workspace.join("images")),
        Mount::new(&layout.yaml_dir, workspace.join("yaml")),
    ]
}

/// Fully resolved description of one container launch
#[derive(Clone, PartialEq, Eq)]
pub struct ContainerInvocation {
    /// Image reference
    pub image: String,
    /// Bind mounts
    pub mounts: Vec<Mount>,
    /// Target accelerator path, bound in addition to the control device
    pub bound_device: String,
    /// Value of `DEVICE_NAME` inside the container
    pub device_name: String,
    /// Allow-listed host environment
    pub env: BTreeMap<String, String>,
    /// Command run by the image
    pub entrypoint_command: Vec<String>,
    /// Attach a pseudo-terminal
    pub interactive: bool,
}

impl ContainerInvocation {
    /// Start building an invocation for `image`
    pub fn builder(image: impl Into<String>) -> InvocationBuilder {
        InvocationBuilder::new(image)
    }

    /// Invocation for a scheduled job
    pub fn for_job(job: &Job, ctx: &RunContext, env: BTreeMap<String, String>) -> Self {
        Self::builder(ctx.image.clone())
            .device(&job.device)
            .layout(&ctx.layout)
            .env(env)
            .script(job.script.clone(), job.extra_args.clone())
            .build()
    }

    /// Arguments passed to the container runtime binary
    pub fn args(&self) -> Vec<String> {
        self.render(|_, value| value.to_string())
    }

    /// Same as [`args`](Self::args) with secret values replaced
    pub fn redacted_args(&self) -> Vec<String> {
        self.render(|name, value| display_value(name, value).to_string())
    }

    fn render(&self, value_of: impl Fn(&str, &str) -> String) -> Vec<String> {
        let mut args = vec!["run".to_string()];

        for (name, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", name, value_of(name, value)));
        }

        args.push("--rm".to_string());
        args.extend(ISOLATION_FLAGS.iter().map(|flag| flag.to_string()));

        if self.interactive {
            args.push("-it".to_string());
        }

        args.push("--device".to_string());
        args.push(self.bound_device.clone());

        args.push("-e".to_string());
        args.push(format!("{}={}", DEVICE_NAME_VAR, self.device_name));

        for mount in &self.mounts {
            args.push("-v".to_string());
            args.push(mount.volume_arg());
        }

        args.push(self.image.clone());
        args.extend(self.entrypoint_command.iter().cloned());
        args
    }
}

impl std::fmt::Display for ContainerInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.redacted_args().join(" "))
    }
}

impl std::fmt::Debug for ContainerInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerInvocation")
            .field("image", &self.image)
            .field("mounts", &self.mounts)
            .field("bound_device", &self.bound_device)
            .field("device_name", &self.device_name)
            .field("env", &RedactedEnv(&self.env))
            .field("entrypoint_command", &self.entrypoint_command)
            .field("interactive", &self.interactive)
            .finish()
    }
}

/// Debug view of an environment map with secret values replaced
struct RedactedEnv<'a>(&'a BTreeMap<String, String>);

impl std::fmt::Debug for RedactedEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.0
                    .iter()
                    .map(|(name, value)| (name, display_value(name, value))),
            )
            .finish()
    }
}

/// Builder for [`ContainerInvocation`]
#[derive(Clone)]
pub struct InvocationBuilder {
    image: String,
    mounts: Vec<Mount>,
    bound_device: String,
    device_name: String,
    env: BTreeMap<String, String>,
    script: Option<String>,
    script_args: Vec<String>,
}

impl std::fmt::Debug for InvocationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationBuilder")
            .field("image", &self.image)
            .field("bound_device", &self.bound_device)
            .field("env", &RedactedEnv(&self.env))
            .field("script", &self.script)
            .finish_non_exhaustive()
    }
}

impl InvocationBuilder {
    fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            mounts: Vec::new(),
            bound_device: String::new(),
            device_name: String::new(),
            env: BTreeMap::new(),
            script: None,
            script_args: Vec::new(),
        }
    }

    pub fn device(mut self, device: &Device) -> Self {
        self.bound_device = device.path.clone();
        self.device_name = device.env_name();
        self
    }

    pub fn layout(mut self, layout: &HostLayout) -> Self {
        self.mounts = standard_mounts(layout);
        self
    }

    pub fn env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Script to run and its arguments; `None` requests an interactive shell
    pub fn script(mut self, script: Option<String>, args: Vec<String>) -> Self {
        self.script = script.filter(|s| !s.is_empty());
        self.script_args = args;
        self
    }

    pub fn build(self) -> ContainerInvocation {
        let interactive = self.script.is_none();
        let entrypoint_command = entrypoint(self.script.as_deref(), &self.script_args);

        ContainerInvocation {
            image: self.image,
            mounts: self.mounts,
            bound_device: self.bound_device,
            device_name: self.device_name,
            env: self.env,
            entrypoint_command,
            interactive,
        }
    }
}

/// `bash -c` pipeline: install requirements, then the script or a shell.
///
/// The script path and its arguments travel as bash positional parameters
/// (`$0`, `$@`) so they are never re-parsed by the shell.
fn entrypoint(script: Option<&str>, args: &[String]) -> Vec<String> {
    match script {
        Some(script) => {
            let mut cmd = vec![
                "/bin/bash".to_string(),
                "-c".to_string(),
                format!("{} && exec python3 \"$0\" \"$@\"", REQUIREMENTS_INSTALL),
                format!("{}/scripts/{}", CONTAINER_WORKSPACE, script),
            ];
            cmd.extend(args.iter().cloned());
            cmd
        }
        None => vec![
            "/bin/bash".to_string(),
            "-c".to_string(),
            format!("{} && bash", REQUIREMENTS_INSTALL),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchlet_core::{EnvAllowList, Model};

    fn ctx() -> RunContext {
        RunContext::new("rocm/vllm:test", HostLayout::default(), EnvAllowList::default())
            .with_script(Some("run_model.py".to_string()))
    }

    fn job(script: Option<&str>) -> Job {
        Job::new(
            Device::new("/dev/kfd0", "MI300 X"),
            Model::new("Qwen/Qwen3-8B", "text"),
            script.map(String::from),
        )
    }

    fn count(args: &[String], needle: &str) -> usize {
        args.iter().filter(|a| a.as_str() == needle).count()
    }

    #[test]
    fn test_device_binding_and_name() {
        let invocation = ContainerInvocation::for_job(&job(Some("run_model.py")), &ctx(), BTreeMap::new());
        let args = invocation.args();

        assert!(args.contains(&"DEVICE_NAME=MI300_X".to_string()));
        assert_eq!(count(&args, "--device"), 2);
        assert!(args.windows(2).any(|w| w[0] == "--device" && w[1] == "/dev/kfd"));
        assert!(args.windows(2).any(|w| w[0] == "--device" && w[1] == "/dev/kfd0"));
    }

    #[test]
    fn test_constant_isolation_flags() {
        let args = ContainerInvocation::for_job(&job(Some("run_model.py")), &ctx(), BTreeMap::new()).args();
        for flag in ["--rm", "--ipc=host", "--cap-add=SYS_PTRACE", "seccomp=unconfined"] {
            assert!(args.contains(&flag.to_string()), "missing {}", flag);
        }
        assert_eq!(args[0], "run");
    }

    #[test]
    fn test_six_mounts_in_order() {
        let invocation = ContainerInvocation::for_job(&job(Some("run_model.py")), &ctx(), BTreeMap::new());
        let containers: Vec<PathBuf> = invocation.mounts.iter().map(|m| m.container.clone()).collect();
        assert_eq!(
            containers,
            vec![
                PathBuf::from("/root/.cache/huggingface"),
                PathBuf::from("/workspace/scripts"),
                PathBuf::from("/workspace/prompts"),
                PathBuf::from("/workspace/logs"),
                PathBuf::from("/workspace/images"),
                PathBuf::from("/workspace/yaml"),
            ]
        );
        assert_eq!(count(&invocation.args(), "-v"), 6);
    }

    #[test]
    fn test_script_entrypoint_keeps_arguments_separate() {
        let invocation = ContainerInvocation::for_job(&job(Some("run_model.py")), &ctx(), BTreeMap::new());
        assert!(!invocation.interactive);

        let cmd = &invocation.entrypoint_command;
        assert_eq!(cmd[0], "/bin/bash");
        assert!(cmd[2].starts_with("pip install --no-cache-dir -r /workspace/scripts/requirements.txt"));
        assert_eq!(cmd[3], "/workspace/scripts/run_model.py");
        assert_eq!(&cmd[4..], &["--model", "Qwen/Qwen3-8B", "--model-type", "text"]);

        let args = invocation.args();
        let image_pos = args.iter().position(|a| a == "rocm/vllm:test").unwrap();
        assert_eq!(args[image_pos + 1], "/bin/bash");
    }

    #[test]
    fn test_no_script_is_interactive() {
        let invocation = ContainerInvocation::for_job(&job(None), &ctx(), BTreeMap::new());
        assert!(invocation.interactive);
        assert!(invocation.args().contains(&"-it".to_string()));
        assert!(invocation.entrypoint_command[2].ends_with("&& bash"));
    }

    #[test]
    fn test_secret_values_redacted_in_display_only() {
        let mut env = BTreeMap::new();
        env.insert("HF_TOKEN".to_string(), "hf_secret".to_string());
        env.insert("GPU_MEM_UTIL".to_string(), "0.85".to_string());

        let invocation = ContainerInvocation::for_job(&job(Some("run_model.py")), &ctx(), env);

        assert!(invocation.args().contains(&"HF_TOKEN=hf_secret".to_string()));
        let shown = invocation.to_string();
        assert!(!shown.contains("hf_secret"));
        assert!(shown.contains("HF_TOKEN=[REDACTED]"));
        assert!(shown.contains("GPU_MEM_UTIL=0.85"));
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let mut env = BTreeMap::new();
        env.insert("HF_TOKEN".to_string(), "hf_secret".to_string());
        env.insert("GPU_MEM_UTIL".to_string(), "0.85".to_string());

        let builder = ContainerInvocation::builder("rocm/vllm:test").env(env.clone());
        let invocation = ContainerInvocation::for_job(&job(Some("run_model.py")), &ctx(), env);

        for shown in [format!("{:?}", invocation), format!("{:?}", builder)] {
            assert!(!shown.contains("hf_secret"));
            assert!(shown.contains("[REDACTED]"));
            assert!(shown.contains("0.85"));
        }
    }

    #[test]
    fn test_env_map_holds_only_forwarded_variables() {
        let mut env = BTreeMap::new();
        env.insert("GPU_MEM_UTIL".to_string(), "0.85".to_string());

        let invocation = ContainerInvocation::for_job(&job(Some("run_model.py")), &ctx(), env);
        assert_eq!(invocation.env.len(), 1);
        assert_eq!(invocation.device_name, "MI300_X");
    }
}
