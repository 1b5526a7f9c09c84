//! Deployment configuration
//!
//! Defaults match the inline S3 demo stack. Every value can be overridden
//! through `SITEDEPLOY_*` environment variables (a `.env` file is loaded by
//! `main` before this runs).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::DeployError;

pub const DEFAULT_PROJECT: &str = "inlineS3Project";
pub const DEFAULT_STACK: &str = "dev";
pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_PLUGIN: &str = "aws";
pub const DEFAULT_PLUGIN_VERSION: &str = "v3.2.1";
pub const DEFAULT_TICK_MS: u64 = 100;

/// Which engine backs the deployment task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// The `pulumi` CLI
    Pulumi,
    /// Scripted demo engine, no cloud calls
    Mock,
}

#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub project_name: String,
    pub stack_name: String,
    pub region: String,
    pub plugin_name: String,
    pub plugin_version: String,
    pub pulumi_bin: PathBuf,
    pub work_dir: PathBuf,
    pub engine: EngineKind,
    pub remove_stack_on_destroy: bool,
    pub tick_interval: Duration,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            project_name: DEFAULT_PROJECT.to_string(),
            stack_name: DEFAULT_STACK.to_string(),
            region: DEFAULT_REGION.to_string(),
            plugin_name: DEFAULT_PLUGIN.to_string(),
            plugin_version: DEFAULT_PLUGIN_VERSION.to_string(),
            pulumi_bin: PathBuf::from("pulumi"),
            work_dir: std::env::temp_dir().join("sitedeploy").join(DEFAULT_PROJECT),
            engine: EngineKind::Pulumi,
            remove_stack_on_destroy: false,
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
        }
    }
}

impl DeployConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, DeployError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DeployError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(project) = lookup("SITEDEPLOY_PROJECT") {
            config.work_dir = std::env::temp_dir().join("sitedeploy").join(&project);
            config.project_name = project;
        }
        if let Some(stack) = lookup("SITEDEPLOY_STACK") {
            config.stack_name = stack;
        }
        if let Some(region) = lookup("SITEDEPLOY_REGION") {
            config.region = region;
        }
        if let Some(version) = lookup("SITEDEPLOY_PLUGIN_VERSION") {
            config.plugin_version = normalize_version(&version);
        }
        if let Some(bin) = lookup("SITEDEPLOY_PULUMI_BIN") {
            config.pulumi_bin = PathBuf::from(bin);
        }
        if let Some(dir) = lookup("SITEDEPLOY_WORK_DIR") {
            config.work_dir = PathBuf::from(dir);
        }
        if let Some(engine) = lookup("SITEDEPLOY_ENGINE") {
            config.engine = match engine.to_ascii_lowercase().as_str() {
                "pulumi" => EngineKind::Pulumi,
                "mock" | "demo" => EngineKind::Mock,
                other => {
                    return Err(DeployError::InvalidConfig(format!(
                        "SITEDEPLOY_ENGINE must be 'pulumi' or 'mock', got '{}'",
                        other
                    )))
                }
            };
        }
        if let Some(flag) = lookup("SITEDEPLOY_REMOVE_STACK") {
            config.remove_stack_on_destroy = parse_bool("SITEDEPLOY_REMOVE_STACK", &flag)?;
        }
        if let Some(ms) = lookup("SITEDEPLOY_TICK_MS") {
            let ms: u64 = ms.trim().parse().map_err(|_| {
                DeployError::InvalidConfig(format!("SITEDEPLOY_TICK_MS is not a number: '{}'", ms))
            })?;
            if ms == 0 {
                return Err(DeployError::InvalidConfig(
                    "SITEDEPLOY_TICK_MS must be greater than zero".to_string(),
                ));
            }
            config.tick_interval = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

/// Plugin versions are passed to pulumi with a leading `v`
fn normalize_version(version: &str) -> String {
    let version = version.trim();
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{}", version)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, DeployError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DeployError::InvalidConfig(format!(
            "{} must be a boolean, got '{}'",
            key, value
        ))),
    }
}
