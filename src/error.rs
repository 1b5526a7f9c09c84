//! Error types with fix suggestions

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Errors raised while driving a deployment.
///
/// Setup failures (stack, plugin, config, refresh) and a missing stack output
/// are fatal: the driver tears down the UI and exits. `Apply` is reported
/// through the UI and ends the run normally.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Failed to get stack '{stack}': {details}")]
    StackAcquire { stack: String, details: String },

    #[error("Failed to install program plugins ({plugin} {version}): {details}")]
    PluginInstall {
        plugin: String,
        version: String,
        details: String,
    },

    #[error("Failed to set config '{key}': {details}")]
    Config { key: String, details: String },

    #[error("Failed to refresh stack: {details}")]
    Refresh { details: String },

    #[error("Failed to {operation} stack: {details}")]
    Apply { operation: String, details: String },

    #[error("Failed to read stack output '{name}': {details}")]
    MissingOutput { name: String, details: String },

    #[error("Failed to remove stack '{stack}': {details}")]
    RemoveStack { stack: String, details: String },

    #[error("Deployment cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("Deployment task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DeployError {
    /// Whether this error must terminate the process.
    ///
    /// `Apply` failures and cancellation are surfaced through the UI instead.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DeployError::Apply { .. } | DeployError::Cancelled)
    }
}

impl FixSuggestion for DeployError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            DeployError::StackAcquire { .. } => {
                Some("Check that the pulumi CLI is installed and you are logged in (pulumi login)")
            }
            DeployError::PluginInstall { .. } => {
                Some("Check network access or set SITEDEPLOY_PLUGIN_VERSION to a published version")
            }
            DeployError::Config { .. } => Some("Check the stack exists and the key is valid"),
            DeployError::Refresh { .. } => Some("Check cloud credentials (AWS_PROFILE or AWS_ACCESS_KEY_ID)"),
            DeployError::Apply { .. } => Some("Inspect the stack with `pulumi stack --show-urns`"),
            DeployError::MissingOutput { .. } => {
                Some("Ensure the program exports websiteUrl as a string")
            }
            DeployError::RemoveStack { .. } => Some("Remove the stack manually with `pulumi stack rm`"),
            DeployError::Cancelled => None,
            DeployError::InvalidConfig(_) => Some("Check SITEDEPLOY_* variables in your environment or .env"),
            DeployError::Terminal(_) => Some("Run sitedeploy from an interactive terminal"),
            DeployError::TaskFailed(_) => Some("Re-run with RUST_LOG=debug and check the log output"),
            DeployError::Io(_) => Some("Check file path and permissions"),
            DeployError::Json(_) => None,
            DeployError::Yaml(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_failures_are_fatal() {
        let err = DeployError::Refresh {
            details: "boom".into(),
        };
        assert!(err.is_fatal());

        let err = DeployError::MissingOutput {
            name: "websiteUrl".into(),
            details: "absent".into(),
        };
        assert!(err.is_fatal());
    }

    #[test]
    fn apply_failure_is_not_fatal() {
        let err = DeployError::Apply {
            operation: "update".into(),
            details: "conflict".into(),
        };
        assert!(!err.is_fatal());
        assert!(!DeployError::Cancelled.is_fatal());
    }

    #[test]
    fn display_includes_context() {
        let err = DeployError::StackAcquire {
            stack: "dev".into(),
            details: "no backend".into(),
        };
        assert_eq!(err.to_string(), "Failed to get stack 'dev': no backend");
        assert!(err.fix_suggestion().is_some());
    }
}
