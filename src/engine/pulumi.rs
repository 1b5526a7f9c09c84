//! Pulumi CLI engine
//!
//! Every operation shells out to `pulumi` inside the project work directory.
//! `up`/`destroy` write an engine event log that is tailed while the command
//! runs, so lifecycle events reach the UI as they happen.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::events::EventLogTail;
use super::{ApplyMode, ApplyResult, Engine, Stack};
use crate::config::DeployConfig;
use crate::error::DeployError;
use crate::program::Program;
use crate::relay::EventSender;

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Engine backed by the `pulumi` binary
#[derive(Debug, Clone)]
pub struct PulumiCli {
    bin: PathBuf,
    work_dir: PathBuf,
}

impl PulumiCli {
    pub fn new(config: &DeployConfig) -> Self {
        Self {
            bin: config.pulumi_bin.clone(),
            work_dir: config.work_dir.clone(),
        }
    }

    fn command(&self, args: &[&str], stack: Option<&Stack>) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.args(args)
            .arg("--non-interactive")
            .current_dir(&self.work_dir)
            .env("PULUMI_SKIP_UPDATE_CHECK", "true")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(stack) = stack {
            cmd.arg("--stack").arg(&stack.name);
        }
        cmd
    }

    /// Run to completion; `Err` carries a readable failure description
    async fn run(&self, args: &[&str], stack: Option<&Stack>) -> Result<String, String> {
        tracing::debug!(?args, "pulumi");
        let output = self
            .command(args, stack)
            .output()
            .await
            .map_err(|e| format!("could not run {}: {}", self.bin.display(), e))?;
        into_stdout(output)
    }

    async fn stack_outputs(&self, stack: &Stack) -> Result<HashMap<String, serde_json::Value>, DeployError> {
        let missing = |details: String| DeployError::MissingOutput {
            name: "*".to_string(),
            details,
        };
        let stdout = self
            .run(&["stack", "output", "--json"], Some(stack))
            .await
            .map_err(missing)?;
        serde_json::from_str(&stdout).map_err(|e| missing(e.to_string()))
    }

    /// Push newly logged events to the UI, opening the log once it exists
    async fn forward_events(
        tail: &mut Option<EventLogTail>,
        path: &Path,
        sink: &EventSender,
    ) -> Result<(), DeployError> {
        if tail.is_none() {
            match EventLogTail::open(path).await {
                Ok(opened) => *tail = Some(opened),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
        if let Some(tail) = tail.as_mut() {
            for event in tail.poll().await? {
                sink.send(event).await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Engine for PulumiCli {
    #[instrument(skip(self, program), fields(project = program.project_name()))]
    async fn acquire_stack(&self, name: &str, program: &Program) -> Result<Stack, DeployError> {
        let fail = |details: String| DeployError::StackAcquire {
            stack: name.to_string(),
            details,
        };

        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| fail(e.to_string()))?;
        let yaml = program.to_yaml()?;
        tokio::fs::write(self.work_dir.join("Pulumi.yaml"), yaml)
            .await
            .map_err(|e| fail(e.to_string()))?;

        self.run(&["stack", "select", "--create", name], None)
            .await
            .map_err(fail)?;

        Ok(Stack {
            name: name.to_string(),
        })
    }

    async fn install_plugin(
        &self,
        _stack: &Stack,
        name: &str,
        version: &str,
    ) -> Result<(), DeployError> {
        self.run(&["plugin", "install", "resource", name, version], None)
            .await
            .map(|_| ())
            .map_err(|details| DeployError::PluginInstall {
                plugin: name.to_string(),
                version: version.to_string(),
                details,
            })
    }

    async fn set_config(&self, stack: &Stack, key: &str, value: &str) -> Result<(), DeployError> {
        self.run(&["config", "set", key, value], Some(stack))
            .await
            .map(|_| ())
            .map_err(|details| DeployError::Config {
                key: key.to_string(),
                details,
            })
    }

    async fn refresh(&self, stack: &Stack) -> Result<(), DeployError> {
        self.run(&["refresh", "--yes", "--skip-preview"], Some(stack))
            .await
            .map(|_| ())
            .map_err(|details| DeployError::Refresh { details })
    }

    #[instrument(skip(self, sink, cancel), fields(stack = %stack.name))]
    async fn apply(
        &self,
        stack: &Stack,
        mode: ApplyMode,
        sink: EventSender,
        cancel: CancellationToken,
    ) -> Result<ApplyResult, DeployError> {
        let fail = |details: String| DeployError::Apply {
            operation: mode.to_string(),
            details,
        };

        // pulumi runs inside work_dir, so it gets the bare file name
        let log_name = format!(".sitedeploy-{}-events.jsonl", mode);
        let log_path = self.work_dir.join(&log_name);
        match tokio::fs::remove_file(&log_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(fail(format!("stale event log: {}", e))),
        }

        let verb = match mode {
            ApplyMode::Update => "up",
            ApplyMode::Destroy => "destroy",
        };
        let child = self
            .command(&[verb, "--yes", "--skip-preview", "--event-log", &log_name], Some(stack))
            .spawn()
            .map_err(|e| fail(format!("could not run {}: {}", self.bin.display(), e)))?;

        // Dropping this future kills the child (kill_on_drop)
        let finished = child.wait_with_output();
        tokio::pin!(finished);

        let mut tail: Option<EventLogTail> = None;
        let mut poll = tokio::time::interval(EVENT_POLL_INTERVAL);

        let output = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("{} cancelled, stopping pulumi", mode);
                    return Err(DeployError::Cancelled);
                }
                output = &mut finished => break output,
                _ = poll.tick() => {
                    Self::forward_events(&mut tail, &log_path, &sink).await?;
                }
            }
        };

        Self::forward_events(&mut tail, &log_path, &sink).await?;
        if let Some(tail) = tail {
            for event in tail.finish().await? {
                sink.send(event).await;
            }
        }

        let output = output.map_err(|e| fail(e.to_string()))?;
        into_stdout(output).map_err(fail)?;

        match mode {
            ApplyMode::Update => Ok(ApplyResult {
                outputs: self.stack_outputs(stack).await?,
            }),
            ApplyMode::Destroy => Ok(ApplyResult::default()),
        }
    }

    async fn remove_stack(&self, stack: &Stack) -> Result<(), DeployError> {
        self.run(&["stack", "rm", "--yes", &stack.name], None)
            .await
            .map(|_| ())
            .map_err(|details| DeployError::RemoveStack {
                stack: stack.name.clone(),
                details,
            })
    }
}

fn into_stdout(output: Output) -> Result<String, String> {
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = stderr.trim();
    if detail.is_empty() {
        Err(format!("pulumi exited with {}", output.status))
    } else {
        Err(detail.to_string())
    }
}
