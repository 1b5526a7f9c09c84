//! Mock Engine - For testing and demo purposes
//!
//! Replays a fixed list of lifecycle events and can be told to fail at any
//! step. Records every call so tests can check the order of operations.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;

use super::{ApplyMode, ApplyResult, Engine, Stack};
use crate::error::DeployError;
use crate::program::{Program, WEBSITE_URL_OUTPUT};
use crate::relay::{EventSender, LifecycleEvent};

/// Engine step a mock can be scripted to fail at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockStep {
    AcquireStack,
    InstallPlugin,
    SetConfig,
    Refresh,
    Apply,
    /// Reading stack outputs after a successful update
    Outputs,
    RemoveStack,
}

/// Scripted engine
#[derive(Debug, Default)]
pub struct MockEngine {
    events: Vec<LifecycleEvent>,
    outputs: HashMap<String, serde_json::Value>,
    fail_at: Option<MockStep>,
    event_delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine used by `SITEDEPLOY_ENGINE=mock`: the website stack, slowed down
    /// enough to watch
    pub fn demo() -> Self {
        let urn = |kind: &str, name: &str| format!("urn:pulumi:dev::inlineS3Project::{}::{}", kind, name);
        let stack = urn("pulumi:pulumi:Stack", "inlineS3Project-dev");
        let bucket = urn("aws:s3/bucket:Bucket", "s3-website-bucket");
        let object = urn("aws:s3/bucketObject:BucketObject", "index");
        let policy = urn("aws:s3/bucketPolicy:BucketPolicy", "bucketPolicy");

        Self::new()
            .with_events(vec![
                LifecycleEvent::pre(&stack, "pulumi:pulumi:Stack"),
                LifecycleEvent::pre(&bucket, "aws:s3/bucket:Bucket"),
                LifecycleEvent::post(&bucket, "aws:s3/bucket:Bucket"),
                LifecycleEvent::pre(&object, "aws:s3/bucketObject:BucketObject"),
                LifecycleEvent::pre(&policy, "aws:s3/bucketPolicy:BucketPolicy"),
                LifecycleEvent::post(&object, "aws:s3/bucketObject:BucketObject"),
                LifecycleEvent::post(&policy, "aws:s3/bucketPolicy:BucketPolicy"),
                LifecycleEvent::post(&stack, "pulumi:pulumi:Stack"),
            ])
            .with_output(
                WEBSITE_URL_OUTPUT,
                json!("s3-website-bucket-4a1c2f3.s3-website-us-west-2.amazonaws.com"),
            )
            .with_event_delay(Duration::from_millis(600))
    }

    pub fn with_events(mut self, events: Vec<LifecycleEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn with_output(mut self, name: &str, value: serde_json::Value) -> Self {
        self.outputs.insert(name.to_string(), value);
        self
    }

    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = delay;
        self
    }

    pub fn failing_at(mut self, step: MockStep) -> Self {
        self.fail_at = Some(step);
        self
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn check(&self, step: MockStep) -> Result<(), String> {
        if self.fail_at == Some(step) {
            Err(format!("mock failure at {:?}", step))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Engine for MockEngine {
    async fn acquire_stack(&self, name: &str, _program: &Program) -> Result<Stack, DeployError> {
        self.record(format!("acquire_stack {}", name));
        self.check(MockStep::AcquireStack)
            .map_err(|details| DeployError::StackAcquire {
                stack: name.to_string(),
                details,
            })?;
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
        self.record(format!("install_plugin {} {}", name, version));
        self.check(MockStep::InstallPlugin)
            .map_err(|details| DeployError::PluginInstall {
                plugin: name.to_string(),
                version: version.to_string(),
                details,
            })
    }

    async fn set_config(&self, _stack: &Stack, key: &str, value: &str) -> Result<(), DeployError> {
        self.record(format!("set_config {}={}", key, value));
        self.check(MockStep::SetConfig)
            .map_err(|details| DeployError::Config {
                key: key.to_string(),
                details,
            })
    }

    async fn refresh(&self, _stack: &Stack) -> Result<(), DeployError> {
        self.record("refresh".to_string());
        self.check(MockStep::Refresh)
            .map_err(|details| DeployError::Refresh { details })
    }

    async fn apply(
        &self,
        _stack: &Stack,
        mode: ApplyMode,
        sink: EventSender,
        cancel: CancellationToken,
    ) -> Result<ApplyResult, DeployError> {
        self.record(format!("apply {}", mode));

        for event in &self.events {
            if !self.event_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(DeployError::Cancelled),
                    _ = time::sleep(self.event_delay) => {}
                }
            }
            if cancel.is_cancelled() {
                return Err(DeployError::Cancelled);
            }
            sink.send(event.clone()).await;
        }

        self.check(MockStep::Apply)
            .map_err(|details| DeployError::Apply {
                operation: mode.to_string(),
                details,
            })?;

        match mode {
            ApplyMode::Update => {
                self.check(MockStep::Outputs)
                    .map_err(|details| DeployError::MissingOutput {
                        name: "*".to_string(),
                        details,
                    })?;
                Ok(ApplyResult {
                    outputs: self.outputs.clone(),
                })
            }
            ApplyMode::Destroy => Ok(ApplyResult::default()),
        }
    }

    async fn remove_stack(&self, stack: &Stack) -> Result<(), DeployError> {
        self.record(format!("remove_stack {}", stack.name));
        self.check(MockStep::RemoveStack)
            .map_err(|details| DeployError::RemoveStack {
                stack: stack.name.clone(),
                details,
            })
    }
}
