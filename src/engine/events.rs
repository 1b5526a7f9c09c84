//! Engine event log decoding
//!
//! The engine writes one JSON object per line. Only resource pre-events and
//! resource output events matter to the UI; everything else is dropped.

use std::io;
use std::path::Path;

use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::relay::LifecycleEvent;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EngineEvent {
    #[serde(default)]
    resource_pre_event: Option<ResourceEvent>,
    #[serde(default)]
    res_outputs_event: Option<ResourceEvent>,
}

#[derive(Debug, Deserialize)]
struct ResourceEvent {
    metadata: StepMetadata,
}

#[derive(Debug, Deserialize)]
struct StepMetadata {
    urn: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Decode one event-log line
pub fn decode_line(line: &str) -> Option<LifecycleEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let event: EngineEvent = match serde_json::from_str(line) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(error = %e, "skipping malformed engine event");
            return None;
        }
    };

    if let Some(pre) = event.resource_pre_event {
        return Some(LifecycleEvent::pre(pre.metadata.urn, pre.metadata.kind));
    }
    event
        .res_outputs_event
        .map(|out| LifecycleEvent::post(out.metadata.urn, out.metadata.kind))
}

/// Follows an event log that another process is still appending to
pub struct EventLogTail {
    reader: BufReader<File>,
    partial: String,
}

impl EventLogTail {
    pub async fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path).await?;
        Ok(Self {
            reader: BufReader::new(file),
            partial: String::new(),
        })
    }

    /// Decode every complete line written since the last poll.
    ///
    /// A trailing line without its newline is kept until it is finished.
    pub async fn poll(&mut self) -> io::Result<Vec<LifecycleEvent>> {
        let mut events = Vec::new();
        loop {
            let read = self.reader.read_line(&mut self.partial).await?;
            if read == 0 {
                break;
            }
            if self.partial.ends_with('\n') {
                if let Some(event) = decode_line(&self.partial) {
                    events.push(event);
                }
                self.partial.clear();
            }
        }
        Ok(events)
    }

    /// Read what is left once the writer has exited
    pub async fn finish(mut self) -> io::Result<Vec<LifecycleEvent>> {
        let mut events = self.poll().await?;
        if let Some(event) = decode_line(&self.partial) {
            events.push(event);
        }
        Ok(events)
    }
}
