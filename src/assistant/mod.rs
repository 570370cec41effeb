//! Assistant chat sessions, one per workspace
//!
//! The assistant SDK itself lives behind [`AssistantClient`] and
//! [`AssistantSession`]; this module owns the per-workspace bookkeeping
//! around it ([`Orchestrator`]) and the read-only tools a session may call
//! back into ([`ToolRegistry`]).

mod orchestrator;
pub mod tools;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

pub use orchestrator::{Orchestrator, SessionRegistry};
pub use tools::{ToolCallError, ToolDefinition, ToolRegistry};

/// What happens when a second message arrives for a workspace while the
/// first is still in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Wait for the previous turn to finish.
    #[default]
    Queue,
    /// Fail the new message with [`AssistantError::Busy`].
    Reject,
    /// Run both; the newest caller takes over the delta stream.
    Race,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NoSession,
    Creating,
    Ready,
}

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("failed to create session for workspace {workspace_id}: {message}")]
    SessionCreation {
        workspace_id: String,
        message: String,
    },

    #[error("assistant request failed: {0}")]
    Request(String),

    #[error("workspace {0} already has a message in flight")]
    Busy(String),

    #[error("failed to stop assistant: {0}")]
    Shutdown(String),
}

/// Receives the streamed reply for one `send_message` call.
pub trait MessageCallbacks: Send + Sync {
    fn on_delta(&self, delta: &str);
    fn on_complete(&self, content: &str);
    fn on_error(&self, message: &str);
}

pub(crate) type CallbackSlot = Arc<Mutex<Option<Arc<dyn MessageCallbacks>>>>;

/// Handle a session uses to stream partial output.
///
/// Deltas go to whichever callbacks are registered for the workspace at the
/// time of the call; with none registered they are dropped.
#[derive(Clone)]
pub struct EventSink {
    slot: CallbackSlot,
}

impl EventSink {
    pub(crate) fn new(slot: CallbackSlot) -> Self {
        Self { slot }
    }

    /// Sink that drops everything.
    pub fn detached() -> Self {
        Self::new(Arc::new(Mutex::new(None)))
    }

    pub fn delta(&self, text: &str) {
        // Clone out so the callback runs without the lock held.
        let callbacks = self.slot.lock().clone();
        if let Some(callbacks) = callbacks {
            callbacks.on_delta(text);
        }
    }
}

/// Everything the SDK needs to open a session for one workspace.
#[derive(Clone)]
pub struct SessionConfig {
    pub workspace_id: String,
    pub working_directory: PathBuf,
    pub system_prompt: Option<String>,
    pub tools: Vec<ToolDefinition>,
    /// Dispatch target for tool calls made by the model.
    pub tool_registry: Arc<ToolRegistry>,
    pub events: EventSink,
}

#[async_trait]
pub trait AssistantClient: Send + Sync {
    async fn create_session(&self, config: SessionConfig)
        -> anyhow::Result<Box<dyn AssistantSession>>;

    async fn stop(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait AssistantSession: Send + Sync {
    /// Send one prompt and wait for the final reply. `None` when the model
    /// finished without text.
    async fn send_and_wait(&self, prompt: &str) -> anyhow::Result<Option<String>>;

    async fn destroy(&self) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(Mutex<Vec<String>>);

    impl MessageCallbacks for Recorder {
        fn on_delta(&self, delta: &str) {
            self.0.lock().push(delta.to_string());
        }
        fn on_complete(&self, _content: &str) {}
        fn on_error(&self, _message: &str) {}
    }

    #[test]
    fn sink_forwards_to_registered_callbacks() {
        let slot: CallbackSlot = Arc::new(Mutex::new(None));
        let sink = EventSink::new(slot.clone());
        sink.delta("dropped");

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        *slot.lock() = Some(recorder.clone() as Arc<dyn MessageCallbacks>);
        sink.delta("kept");

        assert_eq!(*recorder.0.lock(), vec!["kept".to_string()]);
    }

    #[test]
    fn overlap_policy_parses_lowercase() {
        let policy: OverlapPolicy = serde_yaml::from_str("race").unwrap();
        assert_eq!(policy, OverlapPolicy::Race);
        assert_eq!(OverlapPolicy::default(), OverlapPolicy::Queue);
    }
}
