//! Per-workspace session orchestration

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    AssistantClient, AssistantError, AssistantSession, CallbackSlot, EventSink, MessageCallbacks,
    OverlapPolicy, SessionConfig, SessionState, ToolRegistry,
};

/// Bookkeeping for one workspace.
struct Channel {
    callbacks: CallbackSlot,
    /// Held while a session is looked up or created.
    session: tokio::sync::Mutex<Option<Arc<dyn AssistantSession>>>,
    /// Held for a whole message round trip under `Queue` and `Reject`, and by
    /// `reset` while it retires the channel.
    turn: Arc<tokio::sync::Mutex<()>>,
    state: Mutex<SessionState>,
}

impl Channel {
    fn new() -> Self {
        Self {
            callbacks: Arc::new(Mutex::new(None)),
            session: tokio::sync::Mutex::new(None),
            turn: Arc::new(tokio::sync::Mutex::new(())),
            state: Mutex::new(SessionState::NoSession),
        }
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
    }
}

/// Callbacks registered for one call. Dropping it clears the slot, so a
/// cancelled call unregisters too.
struct Registration<'a> {
    slot: &'a CallbackSlot,
}

impl<'a> Registration<'a> {
    fn register(slot: &'a CallbackSlot, callbacks: Arc<dyn MessageCallbacks>) -> Self {
        *slot.lock() = Some(callbacks);
        Self { slot }
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        *self.slot.lock() = None;
    }
}

/// Workspace id to session channel.
#[derive(Default)]
pub struct SessionRegistry {
    channels: Mutex<HashMap<String, Arc<Channel>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn channel(&self, workspace_id: &str) -> Arc<Channel> {
        self.channels
            .lock()
            .entry(workspace_id.to_string())
            .or_insert_with(|| Arc::new(Channel::new()))
            .clone()
    }

    fn get(&self, workspace_id: &str) -> Option<Arc<Channel>> {
        self.channels.lock().get(workspace_id).cloned()
    }

    fn is_current(&self, workspace_id: &str, channel: &Arc<Channel>) -> bool {
        self.channels
            .lock()
            .get(workspace_id)
            .is_some_and(|c| Arc::ptr_eq(c, channel))
    }

    /// Remove the entry if it is still `channel`.
    fn retire(&self, workspace_id: &str, channel: &Arc<Channel>) {
        let mut channels = self.channels.lock();
        if channels
            .get(workspace_id)
            .is_some_and(|c| Arc::ptr_eq(c, channel))
        {
            channels.remove(workspace_id);
        }
    }

    /// Drop a channel that never got a session, unless another call holds it.
    /// Clones are only handed out under the map lock, so the count is stable here.
    fn release_if_idle(&self, workspace_id: &str, channel: &Arc<Channel>) {
        let mut channels = self.channels.lock();
        let idle = channels.get(workspace_id).is_some_and(|c| {
            Arc::ptr_eq(c, channel) && Arc::strong_count(c) == 2
        });
        if idle && *channel.state.lock() == SessionState::NoSession {
            channels.remove(workspace_id);
        }
    }

    fn drain(&self) -> Vec<(String, Arc<Channel>)> {
        self.channels.lock().drain().collect()
    }

    pub fn len(&self) -> usize {
        self.channels.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Orchestrator {
    client: Arc<dyn AssistantClient>,
    registry: SessionRegistry,
    tools: Arc<ToolRegistry>,
    policy: OverlapPolicy,
    system_prompt: Option<String>,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn AssistantClient>,
        registry: SessionRegistry,
        tools: Arc<ToolRegistry>,
        policy: OverlapPolicy,
    ) -> Self {
        Self {
            client,
            registry,
            tools,
            policy,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub fn session_state(&self, workspace_id: &str) -> SessionState {
        self.registry
            .get(workspace_id)
            .map(|c| *c.state.lock())
            .unwrap_or(SessionState::NoSession)
    }

    /// Send `message` to the workspace's session, creating it on first use.
    ///
    /// Streaming deltas go to `callbacks` while the call is in flight; the
    /// outcome is reported through `on_complete` or `on_error` as well as the
    /// return value. The callbacks are unregistered before this returns, or
    /// when the call is dropped midway.
    #[instrument(skip(self, message, callbacks), fields(policy = ?self.policy))]
    pub async fn send_message(
        &self,
        workspace_id: &str,
        message: &str,
        folder_path: &Path,
        callbacks: Arc<dyn MessageCallbacks>,
    ) -> Result<String, AssistantError> {
        // A turn taken on a channel that `reset` retired meanwhile is retried
        // on the replacement.
        let (channel, _turn) = loop {
            let channel = self.registry.channel(workspace_id);
            let turn = match self.policy {
                OverlapPolicy::Queue => Some(channel.turn.clone().lock_owned().await),
                OverlapPolicy::Reject => match channel.turn.clone().try_lock_owned() {
                    Ok(guard) => Some(guard),
                    Err(_) => {
                        let err = AssistantError::Busy(workspace_id.to_string());
                        callbacks.on_error(&err.to_string());
                        return Err(err);
                    }
                },
                OverlapPolicy::Race => None,
            };
            if self.registry.is_current(workspace_id, &channel) {
                break (channel, turn);
            }
        };

        let result = {
            let _registration = Registration::register(&channel.callbacks, callbacks.clone());
            self.round_trip(&channel, workspace_id, message, folder_path)
                .await
        };
        if matches!(result, Err(AssistantError::SessionCreation { .. })) {
            self.registry.release_if_idle(workspace_id, &channel);
        }

        match &result {
            Ok(content) => callbacks.on_complete(content),
            Err(e) => callbacks.on_error(&e.to_string()),
        }
        result
    }

    async fn round_trip(
        &self,
        channel: &Channel,
        workspace_id: &str,
        message: &str,
        folder_path: &Path,
    ) -> Result<String, AssistantError> {
        let session = self.session_for(channel, workspace_id, folder_path).await?;
        let reply = session
            .send_and_wait(message)
            .await
            .map_err(|e| AssistantError::Request(format!("{e:#}")))?;
        Ok(reply.unwrap_or_default())
    }

    async fn session_for(
        &self,
        channel: &Channel,
        workspace_id: &str,
        folder_path: &Path,
    ) -> Result<Arc<dyn AssistantSession>, AssistantError> {
        let mut slot = channel.session.lock().await;
        if let Some(session) = slot.as_ref() {
            return Ok(session.clone());
        }

        channel.set_state(SessionState::Creating);
        let config = SessionConfig {
            workspace_id: workspace_id.to_string(),
            working_directory: folder_path.to_path_buf(),
            system_prompt: self.system_prompt.clone(),
            tools: self.tools.definitions(),
            tool_registry: self.tools.clone(),
            events: EventSink::new(channel.callbacks.clone()),
        };

        match self.client.create_session(config).await {
            Ok(session) => {
                let session: Arc<dyn AssistantSession> = Arc::from(session);
                *slot = Some(session.clone());
                channel.set_state(SessionState::Ready);
                info!(workspace_id, "assistant session created");
                Ok(session)
            }
            Err(e) => {
                channel.set_state(SessionState::NoSession);
                warn!(workspace_id, error = %e, "failed to create assistant session");
                Err(AssistantError::SessionCreation {
                    workspace_id: workspace_id.to_string(),
                    message: format!("{e:#}"),
                })
            }
        }
    }

    /// Destroy the workspace's session, if any. The next message starts a
    /// fresh one.
    ///
    /// Waits for an in-flight turn to finish first.
    pub async fn reset(&self, workspace_id: &str) -> bool {
        let Some(channel) = self.registry.get(workspace_id) else {
            return false;
        };
        let _turn = channel.turn.lock().await;
        self.registry.retire(workspace_id, &channel);
        let session = channel.session.lock().await.take();
        channel.set_state(SessionState::NoSession);
        match session {
            Some(session) => {
                destroy(workspace_id, session.as_ref()).await;
                true
            }
            None => false,
        }
    }

    /// Destroy every session and stop the client.
    pub async fn stop(&self) -> Result<(), AssistantError> {
        let channels = self.registry.drain();
        debug!(sessions = channels.len(), "stopping assistant");
        for (workspace_id, channel) in channels {
            let session = channel.session.lock().await.take();
            channel.set_state(SessionState::NoSession);
            if let Some(session) = session {
                destroy(&workspace_id, session.as_ref()).await;
            }
        }
        self.client
            .stop()
            .await
            .map_err(|e| AssistantError::Shutdown(format!("{e:#}")))
    }
}

async fn destroy(workspace_id: &str, session: &dyn AssistantSession) {
    if let Err(e) = session.destroy().await {
        warn!(workspace_id, error = %e, "failed to destroy assistant session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        deltas: Mutex<Vec<String>>,
        completed: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
    }

    impl MessageCallbacks for Recorder {
        fn on_delta(&self, delta: &str) {
            self.deltas.lock().push(delta.to_string());
        }
        fn on_complete(&self, content: &str) {
            self.completed.lock().push(content.to_string());
        }
        fn on_error(&self, message: &str) {
            self.errors.lock().push(message.to_string());
        }
    }

    /// Echoes the prompt back, streaming it word by word.
    struct EchoSession {
        events: EventSink,
        delay: Duration,
        destroyed: Arc<AtomicUsize>,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl AssistantSession for EchoSession {
        async fn send_and_wait(&self, prompt: &str) -> anyhow::Result<Option<String>> {
            self.log.lock().push(format!("start {prompt}"));
            for word in prompt.split_whitespace() {
                self.events.delta(word);
            }
            tokio::time::sleep(self.delay).await;
            self.log.lock().push(format!("end {prompt}"));
            if prompt.is_empty() {
                return Ok(None);
            }
            Ok(Some(format!("echo: {prompt}")))
        }

        async fn destroy(&self) -> anyhow::Result<()> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeClient {
        created: AtomicUsize,
        failures_left: AtomicUsize,
        destroyed: Arc<AtomicUsize>,
        stopped: AtomicUsize,
        delay_ms: u64,
        seen_tools: Mutex<Vec<String>>,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl AssistantClient for FakeClient {
        async fn create_session(
            &self,
            config: SessionConfig,
        ) -> anyhow::Result<Box<dyn AssistantSession>> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                anyhow::bail!("sdk unavailable");
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            *self.seen_tools.lock() = config.tools.iter().map(|t| t.name.clone()).collect();
            Ok(Box::new(EchoSession {
                events: config.events,
                delay: Duration::from_millis(self.delay_ms),
                destroyed: self.destroyed.clone(),
                log: self.log.clone(),
            }))
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.stopped.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn orchestrator(client: Arc<FakeClient>, policy: OverlapPolicy) -> Orchestrator {
        Orchestrator::new(
            client,
            SessionRegistry::new(),
            Arc::new(ToolRegistry::new()),
            policy,
        )
    }

    #[tokio::test]
    async fn first_message_creates_session_and_streams() {
        let client = Arc::new(FakeClient::default());
        let orch = orchestrator(client.clone(), OverlapPolicy::Queue);
        let recorder = Arc::new(Recorder::default());

        assert_eq!(orch.session_state("w1"), SessionState::NoSession);
        let reply = orch
            .send_message("w1", "hello there", Path::new("/tmp/w1"), recorder.clone())
            .await
            .unwrap();

        assert_eq!(reply, "echo: hello there");
        assert_eq!(*recorder.deltas.lock(), vec!["hello", "there"]);
        assert_eq!(*recorder.completed.lock(), vec!["echo: hello there"]);
        assert_eq!(orch.session_state("w1"), SessionState::Ready);
        assert!(client.seen_tools.lock().contains(&"list_tasks".to_string()));

        orch.send_message("w1", "again", Path::new("/tmp/w1"), recorder.clone())
            .await
            .unwrap();
        assert_eq!(client.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_reply_completes_with_empty_string() {
        let orch = orchestrator(Arc::new(FakeClient::default()), OverlapPolicy::Queue);
        let recorder = Arc::new(Recorder::default());
        let reply = orch
            .send_message("w1", "", Path::new("/tmp"), recorder.clone())
            .await
            .unwrap();
        assert_eq!(reply, "");
        assert_eq!(*recorder.completed.lock(), vec![String::new()]);
    }

    #[tokio::test]
    async fn creation_failure_reverts_state() {
        let client = Arc::new(FakeClient {
            failures_left: AtomicUsize::new(1),
            ..Default::default()
        });
        let orch = orchestrator(client.clone(), OverlapPolicy::Queue);
        let recorder = Arc::new(Recorder::default());

        let err = orch
            .send_message("w1", "hi", Path::new("/tmp"), recorder.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::SessionCreation { .. }));
        assert_eq!(orch.session_state("w1"), SessionState::NoSession);
        assert!(orch.registry.is_empty());
        assert_eq!(recorder.errors.lock().len(), 1);
        assert!(recorder.completed.lock().is_empty());

        // No automatic retry, but the next message tries again.
        orch.send_message("w1", "hi", Path::new("/tmp"), recorder.clone())
            .await
            .unwrap();
        assert_eq!(orch.session_state("w1"), SessionState::Ready);
    }

    #[tokio::test]
    async fn deltas_without_callbacks_are_dropped() {
        let client = Arc::new(FakeClient::default());
        let orch = orchestrator(client, OverlapPolicy::Queue);
        let first = Arc::new(Recorder::default());
        orch.send_message("w1", "one", Path::new("/tmp"), first.clone())
            .await
            .unwrap();

        // Registration is cleared once the call returns.
        let channel = orch.registry.get("w1").unwrap();
        assert!(channel.callbacks.lock().is_none());
        EventSink::new(channel.callbacks.clone()).delta("late");
        assert_eq!(*first.deltas.lock(), vec!["one"]);
    }

    #[tokio::test]
    async fn cancelled_call_unregisters_callbacks() {
        let client = Arc::new(FakeClient {
            delay_ms: 5_000,
            ..Default::default()
        });
        let orch = orchestrator(client, OverlapPolicy::Queue);
        let abandoned = Arc::new(Recorder::default());

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            orch.send_message("w1", "slow", Path::new("/tmp"), abandoned.clone()),
        )
        .await;
        assert!(outcome.is_err());

        let channel = orch.registry.get("w1").unwrap();
        assert!(channel.callbacks.lock().is_none());
        EventSink::new(channel.callbacks.clone()).delta("late");
        assert_eq!(*abandoned.deltas.lock(), vec!["slow"]);
        assert!(abandoned.completed.lock().is_empty());
    }

    #[tokio::test]
    async fn reject_policy_fails_overlapping_call() {
        let client = Arc::new(FakeClient {
            delay_ms: 100,
            ..Default::default()
        });
        let orch = Arc::new(orchestrator(client, OverlapPolicy::Reject));

        let slow = {
            let orch = orch.clone();
            tokio::spawn(async move {
                orch.send_message("w1", "slow", Path::new("/tmp"), Arc::new(Recorder::default()))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let recorder = Arc::new(Recorder::default());
        let err = orch
            .send_message("w1", "fast", Path::new("/tmp"), recorder.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::Busy(ref w) if w == "w1"));
        assert_eq!(recorder.errors.lock().len(), 1);

        assert_eq!(slow.await.unwrap().unwrap(), "echo: slow");
    }

    #[tokio::test]
    async fn queue_policy_serializes_calls() {
        let client = Arc::new(FakeClient {
            delay_ms: 30,
            ..Default::default()
        });
        let orch = Arc::new(orchestrator(client.clone(), OverlapPolicy::Queue));

        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        let (ra, rb) = tokio::join!(
            orch.send_message("w1", "first", Path::new("/tmp"), a.clone()),
            orch.send_message("w1", "second", Path::new("/tmp"), b.clone()),
        );
        assert_eq!(ra.unwrap(), "echo: first");
        assert_eq!(rb.unwrap(), "echo: second");
        assert_eq!(*a.deltas.lock(), vec!["first"]);
        assert_eq!(*b.deltas.lock(), vec!["second"]);
        assert_eq!(client.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reset_waits_for_in_flight_turn() {
        let client = Arc::new(FakeClient {
            delay_ms: 100,
            ..Default::default()
        });
        let orch = Arc::new(orchestrator(client.clone(), OverlapPolicy::Queue));

        let slow = {
            let orch = orch.clone();
            tokio::spawn(async move {
                orch.send_message("w1", "slow", Path::new("/tmp"), Arc::new(Recorder::default()))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let recorder = Arc::new(Recorder::default());
        let (reset, next) = tokio::join!(
            orch.reset("w1"),
            orch.send_message("w1", "next", Path::new("/tmp"), recorder.clone()),
        );
        assert!(reset);
        assert_eq!(next.unwrap(), "echo: next");
        assert_eq!(slow.await.unwrap().unwrap(), "echo: slow");

        // The next turn started only after the reset, on a fresh session.
        assert_eq!(
            *client.log.lock(),
            vec!["start slow", "end slow", "start next", "end next"]
        );
        assert_eq!(client.created.load(Ordering::SeqCst), 2);
        assert_eq!(client.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(orch.registry.len(), 1);
    }

    #[tokio::test]
    async fn reset_and_stop_destroy_sessions() {
        let client = Arc::new(FakeClient::default());
        let orch = orchestrator(client.clone(), OverlapPolicy::Queue);
        let recorder: Arc<dyn MessageCallbacks> = Arc::new(Recorder::default());

        for ws in ["w1", "w2"] {
            orch.send_message(ws, "hi", Path::new("/tmp"), recorder.clone())
                .await
                .unwrap();
        }

        assert!(orch.reset("w1").await);
        assert!(!orch.reset("w1").await);
        assert_eq!(orch.session_state("w1"), SessionState::NoSession);
        assert_eq!(client.destroyed.load(Ordering::SeqCst), 1);

        orch.stop().await.unwrap();
        assert_eq!(client.destroyed.load(Ordering::SeqCst), 2);
        assert_eq!(client.stopped.load(Ordering::SeqCst), 1);
        assert!(orch.registry.is_empty());
    }
}
