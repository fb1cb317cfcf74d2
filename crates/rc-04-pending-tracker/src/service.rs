//! # Pending Request Tracker
//!
//! Resolves requests the dispatcher left pending.
//!
//! ```text
//! Created ──dispatch──→ Dispatched ──{result|error}──→ Completed (sync)
//!                           │
//!                          {id}
//!                           ↓
//!                        Pending ──push: requests_completed──→ Completed
//!                           │    ──reconcile reply──────────→ Completed
//!                           └──push: request_interim_status──→ (status callback)
//! ```
//!
//! `Completed` is reached at most once: the registry removal is the gate, and a
//! completion for an id that is no longer tracked is dropped.

use crate::domain::{ChannelState, CompletionRecord, ConnectOutcome, MessageOutcome, TrackerConfig};
use parking_lot::Mutex;
use rc_03_request_dispatcher::{
    deliver_error, deliver_status, deliver_success, ClientSession, Diagnostic, DiagnosticSink,
    RequestDispatcher, RequestEnvelope,
};
use serde_json::Value;
use shared_bus::{ChannelEvent, ConnectEvent, PushTransport};
use shared_types::{
    CompletionDetails, CorrelationId, ProtocolError, PushMessage, ReconcileParams, RequestError,
    TransportError,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

/// Actions the server sends to the client.
const INBOUND_ACTIONS: [&str; 2] = ["requests_completed", "request_interim_status"];

/// Correlates push and poll completions with tracked envelopes.
pub struct PendingRequestTracker {
    session: Arc<ClientSession>,
    push: Arc<dyn PushTransport>,
    dispatcher: Arc<RequestDispatcher>,
    config: TrackerConfig,
    state: Mutex<ChannelState>,
}

impl PendingRequestTracker {
    pub fn new(
        session: Arc<ClientSession>,
        push: Arc<dyn PushTransport>,
        dispatcher: Arc<RequestDispatcher>,
    ) -> Self {
        Self::with_config(session, push, dispatcher, TrackerConfig::default())
    }

    pub fn with_config(
        session: Arc<ClientSession>,
        push: Arc<dyn PushTransport>,
        dispatcher: Arc<RequestDispatcher>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            session,
            push,
            dispatcher,
            config,
            state: Mutex::new(ChannelState::new()),
        }
    }

    pub fn session(&self) -> &Arc<ClientSession> {
        &self.session
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Channel currently subscribed, if any.
    pub fn subscribed_channel(&self) -> Option<String> {
        self.state.lock().channel().map(str::to_string)
    }

    fn sink(&self) -> &dyn DiagnosticSink {
        self.dispatcher.diagnostics().as_ref()
    }

    // =========================================================================
    // CHANNEL LIFECYCLE
    // =========================================================================

    /// React to a connect event from the push transport.
    ///
    /// A new subscription is followed by a `requests_status` publish listing
    /// every outstanding id, so the server can re-send completions that were
    /// published while the client was away.
    pub async fn handle_connect(
        &self,
        event: &ConnectEvent,
    ) -> Result<ConnectOutcome, TransportError> {
        let Some(session_id) = self.session.session_id() else {
            debug!(client_id = %event.client_id, "Connect without a session, not subscribing");
            return Ok(ConnectOutcome::Ignored);
        };
        let channel = self.config.channel_for(&session_id);

        let outcome = self.state.lock().plan(event, &channel);
        match &outcome {
            ConnectOutcome::Ignored => {
                debug!(client_id = %event.client_id, state = ?event.state, "Connect event ignored");
                return Ok(outcome);
            }
            ConnectOutcome::Unchanged => return Ok(outcome),
            ConnectOutcome::Resubscribed { stale, .. } => {
                info!(client_id = %event.client_id, stale = %stale, "Transport identity changed, resubscribing");
                if let Err(e) = self.push.unsubscribe(stale).await {
                    warn!(channel = %stale, error = %e, "Failed to drop stale subscription");
                }
                self.state.lock().reset();
            }
            ConnectOutcome::Subscribed { .. } => {}
        }

        self.push.subscribe(&channel).await?;
        self.state
            .lock()
            .established(event.client_id.clone(), channel.clone());
        info!(channel = %channel, client_id = %event.client_id, "Subscribed to private channel");

        self.publish_status(&channel).await;

        if self.config.reconcile_on_connect {
            if let Err(e) = self.reconcile().await {
                warn!(error = %e, "Reconciliation after connect failed");
            }
        }
        Ok(outcome)
    }

    /// Forget the subscription; the next connect subscribes afresh.
    pub async fn handle_disconnect(&self) {
        let Some(channel) = self.state.lock().reset() else {
            return;
        };
        if let Err(e) = self.push.unsubscribe(&channel).await {
            debug!(channel = %channel, error = %e, "Unsubscribe after disconnect failed");
        }
        info!(channel = %channel, "Push channel disconnected");
    }

    async fn publish_status(&self, channel: &str) {
        let ids = self.session.pending().ids();
        let count = ids.len();
        let message = PushMessage::RequestsStatus { ids }.to_value();
        match self.push.publish(channel, message).await {
            Ok(()) => debug!(channel = %channel, outstanding = count, "Published request status"),
            Err(e) => warn!(channel = %channel, error = %e, "Request status publish dropped"),
        }
    }

    // =========================================================================
    // PUSH MESSAGES
    // =========================================================================

    /// Route one push payload by its `action`.
    pub async fn handle_message(&self, data: Value) -> MessageOutcome {
        let action = data.get("action").and_then(Value::as_str).map(str::to_string);
        match action.as_deref() {
            Some(action) if INBOUND_ACTIONS.contains(&action) => {}
            other => {
                debug!(action = ?other, "Push message ignored");
                return MessageOutcome::Ignored;
            }
        }

        match serde_json::from_value::<PushMessage>(data.clone()) {
            Ok(PushMessage::RequestsCompleted { requests }) => {
                MessageOutcome::Completed(self.handle_completions(requests).await)
            }
            Ok(PushMessage::RequestInterimStatus { request_id, status }) => {
                let delivered = self.handle_interim_status(&request_id, &status);
                MessageOutcome::Status {
                    id: request_id,
                    delivered,
                }
            }
            Ok(_) => MessageOutcome::Ignored,
            Err(e) => {
                self.sink().report(Diagnostic::MalformedPush {
                    reason: e.to_string(),
                    payload: data,
                });
                MessageOutcome::Malformed
            }
        }
    }

    /// Apply a `requests_completed` notification.
    ///
    /// One acknowledgment naming every id is published before any entry is
    /// decoded or any callback runs, including ids that turn out to be
    /// duplicates or malformed.
    pub async fn handle_completions(
        &self,
        requests: BTreeMap<CorrelationId, Value>,
    ) -> Vec<CompletionRecord> {
        if requests.is_empty() {
            return Vec::new();
        }
        self.acknowledge(requests.keys().cloned().collect()).await;

        requests
            .into_iter()
            .filter_map(|(id, raw)| match serde_json::from_value::<CompletionDetails>(raw.clone()) {
                Ok(details) => self.complete(id, &details),
                Err(e) => self.fail_malformed(id, raw, e.to_string()),
            })
            .collect()
    }

    async fn acknowledge(&self, ids: Vec<CorrelationId>) {
        let channel = self
            .subscribed_channel()
            .or_else(|| self.session.session_id().map(|s| self.config.channel_for(&s)));
        let Some(channel) = channel else {
            warn!(ids = ids.len(), "No channel to acknowledge on, ack dropped");
            return;
        };

        let count = ids.len();
        let message = PushMessage::RequestsAcknowledged { ids }.to_value();
        match self.push.publish(&channel, message).await {
            Ok(()) => debug!(channel = %channel, acknowledged = count, "Acknowledged completions"),
            Err(e) => warn!(channel = %channel, error = %e, "Acknowledgment dropped"),
        }
    }

    /// Deliver interim status to a tracked request. The registry is unchanged.
    pub fn handle_interim_status(&self, id: &CorrelationId, status: &Value) -> bool {
        let Some(envelope) = self.session.pending().get(id) else {
            debug!(correlation_id = %id, "Interim status for untracked request ignored");
            return false;
        };
        let handlers = self.session.handlers();
        let callback = envelope
            .status_callback()
            .or(handlers.on_pending_status.as_ref());
        deliver_status(self.sink(), &envelope, callback, status);
        true
    }

    /// Terminal transition for one id. `None` when the id was not tracked.
    fn complete(&self, id: CorrelationId, details: &CompletionDetails) -> Option<CompletionRecord> {
        let tracked = self.session.pending().remove(&id)?;

        let params = match details.request.params() {
            Ok(Some(params)) => Ok(params),
            Ok(None) => Ok(tracked.params.clone()),
            Err(e) => Err(e),
        };
        let envelope = RequestEnvelope::reconstruct(
            &tracked,
            details.request.service_name.clone(),
            details.request.method_name.clone(),
            params.as_ref().cloned().unwrap_or_else(|_| tracked.params.clone()),
        );

        let outcome = match params.and_then(|_| details.decode_payload()) {
            Ok(payload) if details.success => Ok(payload),
            Ok(payload) => Err(RequestError::Server(
                self.dispatcher.classify_error(&envelope, payload),
            )),
            Err(e) => Err(RequestError::Protocol(e)),
        };

        let handlers = self.session.handlers();
        match &outcome {
            Ok(result) => {
                let callback = envelope
                    .success_callback()
                    .or(handlers.on_pending_success.as_ref());
                deliver_success(self.sink(), &envelope, callback, result);
            }
            Err(error) => {
                let callback = envelope
                    .error_callback()
                    .or(handlers.on_pending_error.as_ref());
                deliver_error(self.sink(), &envelope, callback, error);
            }
        }

        debug!(correlation_id = %id, call = %envelope.target(), success = details.success, "Pending request completed");
        Some(CompletionRecord {
            id,
            envelope,
            success: details.success,
            outcome,
        })
    }

    /// Terminal transition for an entry that could not be decoded.
    fn fail_malformed(
        &self,
        id: CorrelationId,
        raw: Value,
        reason: String,
    ) -> Option<CompletionRecord> {
        self.sink().report(Diagnostic::MalformedPush {
            reason: format!("completion {}: {}", id, reason),
            payload: raw,
        });
        let mut envelope = self.session.pending().remove(&id)?;
        envelope.pending = false;

        let error = RequestError::Protocol(ProtocolError::MalformedResponse(reason));
        let handlers = self.session.handlers();
        let callback = envelope
            .error_callback()
            .or(handlers.on_pending_error.as_ref());
        deliver_error(self.sink(), &envelope, callback, &error);

        warn!(correlation_id = %id, call = %envelope.target(), "Malformed completion failed request");
        Some(CompletionRecord {
            id,
            envelope,
            success: false,
            outcome: Err(error),
        })
    }

    // =========================================================================
    // RECONCILIATION
    // =========================================================================

    /// Poll the server for every outstanding id and apply what it returns.
    ///
    /// No acknowledgment is published. With nothing outstanding no call is
    /// made.
    pub async fn reconcile(&self) -> Result<Vec<CompletionRecord>, RequestError> {
        let ids = self.session.pending().ids();
        if ids.is_empty() {
            debug!("Nothing outstanding, reconciliation skipped");
            return Ok(Vec::new());
        }

        let params = serde_json::to_value(ReconcileParams { ids: ids.clone() })
            .map_err(|e| RequestError::Invalid(e.to_string()))?;
        let reply = self
            .dispatcher
            .call(
                &self.session,
                &self.config.reconcile_service,
                &self.config.reconcile_method,
                params,
            )
            .await?;

        let records = match reply {
            Value::Array(records) => records,
            Value::Null => Vec::new(),
            other => {
                self.sink().report(Diagnostic::MalformedPush {
                    reason: "reconciliation reply is not a list".into(),
                    payload: other,
                });
                return Ok(Vec::new());
            }
        };

        let mut applied = Vec::new();
        for raw in records {
            match serde_json::from_value::<CompletionDetails>(raw.clone()) {
                Ok(details) => match details.id.clone() {
                    Some(id) => applied.extend(self.complete(id, &details)),
                    None => self.sink().report(Diagnostic::MalformedPush {
                        reason: "reconciliation record without id".into(),
                        payload: raw,
                    }),
                },
                Err(e) => self.sink().report(Diagnostic::MalformedPush {
                    reason: format!("reconciliation record: {}", e),
                    payload: raw,
                }),
            }
        }

        info!(
            outstanding = ids.len(),
            applied = applied.len(),
            remaining = self.session.pending().len(),
            "Reconciliation complete"
        );
        Ok(applied)
    }

    // =========================================================================
    // EVENT LOOP
    // =========================================================================

    /// Handle one channel event.
    pub async fn handle_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connect(event) => {
                if let Err(e) = self.handle_connect(&event).await {
                    warn!(client_id = %event.client_id, error = %e, "Subscription failed");
                }
            }
            ChannelEvent::Disconnected => self.handle_disconnect().await,
            ChannelEvent::Message { channel, data } => {
                if self.subscribed_channel().as_deref() != Some(channel.as_str()) {
                    debug!(channel = %channel, "Message on a channel not held by the tracker");
                }
                self.handle_message(data).await;
            }
        }
    }

    /// Handle events one at a time until the stream ends.
    pub async fn run<S>(&self, mut events: S)
    where
        S: Stream<Item = ChannelEvent> + Unpin,
    {
        info!("Pending request tracker started");
        while let Some(event) = events.next().await {
            self.handle_event(event).await;
        }
        info!(outstanding = self.session.pending().len(), "Pending request tracker stopped");
    }

    /// [`run`](Self::run) over an mpsc receiver.
    pub async fn run_channel(&self, events: mpsc::Receiver<ChannelEvent>) {
        self.run(ReceiverStream::new(events)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_03_request_dispatcher::{MemoryDiagnostics, PendingHandlers, ScriptedTransport};
    use serde_json::json;
    use shared_bus::InMemoryPushBus;
    use shared_types::SessionId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CHANNEL: &str = "/private/s1";

    struct Harness {
        bus: Arc<InMemoryPushBus>,
        transport: Arc<ScriptedTransport>,
        diagnostics: Arc<MemoryDiagnostics>,
        session: Arc<ClientSession>,
        tracker: PendingRequestTracker,
    }

    fn harness() -> Harness {
        harness_with(TrackerConfig::default())
    }

    fn harness_with(config: TrackerConfig) -> Harness {
        let bus = Arc::new(InMemoryPushBus::new());
        let transport = Arc::new(ScriptedTransport::new());
        let diagnostics = Arc::new(MemoryDiagnostics::new());
        let session = Arc::new(ClientSession::with_session_id(SessionId::new("s1")));
        let dispatcher = Arc::new(
            RequestDispatcher::new(transport.clone()).with_diagnostics(diagnostics.clone()),
        );
        let tracker =
            PendingRequestTracker::with_config(session.clone(), bus.clone(), dispatcher, config);
        Harness {
            bus,
            transport,
            diagnostics,
            session,
            tracker,
        }
    }

    fn track(session: &ClientSession, id: &str, hits: &Arc<AtomicUsize>) {
        let counter = hits.clone();
        let mut envelope = RequestEnvelope::new("Accounts", "createAccount", json!({"username": "bob"}))
            .with_context(json!({"form": "signup"}))
            .on_success(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        envelope.pending = true;
        envelope.id = Some(id.into());
        session.pending().insert(id.into(), envelope);
    }

    fn completion(success: bool, result_json: &str) -> CompletionDetails {
        serde_json::from_value(json!({
            "request": {
                "serviceName": "Accounts",
                "methodName": "createAccount",
                "paramsJSON": "{\"username\":\"bob\"}"
            },
            "success": success,
            "resultJSON": result_json
        }))
        .unwrap()
    }

    fn completions(entries: &[(&str, CompletionDetails)]) -> BTreeMap<CorrelationId, Value> {
        entries
            .iter()
            .map(|(id, details)| (CorrelationId::from(*id), serde_json::to_value(details).unwrap()))
            .collect()
    }

    // =========================================================================
    // CHANNEL LIFECYCLE
    // =========================================================================

    #[tokio::test]
    async fn test_first_connect_subscribes_and_publishes_status() {
        let h = harness();
        track(&h.session, "r1", &Arc::default());

        let outcome = h.tracker.handle_connect(&ConnectEvent::connected("c1")).await.unwrap();

        assert_eq!(outcome, ConnectOutcome::Subscribed { channel: CHANNEL.into() });
        assert!(h.bus.is_subscribed(CHANNEL));
        assert_eq!(
            h.bus.published_actions("requests_status"),
            vec![json!({"action": "requests_status", "ids": ["r1"]})]
        );
    }

    #[tokio::test]
    async fn test_same_identity_does_nothing() {
        let h = harness();
        h.tracker.handle_connect(&ConnectEvent::connected("c1")).await.unwrap();
        let outcome = h.tracker.handle_connect(&ConnectEvent::connected("c1")).await.unwrap();

        assert_eq!(outcome, ConnectOutcome::Unchanged);
        assert_eq!(h.bus.subscribe_calls(), 1);
        assert_eq!(h.bus.published_actions("requests_status").len(), 1);
    }

    #[tokio::test]
    async fn test_changed_identity_resubscribes_once() {
        let h = harness();
        track(&h.session, "r1", &Arc::default());
        track(&h.session, "r2", &Arc::default());
        h.tracker.handle_connect(&ConnectEvent::connected("c1")).await.unwrap();

        let outcome = h.tracker.handle_connect(&ConnectEvent::connected("c2")).await.unwrap();
        h.tracker.handle_connect(&ConnectEvent::connected("c2")).await.unwrap();

        assert!(matches!(outcome, ConnectOutcome::Resubscribed { .. }));
        assert_eq!(h.bus.unsubscribe_calls(), 1);
        assert_eq!(h.bus.subscribe_calls(), 2);
        let status = h.bus.published_actions("requests_status");
        assert_eq!(status.len(), 2);
        assert_eq!(status[1]["ids"], json!(["r1", "r2"]));
        assert!(h.bus.is_subscribed(CHANNEL));
    }

    #[tokio::test]
    async fn test_failed_connect_ignored() {
        let h = harness();
        let outcome = h.tracker.handle_connect(&ConnectEvent::failed("c1")).await.unwrap();
        assert_eq!(outcome, ConnectOutcome::Ignored);
        assert_eq!(h.bus.subscribe_calls(), 0);
    }

    #[tokio::test]
    async fn test_connect_without_session_ignored() {
        let h = harness();
        h.session.logout();
        let outcome = h.tracker.handle_connect(&ConnectEvent::connected("c1")).await.unwrap();
        assert_eq!(outcome, ConnectOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_disconnect_then_connect_subscribes_afresh() {
        let h = harness();
        h.tracker.handle_connect(&ConnectEvent::connected("c1")).await.unwrap();
        h.tracker.handle_disconnect().await;

        assert!(h.tracker.subscribed_channel().is_none());
        assert!(!h.bus.is_subscribed(CHANNEL));

        let outcome = h.tracker.handle_connect(&ConnectEvent::connected("c1")).await.unwrap();
        assert_eq!(outcome, ConnectOutcome::Subscribed { channel: CHANNEL.into() });
    }

    // =========================================================================
    // COMPLETIONS
    // =========================================================================

    #[tokio::test]
    async fn test_completion_fires_once_and_acks() {
        let h = harness();
        let hits = Arc::new(AtomicUsize::new(0));
        track(&h.session, "r1", &hits);
        h.tracker.handle_connect(&ConnectEvent::connected("c1")).await.unwrap();

        let records = h
            .tracker
            .handle_completions(completions(&[("r1", completion(true, "{\"id\":42}"))]))
            .await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(h.session.pending().is_empty());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].result(), Some(&json!({"id": 42})));
        assert_eq!(records[0].envelope.context, Some(json!({"form": "signup"})));
        assert!(!records[0].envelope.pending);

        // Redelivery: acknowledged again, callback not repeated.
        let again = h
            .tracker
            .handle_completions(completions(&[("r1", completion(true, "{\"id\":42}"))]))
            .await;

        assert!(again.is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let acks = h.bus.published_actions("requests_acknowledged");
        assert_eq!(acks.len(), 2);
        assert_eq!(acks[0], json!({"action": "requests_acknowledged", "ids": ["r1"]}));
        assert_eq!(h.session.pending().stats().snapshot().duplicates, 1);
    }

    #[tokio::test]
    async fn test_ack_published_before_callbacks() {
        let h = harness();
        h.tracker.handle_connect(&ConnectEvent::connected("c1")).await.unwrap();

        let bus = h.bus.clone();
        let acks_seen = Arc::new(AtomicUsize::new(0));
        let seen = acks_seen.clone();
        let mut envelope = RequestEnvelope::new("Accounts", "createAccount", json!({}))
            .on_success(move |_, _| {
                seen.store(bus.published_actions("requests_acknowledged").len(), Ordering::SeqCst);
                Ok(())
            });
        envelope.pending = true;
        h.session.pending().insert("r1".into(), envelope);

        h.tracker
            .handle_completions(completions(&[("r1", completion(true, "1"))]))
            .await;

        assert_eq!(acks_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_completion_goes_to_on_error() {
        let h = harness();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let envelope = RequestEnvelope::new("Accounts", "createAccount", json!({}))
            .on_error(move |_, error| {
                sink.lock().push(error.clone());
                Ok(())
            });
        h.session.pending().insert("r1".into(), envelope);

        let records = h
            .tracker
            .handle_completions(completions(&[("r1", completion(false, "\"quota exceeded\""))]))
            .await;

        assert!(!records[0].success);
        assert_eq!(*errors.lock(), vec![RequestError::server_message("quota exceeded")]);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_protocol_error() {
        let h = harness();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let envelope = RequestEnvelope::new("Accounts", "createAccount", json!({}))
            .on_error(move |_, error| {
                sink.lock().push(error.clone());
                Ok(())
            });
        h.session.pending().insert("r1".into(), envelope);

        h.tracker
            .handle_completions(completions(&[("r1", completion(true, "{not json"))]))
            .await;

        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], RequestError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_session_handlers_are_fallback() {
        let h = harness();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        h.session.set_handlers(PendingHandlers::new().on_pending_success(move |envelope, _| {
            assert_eq!(envelope.method, "createAccount");
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        h.session
            .pending()
            .insert("r1".into(), RequestEnvelope::new("Accounts", "createAccount", json!({})));

        h.tracker
            .handle_completions(completions(&[("r1", completion(true, "1"))]))
            .await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(h.diagnostics.is_empty());
    }

    // =========================================================================
    // MESSAGES AND STATUS
    // =========================================================================

    #[tokio::test]
    async fn test_interim_status_keeps_request_pending() {
        let h = harness();
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let sink = statuses.clone();
        let envelope = RequestEnvelope::new("Accounts", "createAccount", json!({}))
            .on_status(move |_, status| {
                sink.lock().push(status.clone());
                Ok(())
            });
        h.session.pending().insert("r1".into(), envelope);

        let outcome = h
            .tracker
            .handle_message(json!({"action": "request_interim_status", "requestId": "r1", "status": "50%"}))
            .await;

        assert!(matches!(outcome, MessageOutcome::Status { delivered: true, .. }));
        assert_eq!(*statuses.lock(), vec![json!("50%")]);
        assert!(h.session.pending().contains(&"r1".into()));
    }

    #[tokio::test]
    async fn test_interim_status_for_unknown_id() {
        let h = harness();
        assert!(!h.tracker.handle_interim_status(&"nope".into(), &json!("50%")));
    }

    #[tokio::test]
    async fn test_unknown_action_ignored() {
        let h = harness();
        let outcome = h.tracker.handle_message(json!({"action": "server_restart"})).await;
        assert!(matches!(outcome, MessageOutcome::Ignored));
        assert!(h.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_push_reported() {
        let h = harness();
        let outcome = h
            .tracker
            .handle_message(json!({"action": "requests_completed", "requests": 5}))
            .await;

        assert!(matches!(outcome, MessageOutcome::Malformed));
        assert!(matches!(
            &h.diagnostics.diagnostics()[0],
            Diagnostic::MalformedPush { .. }
        ));
    }

    #[tokio::test]
    async fn test_malformed_entry_does_not_block_notification() {
        let h = harness();
        let hits = Arc::new(AtomicUsize::new(0));
        track(&h.session, "r1", &hits);
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let mut envelope = RequestEnvelope::new("Accounts", "createAccount", json!({}))
            .on_error(move |_, error| {
                sink.lock().push(error.clone());
                Ok(())
            });
        envelope.pending = true;
        h.session.pending().insert("r2".into(), envelope);
        h.tracker.handle_connect(&ConnectEvent::connected("c1")).await.unwrap();

        let mut message = PushMessage::RequestsCompleted {
            requests: completions(&[("r1", completion(true, "1"))]),
        }
        .to_value();
        message["requests"]["r2"] = json!({"success": true, "resultJSON": "2"});

        let outcome = h.tracker.handle_message(message).await;

        assert!(matches!(outcome, MessageOutcome::Completed(ref records) if records.len() == 2));
        assert_eq!(
            h.bus.published_actions("requests_acknowledged"),
            vec![json!({"action": "requests_acknowledged", "ids": ["r1", "r2"]})]
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(h.session.pending().is_empty());

        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            RequestError::Protocol(ProtocolError::MalformedResponse(_))
        ));
        assert!(h
            .diagnostics
            .diagnostics()
            .iter()
            .any(|d| matches!(d, Diagnostic::MalformedPush { .. })));
    }

    #[tokio::test]
    async fn test_malformed_entry_for_untracked_id_acknowledged() {
        let h = harness();
        h.tracker.handle_connect(&ConnectEvent::connected("c1")).await.unwrap();

        let records = h
            .tracker
            .handle_completions(BTreeMap::from([(CorrelationId::from("gone"), json!(7))]))
            .await;

        assert!(records.is_empty());
        assert_eq!(h.bus.published_actions("requests_acknowledged")[0]["ids"], json!(["gone"]));
        assert_eq!(h.diagnostics.diagnostics().len(), 1);
    }

    // =========================================================================
    // RECONCILIATION
    // =========================================================================

    #[tokio::test]
    async fn test_reconcile_without_outstanding_makes_no_call() {
        let h = harness();
        assert!(h.tracker.reconcile().await.unwrap().is_empty());
        assert_eq!(h.transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_applies_records_without_ack() {
        let h = harness();
        let hits = Arc::new(AtomicUsize::new(0));
        track(&h.session, "r1", &hits);
        track(&h.session, "r2", &hits);
        h.transport.push_reply(json!([{"result": [{
            "id": "r1",
            "request": {"serviceName": "Accounts", "methodName": "createAccount"},
            "success": true,
            "resultJSON": "7"
        }]}]));

        let applied = h.tracker.reconcile().await.unwrap();

        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].id, CorrelationId::from("r1"));
        assert_eq!(applied[0].envelope.params, json!({"username": "bob"}));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(h.session.pending().ids(), vec![CorrelationId::from("r2")]);
        assert!(h.bus.published_actions("requests_acknowledged").is_empty());

        let call = &h.transport.sent()[0].calls[0];
        assert_eq!(call.service, "CP");
        assert_eq!(call.method, "getPendingResults");
        assert_eq!(call.params, json!({"ids": ["r1", "r2"]}));
    }

    #[tokio::test]
    async fn test_reconcile_surfaces_call_failure() {
        let h = harness();
        track(&h.session, "r1", &Arc::default());
        h.transport.push_reply(json!([{"error": "not allowed"}]));

        assert_eq!(
            h.tracker.reconcile().await.unwrap_err(),
            RequestError::server_message("not allowed")
        );
        assert!(h.session.pending().contains(&"r1".into()));
    }

    #[tokio::test]
    async fn test_reconcile_on_connect() {
        let h = harness_with(
            TrackerConfig::default()
                .with_reconcile_on_connect(true)
                .with_reconcile_call("Results", "fetch"),
        );
        track(&h.session, "r1", &Arc::default());
        h.transport.push_reply(json!([{"result": []}]));

        h.tracker.handle_connect(&ConnectEvent::connected("c1")).await.unwrap();

        assert_eq!(h.transport.sent()[0].calls[0].service, "Results");
        assert_eq!(h.transport.sent()[0].calls[0].method, "fetch");
    }

    // =========================================================================
    // EVENT LOOP
    // =========================================================================

    #[tokio::test]
    async fn test_run_drains_events_in_order() {
        let h = harness();
        let hits = Arc::new(AtomicUsize::new(0));
        track(&h.session, "r1", &hits);
        let (tx, rx) = mpsc::channel(8);

        tx.send(ChannelEvent::Connect(ConnectEvent::connected("c1"))).await.unwrap();
        tx.send(ChannelEvent::Message {
            channel: CHANNEL.into(),
            data: PushMessage::RequestsCompleted {
                requests: completions(&[("r1", completion(true, "1"))]),
            }
            .to_value(),
        })
        .await
        .unwrap();
        tx.send(ChannelEvent::Disconnected).await.unwrap();
        drop(tx);

        h.tracker.run_channel(rx).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(h.tracker.subscribed_channel().is_none());
        assert_eq!(h.bus.published_actions("requests_acknowledged").len(), 1);
    }
}
