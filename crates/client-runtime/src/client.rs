//! # RPC Client
//!
//! One object per logged-in user: it owns the session and wires the
//! dispatcher to the pending tracker so both act on the same registry.

use crate::config::{ClientConfig, ConfigError};
use rc_01_type_registry::{SchemaDocument, SchemaError, TypeRegistry};
use rc_02_validator::{ValidationFailure, Validator};
use rc_03_request_dispatcher::{
    ClientSession, DiagnosticSink, DispatchSummary, PendingHandlers, RequestDispatcher,
    RequestEnvelope, RequestTransport,
};
use rc_04_pending_tracker::{CompletionRecord, PendingRequestTracker};
use serde_json::Value;
use shared_bus::{ChannelEvent, PushTransport};
use shared_types::{RequestError, SessionId};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tracing::info;

/// Builder for [`RpcClient`].
pub struct RpcClientBuilder {
    config: ClientConfig,
    transport: Arc<dyn RequestTransport>,
    push: Arc<dyn PushTransport>,
    registry: Option<Arc<TypeRegistry>>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
    session: Option<Arc<ClientSession>>,
}

impl RpcClientBuilder {
    /// Use an already-loaded schema instead of `validation.schema_path`.
    pub fn schema(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Share an existing session instead of starting an anonymous one.
    pub fn session(mut self, session: Arc<ClientSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn build(self) -> Result<RpcClient, ConfigError> {
        self.config.validate()?;

        let registry = match (self.registry, &self.config.validation.schema_path) {
            (Some(registry), _) => Some(registry),
            (None, Some(path)) => {
                let document = SchemaDocument::from_path(path)
                    .map_err(|e| ConfigError::Invalid(format!("schema {}: {}", path.display(), e)))?;
                let registry = TypeRegistry::from_document(&document)
                    .map_err(|e| ConfigError::Invalid(format!("schema {}: {}", path.display(), e)))?;
                Some(Arc::new(registry))
            }
            (None, None) => None,
        };

        if self.config.validation.before_dispatch && registry.is_none() {
            return Err(ConfigError::Invalid(
                "validation before dispatch needs a schema".into(),
            ));
        }

        let validator = registry.clone().map(|r| Arc::new(Validator::new(r)));

        let mut dispatcher = RequestDispatcher::new(self.transport);
        if let Some(diagnostics) = self.diagnostics {
            dispatcher = dispatcher.with_diagnostics(diagnostics);
        }
        if let Some(registry) = &registry {
            dispatcher = dispatcher.with_schema(registry.clone());
        }
        if self.config.validation.before_dispatch {
            if let Some(validator) = &validator {
                dispatcher = dispatcher.with_validation(validator.clone());
            }
        }
        let dispatcher = Arc::new(dispatcher);

        let session = self.session.unwrap_or_default();
        let tracker = Arc::new(PendingRequestTracker::with_config(
            session.clone(),
            self.push,
            dispatcher.clone(),
            self.config.tracker_config(),
        ));

        info!(
            schema = registry.is_some(),
            validate_before_dispatch = self.config.validation.before_dispatch,
            channel_prefix = %self.config.channel.prefix,
            "RPC client ready"
        );

        Ok(RpcClient {
            config: self.config,
            session,
            registry,
            validator,
            dispatcher,
            tracker,
        })
    }
}

/// Client facade.
pub struct RpcClient {
    config: ClientConfig,
    session: Arc<ClientSession>,
    registry: Option<Arc<TypeRegistry>>,
    validator: Option<Arc<Validator>>,
    dispatcher: Arc<RequestDispatcher>,
    tracker: Arc<PendingRequestTracker>,
}

impl RpcClient {
    pub fn builder(
        config: ClientConfig,
        transport: Arc<dyn RequestTransport>,
        push: Arc<dyn PushTransport>,
    ) -> RpcClientBuilder {
        RpcClientBuilder {
            config,
            transport,
            push,
            registry: None,
            diagnostics: None,
            session: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<ClientSession> {
        &self.session
    }

    pub fn registry(&self) -> Option<&Arc<TypeRegistry>> {
        self.registry.as_ref()
    }

    pub fn validator(&self) -> Option<&Arc<Validator>> {
        self.validator.as_ref()
    }

    pub fn dispatcher(&self) -> &Arc<RequestDispatcher> {
        &self.dispatcher
    }

    pub fn tracker(&self) -> &Arc<PendingRequestTracker> {
        &self.tracker
    }

    // =========================================================================
    // SESSION
    // =========================================================================

    pub fn login(&self, session_id: SessionId) {
        self.session.set_session_id(session_id);
    }

    /// Drop the push subscription, the identity and every pending request.
    pub async fn logout(&self) {
        self.tracker.handle_disconnect().await;
        self.session.logout();
    }

    pub fn set_pending_handlers(&self, handlers: PendingHandlers) {
        self.session.set_handlers(handlers);
    }

    // =========================================================================
    // CALLS
    // =========================================================================

    pub async fn send(&self, envelope: RequestEnvelope) -> DispatchSummary {
        self.dispatcher.dispatch_one(&self.session, envelope).await
    }

    pub async fn send_batch(&self, batch: Vec<RequestEnvelope>) -> DispatchSummary {
        self.dispatcher.dispatch(&self.session, batch).await
    }

    /// Call and return the immediate result, without callbacks.
    pub async fn call(
        &self,
        service: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, RequestError> {
        self.dispatcher.call(&self.session, service, method, params).await
    }

    /// Validate params against the loaded schema.
    ///
    /// `Ok(false)` leaves the reason in [`last_validation_error`](Self::last_validation_error).
    pub fn validate_params(
        &self,
        service: &str,
        method: &str,
        params: &Value,
    ) -> Result<bool, SchemaError> {
        match &self.validator {
            Some(validator) => validator.validate_call(service, method, params),
            None => Err(SchemaError::UnknownService(service.to_string())),
        }
    }

    pub fn last_validation_error(&self) -> Option<ValidationFailure> {
        self.validator.as_ref().and_then(|v| v.last_error())
    }

    pub async fn reconcile(&self) -> Result<Vec<CompletionRecord>, RequestError> {
        self.tracker.reconcile().await
    }

    /// Run the pending tracker over `events` on a background task.
    pub fn spawn_tracker<S>(&self, events: S) -> JoinHandle<()>
    where
        S: Stream<Item = ChannelEvent> + Send + Unpin + 'static,
    {
        let tracker = self.tracker.clone();
        tokio::spawn(async move { tracker.run(events).await })
    }
}
