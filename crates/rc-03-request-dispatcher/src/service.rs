//! # Request Dispatcher
//!
//! Sends a batch of envelopes through the request transport and routes each
//! outcome back to its envelope.
//!
//! ```text
//! reply                     → delivered as
//! ──────────────────────────────────────────────────────────────
//! transport error           → on_error(Transport) on every envelope
//! {error: truthy}           → on_error(Transport::Rejected) on every envelope
//! neither object nor array  → on_error(MalformedResponse) on every envelope
//! [ ..., outcome_i, ... ]   → per envelope, in submission order:
//!     missing / null        → on_error("No response found")
//!     {error}               → on_error(Server)
//!     {id}                  → tracked as pending, no callback
//!     {result}              → on_success(result)
//!     non-object            → on_error(MalformedResponse)
//! ```

use crate::adapters::TracingDiagnostics;
use crate::domain::{deliver_error, deliver_success, ClientSession, RequestEnvelope};
use crate::ports::{DiagnosticSink, RequestTransport};
use rc_01_type_registry::TypeRegistry;
use rc_02_validator::Validator;
use serde_json::Value;
use shared_types::{
    CorrelationId, ProtocolError, RequestError, ServerError, TransportError, NO_RESPONSE_FOUND,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to one dispatched batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub pending: usize,
    /// Rejected locally by validation, never sent.
    pub rejected: usize,
    pub pending_ids: Vec<CorrelationId>,
}

impl DispatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.pending + self.rejected
    }
}

/// Interpretation of one aligned outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    Failure(Value),
    Pending(CorrelationId),
    Malformed(String),
}

impl Outcome {
    /// Classify one outcome: `error` before `id` before `result`.
    pub fn from_value(outcome: Option<&Value>) -> Self {
        let object = match outcome {
            None | Some(Value::Null) => {
                return Self::Failure(Value::String(NO_RESPONSE_FOUND.to_string()))
            }
            Some(Value::Object(object)) => object,
            Some(other) => return Self::Malformed(format!("outcome is not an object: {}", other)),
        };

        if let Some(error) = object.get("error").filter(|e| is_truthy(e)) {
            return Self::Failure(error.clone());
        }
        match object.get("id").filter(|id| is_truthy(id)) {
            Some(Value::String(id)) => return Self::Pending(CorrelationId::new(id.clone())),
            Some(Value::Number(id)) => return Self::Pending(CorrelationId::new(id.to_string())),
            Some(other) => return Self::Malformed(format!("correlation id is not a scalar: {}", other)),
            None => {}
        }
        Self::Success(object.get("result").cloned().unwrap_or(Value::Null))
    }
}

/// Split a raw reply into one outcome per call, or a batch-wide error.
pub fn interpret_reply(reply: &Value, calls: usize) -> Result<Vec<Outcome>, RequestError> {
    match reply {
        Value::Array(outcomes) => {
            if outcomes.len() != calls {
                warn!(expected = calls, received = outcomes.len(), "Reply length does not match batch");
            }
            Ok((0..calls).map(|i| Outcome::from_value(outcomes.get(i))).collect())
        }
        Value::Object(object) => match object.get("error").filter(|e| is_truthy(e)) {
            Some(error) => Err(TransportError::Rejected(error.clone()).into()),
            None => Err(ProtocolError::MalformedResponse("object reply without error".into()).into()),
        },
        other => Err(ProtocolError::MalformedResponse(format!(
            "reply is neither an array nor an error: {}",
            other
        ))
        .into()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Dispatches envelopes and correlates their outcomes.
pub struct RequestDispatcher {
    transport: Arc<dyn RequestTransport>,
    diagnostics: Arc<dyn DiagnosticSink>,
    registry: Option<Arc<TypeRegistry>>,
    validator: Option<Arc<Validator>>,
}

impl RequestDispatcher {
    pub fn new(transport: Arc<dyn RequestTransport>) -> Self {
        Self {
            transport,
            diagnostics: Arc::new(TracingDiagnostics),
            registry: None,
            validator: None,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Attach the schema, used to classify declared exceptions.
    pub fn with_schema(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Validate params before sending; failures never reach the transport.
    pub fn with_validation(mut self, validator: Arc<Validator>) -> Self {
        if self.registry.is_none() {
            self.registry = Some(validator.registry().clone());
        }
        self.validator = Some(validator);
        self
    }

    pub fn diagnostics(&self) -> &Arc<dyn DiagnosticSink> {
        &self.diagnostics
    }

    pub fn registry(&self) -> Option<&Arc<TypeRegistry>> {
        self.registry.as_ref()
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    /// Send a batch and deliver every outcome.
    pub async fn dispatch(
        &self,
        session: &ClientSession,
        batch: Vec<RequestEnvelope>,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        let batch = self.reject_invalid(batch, &mut summary);
        if batch.is_empty() {
            return summary;
        }

        let calls: Vec<_> = batch.iter().map(RequestEnvelope::to_call_request).collect();
        let session_id = session.session_id();
        debug!(calls = calls.len(), session = ?session_id.as_ref().map(|s| s.as_str()), "Dispatching batch");

        let outcomes = match self.transport.send_batch(session_id.as_ref(), &calls).await {
            Ok(reply) => interpret_reply(&reply, batch.len()),
            Err(e) => Err(RequestError::Transport(e)),
        };

        match outcomes {
            Ok(outcomes) => {
                for (envelope, outcome) in batch.into_iter().zip(outcomes) {
                    self.apply_outcome(session, envelope, outcome, &mut summary);
                }
            }
            Err(error) => {
                warn!(error = %error, calls = batch.len(), "Batch failed, notifying every envelope");
                for envelope in &batch {
                    deliver_error(self.diagnostics.as_ref(), envelope, envelope.error_callback(), &error);
                }
                summary.failed += batch.len();
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            pending = summary.pending,
            rejected = summary.rejected,
            "Batch dispatched"
        );
        summary
    }

    pub async fn dispatch_one(
        &self,
        session: &ClientSession,
        envelope: RequestEnvelope,
    ) -> DispatchSummary {
        self.dispatch(session, vec![envelope]).await
    }

    /// Send one call and return its result directly, without callbacks.
    ///
    /// A pending reply is a protocol error here.
    pub async fn call(
        &self,
        session: &ClientSession,
        service: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, RequestError> {
        let envelope = RequestEnvelope::new(service, method, params);
        let session_id = session.session_id();
        let reply = self
            .transport
            .send_batch(session_id.as_ref(), &[envelope.to_call_request()])
            .await?;

        let outcome = interpret_reply(&reply, 1)?
            .into_iter()
            .next()
            .unwrap_or(Outcome::Malformed("empty reply".into()));

        match outcome {
            Outcome::Success(result) => Ok(result),
            Outcome::Failure(error) => Err(self.classify_error(&envelope, error).into()),
            Outcome::Pending(id) => Err(ProtocolError::MalformedResponse(format!(
                "unexpected pending reply {} from {}",
                id,
                envelope.target()
            ))
            .into()),
            Outcome::Malformed(reason) => Err(ProtocolError::MalformedResponse(reason).into()),
        }
    }

    fn apply_outcome(
        &self,
        session: &ClientSession,
        mut envelope: RequestEnvelope,
        outcome: Outcome,
        summary: &mut DispatchSummary,
    ) {
        let sink = self.diagnostics.as_ref();
        match outcome {
            Outcome::Success(result) => {
                summary.succeeded += 1;
                deliver_success(sink, &envelope, envelope.success_callback(), &result);
            }
            Outcome::Failure(payload) => {
                summary.failed += 1;
                let error = RequestError::Server(self.classify_error(&envelope, payload));
                deliver_error(sink, &envelope, envelope.error_callback(), &error);
            }
            Outcome::Pending(id) => {
                summary.pending += 1;
                summary.pending_ids.push(id.clone());
                envelope.pending = true;
                envelope.id = Some(id.clone());
                session.pending().insert(id, envelope);
            }
            Outcome::Malformed(reason) => {
                summary.failed += 1;
                let error = RequestError::Protocol(ProtocolError::MalformedResponse(reason));
                deliver_error(sink, &envelope, envelope.error_callback(), &error);
            }
        }
    }

    fn reject_invalid(
        &self,
        batch: Vec<RequestEnvelope>,
        summary: &mut DispatchSummary,
    ) -> Vec<RequestEnvelope> {
        let Some(validator) = &self.validator else {
            return batch;
        };

        batch
            .into_iter()
            .filter(|envelope| {
                match validator.check_call(&envelope.service, &envelope.method, &envelope.params) {
                    Ok(()) => true,
                    Err(failure) => {
                        debug!(call = %envelope.target(), reason = %failure, "Rejected before dispatch");
                        summary.rejected += 1;
                        deliver_error(
                            self.diagnostics.as_ref(),
                            envelope,
                            envelope.error_callback(),
                            &RequestError::Invalid(failure.to_string()),
                        );
                        false
                    }
                }
            })
            .collect()
    }

    /// Classify a server error payload.
    ///
    /// With the schema attached, a single-key object naming one of the
    /// method's declared exception fields is a declared exception.
    pub fn classify_error(&self, envelope: &RequestEnvelope, payload: Value) -> ServerError {
        let declared = self.registry.as_ref().and_then(|registry| {
            let method = registry.method(&envelope.service, &envelope.method).ok()?;
            let object = payload.as_object().filter(|o| o.len() == 1)?;
            let (field, inner) = object.iter().next()?;
            let exception = method.exception(field).ok()?;
            Some(ServerError::Declared {
                field: field.clone(),
                exception_type: exception.type_ref.to_string(),
                payload: inner.clone(),
            })
        });
        declared.unwrap_or_else(|| ServerError::from_payload(payload))
    }
}
