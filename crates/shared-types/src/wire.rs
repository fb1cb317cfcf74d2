//! # Wire Shapes
//!
//! JSON shapes exchanged with the request transport and the push channel.
//!
//! ## Request transport
//!
//! ```text
//! client → [ {service, method, params, context?}, ... ]
//! server → {error}                                   (whole batch failed)
//!        | [ {error} | {result} | {id}, ... ]        (aligned by index)
//! ```
//!
//! ## Push channel (`/private/<session>`)
//!
//! | Direction | `action` | Payload |
//! |-----------|----------|---------|
//! | server → client | `requests_completed` | `requests: {<id>: CompletionDetails}` |
//! | server → client | `request_interim_status` | `requestId`, `status` |
//! | client → server | `requests_acknowledged` | `ids` |
//! | client → server | `requests_status` | `ids` |

use crate::errors::ProtocolError;
use crate::ids::CorrelationId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Service name of the reconciliation call, unless configured otherwise.
pub const DEFAULT_RECONCILE_SERVICE: &str = "CP";

/// Method name of the reconciliation call, unless configured otherwise.
pub const DEFAULT_RECONCILE_METHOD: &str = "getPendingResults";

/// Fallback error for a batch index the server did not answer.
pub const NO_RESPONSE_FOUND: &str = "No response found";

/// One call of a request batch, as serialised to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    pub service: String,
    pub method: String,
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Request snapshot echoed back by the server with a completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    #[serde(rename = "serviceName")]
    pub service_name: String,
    #[serde(rename = "methodName")]
    pub method_name: String,
    /// Params, JSON-encoded as a string.
    #[serde(rename = "paramsJSON", default, skip_serializing_if = "Option::is_none")]
    pub params_json: Option<String>,
}

impl RequestSnapshot {
    /// Decode the params carried by the snapshot, if any.
    pub fn params(&self) -> Result<Option<Value>, ProtocolError> {
        self.params_json
            .as_deref()
            .map(|raw| {
                serde_json::from_str(raw).map_err(|e| {
                    ProtocolError::MalformedResponse(format!("paramsJSON: {}", e))
                })
            })
            .transpose()
    }
}

/// Completion of one asynchronous request.
///
/// Same shape whether it arrives in a `requests_completed` push (keyed by id)
/// or in the reconciliation reply (carrying its own `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CorrelationId>,
    pub request: RequestSnapshot,
    #[serde(default)]
    pub success: bool,
    /// Result or error, JSON-encoded as a string.
    #[serde(rename = "resultJSON", default, skip_serializing_if = "Option::is_none")]
    pub result_json: Option<String>,
    /// Already-decoded result (older servers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Already-decoded error (older servers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl CompletionDetails {
    /// Decode the result (on success) or error (on failure) payload.
    ///
    /// `resultJSON` wins over the decoded fields when both are present.
    pub fn decode_payload(&self) -> Result<Value, ProtocolError> {
        if let Some(raw) = &self.result_json {
            return serde_json::from_str(raw)
                .map_err(|e| ProtocolError::MalformedResponse(format!("resultJSON: {}", e)));
        }
        let decoded = if self.success {
            self.result.clone()
        } else {
            self.error.clone().or_else(|| self.result.clone())
        };
        Ok(decoded.unwrap_or(Value::Null))
    }
}

/// Messages carried on the private push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PushMessage {
    /// Entries stay raw; each one decodes into [`CompletionDetails`] on its own.
    RequestsCompleted {
        requests: BTreeMap<CorrelationId, Value>,
    },
    RequestInterimStatus {
        #[serde(rename = "requestId")]
        request_id: CorrelationId,
        #[serde(default)]
        status: Value,
    },
    RequestsAcknowledged {
        ids: Vec<CorrelationId>,
    },
    RequestsStatus {
        ids: Vec<CorrelationId>,
    },
}

impl PushMessage {
    /// Action tag as it appears on the wire.
    pub fn action(&self) -> &'static str {
        match self {
            Self::RequestsCompleted { .. } => "requests_completed",
            Self::RequestInterimStatus { .. } => "request_interim_status",
            Self::RequestsAcknowledged { .. } => "requests_acknowledged",
            Self::RequestsStatus { .. } => "requests_status",
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Params of the reconciliation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileParams {
    pub ids: Vec<CorrelationId>,
}
