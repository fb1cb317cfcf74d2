//! Shared fixtures: an [`RpcClient`] over in-memory transports.

use client_runtime::{ClientConfig, RpcClient};
use parking_lot::Mutex;
use rc_01_type_registry::test_utils::accounts_registry;
use rc_03_request_dispatcher::{MemoryDiagnostics, RequestEnvelope, ScriptedTransport};
use serde_json::{json, Value};
use shared_bus::InMemoryPushBus;
use shared_types::SessionId;
use std::sync::Arc;
use std::time::Duration;

/// Session used by every fixture.
pub const SESSION: &str = "s1";

/// Private channel of [`SESSION`].
pub const CHANNEL: &str = "/private/s1";

pub struct Fixture {
    pub client: RpcClient,
    pub transport: Arc<ScriptedTransport>,
    pub bus: Arc<InMemoryPushBus>,
    pub diagnostics: Arc<MemoryDiagnostics>,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let transport = Arc::new(ScriptedTransport::new());
        let bus = Arc::new(InMemoryPushBus::new());
        let diagnostics = Arc::new(MemoryDiagnostics::new());
        let registry = accounts_registry().expect("fixture schema");

        let client = RpcClient::builder(config, transport.clone(), bus.clone())
            .schema(registry)
            .diagnostics(diagnostics.clone())
            .build()
            .expect("fixture client");
        client.login(SessionId::new(SESSION));

        Self {
            client,
            transport,
            bus,
            diagnostics,
            log: Arc::default(),
        }
    }

    /// Envelope whose callbacks append `name:kind:payload` to the log.
    pub fn recorded(&self, name: &str, method: &str, params: Value) -> RequestEnvelope {
        let (ok, err, status) = (self.log.clone(), self.log.clone(), self.log.clone());
        let (n1, n2, n3) = (name.to_string(), name.to_string(), name.to_string());
        RequestEnvelope::new("Accounts", method, params)
            .on_success(move |_, result| {
                ok.lock().push(format!("{}:ok:{}", n1, result));
                Ok(())
            })
            .on_error(move |_, error| {
                err.lock().push(format!("{}:err:{}", n2, error));
                Ok(())
            })
            .on_status(move |_, value| {
                status.lock().push(format!("{}:status:{}", n3, value));
                Ok(())
            })
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Server-side completion record for `createAccount`.
pub fn completion(success: bool, result: Value) -> Value {
    json!({
        "request": {
            "serviceName": "Accounts",
            "methodName": "createAccount",
            "paramsJSON": "{\"username\":\"bob\",\"password\":\"pw\"}"
        },
        "success": success,
        "resultJSON": result.to_string()
    })
}

/// Poll `condition` until it holds or a second passes.
pub async fn eventually<F>(condition: F) -> bool
where
    F: Fn() -> bool,
{
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
