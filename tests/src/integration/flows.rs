//! # Request Lifecycle Flows
//!
//! Dispatch, pending tracking and completion across the dispatcher, the
//! pending tracker and the push bus.
//!
//! ## Flows Tested:
//!
//! 1. **Mixed batch**: sync success, sync error and pending in one round trip
//! 2. **Push completion**: acknowledged once, delivered once, redelivery is a no-op
//! 3. **Reconnect**: a new transport identity resubscribes and republishes status
//! 4. **Reconciliation**: a missed push is recovered by polling
//! 5. **Push / poll race**: whichever arrives first wins, the other is dropped

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{completion, eventually, Fixture, CHANNEL};
    use client_runtime::ClientConfig;
    use rc_03_request_dispatcher::{PendingHandlers, RequestEnvelope};
    use rc_04_pending_tracker::{ConnectOutcome, MessageOutcome};
    use serde_json::json;
    use shared_bus::{ChannelEvent, ConnectEvent};
    use shared_types::{CorrelationId, PushMessage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn create_params() -> serde_json::Value {
        json!({"username": "bob", "password": "pw"})
    }

    fn completed(id: &str, success: bool, result: serde_json::Value) -> serde_json::Value {
        json!({
            "action": "requests_completed",
            "requests": { id: completion(success, result) }
        })
    }

    // =============================================================================
    // DISPATCH
    // =============================================================================

    #[tokio::test]
    async fn test_mixed_batch_outcomes() {
        let f = Fixture::new();
        f.transport
            .push_reply(json!([{"result": 1}, {"id": "r1"}, {"error": "bad"}]));

        let summary = f
            .client
            .send_batch(vec![
                f.recorded("a", "createAccount", create_params()),
                f.recorded("b", "createAccount", create_params()),
                f.recorded("c", "createAccount", create_params()),
            ])
            .await;

        assert_eq!(f.log(), vec!["a:ok:1", "c:err:bad"]);
        assert_eq!(summary.pending_ids, vec![CorrelationId::from("r1")]);
        assert!(f.client.session().pending().contains(&"r1".into()));
        assert_eq!(
            f.transport.sent()[0].session.as_ref().map(|s| s.as_str()),
            Some("s1")
        );
    }

    #[tokio::test]
    async fn test_validation_before_dispatch() {
        let mut config = ClientConfig::default();
        config.validation.before_dispatch = true;
        let f = Fixture::with_config(config);
        f.transport.push_reply(json!([{"id": "r1"}]));

        let summary = f
            .client
            .send_batch(vec![
                f.recorded("bad", "createAccount", json!({"username": "bob"})),
                f.recorded("good", "createAccount", create_params()),
            ])
            .await;

        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(f.transport.sent()[0].calls.len(), 1);
        assert!(f.log()[0].starts_with("bad:err:invalid params"));
    }

    // =============================================================================
    // PUSH COMPLETION
    // =============================================================================

    #[tokio::test]
    async fn test_push_completion_delivered_once() {
        let f = Fixture::new();
        let tracker = f.client.tracker();
        f.transport.push_reply(json!([{"id": "r1"}]));
        f.client
            .send(f.recorded("a", "createAccount", create_params()))
            .await;
        tracker
            .handle_connect(&ConnectEvent::connected("c1"))
            .await
            .unwrap();

        let first = tracker
            .handle_message(completed("r1", true, json!({"id": 7})))
            .await;
        let second = tracker
            .handle_message(completed("r1", true, json!({"id": 7})))
            .await;

        assert!(matches!(first, MessageOutcome::Completed(ref records) if records.len() == 1));
        assert!(matches!(second, MessageOutcome::Completed(ref records) if records.is_empty()));
        assert_eq!(f.log(), vec![r#"a:ok:{"id":7}"#]);
        assert!(f.client.session().pending().is_empty());

        let acks = f.bus.published_actions("requests_acknowledged");
        assert_eq!(acks.len(), 2);
        assert!(acks.iter().all(|ack| ack["ids"] == json!(["r1"])));
    }

    #[tokio::test]
    async fn test_failed_push_completion() {
        let f = Fixture::new();
        f.transport.push_reply(json!([{"id": "r1"}]));
        f.client
            .send(f.recorded("a", "createAccount", create_params()))
            .await;

        f.client
            .tracker()
            .handle_message(completed(
                "r1",
                false,
                json!({"insufficient": {"code": 3, "message": "quota"}}),
            ))
            .await;

        let log = f.log();
        assert_eq!(log.len(), 1);
        assert!(log[0].starts_with("a:err:insufficientResources exception raised as 'insufficient'"));
    }

    #[tokio::test]
    async fn test_interim_status_then_completion() {
        let f = Fixture::new();
        f.transport.push_reply(json!([{"id": "r1"}]));
        f.client
            .send(f.recorded("a", "createAccount", create_params()))
            .await;
        let tracker = f.client.tracker();

        tracker
            .handle_message(json!({"action": "request_interim_status", "requestId": "r1", "status": "queued"}))
            .await;
        tracker.handle_message(completed("r1", true, json!(1))).await;

        assert_eq!(f.log(), vec![r#"a:status:"queued""#, "a:ok:1"]);
    }

    #[tokio::test]
    async fn test_session_handlers_receive_untracked_callbacks() {
        let f = Fixture::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        f.client
            .set_pending_handlers(PendingHandlers::new().on_pending_success(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        f.transport.push_reply(json!([{"id": "r1"}]));
        f.client
            .send(RequestEnvelope::new("Accounts", "createAccount", create_params()))
            .await;

        f.client
            .tracker()
            .handle_message(completed("r1", true, json!(1)))
            .await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_logout_drops_pending() {
        let f = Fixture::new();
        f.transport.push_reply(json!([{"id": "r1"}]));
        f.client
            .send(f.recorded("a", "createAccount", create_params()))
            .await;

        f.client.logout().await;
        f.client
            .tracker()
            .handle_message(completed("r1", true, json!(1)))
            .await;

        assert!(f.log().is_empty());
    }

    // =============================================================================
    // RECONNECT
    // =============================================================================

    #[tokio::test]
    async fn test_reconnect_with_new_identity() {
        let f = Fixture::new();
        f.transport.push_reply(json!([{"id": "r1"}, {"id": "r2"}]));
        f.client
            .send_batch(vec![
                f.recorded("a", "createAccount", create_params()),
                f.recorded("b", "createAccount", create_params()),
            ])
            .await;
        let tracker = f.client.tracker();

        tracker
            .handle_connect(&ConnectEvent::connected("c1"))
            .await
            .unwrap();
        for _ in 0..3 {
            assert_eq!(
                tracker
                    .handle_connect(&ConnectEvent::connected("c1"))
                    .await
                    .unwrap(),
                ConnectOutcome::Unchanged
            );
        }
        let subscribes_before = f.bus.subscribe_calls();
        let status_before = f.bus.published_actions("requests_status").len();

        tracker
            .handle_connect(&ConnectEvent::connected("c2"))
            .await
            .unwrap();

        assert_eq!(f.bus.subscribe_calls(), subscribes_before + 1);
        let status = f.bus.published_actions("requests_status");
        assert_eq!(status.len(), status_before + 1);
        assert_eq!(status.last().unwrap()["ids"], json!(["r1", "r2"]));
    }

    // =============================================================================
    // RECONCILIATION
    // =============================================================================

    #[tokio::test]
    async fn test_reconcile_recovers_missed_push() {
        let f = Fixture::new();
        f.transport.push_reply(json!([{"id": "r1"}]));
        f.client
            .send(f.recorded("a", "createAccount", create_params()))
            .await;

        let mut record = completion(true, json!(5));
        record["id"] = json!("r1");
        f.transport.push_reply(json!([{"result": [record]}]));

        let applied = f.client.reconcile().await.unwrap();

        assert_eq!(applied.len(), 1);
        assert_eq!(f.log(), vec!["a:ok:5"]);
        assert!(f.bus.published_actions("requests_acknowledged").is_empty());
        let call = &f.transport.sent()[1].calls[0];
        assert_eq!((call.service.as_str(), call.method.as_str()), ("CP", "getPendingResults"));
    }

    #[tokio::test]
    async fn test_push_after_poll_is_dropped() {
        let f = Fixture::new();
        f.transport.push_reply(json!([{"id": "r1"}]));
        f.client
            .send(f.recorded("a", "createAccount", create_params()))
            .await;

        let mut record = completion(true, json!(5));
        record["id"] = json!("r1");
        f.transport.push_reply(json!([{"result": [record]}]));
        f.client.reconcile().await.unwrap();

        f.client
            .tracker()
            .handle_message(completed("r1", true, json!(5)))
            .await;

        assert_eq!(f.log(), vec!["a:ok:5"]);
        assert_eq!(f.bus.published_actions("requests_acknowledged").len(), 1);
    }

    // =============================================================================
    // EVENT LOOP
    // =============================================================================

    #[tokio::test]
    async fn test_spawned_tracker_over_push_bus() {
        let f = Fixture::new();
        f.transport.push_reply(json!([{"id": "r1"}]));
        f.client
            .send(f.recorded("a", "createAccount", create_params()))
            .await;

        let handle = f.client.spawn_tracker(f.bus.listen());
        f.bus.connect(ConnectEvent::connected("c1"));
        assert!(eventually(|| f.bus.is_subscribed(CHANNEL)).await);

        f.bus.deliver(CHANNEL, completed("r1", true, json!(1)));
        assert!(eventually(|| f.log() == vec!["a:ok:1".to_string()]).await);

        f.bus.disconnect();
        assert!(eventually(|| !f.bus.is_subscribed(CHANNEL)).await);
        handle.abort();
    }

    #[tokio::test]
    async fn test_tracker_over_mpsc_channel() {
        let f = Fixture::new();
        f.transport.push_reply(json!([{"id": "r1"}]));
        f.client
            .send(f.recorded("a", "createAccount", create_params()))
            .await;
        let (tx, rx) = tokio::sync::mpsc::channel(4);

        tx.send(ChannelEvent::Connect(ConnectEvent::connected("c1")))
            .await
            .unwrap();
        tx.send(ChannelEvent::Message {
            channel: CHANNEL.into(),
            data: PushMessage::RequestInterimStatus {
                request_id: "r1".into(),
                status: json!(50),
            }
            .to_value(),
        })
        .await
        .unwrap();
        drop(tx);

        f.client.tracker().run_channel(rx).await;

        assert_eq!(f.log(), vec!["a:status:50"]);
        assert!(f.client.session().pending().contains(&"r1".into()));
    }
}
