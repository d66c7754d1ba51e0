//! Circuit breaker behavior as seen through the gateway.

use aigate_foundation::tasks::GENERATE_QUESTION;
use aigate_foundation::{
    CircuitBreakerConfig, FallbackConfig, FallbackStrategy, Gateway, RetryConfig, State,
};
use aigate_kernel::{ErrorCode, GatewayEvent, ManualClock};
use aigate_testing::{RecordingSink, ScriptedReply, ScriptedVendor, assert_vendor_called};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

const BREAKER: &str = "ai-openai";

struct Harness {
    gateway: Gateway,
    vendor: ScriptedVendor,
    sink: Arc<RecordingSink>,
    clock: Arc<ManualClock>,
}

fn harness(breaker: CircuitBreakerConfig, retry: RetryConfig) -> Harness {
    let vendor = ScriptedVendor::new("openai");
    let sink = Arc::new(RecordingSink::new());
    let clock = Arc::new(ManualClock::new(10_000));
    let gateway = Gateway::builder()
        .vendor(Arc::new(vendor.clone()))
        .circuit_breaker(breaker)
        .retry(retry)
        .fallback(FallbackConfig::default().with_strategy(FallbackStrategy::Mock))
        .events(sink.clone())
        .clock(clock.clone())
        .build()
        .unwrap();
    Harness {
        gateway,
        vendor,
        sink,
        clock,
    }
}

fn question() -> Value {
    json!({ "topic": "traits" })
}

fn breaker_state(gateway: &Gateway) -> State {
    gateway.breakers().get_or_create(BREAKER).state()
}

/// Two failures with threshold 2 and no retries open the circuit.
async fn trip(h: &Harness) {
    h.vendor.set_fallback_reply(ScriptedReply::Timeout).await;
    for _ in 0..2 {
        h.gateway.ask(GENERATE_QUESTION, &question()).await.unwrap();
    }
    assert_eq!(breaker_state(&h.gateway), State::Open);
}

#[tokio::test(start_paused = true)]
async fn test_open_circuit_serves_mock_without_calling_vendor() {
    let h = harness(
        CircuitBreakerConfig::default().with_failure_threshold(2),
        RetryConfig::no_retry(),
    );
    trip(&h).await;
    assert_vendor_called!(h.vendor, 2);

    let out = h.gateway.ask(GENERATE_QUESTION, &question()).await.unwrap();

    assert_eq!(out["prompt"], "Explain the key ideas behind traits.");
    assert_vendor_called!(h.vendor, 2);
    assert_eq!(h.sink.count("circuit_open_rejected"), 1);
    let health = h.gateway.health();
    assert!(!health.available);
    assert_eq!(health.circuit_breakers[0].rejected_requests, 1);
    assert_eq!(health.circuit_breakers[0].total_requests, 3);

    let retry_after = h.sink.events().into_iter().find_map(|event| match event {
        GatewayEvent::CircuitOpenRejected { retry_after_ms, .. } => retry_after_ms,
        _ => None,
    });
    assert_eq!(retry_after, Some(60_000));
}

#[tokio::test(start_paused = true)]
async fn test_opening_mid_retry_stops_the_loop() {
    let h = harness(
        CircuitBreakerConfig::default().with_failure_threshold(2),
        RetryConfig::default()
            .with_max_attempts(5)
            .with_base_delay(Duration::from_millis(10))
            .with_jitter(false),
    );
    h.gateway.configure(|config| config.enable_fallback = false);
    h.vendor.set_fallback_reply(ScriptedReply::code("TIMEOUT")).await;

    let err = h.gateway.ask(GENERATE_QUESTION, &question()).await.unwrap_err();

    assert_eq!(err.code(), &ErrorCode::ServiceUnavailable);
    assert_eq!(err.retryable(), Some(false));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(60)));
    assert_vendor_called!(h.vendor, 2);
    assert_eq!(h.sink.count("retry_attempt_failed"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_recovers_through_half_open() {
    let h = harness(
        CircuitBreakerConfig::default().with_failure_threshold(2),
        RetryConfig::no_retry(),
    );
    trip(&h).await;

    h.clock.advance(Duration::from_secs(60));
    h.vendor
        .set_fallback_reply(ScriptedReply::Ok(json!({ "prompt": "back online" })))
        .await;

    let out = h.gateway.ask(GENERATE_QUESTION, &question()).await.unwrap();
    assert_eq!(out["prompt"], "back online");
    assert_eq!(breaker_state(&h.gateway), State::HalfOpen);

    h.gateway.ask(GENERATE_QUESTION, &question()).await.unwrap();
    assert_eq!(breaker_state(&h.gateway), State::Closed);

    let transitions: Vec<(String, String)> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            GatewayEvent::CircuitStateChanged { from, to, .. } => Some((from, to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            ("closed".to_string(), "open".to_string()),
            ("open".to_string(), "half-open".to_string()),
            ("half-open".to_string(), "closed".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_probe_reopens_circuit() {
    let h = harness(
        CircuitBreakerConfig::default().with_failure_threshold(2),
        RetryConfig::no_retry(),
    );
    trip(&h).await;

    h.clock.advance(Duration::from_secs(60));
    h.gateway.ask(GENERATE_QUESTION, &question()).await.unwrap();

    let stats = h.gateway.breakers().get_or_create(BREAKER).stats();
    assert_eq!(stats.state, State::Open);
    assert_eq!(stats.open_count, 2);
    assert_eq!(stats.next_attempt_at, Some(10_000 + 60_000 + 60_000));
    assert_vendor_called!(h.vendor, 3);
}

#[tokio::test(start_paused = true)]
async fn test_half_open_admits_a_single_probe() {
    let h = harness(
        CircuitBreakerConfig::default()
            .with_failure_threshold(2)
            .with_success_threshold(1),
        RetryConfig::no_retry(),
    );
    trip(&h).await;

    h.clock.advance(Duration::from_secs(60));
    h.vendor
        .set_fallback_reply(ScriptedReply::Ok(json!({ "prompt": "probe" })))
        .await;
    h.vendor.set_latency(Duration::from_millis(100)).await;

    let payload = question();
    let (probe, rejected) = tokio::join!(
        h.gateway.ask(GENERATE_QUESTION, &payload),
        h.gateway.ask(GENERATE_QUESTION, &payload),
    );

    assert_eq!(probe.unwrap()["prompt"], "probe");
    assert_eq!(
        rejected.unwrap()["prompt"],
        "Explain the key ideas behind traits."
    );
    assert_vendor_called!(h.vendor, 3);
    assert_eq!(breaker_state(&h.gateway), State::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_reset_state_closes_circuit() {
    let h = harness(
        CircuitBreakerConfig::default().with_failure_threshold(2),
        RetryConfig::no_retry(),
    );
    trip(&h).await;
    assert!(!h.gateway.health().available);

    h.gateway.reset_state();

    assert!(h.gateway.health().available);
    assert_eq!(breaker_state(&h.gateway), State::Closed);
}
