//! End-to-end behavior of `Gateway::ask` against a scripted vendor.

use aigate_foundation::tasks::{GENERATE_QUESTION, SCORE};
use aigate_foundation::{
    CircuitBreakerConfig, FallbackConfig, FallbackStrategy, Gateway, GatewayBuilder, RetryConfig,
};
use aigate_kernel::{ErrorCode, GatewayEvent, ManualClock, ResultSource};
use aigate_testing::{RecordingSink, ScriptedReply, ScriptedVendor, assert_vendor_called};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    gateway: Gateway,
    vendor: ScriptedVendor,
    sink: Arc<RecordingSink>,
}

fn harness(customize: impl FnOnce(GatewayBuilder) -> GatewayBuilder) -> Harness {
    let vendor = ScriptedVendor::new("openai");
    let sink = Arc::new(RecordingSink::new());
    let builder = Gateway::builder()
        .vendor(Arc::new(vendor.clone()))
        .retry(
            RetryConfig::default()
                .with_base_delay(Duration::from_millis(10))
                .with_jitter(false),
        )
        .events(sink.clone())
        .clock(Arc::new(ManualClock::new(1_000)));
    let gateway = customize(builder).build().unwrap();
    Harness {
        gateway,
        vendor,
        sink,
    }
}

fn question(topic: &str) -> Value {
    json!({ "topic": topic })
}

fn completed_source(sink: &RecordingSink) -> Option<ResultSource> {
    sink.events().into_iter().find_map(|event| match event {
        GatewayEvent::RequestCompleted { source, .. } => Some(source),
        _ => None,
    })
}

#[tokio::test(start_paused = true)]
async fn test_retries_transient_failures_until_success() {
    let h = harness(|builder| {
        builder
            .circuit_breaker(CircuitBreakerConfig::default())
            .retry(RetryConfig::default().with_max_attempts(3))
    });
    h.gateway.configure(|config| config.enable_circuit_breaker = false);
    h.vendor.push(ScriptedReply::code("TIMEOUT")).await;
    h.vendor.push(ScriptedReply::code("TIMEOUT")).await;
    h.vendor.push_ok(json!({ "prompt": "X" })).await;

    let out = h.gateway.ask(GENERATE_QUESTION, &question("lifetimes")).await.unwrap();

    assert_eq!(out, json!({ "prompt": "X" }));
    assert_vendor_called!(h.vendor, 3);
    assert_vendor_called!(h.vendor, task = GENERATE_QUESTION);
    assert_eq!(h.sink.count("retry_attempt_failed"), 2);
    assert_eq!(completed_source(&h.sink), Some(ResultSource::Primary));
    assert!(h.gateway.breakers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_request_validation_failure_never_reaches_vendor() {
    let h = harness(|builder| builder);

    let err = h
        .gateway
        .ask(GENERATE_QUESTION, &json!({ "difficulty": "hard" }))
        .await
        .unwrap_err();

    assert_eq!(err.code(), &ErrorCode::ValidationFailed);
    assert!(!err.details().is_empty());
    assert_vendor_called!(h.vendor, 0);
    assert_eq!(h.sink.count("fallback_invoked"), 0);
    assert_eq!(h.sink.names(), vec!["request_started", "request_failed"]);
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_error_goes_straight_to_fallback() {
    let h = harness(|builder| builder);
    h.vendor.set_fallback_reply(ScriptedReply::status(400)).await;

    let out = h.gateway.ask(SCORE, &json!({ "answer": "borrowing" })).await.unwrap();

    assert_eq!(out["degraded"], true);
    assert_eq!(out["score"], json!(5.0));
    assert_vendor_called!(h.vendor, 1);
    assert_eq!(h.sink.count("retry_attempt_failed"), 1);
    assert_eq!(completed_source(&h.sink), Some(ResultSource::Fallback));
}

#[tokio::test(start_paused = true)]
async fn test_cached_result_served_during_outage() {
    let h = harness(|builder| {
        builder
            .retry(RetryConfig::no_retry())
            .fallback(FallbackConfig::default().with_strategy(FallbackStrategy::Cached))
    });
    h.vendor.push_ok(json!({ "prompt": "What is a trait object?" })).await;
    h.vendor.set_fallback_reply(ScriptedReply::Timeout).await;

    let fresh = h.gateway.ask(GENERATE_QUESTION, &question("traits")).await.unwrap();
    assert_eq!(h.gateway.cache().len(), 1);

    let cached = h.gateway.ask(GENERATE_QUESTION, &question("traits")).await.unwrap();
    assert_eq!(cached, fresh);
    assert_vendor_called!(h.vendor, 2);
    assert_eq!(h.gateway.health().cache.hits, 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_fallback_returns_original_error() {
    let h = harness(|builder| {
        builder
            .retry(RetryConfig::no_retry())
            .fallback(FallbackConfig::default().with_strategy(FallbackStrategy::Cached))
    });
    h.vendor.set_fallback_reply(ScriptedReply::Timeout).await;

    let err = h.gateway.ask(GENERATE_QUESTION, &question("macros")).await.unwrap_err();

    assert_eq!(err.code(), &ErrorCode::Timeout);
    let correlation_id = err.correlation_id().unwrap().to_string();
    let names: Vec<&str> = h
        .sink
        .for_correlation_id(&correlation_id)
        .iter()
        .map(GatewayEvent::name)
        .collect();
    assert_eq!(
        names,
        vec![
            "request_started",
            "retry_attempt_failed",
            "fallback_invoked",
            "fallback_failed",
            "request_failed",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_fallback_disabled_surfaces_last_error() {
    let h = harness(|builder| builder.retry(RetryConfig::default().with_max_attempts(2)));
    h.gateway.configure(|config| config.enable_fallback = false);
    h.vendor.set_fallback_reply(ScriptedReply::RateLimited).await;

    let err = h.gateway.ask(GENERATE_QUESTION, &question("async")).await.unwrap_err();

    assert_eq!(err.code(), &ErrorCode::RateLimited);
    assert_eq!(err.status_code(), Some(429));
    assert_vendor_called!(h.vendor, 2);
    assert_eq!(h.sink.count("fallback_invoked"), 0);

    let started = h.sink.events().into_iter().find_map(|event| match event {
        GatewayEvent::RequestStarted { correlation_id, .. } => Some(correlation_id),
        _ => None,
    });
    assert_eq!(started.as_deref(), err.correlation_id());
}

#[tokio::test(start_paused = true)]
async fn test_caching_disabled_leaves_cache_empty() {
    let h = harness(|builder| builder);
    h.gateway.configure(|config| config.enable_caching = false);
    h.vendor.set_fallback_reply(ScriptedReply::Ok(json!({ "prompt": "Y" }))).await;

    h.gateway.ask(GENERATE_QUESTION, &question("closures")).await.unwrap();

    assert!(h.gateway.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fallback_caching_disabled_leaves_cache_empty() {
    let h = harness(|builder| builder.fallback(FallbackConfig::default().with_caching(false)));
    assert!(h.gateway.config().enable_caching);
    h.vendor.set_fallback_reply(ScriptedReply::Ok(json!({ "prompt": "Y" }))).await;

    h.gateway.ask(GENERATE_QUESTION, &question("generics")).await.unwrap();

    assert!(h.gateway.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_every_call_gets_its_own_correlation_id() {
    let h = harness(|builder| builder);
    h.vendor.set_fallback_reply(ScriptedReply::Ok(json!({ "prompt": "Z" }))).await;

    h.gateway.ask(GENERATE_QUESTION, &question("a")).await.unwrap();
    h.gateway.ask(GENERATE_QUESTION, &question("b")).await.unwrap();

    let ids: Vec<String> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            GatewayEvent::RequestStarted { correlation_id, .. } => Some(correlation_id),
            _ => None,
        })
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    for id in &ids {
        assert_eq!(h.sink.for_correlation_id(id).len(), 2);
    }
}

#[tokio::test(start_paused = true)]
async fn test_health_reports_activity_and_reset_clears_it() {
    let h = harness(|builder| builder);
    h.vendor.push(ScriptedReply::Network).await;
    h.vendor.push_ok(json!({ "prompt": "W" })).await;

    h.gateway.ask(GENERATE_QUESTION, &question("iterators")).await.unwrap();

    let health = h.gateway.health();
    assert!(health.available);
    assert_eq!(health.vendors, vec!["openai".to_string()]);
    assert_eq!(health.retry.operations, 1);
    assert_eq!(health.retry.total_retries, 1);
    assert_eq!(health.cache.size, 1);
    assert_eq!(health.circuit_breakers.len(), 1);
    assert_eq!(health.circuit_breakers[0].name, "ai-openai");

    h.gateway.reset_state();
    let health = h.gateway.health();
    assert_eq!(health.retry.operations, 0);
    assert_eq!(health.cache.size, 0);
    assert!(health.circuit_breakers.is_empty());
}
