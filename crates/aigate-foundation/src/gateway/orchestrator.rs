//! Gateway Orchestrator
//!
//! Composes the layers for one `ask(task, payload)` call:
//!
//! ```text
//! validate request ──► breaker fast-path ──► retry( breaker( vendor call + validate response ) )
//!        │                    │                              │
//!      fatal            circuit open                    any failure
//!                             └──────────► fallback resolver ◄┘
//! ```
//!
//! Request validation failures are fatal. Every other terminal failure is
//! offered to the fallback resolver; if fallback is disabled or fails, the
//! caller receives the original error tagged with the call's correlation ID.

use aigate_kernel::{
    Clock, EventSink, GatewayEvent, GatewayResult, NormalizedError, ResultSource, SchemaValidator,
    SystemClock, VendorAdapter, normalize_error,
};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use super::config::GatewayConfig;
use super::health::HealthReport;
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry};
use crate::fallback::{FallbackConfig, FallbackResolver, ResultCache, cache::DEFAULT_MAX_SIZE};
use crate::logging::TracingEventSink;
use crate::retry::{RetryConfig, RetryExecutor, RetryStats};
use crate::tasks::{TaskRegistry, input_schema_id, output_schema_id};
use crate::validation::JsonSchemaValidator;

pub struct Gateway {
    config: RwLock<GatewayConfig>,
    vendors: HashMap<String, Arc<dyn VendorAdapter>>,
    tasks: Arc<TaskRegistry>,
    validator: Arc<dyn SchemaValidator>,
    breakers: CircuitBreakerRegistry,
    retry: RetryExecutor,
    fallback: FallbackConfig,
    cache: Arc<ResultCache>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Run `task` with `payload` through the full resilience pipeline.
    pub async fn ask(&self, task: &str, payload: &Value) -> GatewayResult<Value> {
        let config = self.config();
        let correlation_id = Uuid::new_v4().to_string();
        let span = info_span!("aigate.ask", task, correlation_id = %correlation_id, vendor = %config.vendor);
        self.run(&config, task, payload, &correlation_id)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        config: &GatewayConfig,
        task: &str,
        payload: &Value,
        correlation_id: &str,
    ) -> GatewayResult<Value> {
        let started = Instant::now();
        self.events.emit(&GatewayEvent::RequestStarted {
            correlation_id: correlation_id.to_string(),
            task: task.to_string(),
            vendor: config.vendor.clone(),
        });

        if config.enable_validation {
            if let Err(err) = self.validate_request(task, payload) {
                return Err(self.fail(task, correlation_id, err));
            }
        }

        let Some(vendor) = self.vendors.get(&config.vendor).cloned() else {
            let err = NormalizedError::service_unavailable(
                format!("no vendor adapter registered as '{}'", config.vendor),
                None,
            );
            return Err(self.fail(task, correlation_id, err));
        };

        let resolver = self.resolver(config);
        let breaker = config
            .enable_circuit_breaker
            .then(|| self.breakers.get_or_create(&config.breaker_key()));

        if let Some(breaker) = &breaker {
            if !breaker.is_available() {
                breaker.record_rejection();
                let now = self.clock.now_millis();
                let retry_after = breaker
                    .stats()
                    .next_attempt_at
                    .map(|next| Duration::from_millis(next.saturating_sub(now)));
                self.events.emit(&GatewayEvent::CircuitOpenRejected {
                    correlation_id: correlation_id.to_string(),
                    task: task.to_string(),
                    breaker: breaker.name().to_string(),
                    retry_after_ms: retry_after.map(|d| d.as_millis() as u64),
                });
                let cause = NormalizedError::service_unavailable(
                    format!("circuit '{}' is open", breaker.name()),
                    retry_after,
                );
                return self.recover(config, &resolver, task, payload, cause, correlation_id, started);
            }
        }

        let primary = self
            .call_primary(config, vendor.as_ref(), breaker.as_deref(), task, payload, correlation_id)
            .await;

        match primary {
            Ok(result) => {
                resolver.cache_result(task, payload, &result, Some(correlation_id));
                self.completed(task, correlation_id, ResultSource::Primary, started);
                Ok(result)
            }
            Err(err) => self.recover(config, &resolver, task, payload, err, correlation_id, started),
        }
    }

    fn validate_request(&self, task: &str, payload: &Value) -> GatewayResult<()> {
        if !self.tasks.contains(task) {
            return Err(NormalizedError::validation_failed(
                format!("unknown task '{task}'"),
                Vec::new(),
            ));
        }
        self.validator
            .validate(&input_schema_id(task), payload)
            .map_err(|err| NormalizedError::validation_failed(err.to_string(), err.details))
    }

    /// One breaker-guarded vendor call per attempt, retried as a whole.
    async fn call_primary(
        &self,
        config: &GatewayConfig,
        vendor: &dyn VendorAdapter,
        breaker: Option<&CircuitBreaker>,
        task: &str,
        payload: &Value,
        correlation_id: &str,
    ) -> GatewayResult<Value> {
        let validate_response = config.enable_validation;
        let attempt = || async move {
            let call = || async {
                let raw = vendor.call(task, payload).await.map_err(normalize_error)?;
                if validate_response {
                    self.validator
                        .validate(&output_schema_id(task), &raw)
                        .map_err(normalize_error)?;
                }
                Ok(raw)
            };
            match breaker {
                Some(breaker) => breaker.execute(call).await,
                None => call().await,
            }
        };

        if config.enable_retry {
            self.retry
                .run(Some(correlation_id), attempt)
                .await
                .map(|outcome| outcome.result)
        } else {
            attempt().await
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn recover(
        &self,
        config: &GatewayConfig,
        resolver: &FallbackResolver,
        task: &str,
        payload: &Value,
        cause: NormalizedError,
        correlation_id: &str,
        started: Instant,
    ) -> GatewayResult<Value> {
        let cause = cause.with_correlation_id(correlation_id);
        if !config.enable_fallback {
            return Err(self.fail(task, correlation_id, cause));
        }

        self.events.emit(&GatewayEvent::FallbackInvoked {
            correlation_id: correlation_id.to_string(),
            task: task.to_string(),
            strategy: resolver.config().strategy.to_string(),
            cause: cause.code().to_string(),
        });

        match resolver.handle(task, payload, cause.clone()) {
            Ok(result) => {
                self.completed(task, correlation_id, ResultSource::Fallback, started);
                Ok(result)
            }
            Err(fallback_error) => {
                if fallback_error != cause {
                    self.events.emit(&GatewayEvent::FallbackFailed {
                        correlation_id: correlation_id.to_string(),
                        task: task.to_string(),
                        primary_error: cause.to_string(),
                        fallback_error: fallback_error.to_string(),
                    });
                }
                Err(self.fail(task, correlation_id, cause))
            }
        }
    }

    fn completed(&self, task: &str, correlation_id: &str, source: ResultSource, started: Instant) {
        self.events.emit(&GatewayEvent::RequestCompleted {
            correlation_id: correlation_id.to_string(),
            task: task.to_string(),
            source,
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
    }

    fn fail(&self, task: &str, correlation_id: &str, err: NormalizedError) -> NormalizedError {
        let err = err.with_correlation_id(correlation_id);
        self.events.emit(&GatewayEvent::RequestFailed {
            correlation_id: correlation_id.to_string(),
            task: task.to_string(),
            code: err.code().to_string(),
            message: err.message().to_string(),
        });
        err
    }

    fn resolver(&self, config: &GatewayConfig) -> FallbackResolver {
        let fallback = FallbackConfig {
            enable_caching: self.fallback.enable_caching && config.enable_caching,
            ..self.fallback.clone()
        };
        FallbackResolver::new(fallback, Arc::clone(&self.cache), Arc::clone(&self.tasks))
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> GatewayConfig {
        self.config.read().clone()
    }

    /// Update the configuration in place; calls already running keep the
    /// snapshot they started with. Returns the new configuration.
    pub fn configure(&self, update: impl FnOnce(&mut GatewayConfig)) -> GatewayConfig {
        let mut config = self.config.write();
        update(&mut config);
        info!(config = ?*config, "Gateway configuration updated");
        config.clone()
    }

    pub fn health(&self) -> HealthReport {
        let config = self.config();
        let vendor_registered = self.vendors.contains_key(&config.vendor);
        let circuit_open = config.enable_circuit_breaker
            && self
                .breakers
                .get(&config.breaker_key())
                .is_some_and(|breaker| !breaker.is_available());
        let mut vendors: Vec<String> = self.vendors.keys().cloned().collect();
        vendors.sort();

        HealthReport {
            available: vendor_registered && !circuit_open,
            vendors,
            circuit_breakers: self.breakers.stats(),
            retry: self.retry.stats().snapshot(),
            cache: self.cache.stats(),
            config,
        }
    }

    /// Drop all breakers, retry statistics and cached results.
    pub fn reset_state(&self) {
        self.breakers.clear();
        self.retry.stats().reset();
        self.cache.clear();
        info!("Gateway state reset");
    }

    pub fn breakers(&self) -> &CircuitBreakerRegistry {
        &self.breakers
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }
}

/// Builder for [`Gateway`].
pub struct GatewayBuilder {
    config: GatewayConfig,
    vendors: HashMap<String, Arc<dyn VendorAdapter>>,
    tasks: TaskRegistry,
    validator: Option<Arc<dyn SchemaValidator>>,
    circuit_breaker: CircuitBreakerConfig,
    breaker_overrides: HashMap<String, CircuitBreakerConfig>,
    retry: RetryConfig,
    fallback: FallbackConfig,
    cache_max_size: usize,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
            vendors: HashMap::new(),
            tasks: TaskRegistry::builtin(),
            validator: None,
            circuit_breaker: CircuitBreakerConfig::default(),
            breaker_overrides: HashMap::new(),
            retry: RetryConfig::default(),
            fallback: FallbackConfig::default(),
            cache_max_size: DEFAULT_MAX_SIZE,
            events: Arc::new(TracingEventSink),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a vendor adapter under its own name.
    pub fn vendor(mut self, vendor: Arc<dyn VendorAdapter>) -> Self {
        self.vendors.insert(vendor.name().to_string(), vendor);
        self
    }

    pub fn tasks(mut self, tasks: TaskRegistry) -> Self {
        self.tasks = tasks;
        self
    }

    /// Replace the JSON Schema validator built from the task registry.
    pub fn validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    pub fn breaker_override(mut self, name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        self.breaker_overrides.insert(name.into(), config);
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn fallback(mut self, config: FallbackConfig) -> Self {
        self.fallback = config;
        self
    }

    pub fn cache_max_size(mut self, max_size: usize) -> Self {
        self.cache_max_size = max_size;
        self
    }

    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Fails only if a task schema does not compile.
    pub fn build(self) -> GatewayResult<Gateway> {
        let tasks = Arc::new(self.tasks);
        let validator: Arc<dyn SchemaValidator> = match self.validator {
            Some(validator) => validator,
            None => Arc::new(JsonSchemaValidator::for_tasks(&tasks).map_err(NormalizedError::from)?),
        };

        let breakers = self.breaker_overrides.into_iter().fold(
            CircuitBreakerRegistry::with_clock(
                self.circuit_breaker,
                Arc::clone(&self.clock),
                Arc::clone(&self.events),
            ),
            |registry, (name, config)| registry.with_override(name, config),
        );
        let retry = RetryExecutor::new(self.retry)
            .with_stats(Arc::new(RetryStats::new()))
            .with_events(Arc::clone(&self.events))
            .with_clock(Arc::clone(&self.clock));
        let cache = Arc::new(ResultCache::with_clock(
            self.cache_max_size,
            self.fallback.cache_ttl,
            Arc::clone(&self.clock),
        ));

        Ok(Gateway {
            config: RwLock::new(self.config),
            vendors: self.vendors,
            tasks,
            validator,
            breakers,
            retry,
            fallback: self.fallback,
            cache,
            events: self.events,
            clock: self.clock,
        })
    }
}
