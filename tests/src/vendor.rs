use aigate_kernel::{VendorAdapter, VendorError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// One scripted vendor response.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    Ok(Value),
    Timeout,
    Network,
    RateLimited,
    /// An SDK-style error, e.g. `{code: "TIMEOUT"}` or a bare HTTP status.
    Api {
        code: Option<String>,
        message: String,
        status: Option<u16>,
    },
}

impl ScriptedReply {
    pub fn code(code: &str) -> Self {
        ScriptedReply::Api {
            code: Some(code.to_string()),
            message: format!("scripted {code}"),
            status: None,
        }
    }

    pub fn status(status: u16) -> Self {
        ScriptedReply::Api {
            code: None,
            message: format!("scripted HTTP {status}"),
            status: Some(status),
        }
    }

    fn into_result(self) -> Result<Value, VendorError> {
        match self {
            ScriptedReply::Ok(value) => Ok(value),
            ScriptedReply::Timeout => Err(VendorError::Timeout("scripted timeout".into())),
            ScriptedReply::Network => Err(VendorError::Network("scripted ECONNRESET".into())),
            ScriptedReply::RateLimited => Err(VendorError::RateLimited("scripted 429".into())),
            ScriptedReply::Api {
                code,
                message,
                status,
            } => Err(VendorError::Api {
                code,
                message,
                status,
            }),
        }
    }
}

/// Vendor adapter that replays a script of replies.
///
/// Queued replies are consumed in order; once the queue is empty every call
/// gets the fallback reply.
#[derive(Clone)]
pub struct ScriptedVendor {
    name: String,
    script: Arc<Mutex<VecDeque<ScriptedReply>>>,
    fallback_reply: Arc<Mutex<ScriptedReply>>,
    latency: Arc<Mutex<Option<Duration>>>,
    call_history: Arc<Mutex<Vec<(String, Value)>>>,
}

impl ScriptedVendor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback_reply: Arc::new(Mutex::new(ScriptedReply::Api {
                code: Some("SCRIPT_EXHAUSTED".to_string()),
                message: "no scripted reply left".to_string(),
                status: None,
            })),
            latency: Arc::new(Mutex::new(None)),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a reply.
    pub async fn push(&self, reply: ScriptedReply) {
        self.script.lock().await.push_back(reply);
    }

    pub async fn push_ok(&self, value: Value) {
        self.push(ScriptedReply::Ok(value)).await;
    }

    /// Reply used once the queue is exhausted.
    pub async fn set_fallback_reply(&self, reply: ScriptedReply) {
        *self.fallback_reply.lock().await = reply;
    }

    /// Sleep this long before answering each call.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.lock().await = Some(latency);
    }

    pub async fn call_count(&self) -> usize {
        self.call_history.lock().await.len()
    }

    pub async fn call_history(&self) -> Vec<(String, Value)> {
        self.call_history.lock().await.clone()
    }

    pub async fn was_called_with(&self, task: &str) -> bool {
        self.call_history
            .lock()
            .await
            .iter()
            .any(|(called, _)| called == task)
    }

    pub async fn clear_history(&self) {
        self.call_history.lock().await.clear();
    }
}

#[async_trait]
impl VendorAdapter for ScriptedVendor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, task: &str, payload: &Value) -> Result<Value, VendorError> {
        self.call_history
            .lock()
            .await
            .push((task.to_string(), payload.clone()));

        let latency = *self.latency.lock().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let next = self.script.lock().await.pop_front();
        let reply = match next {
            Some(reply) => reply,
            None => self.fallback_reply.lock().await.clone(),
        };
        reply.into_result()
    }
}

/// Assert how many times a [`ScriptedVendor`] was called, optionally with a
/// specific task.
#[macro_export]
macro_rules! assert_vendor_called {
    ($vendor:expr, task = $task:expr) => {
        assert!(
            $vendor.was_called_with($task).await,
            "Expected vendor to be called with task '{}'",
            $task
        );
    };
    ($vendor:expr, $count:expr) => {
        assert_eq!(
            $vendor.call_count().await,
            $count,
            "Expected vendor to be called {} times, but was called {} times",
            $count,
            $vendor.call_count().await
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigate_kernel::{ErrorCode, NormalizedError};
    use serde_json::json;

    #[tokio::test]
    async fn test_replays_script_in_order() {
        let vendor = ScriptedVendor::new("openai");
        vendor.push(ScriptedReply::code("TIMEOUT")).await;
        vendor.push_ok(json!({ "prompt": "X" })).await;

        let err = NormalizedError::from(vendor.call("score", &json!({})).await.unwrap_err());
        assert_eq!(err.code(), &ErrorCode::Timeout);
        assert_eq!(
            vendor.call("score", &json!({})).await.unwrap(),
            json!({ "prompt": "X" })
        );
        assert_vendor_called!(vendor, 2);
        assert_vendor_called!(vendor, task = "score");
    }

    #[tokio::test]
    async fn test_exhausted_script_uses_fallback_reply() {
        let vendor = ScriptedVendor::new("openai");
        vendor.set_fallback_reply(ScriptedReply::status(503)).await;

        let err = NormalizedError::from(vendor.call("score", &json!({})).await.unwrap_err());
        assert_eq!(err.code(), &ErrorCode::ExternalServiceError);
        assert_eq!(err.status_code(), Some(503));
    }

    #[tokio::test]
    async fn test_records_history() {
        let vendor = ScriptedVendor::new("anthropic");
        vendor.set_fallback_reply(ScriptedReply::Ok(json!({}))).await;
        vendor.call("summarize", &json!({ "text": "a" })).await.unwrap();

        let history = vendor.call_history().await;
        assert_eq!(history, vec![("summarize".to_string(), json!({ "text": "a" }))]);

        vendor.clear_history().await;
        assert_vendor_called!(vendor, 0);
        assert_eq!(vendor.name(), "anthropic");
    }
}
