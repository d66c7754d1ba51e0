//! Error classification: decides whether a failure is worth another attempt.

use aigate_kernel::{ErrorCode, NormalizedError};
use std::collections::HashSet;

/// Message fragments that mark a failure as transient.
const TRANSIENT_KEYWORDS: [&str; 5] = ["timeout", "network", "unavailable", "econnreset", "econnrefused"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub code: ErrorCode,
    pub retryable: bool,
}

/// Classify `error` against the configured `retryable_codes`.
///
/// Rules, first match wins:
/// 1. an explicit `retryable` flag on the error
/// 2. validation codes are never retried
/// 3. status 5xx or 429
/// 4. code listed in `retryable_codes`
/// 5. a transient keyword in the message (case-insensitive)
pub fn classify(error: &NormalizedError, retryable_codes: &HashSet<String>) -> Classification {
    let code = error.code().clone();
    let retryable = match error.retryable() {
        Some(flag) => flag,
        None if code.is_validation() => false,
        None => {
            matches!(error.status_code(), Some(500..=599) | Some(429))
                || retryable_codes.contains(code.as_str())
                || mentions_transient(error.message())
        }
    };
    Classification { code, retryable }
}

pub fn is_retryable(error: &NormalizedError, retryable_codes: &HashSet<String>) -> bool {
    classify(error, retryable_codes).retryable
}

fn mentions_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_KEYWORDS.iter().any(|kw| lower.contains(kw))
}
