//! Built-in tasks: schemas plus mock and degraded producers.
//!
//! Every producer here is pure and total: missing optional fields fall back to
//! defaults, so the fallback resolver can always answer for a payload that
//! passed input validation.

use aigate_kernel::GatewayResult;
use serde_json::{Value, json};
use std::sync::Arc;

use super::TaskDefinition;

pub const GENERATE_QUESTION: &str = "generate-question";
pub const SCORE: &str = "score";
pub const SUMMARIZE: &str = "summarize";
pub const ANALYZE: &str = "analyze";

/// Text placed in free-text fields of degraded results.
pub const DEGRADED_NOTICE: &str =
    "The AI service is temporarily unavailable; this is a degraded placeholder result.";

const DEFAULT_MAX_SCORE: f64 = 10.0;
const DEFAULT_SUMMARY_LENGTH: usize = 200;
/// Answers at least this many words long get full marks from the mock scorer.
const MOCK_FULL_MARKS_WORDS: usize = 50;

pub(super) fn definitions() -> Vec<TaskDefinition> {
    vec![
        TaskDefinition::new(
            GENERATE_QUESTION,
            json!({
                "type": "object",
                "required": ["topic"],
                "properties": {
                    "topic": { "type": "string", "minLength": 1 },
                    "difficulty": { "enum": ["easy", "medium", "hard"] },
                    "format": { "enum": ["open", "multiple-choice"] }
                }
            }),
            json!({
                "type": "object",
                "required": ["prompt"],
                "properties": {
                    "prompt": { "type": "string", "minLength": 1 },
                    "difficulty": { "type": "string" },
                    "options": { "type": "array", "items": { "type": "string" } },
                    "degraded": { "type": "boolean" }
                }
            }),
            Arc::new(mock_generate_question),
            Arc::new(degraded_generate_question),
        ),
        TaskDefinition::new(
            SCORE,
            json!({
                "type": "object",
                "required": ["answer"],
                "properties": {
                    "question": { "type": "string" },
                    "answer": { "type": "string" },
                    "max_score": { "type": "number", "exclusiveMinimum": 0 }
                }
            }),
            json!({
                "type": "object",
                "required": ["score", "max_score", "feedback"],
                "properties": {
                    "score": { "type": "number", "minimum": 0 },
                    "max_score": { "type": "number" },
                    "feedback": { "type": "string" },
                    "degraded": { "type": "boolean" }
                }
            }),
            Arc::new(mock_score),
            Arc::new(degraded_score),
        ),
        TaskDefinition::new(
            SUMMARIZE,
            json!({
                "type": "object",
                "required": ["text"],
                "properties": {
                    "text": { "type": "string", "minLength": 1 },
                    "max_length": { "type": "integer", "minimum": 1 }
                }
            }),
            json!({
                "type": "object",
                "required": ["summary"],
                "properties": {
                    "summary": { "type": "string" },
                    "key_points": { "type": "array", "items": { "type": "string" } },
                    "degraded": { "type": "boolean" }
                }
            }),
            Arc::new(mock_summarize),
            Arc::new(degraded_summarize),
        ),
        TaskDefinition::new(
            ANALYZE,
            json!({
                "type": "object",
                "required": ["results"],
                "properties": {
                    "results": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": { "score": { "type": "number" } }
                        }
                    },
                    "max_score": { "type": "number", "exclusiveMinimum": 0 }
                }
            }),
            json!({
                "type": "object",
                "required": ["overall_score", "insights"],
                "properties": {
                    "overall_score": { "type": "number" },
                    "result_count": { "type": "integer" },
                    "insights": { "type": "array", "items": { "type": "string" } },
                    "degraded": { "type": "boolean" }
                }
            }),
            Arc::new(mock_analyze),
            Arc::new(degraded_analyze),
        ),
    ]
}

fn str_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

fn max_score(payload: &Value) -> f64 {
    payload
        .get("max_score")
        .and_then(Value::as_f64)
        .filter(|max| *max > 0.0)
        .unwrap_or(DEFAULT_MAX_SCORE)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Scores of the sub-results that carry one.
fn sub_scores(payload: &Value) -> Vec<f64> {
    payload
        .get("results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|r| r.get("score").and_then(Value::as_f64))
                .collect()
        })
        .unwrap_or_default()
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_terminator(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn mock_generate_question(_task: &str, payload: &Value) -> GatewayResult<Value> {
    let topic = str_field(payload, "topic").unwrap_or("the topic");
    let difficulty = str_field(payload, "difficulty").unwrap_or("medium");
    let mut result = json!({
        "prompt": format!("Explain the key ideas behind {topic}."),
        "difficulty": difficulty,
    });
    if str_field(payload, "format") == Some("multiple-choice") {
        let options: Vec<String> = ["A", "B", "C", "D"]
            .iter()
            .map(|label| format!("{label}) a statement about {topic}"))
            .collect();
        result["options"] = json!(options);
    }
    Ok(result)
}

fn degraded_generate_question(_task: &str, payload: &Value) -> GatewayResult<Value> {
    let topic = str_field(payload, "topic").unwrap_or("the topic");
    Ok(json!({
        "prompt": format!("Describe, in your own words, what you know about {topic}."),
        "difficulty": str_field(payload, "difficulty").unwrap_or("medium"),
        "notice": DEGRADED_NOTICE,
        "degraded": true,
    }))
}

fn mock_score(_task: &str, payload: &Value) -> GatewayResult<Value> {
    let max = max_score(payload);
    let words = str_field(payload, "answer")
        .map(|a| a.split_whitespace().count())
        .unwrap_or(0);
    let ratio = words.min(MOCK_FULL_MARKS_WORDS) as f64 / MOCK_FULL_MARKS_WORDS as f64;
    Ok(json!({
        "score": round1(max * ratio),
        "max_score": max,
        "feedback": format!("Mock evaluation of a {words}-word answer."),
    }))
}

fn degraded_score(_task: &str, payload: &Value) -> GatewayResult<Value> {
    let max = max_score(payload);
    Ok(json!({
        "score": max / 2.0,
        "max_score": max,
        "feedback": DEGRADED_NOTICE,
        "degraded": true,
    }))
}

fn mock_summarize(_task: &str, payload: &Value) -> GatewayResult<Value> {
    let text = str_field(payload, "text").unwrap_or_default();
    let max_length = payload
        .get("max_length")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or(DEFAULT_SUMMARY_LENGTH);
    let first = sentences(text).next().unwrap_or_default();
    Ok(json!({
        "summary": first.chars().take(max_length).collect::<String>(),
        "key_points": sentences(text).take(3).collect::<Vec<_>>(),
    }))
}

fn degraded_summarize(_task: &str, _payload: &Value) -> GatewayResult<Value> {
    Ok(json!({
        "summary": DEGRADED_NOTICE,
        "key_points": [],
        "degraded": true,
    }))
}

fn mock_analyze(_task: &str, payload: &Value) -> GatewayResult<Value> {
    let scores = sub_scores(payload);
    let overall = average(&scores).map(round1).unwrap_or(0.0);
    Ok(json!({
        "overall_score": overall,
        "result_count": scores.len(),
        "insights": [format!("Mock analysis of {} scored results.", scores.len())],
    }))
}

fn degraded_analyze(_task: &str, payload: &Value) -> GatewayResult<Value> {
    let scores = sub_scores(payload);
    let overall = average(&scores).unwrap_or_else(|| max_score(payload) / 2.0);
    Ok(json!({
        "overall_score": overall,
        "result_count": scores.len(),
        "insights": [DEGRADED_NOTICE],
        "degraded": true,
    }))
}
