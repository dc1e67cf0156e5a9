//! Turns raw completions into validated results, or rejects them.
//!
//! Rejection is the normal path for a bad completion: the engine treats it
//! like any other failed attempt and retries.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::errors::StageError;
use crate::schema::{self, Shape};
use crate::wire::{AmbiguityQuestions, AuditResult, SynthesisResult, Variations};

/// Rewrites shorter than this fraction of the original prompt are degenerate.
pub const MIN_REWRITE_RATIO: f64 = 0.6;
pub const QUESTION_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedShape {
    Questions,
    Audit,
    Variations,
    /// A single rewritten prompt; subject to the content-shape checks.
    Rewrite,
    /// Arbitrary non-empty text (simulation output).
    Freeform,
}

impl ExpectedShape {
    pub fn is_json(&self) -> bool {
        matches!(self, ExpectedShape::Questions | ExpectedShape::Audit | ExpectedShape::Variations)
    }
}

static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)\r?\n?```$").unwrap());

// Openings that mean the model answered the prompt instead of rewriting it.
static NARRATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^(once upon a time\b|here(\s+(is|are)|'s|’s)\b|chapter\s+(\d+|[ivxlc]+)\b|["“”„«]|\d+[.)]\s)"#)
        .unwrap()
});

/// `None` when the completion is unusable.
pub fn normalize(raw: &str, original: &str, shape: ExpectedShape) -> Option<SynthesisResult> {
    normalize_detailed(raw, original, shape).ok()
}

/// Same as [`normalize`], keeping the reason for a rejection.
pub fn normalize_detailed(
    raw: &str,
    original: &str,
    shape: ExpectedShape,
) -> Result<SynthesisResult, StageError> {
    match shape {
        ExpectedShape::Rewrite => {
            let text = strip_fences(raw).to_string();
            check_rewrite(&text, original).map_err(StageError::ContentShape)?;
            Ok(SynthesisResult::Text { text })
        }
        ExpectedShape::Freeform => {
            let text = raw.trim();
            if text.is_empty() {
                return Err(StageError::ContentShape("empty completion".into()));
            }
            Ok(SynthesisResult::Text { text: text.to_string() })
        }
        _ => {
            let value = parse_json(raw)?;
            normalize_value(value, original, shape)
        }
    }
}

/// Entry point for completions that already arrived as parsed JSON.
pub fn normalize_value(
    value: Value,
    original: &str,
    shape: ExpectedShape,
) -> Result<SynthesisResult, StageError> {
    match shape {
        ExpectedShape::Questions => {
            let v = coerce_questions(value);
            validate(&schema::questions_schema(), &v)?;
            let mut parsed: AmbiguityQuestions = from_value(v)?;
            if parsed.questions.len() < QUESTION_COUNT {
                return Err(StageError::ContentShape(format!(
                    "expected {QUESTION_COUNT} questions, got {}",
                    parsed.questions.len()
                )));
            }
            parsed.questions.truncate(QUESTION_COUNT);
            Ok(SynthesisResult::Questions(parsed))
        }
        ExpectedShape::Audit => {
            let v = coerce_audit(value);
            validate(&schema::audit_schema(), &v)?;
            Ok(SynthesisResult::Audit(from_value::<AuditResult>(v)?))
        }
        ExpectedShape::Variations => {
            let v = coerce_variations(value);
            validate(&schema::enhancer_schema(), &v)?;
            let parsed: Variations = from_value(v)?;
            // all three or nothing
            for (name, text) in parsed.fields() {
                check_rewrite(text, original)
                    .map_err(|why| StageError::ContentShape(format!("{name}: {why}")))?;
            }
            Ok(SynthesisResult::Variations(parsed))
        }
        ExpectedShape::Rewrite | ExpectedShape::Freeform => match value {
            Value::String(s) => normalize_detailed(&s, original, shape),
            other => Err(StageError::Parse(format!("expected text, got {other}"))),
        },
    }
}

/// Content-shape checks for one rewritten prompt.
pub fn check_rewrite(candidate: &str, original: &str) -> Result<(), String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return Err("empty rewrite".into());
    }
    if is_narrative(candidate) {
        return Err("reads like an answer, not a rewritten prompt".into());
    }
    if is_truncated(candidate, original) {
        return Err(format!(
            "rewrite is {} chars, under {:.0}% of the original {}",
            candidate.chars().count(),
            MIN_REWRITE_RATIO * 100.0,
            original.trim().chars().count()
        ));
    }
    Ok(())
}

pub fn is_narrative(candidate: &str) -> bool {
    NARRATIVE.is_match(candidate.trim_start())
}

pub fn is_truncated(candidate: &str, original: &str) -> bool {
    let have = candidate.trim().chars().count() as f64;
    let want = original.trim().chars().count() as f64;
    have < want * MIN_REWRITE_RATIO
}

/// Removes a Markdown code fence wrapping the whole completion.
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    match FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

fn parse_json(raw: &str) -> Result<Value, StageError> {
    let body = strip_fences(raw);
    match serde_json::from_str::<Value>(body) {
        Ok(v) => Ok(v),
        Err(e) => extract_first_json_object(body)
            .and_then(|obj| serde_json::from_str::<Value>(obj).ok())
            .ok_or_else(|| StageError::Parse(e.to_string())),
    }
}

/// First balanced top-level `{...}` in `s`, ignoring braces inside strings.
fn extract_first_json_object(s: &str) -> Option<&str> {
    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in s.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' if start.is_some() => in_string = true,
            b'{' => {
                start.get_or_insert(i);
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|st| &s[st..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn validate(shape: &Shape, v: &Value) -> Result<(), StageError> {
    schema::check(shape, v).map_err(StageError::Validation)
}

fn from_value<T: serde::de::DeserializeOwned>(v: Value) -> Result<T, StageError> {
    serde_json::from_value(v).map_err(|e| StageError::Validation(e.to_string()))
}

fn coerce_questions(value: Value) -> Value {
    let mut obj = match value {
        Value::Array(items) => {
            let mut m = Map::new();
            m.insert("questions".into(), Value::Array(items));
            m
        }
        Value::Object(m) => m,
        other => return other,
    };
    if let Some(Value::Array(items)) = obj.remove("questions") {
        let cleaned = items
            .into_iter()
            .filter_map(|q| match q {
                Value::String(s) => {
                    let s = s.trim();
                    (!s.is_empty()).then(|| Value::String(s.to_string()))
                }
                other => Some(other),
            })
            .collect();
        obj.insert("questions".into(), Value::Array(cleaned));
    }
    Value::Object(obj)
}

fn coerce_audit(value: Value) -> Value {
    let mut obj = match value {
        Value::Object(m) => m,
        other => return other,
    };
    if let Some(score) = obj.get_mut("score") {
        coerce_score(score);
    }
    if let Some(Value::Object(breakdown)) = obj.get_mut("breakdown") {
        for key in ["clarity", "context", "constraints"] {
            if let Some(v) = breakdown.get_mut(key) {
                coerce_score(v);
            }
        }
    }
    for key in ["issues", "suggestions"] {
        if let Some(Value::String(s)) = obj.get(key).cloned() {
            obj.insert(key.into(), Value::Array(vec![Value::String(s)]));
        }
    }
    Value::Object(obj)
}

/// Numeric strings become numbers, numbers are clamped to 0-100.
fn coerce_score(v: &mut Value) {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    if let Some(n) = n.filter(|n| n.is_finite()) {
        if let Some(num) = serde_json::Number::from_f64(n.clamp(0.0, 100.0)) {
            *v = Value::Number(num);
        }
    }
}

fn coerce_variations(value: Value) -> Value {
    match value {
        Value::Array(items) if items.len() == 3 => {
            let mut m = Map::new();
            for (key, item) in ["logical", "creative", "optimized"].into_iter().zip(items) {
                m.insert(key.into(), item);
            }
            trim_strings(Value::Object(m))
        }
        Value::Object(_) => trim_strings(value),
        other => other,
    }
}

fn trim_strings(value: Value) -> Value {
    match value {
        Value::Object(m) => Value::Object(
            m.into_iter()
                .map(|(k, v)| match v {
                    Value::String(s) => (k, Value::String(s.trim().to_string())),
                    other => (k, other),
                })
                .collect(),
        ),
        other => other,
    }
}
