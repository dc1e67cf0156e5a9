use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// ========================================
/// Request/result types exchanged with callers and the generation service
/// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Analyze,
    Enhance,
    Finalize,
    Audit,
    Simulate,
    Remix,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Analyze => "analyze",
            Intent::Enhance => "enhance",
            Intent::Finalize => "finalize",
            Intent::Audit => "audit",
            Intent::Simulate => "simulate",
            Intent::Remix => "remix",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clarifying answers as sent by clients: either a keyed map (question index
/// to answer) or a plain list.
///
/// JSON object keys are always strings, so the keyed form is held by its raw
/// keys and ordered numerically on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answers {
    List(Vec<String>),
    Ordered(BTreeMap<String, String>),
}

impl Default for Answers {
    fn default() -> Self {
        Answers::List(Vec::new())
    }
}

impl Answers {
    /// Answers in order, blanks included.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Answers::List(v) => v.iter().map(String::as_str).collect(),
            Answers::Ordered(m) => {
                let mut entries: Vec<(&str, &str)> =
                    m.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                // numeric keys first in numeric order, anything else after
                entries.sort_by(|(a, _), (b, _)| position(a).cmp(&position(b)).then_with(|| a.cmp(b)));
                entries.into_iter().map(|(_, v)| v).collect()
            }
        }
    }

    /// (1-based position, trimmed answer) for every non-blank answer.
    pub fn non_empty(&self) -> Vec<(usize, &str)> {
        self.values()
            .into_iter()
            .enumerate()
            .filter_map(|(i, a)| {
                let a = a.trim();
                (!a.is_empty()).then_some((i + 1, a))
            })
            .collect()
    }
}

fn position(key: &str) -> u64 {
    key.trim().parse().unwrap_or(u64::MAX)
}

impl From<Vec<String>> for Answers {
    fn from(v: Vec<String>) -> Self {
        Answers::List(v)
    }
}

/// Raw input for one synthesis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRequest {
    pub source_text: String,
    #[serde(default)]
    pub answers: Answers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_model: Option<String>,
    pub intent: Intent,
}

impl PromptRequest {
    pub fn new(intent: Intent, source_text: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            answers: Answers::default(),
            target_model: None,
            intent,
        }
    }

    pub fn with_answers(mut self, answers: impl Into<Answers>) -> Self {
        self.answers = answers.into();
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_model = Some(target.into());
        self
    }
}

/// Template remix input. `protected_tokens` must survive verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemixContext {
    pub template_body: String,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub protected_tokens: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instruction {
    pub system: String,
    pub user: String,
}

/// One call to the generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub instruction: Instruction,
    pub response_format: ResponseFormat,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguityQuestions {
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub clarity: f64,
    pub context: f64,
    pub constraints: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    pub score: f64,
    pub breakdown: Breakdown,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variations {
    pub logical: String,
    pub creative: String,
    pub optimized: String,
}

impl Variations {
    pub fn fields(&self) -> [(&'static str, &str); 3] {
        [
            ("logical", self.logical.as_str()),
            ("creative", self.creative.as_str()),
            ("optimized", self.optimized.as_str()),
        ]
    }
}

/// Validated output, one variant per expected shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SynthesisResult {
    Questions(AmbiguityQuestions),
    Audit(AuditResult),
    Variations(Variations),
    Text { text: String },
}

impl SynthesisResult {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SynthesisResult::Text { text } => Some(text),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            SynthesisResult::Questions(_) => "questions",
            SynthesisResult::Audit(_) => "audit",
            SynthesisResult::Variations(_) => "variations",
            SynthesisResult::Text { .. } => "text",
        }
    }

    pub fn into_text(self) -> Result<String, String> {
        match self {
            SynthesisResult::Text { text } => Ok(text),
            other => Err(format!("expected text, got {}", other.kind())),
        }
    }

    pub fn into_questions(self) -> Result<AmbiguityQuestions, String> {
        match self {
            SynthesisResult::Questions(q) => Ok(q),
            other => Err(format!("expected questions, got {}", other.kind())),
        }
    }

    pub fn into_audit(self) -> Result<AuditResult, String> {
        match self {
            SynthesisResult::Audit(a) => Ok(a),
            other => Err(format!("expected audit, got {}", other.kind())),
        }
    }

    pub fn into_variations(self) -> Result<Variations, String> {
        match self {
            SynthesisResult::Variations(v) => Ok(v),
            other => Err(format!("expected variations, got {}", other.kind())),
        }
    }
}

/// `finalize` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finalized {
    pub enhanced: String,
}

/// `simulate` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub result: String,
}

/// `remixTemplate` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remixed {
    pub remixed_prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_accept_list_and_keyed_forms() {
        let list: Answers = serde_json::from_str(r#"["oil", "", "dusk"]"#).unwrap();
        assert_eq!(list.non_empty(), vec![(1, "oil"), (3, "dusk")]);

        let keyed: Answers = serde_json::from_str(r#"{"2": "dusk", "0": " oil "}"#).unwrap();
        assert_eq!(keyed.values(), vec![" oil ", "dusk"]);
        assert_eq!(keyed.non_empty(), vec![(1, "oil"), (2, "dusk")]);
    }

    #[test]
    fn keyed_answers_order_numerically_not_lexically() {
        let keyed: Answers = serde_json::from_str(r#"{"10": "tenth", "2": "second", "1": "first"}"#).unwrap();
        assert_eq!(keyed.values(), vec!["first", "second", "tenth"]);
    }

    #[test]
    fn whitespace_answers_count_as_blank() {
        let a = Answers::from(vec!["  ".to_string(), "\t".to_string()]);
        assert!(a.non_empty().is_empty());
    }

    #[test]
    fn prompt_request_with_keyed_answers_round_trips() {
        let raw = r#"{"source_text": "a cat", "answers": {"0": "oil", "1": "dusk"}, "target_model": "dalle", "intent": "finalize"}"#;
        let req: PromptRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.intent, Intent::Finalize);
        assert_eq!(req.answers.non_empty(), vec![(1, "oil"), (2, "dusk")]);

        let back: PromptRequest = serde_json::from_str(&serde_json::to_string(&req).unwrap()).unwrap();
        assert_eq!(back.answers, req.answers);
        assert_eq!(back.target_model.as_deref(), Some("dalle"));
    }
}
