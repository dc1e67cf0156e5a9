use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::ProviderError;
use crate::wire::{Generation, GenerationRequest, ResponseFormat};

/// OpenAI-compatible chat completions (OpenAI, Groq, OpenRouter, vLLM, ...).
pub struct OpenAiCompatible {
    client: Client,
    api_base: String,
    api_key: String,
    debug: bool,
}

impl OpenAiCompatible {
    pub fn new(client: Client, api_base: String, api_key: String, debug: bool) -> Self {
        Self { client, api_base, api_key, debug }
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

// Minimal structs to parse the chat response
#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}
#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[async_trait]
impl super::Generator for OpenAiCompatible {
    async fn generate(&self, req: &GenerationRequest) -> Result<Generation, ProviderError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = ChatRequest {
            model: &req.model,
            messages: vec![
                Msg { role: "system", content: &req.instruction.system },
                Msg { role: "user", content: &req.instruction.user },
            ],
            temperature: req.temperature,
            max_tokens: req.max_tokens,
            // Force a valid JSON object in the response.
            response_format: match req.response_format {
                ResponseFormat::Json => Some(json!({ "type": "json_object" })),
                ResponseFormat::Text => None,
            },
        };

        if self.debug {
            eprintln!("debug[openai]: POST {url} model={}", req.model);
        }

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let text = super::read_body(resp, "openai", self.debug).await?;

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Decode(format!("chat response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        super::non_empty(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_mode_only_when_requested() {
        let body = ChatRequest {
            model: "llama-3.3-70b-versatile",
            messages: vec![Msg { role: "system", content: "rules" }],
            temperature: 0.2,
            max_tokens: 64,
            response_format: Some(json!({ "type": "json_object" })),
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["response_format"]["type"], "json_object");
        assert_eq!(v["messages"][0]["role"], "system");

        let body = ChatRequest { response_format: None, ..body };
        let v = serde_json::to_value(&body).unwrap();
        assert!(v.get("response_format").is_none());
    }

    #[test]
    fn missing_content_parses_as_none() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
