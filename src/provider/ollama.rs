use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::wire::{Generation, GenerationRequest, ResponseFormat};
use super::Generator;

pub struct Ollama {
    client: Client,
    url: String,
    debug: bool,
}

impl Ollama {
    pub fn new(client: Client, url: String, debug: bool) -> Self {
        Self { client, url, debug }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: String,
}

#[async_trait]
impl Generator for Ollama {
    async fn generate(&self, req: &GenerationRequest) -> Result<Generation, ProviderError> {
        let url = format!("{}/api/chat", self.url);
        let body = ChatRequest {
            model: &req.model,
            messages: vec![
                Msg { role: "system", content: &req.instruction.system },
                Msg { role: "user", content: &req.instruction.user },
            ],
            stream: false,
            format: (req.response_format == ResponseFormat::Json).then_some("json"),
            options: OllamaOptions {
                temperature: req.temperature,
                num_predict: req.max_tokens,
            },
        };

        if self.debug {
            eprintln!("debug[ollama]: POST {url} model={}", req.model);
        }

        let resp = self.client.post(&url).json(&body).send().await?;
        let text = super::read_body(resp, "ollama", self.debug).await?;

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Decode(format!("ollama response: {e}")))?;

        super::non_empty(parsed.message.content)
    }
}
