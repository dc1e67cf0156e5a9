use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::wire::{Generation, GenerationRequest, ResponseFormat};
use super::Generator;

const API_VERSION: &str = "2023-06-01";

pub struct Anthropic {
    client: Client,
    api_base: String,
    api_key: String,
    debug: bool,
}

impl Anthropic {
    pub fn new(client: Client, api_base: String, api_key: String, debug: bool) -> Self {
        Self { client, api_base, api_key, debug }
    }
}

#[derive(Serialize)]
struct MsgRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Msg<'a>>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MsgResponse {
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(default)]
    text: String,
    #[serde(default)]
    r#type: String,
}

// No native JSON mode; ask for it in the system prompt.
fn system_text(req: &GenerationRequest) -> String {
    let mut system = req.instruction.system.clone();
    if req.response_format == ResponseFormat::Json {
        system.push_str("\n\nRespond with exactly one JSON object and nothing else.");
    }
    system
}

#[async_trait]
impl Generator for Anthropic {
    async fn generate(&self, req: &GenerationRequest) -> Result<Generation, ProviderError> {
        let url = format!("{}/v1/messages", self.api_base);
        let body = MsgRequest {
            model: &req.model,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            system: system_text(req),
            messages: vec![Msg { role: "user", content: &req.instruction.user }],
        };

        if self.debug {
            eprintln!("debug[anthropic]: POST {url} model={}", req.model);
        }

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;
        let text = super::read_body(resp, "anthropic", self.debug).await?;

        let parsed: MsgResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Decode(format!("anthropic response: {e}")))?;

        let content = parsed
            .content
            .into_iter()
            .filter(|b| b.r#type == "text")
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");

        super::non_empty(content)
    }
}
