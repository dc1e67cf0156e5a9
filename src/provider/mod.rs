use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::cli::ProviderKind;
use crate::config::Config;
use crate::errors::ProviderError;
use crate::wire::{Generation, GenerationRequest};

pub mod openai;
pub mod anthropic;
pub mod ollama;

/// The external generation service: one request in, one completion out.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, req: &GenerationRequest) -> Result<Generation, ProviderError>;
}

pub type DynGenerator = Arc<dyn Generator>;

/// One client for every target model; the model id travels in the request.
pub fn make_provider(cfg: &Config, debug: bool) -> Result<DynGenerator> {
    let client = Client::builder()
        .timeout(cfg.timeout())
        .build()?;
    let base = cfg.base_url();

    let key = || {
        let env = cfg.api_key_env().unwrap_or("API_KEY");
        cfg.api_key()
            .ok_or_else(|| anyhow!(ProviderError::MissingApiKey(env.to_string())))
    };

    match cfg.provider {
        ProviderKind::OpenAI => Ok(Arc::new(openai::OpenAiCompatible::new(client, base, key()?, debug))),
        ProviderKind::Anthropic => Ok(Arc::new(anthropic::Anthropic::new(client, base, key()?, debug))),
        ProviderKind::Ollama => Ok(Arc::new(ollama::Ollama::new(client, base, debug))),
    }
}

/// Status check shared by the adapters: non-2xx becomes `ProviderError::Status`.
pub(crate) async fn read_body(resp: reqwest::Response, tag: &str, debug: bool) -> Result<String, ProviderError> {
    let status = resp.status();
    let text = resp.text().await?;
    if debug {
        eprintln!("debug[{tag}]: raw status: {status}");
        eprintln!("debug[{tag}]: raw response:\n{text}\n");
    }
    if !status.is_success() {
        return Err(ProviderError::Status { status: status.as_u16(), body: text });
    }
    Ok(text)
}

pub(crate) fn non_empty(content: String) -> Result<Generation, ProviderError> {
    if content.trim().is_empty() {
        return Err(ProviderError::EmptyContent);
    }
    Ok(Generation { text: content })
}
