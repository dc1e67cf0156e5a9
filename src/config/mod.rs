use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use fs_err as fs;
use serde::{Deserialize, Serialize};

use crate::cli::ProviderKind;
use crate::wire::Intent;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderKind,
    /// Defaults to the provider's public endpoint.
    pub api_base: Option<String>,
    /// Env var holding the API key; defaults per provider.
    pub api_key_env: Option<String>,
    pub model: String,
    pub templates_dir: String,
    pub attempts: usize,
    /// Per-call deadline. Zero is read as one second.
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub simulation_models: Vec<String>,
    pub temperatures: Temperatures,
}

/// Sampling temperature per intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Temperatures {
    pub analyze: f32,
    pub finalize: f32,
    pub audit: f32,
    pub enhance: f32,
    pub simulate: f32,
    pub remix: f32,
}

impl Temperatures {
    pub fn for_intent(&self, intent: Intent) -> f32 {
        match intent {
            Intent::Analyze => self.analyze,
            Intent::Finalize => self.finalize,
            Intent::Audit => self.audit,
            Intent::Enhance => self.enhance,
            Intent::Simulate => self.simulate,
            Intent::Remix => self.remix,
        }
    }
}

impl Default for Temperatures {
    fn default() -> Self {
        Self {
            analyze: 0.6,
            finalize: 0.7,
            audit: 0.2,
            enhance: 0.7,
            simulate: 0.7,
            remix: 0.5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAI,
            api_base: None,
            api_key_env: None,
            model: "llama-3.3-70b-versatile".into(),
            templates_dir: "prompts".into(),
            attempts: 2,
            timeout_secs: 30,
            max_tokens: 1024,
            simulation_models: vec![
                "openai/gpt-oss-120b".into(),
                "llama-3.3-70b-versatile".into(),
                "meta-llama/llama-4-scout-17b-16e-instruct".into(),
                "qwen/qwen3-32b".into(),
            ],
            temperatures: Temperatures::default(),
        }
    }
}

impl Config {
    /// Defaults, overlaid by the TOML file at `path` (if given), overlaid by env.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let raw = fs::read_to_string(p)?;
                toml::from_str::<Config>(&raw)
                    .with_context(|| format!("parsing config {}", p.display()))?
            }
            None => Config::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("PROMPT_ARCHITECT_MODEL") {
            self.model = v;
        }
        if let Ok(v) = std::env::var("PROMPT_ARCHITECT_API_BASE") {
            self.api_base = Some(v);
        }
        if let Ok(v) = std::env::var("PROMPT_ARCHITECT_TEMPLATES") {
            self.templates_dir = v;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn base_url(&self) -> String {
        match &self.api_base {
            Some(b) => b.trim_end_matches('/').to_string(),
            None => self.provider.default_base().to_string(),
        }
    }

    pub fn api_key_env(&self) -> Option<&str> {
        self.api_key_env.as_deref().or(self.provider.default_key_env())
    }

    pub fn api_key(&self) -> Option<String> {
        std::env::var(self.api_key_env()?)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            model = "qwen/qwen3-32b"
            attempts = 3

            [temperatures]
            audit = 0.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.model, "qwen/qwen3-32b");
        assert_eq!(cfg.attempts, 3);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.temperatures.audit, 0.0);
        assert_eq!(cfg.temperatures.remix, 0.5);
    }

    #[test]
    fn provider_kind_parses_lowercase() {
        let cfg: Config = toml::from_str(r#"provider = "ollama""#).unwrap();
        assert!(matches!(cfg.provider, ProviderKind::Ollama));
        assert_eq!(cfg.base_url(), "http://localhost:11434");
        assert_eq!(cfg.api_key_env(), None);
    }

    #[test]
    fn endpoint_defaults_follow_provider() {
        let cfg = Config::default();
        assert_eq!(cfg.base_url(), "https://api.groq.com/openai/v1");
        assert_eq!(cfg.api_key_env(), Some("GROQ_API_KEY"));

        let cfg: Config = toml::from_str(
            r#"
            provider = "anthropic"
            api_base = "https://proxy.internal/"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.base_url(), "https://proxy.internal");
        assert_eq!(cfg.api_key_env(), Some("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let cfg: Config = toml::from_str("timeout_secs = 0").unwrap();
        assert_eq!(cfg.timeout(), Duration::from_secs(1));
        assert_eq!(Config::default().timeout(), Duration::from_secs(30));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("architect.toml");
        std::fs::write(&path, "timeout_secs = 15\n").unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.timeout_secs, 15);
    }
}
