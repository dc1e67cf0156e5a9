use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(ValueEnum, Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Any OpenAI-compatible chat completions endpoint (Groq by default).
    #[value(name = "openai", alias = "open-ai", alias = "groq")]
    OpenAI,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    pub fn default_base(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "https://api.groq.com/openai/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::Ollama => "http://localhost:11434",
        }
    }

    pub fn default_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAI => Some("GROQ_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Ollama => None,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "prompt_architect", version, about = "Rewrites raw prompts into model-specific, validated prompts")]
pub struct Args {
    /// TOML config file; defaults are used when omitted.
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[arg(long, value_enum, global = true)]
    pub provider: Option<ProviderKind>,

    /// Generation-service model id.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Base directory of the `{domain}/{name}.{version}.txt` templates.
    #[arg(long, global = true)]
    pub templates: Option<String>,

    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[arg(long, global = true)]
    pub attempts: Option<usize>,

    #[arg(long, default_value = ".", global = true)]
    pub root: String,

    /// Write a history record under `<root>/.prompt_architect/history`.
    #[arg(long, default_value_t = false, global = true)]
    pub save: bool,

    #[arg(long, default_value_t = false, global = true)]
    pub debug: bool,

    /// Hide the progress spinner.
    #[arg(long, default_value_t = false, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask three clarifying questions about a visual prompt.
    Analyze { prompt: String },
    /// Rewrite a visual prompt for an image model.
    Finalize {
        prompt: String,
        #[arg(long = "answer")]
        answers: Vec<String>,
        /// midjourney | dalle | leonardo | banana
        #[arg(long, default_value = "midjourney")]
        target: String,
    },
    /// Score a text prompt 0-100.
    Audit { prompt: String },
    /// Produce logical, creative and optimized rewrites.
    Enhance { prompt: String },
    /// Run the prompt on one of the served models.
    Simulate {
        prompt: String,
        #[arg(long)]
        target: Option<String>,
    },
    /// Fill a template from question/answer pairs, keeping protected tokens.
    Remix {
        #[arg(long, allow_hyphen_values = true)]
        template: String,
        #[arg(long = "question")]
        questions: Vec<String>,
        #[arg(long = "answer")]
        answers: Vec<String>,
        #[arg(long = "protect", allow_hyphen_values = true)]
        protected_tokens: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_remix_with_repeated_flags() {
        let args = Args::parse_from([
            "prompt_architect",
            "remix",
            "--template",
            "/imagine a cat --v 6.0",
            "--question",
            "style?",
            "--answer",
            "oil painting",
            "--protect",
            "--v 6.0",
        ]);
        match args.command {
            Command::Remix { template, questions, answers, protected_tokens } => {
                assert_eq!(template, "/imagine a cat --v 6.0");
                assert_eq!(questions, vec!["style?"]);
                assert_eq!(answers, vec!["oil painting"]);
                assert_eq!(protected_tokens, vec!["--v 6.0"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::parse_from(["prompt_architect", "audit", "fix my code", "--provider", "groq", "--debug"]);
        assert!(matches!(args.provider, Some(ProviderKind::OpenAI)));
        assert!(args.debug);
    }
}
