use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use prompt_architect::cli::{Args, Command};
use prompt_architect::config::Config;
use prompt_architect::log::{self, HistoryRecord};
use prompt_architect::wire::{Intent, RemixContext};
use prompt_architect::{provider, ux, PromptArchitect, SynthesisError, TemplateStore};

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn spinner(enabled: bool, msg: &str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Log which stage gave up before handing the error to anyhow.
fn report(e: SynthesisError) -> anyhow::Error {
    match e.stage() {
        Some(stage) => tracing::error!(%stage, "synthesis failed: {e}"),
        None => tracing::error!("synthesis failed: {e}"),
    }
    e.into()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let mut cfg = Config::load(args.config.as_deref().map(Path::new))?;
    if let Some(p) = args.provider {
        cfg.provider = p;
    }
    if let Some(m) = &args.model {
        cfg.model = m.clone();
    }
    if let Some(t) = &args.templates {
        cfg.templates_dir = t.clone();
    }
    if let Some(s) = args.timeout_secs {
        cfg.timeout_secs = s;
    }
    if let Some(n) = args.attempts {
        cfg.attempts = n;
    }

    let generator = provider::make_provider(&cfg, args.debug)?;
    let store = Arc::new(TemplateStore::from_dir(&cfg.templates_dir));
    let architect = PromptArchitect::new(generator, store, cfg);

    let pb = spinner(!args.quiet, "synthesizing...");
    let record = match args.command {
        Command::Analyze { prompt } => {
            let q = architect.analyze_ambiguity(&prompt).await;
            pb.finish_and_clear();
            ux::show_questions(&q);
            HistoryRecord::new(Intent::Analyze, &prompt, json!(q))
        }
        Command::Finalize { prompt, answers, target } => {
            let out = architect
                .finalize(&prompt, answers.clone(), &target)
                .await
                .map_err(report);
            pb.finish_and_clear();
            let out = out?;
            ux::show_prompt(&format!("PROMPT FOR {}", target.to_uppercase()), &out.enhanced);
            let mut rec = HistoryRecord::new(Intent::Finalize, &prompt, json!(out));
            rec.model_used = Some(target);
            rec.answers = answers;
            rec
        }
        Command::Audit { prompt } => {
            let out = architect.audit(&prompt).await.map_err(report);
            pb.finish_and_clear();
            let out = out?;
            ux::show_audit(&out);
            HistoryRecord::new(Intent::Audit, &prompt, json!(out))
        }
        Command::Enhance { prompt } => {
            let out = architect.enhance_variations(&prompt).await.map_err(report);
            pb.finish_and_clear();
            let out = out?;
            ux::show_variations(&out);
            HistoryRecord::new(Intent::Enhance, &prompt, json!(out))
        }
        Command::Simulate { prompt, target } => {
            let out = architect.simulate(&prompt, target.as_deref()).await.map_err(report);
            pb.finish_and_clear();
            let out = out?;
            ux::show_prompt("SIMULATION", &out.result);
            let mut rec = HistoryRecord::new(Intent::Simulate, &prompt, json!(out));
            rec.model_used = target;
            rec
        }
        Command::Remix { template, questions, answers, protected_tokens } => {
            let ctx = RemixContext {
                template_body: template,
                questions,
                answers,
                protected_tokens,
            };
            let out = architect.remix_template(&ctx).await.map_err(report);
            pb.finish_and_clear();
            let out = out?;
            ux::show_prompt("REMIX", &out.remixed_prompt);
            let mut rec = HistoryRecord::new(Intent::Remix, &ctx.template_body, json!(out));
            rec.answers = ctx.answers;
            rec
        }
    };

    if args.save {
        let path = log::save_record(Path::new(&args.root), &record)?;
        tracing::info!(path = %path.display(), "history record saved");
    }

    Ok(())
}
