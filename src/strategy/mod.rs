use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::prompt::TemplatePath;
use crate::wire::{Intent, ResponseFormat};

pub const DEFAULT_VISUAL_MODEL: &str = "midjourney";
pub const TEMPLATE_VERSION: &str = "v1";

/// Each family owns its own template namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentFamily {
    VisualSynthesis,
    TextAudit,
    TextEnhance,
    TextSimulate,
    TemplateRemix,
}

impl IntentFamily {
    pub fn of(intent: Intent) -> Self {
        match intent {
            Intent::Analyze | Intent::Finalize => IntentFamily::VisualSynthesis,
            Intent::Audit => IntentFamily::TextAudit,
            Intent::Enhance => IntentFamily::TextEnhance,
            Intent::Simulate => IntentFamily::TextSimulate,
            Intent::Remix => IntentFamily::TemplateRemix,
        }
    }

    pub fn domain(&self) -> &'static str {
        match self {
            IntentFamily::VisualSynthesis => "visual",
            IntentFamily::TextAudit | IntentFamily::TextEnhance | IntentFamily::TextSimulate => "text",
            IntentFamily::TemplateRemix => "remix",
        }
    }
}

/// Canonical visual strategy for a client-advertised model id, if known.
pub fn visual_strategy(target_model: &str) -> Option<&'static str> {
    let key = target_model.trim().to_ascii_lowercase();
    let canonical = match key.as_str() {
        "midjourney" | "mj" => "midjourney",
        "dalle" | "dall-e" | "dalle3" | "dall-e-3" => "dalle",
        "leonardo" | "leonardo.ai" => "leonardo",
        "banana" | "stable-diffusion" | "sdxl" => "banana",
        _ => return None,
    };
    Some(canonical)
}

/// Template path for a target within a family. Unknown visual targets fall
/// back to Midjourney; the other families have a single template each and
/// ignore the target.
pub fn select_template(target_model: &str, family: IntentFamily) -> TemplatePath {
    let name = match family {
        IntentFamily::VisualSynthesis => {
            visual_strategy(target_model).unwrap_or(DEFAULT_VISUAL_MODEL)
        }
        IntentFamily::TextAudit => "auditor",
        IntentFamily::TextEnhance => "enhancer",
        IntentFamily::TextSimulate => "simulator",
        IntentFamily::TemplateRemix => "synthesizer",
    };
    TemplatePath::new(family.domain(), name, TEMPLATE_VERSION)
}

/// Everything the engine needs to issue calls for one intent.
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub intent: Intent,
    pub family: IntentFamily,
    pub template: TemplatePath,
    /// Generation-service model id to call.
    pub model: String,
    /// Visual strategy name the prompt is written for (finalize only).
    pub target: Option<String>,
    pub response_format: ResponseFormat,
    pub temperature: f32,
}

impl Strategy {
    pub fn select(intent: Intent, target_model: Option<&str>, cfg: &Config) -> Self {
        let family = IntentFamily::of(intent);
        let target = target_model.unwrap_or("");

        let template = match intent {
            Intent::Analyze => TemplatePath::new(family.domain(), "analyst", TEMPLATE_VERSION),
            _ => select_template(target, family),
        };

        let visual_target = match intent {
            Intent::Finalize => Some(
                visual_strategy(target).unwrap_or(DEFAULT_VISUAL_MODEL).to_string(),
            ),
            _ => None,
        };

        let model = match intent {
            Intent::Simulate => simulation_model(target, cfg),
            _ => cfg.model.clone(),
        };

        let response_format = match intent {
            Intent::Analyze | Intent::Audit | Intent::Enhance => ResponseFormat::Json,
            Intent::Finalize | Intent::Simulate | Intent::Remix => ResponseFormat::Text,
        };

        Self {
            intent,
            family,
            template,
            model,
            target: visual_target,
            response_format,
            temperature: cfg.temperatures.for_intent(intent),
        }
    }
}

/// Simulation runs the prompt on the requested client model when it is one we
/// serve, otherwise on the configured default.
fn simulation_model(target: &str, cfg: &Config) -> String {
    let target = target.trim();
    if cfg.simulation_models.iter().any(|m| m == target) {
        target.to_string()
    } else {
        cfg.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_visual_target_falls_back_to_midjourney() {
        let p = select_template("unknown-model-xyz", IntentFamily::VisualSynthesis);
        assert_eq!(p.relative(), "visual/midjourney.v1.txt");
        let p = select_template("", IntentFamily::VisualSynthesis);
        assert_eq!(p.relative(), "visual/midjourney.v1.txt");
    }

    #[test]
    fn known_visual_targets_and_aliases() {
        assert_eq!(select_template("dalle", IntentFamily::VisualSynthesis).name, "dalle");
        assert_eq!(select_template("DALL-E", IntentFamily::VisualSynthesis).name, "dalle");
        assert_eq!(select_template("leonardo", IntentFamily::VisualSynthesis).name, "leonardo");
        assert_eq!(select_template("sdxl", IntentFamily::VisualSynthesis).name, "banana");
    }

    #[test]
    fn families_never_cross_namespaces() {
        // a visual model id means nothing to the text families
        let p = select_template("dalle", IntentFamily::TextAudit);
        assert_eq!(p.relative(), "text/auditor.v1.txt");
        let p = select_template("midjourney", IntentFamily::TemplateRemix);
        assert_eq!(p.relative(), "remix/synthesizer.v1.txt");
    }

    #[test]
    fn select_wires_format_model_and_target() {
        let cfg = Config::default();

        let s = Strategy::select(Intent::Finalize, Some("unknown-model-xyz"), &cfg);
        assert_eq!(s.template.relative(), "visual/midjourney.v1.txt");
        assert_eq!(s.target.as_deref(), Some("midjourney"));
        assert_eq!(s.response_format, ResponseFormat::Text);
        assert_eq!(s.model, cfg.model);

        let s = Strategy::select(Intent::Analyze, Some("dalle"), &cfg);
        assert_eq!(s.template.relative(), "visual/analyst.v1.txt");
        assert_eq!(s.response_format, ResponseFormat::Json);

        let s = Strategy::select(Intent::Audit, None, &cfg);
        assert_eq!(s.response_format, ResponseFormat::Json);
        assert!((s.temperature - cfg.temperatures.audit).abs() < f32::EPSILON);
    }

    #[test]
    fn simulate_routes_to_served_models_only() {
        let cfg = Config::default();
        let s = Strategy::select(Intent::Simulate, Some("qwen/qwen3-32b"), &cfg);
        assert_eq!(s.model, "qwen/qwen3-32b");
        assert_eq!(s.template.relative(), "text/simulator.v1.txt");

        let s = Strategy::select(Intent::Simulate, Some("chatgpt"), &cfg);
        assert_eq!(s.model, cfg.model);
    }
}
