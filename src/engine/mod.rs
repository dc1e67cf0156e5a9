//! Synthesis engine: picks a strategy, calls the generation service with the
//! strategy's template, runs the completion through the normalizer, and
//! retries rejected attempts. The six public operations sit on top.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::Config;
use crate::context;
use crate::errors::{StageError, SynthesisError};
use crate::normalize::{self, ExpectedShape};
use crate::prompt::{SystemTemplate, TemplateStore};
use crate::provider::DynGenerator;
use crate::retry::with_retry;
use crate::safety;
use crate::strategy::Strategy;
use crate::wire::{
    AmbiguityQuestions, Answers, AuditResult, Finalized, GenerationRequest, Instruction, Intent,
    PromptRequest, Remixed, RemixContext, Simulation, SynthesisResult, Variations,
};

/// Served when ambiguity analysis fails for any reason.
pub const FALLBACK_QUESTIONS: [&str; 3] = [
    "What art style do you want?",
    "What is the lighting?",
    "What is the camera angle?",
];

pub fn fallback_questions() -> AmbiguityQuestions {
    AmbiguityQuestions {
        questions: FALLBACK_QUESTIONS.iter().map(|q| q.to_string()).collect(),
    }
}

pub fn expected_shape(intent: Intent) -> ExpectedShape {
    match intent {
        Intent::Analyze => ExpectedShape::Questions,
        Intent::Audit => ExpectedShape::Audit,
        Intent::Enhance => ExpectedShape::Variations,
        Intent::Finalize | Intent::Remix => ExpectedShape::Rewrite,
        Intent::Simulate => ExpectedShape::Freeform,
    }
}

/// Request-scoped state lives on the stack; the only shared state is the
/// template cache inside `templates`.
pub struct PromptArchitect {
    generator: DynGenerator,
    templates: Arc<TemplateStore>,
    cfg: Config,
}

impl PromptArchitect {
    pub fn new(generator: DynGenerator, templates: Arc<TemplateStore>, cfg: Config) -> Self {
        Self { generator, templates, cfg }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    fn template_for(&self, strategy: &Strategy) -> Result<SystemTemplate, SynthesisError> {
        Ok(self.templates.template(&strategy.template)?)
    }

    /// One synthesis for `request` with an already loaded template.
    ///
    /// Remix requests carry only answers here; use [`Self::synthesize_remix`]
    /// to pass questions and protected tokens.
    pub async fn synthesize(
        &self,
        request: &PromptRequest,
        template: &SystemTemplate,
    ) -> Result<SynthesisResult, SynthesisError> {
        if request.intent == Intent::Remix {
            let ctx = RemixContext {
                template_body: request.source_text.clone(),
                answers: request.answers.values().into_iter().map(str::to_string).collect(),
                ..RemixContext::default()
            };
            return self
                .synthesize_remix(&ctx, template)
                .await
                .map(|text| SynthesisResult::Text { text });
        }

        let strategy = Strategy::select(request.intent, request.target_model.as_deref(), &self.cfg);
        let user = self.user_message(request, &strategy);
        self.run(&strategy, template, user, &request.source_text, Ok).await
    }

    /// Remix synthesis without the protected-token check.
    pub async fn synthesize_remix(
        &self,
        ctx: &RemixContext,
        template: &SystemTemplate,
    ) -> Result<String, SynthesisError> {
        let strategy = Strategy::select(Intent::Remix, None, &self.cfg);
        let user = context::remix_message(ctx);
        self.run(&strategy, template, user, &ctx.template_body, SynthesisResult::into_text)
            .await
    }

    fn user_message(&self, request: &PromptRequest, strategy: &Strategy) -> String {
        let prompt = &request.source_text;
        match request.intent {
            Intent::Analyze => context::analyze_message(prompt),
            Intent::Finalize => {
                let target = strategy.target.as_deref().unwrap_or(crate::strategy::DEFAULT_VISUAL_MODEL);
                context::finalize_message(prompt, &request.answers, target)
            }
            Intent::Audit => context::audit_message(prompt),
            Intent::Enhance => context::enhance_message(prompt),
            Intent::Simulate => context::simulate_message(prompt),
            Intent::Remix => context::remix_message(&RemixContext {
                template_body: prompt.clone(),
                ..RemixContext::default()
            }),
        }
    }

    /// The retry loop. `extract` turns the normalized result into the typed
    /// value; a mismatch counts as a failed attempt.
    async fn run<T, F>(
        &self,
        strategy: &Strategy,
        template: &SystemTemplate,
        user: String,
        original: &str,
        extract: F,
    ) -> Result<T, SynthesisError>
    where
        F: Fn(SynthesisResult) -> Result<T, String>,
    {
        let req = GenerationRequest {
            model: strategy.model.clone(),
            instruction: Instruction {
                system: template.body.to_string(),
                user,
            },
            response_format: strategy.response_format,
            temperature: strategy.temperature,
            max_tokens: self.cfg.max_tokens,
        };
        let shape = expected_shape(strategy.intent);
        let attempts = self.cfg.attempts.max(1);
        let path = template.path();
        let counter = AtomicUsize::new(0);

        let (req, path, counter, extract) = (&req, &path, &counter, &extract);
        with_retry(attempts, || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(intent = %strategy.intent, attempt = n, template = %path, model = %req.model, "generation attempt");

            let outcome = self
                .attempt(req, original, shape)
                .await
                .and_then(|r| extract(r).map_err(StageError::Validation));
            if let Err(e) = &outcome {
                warn!(intent = %strategy.intent, attempt = n, stage = %e.stage(), error = %e, "attempt rejected");
            }
            outcome
        })
        .await
        .map_err(|last| SynthesisError::Exhausted {
            intent: strategy.intent,
            attempts,
            last,
        })
    }

    /// One generation call plus normalization. Never retries by itself.
    async fn attempt(
        &self,
        req: &GenerationRequest,
        original: &str,
        shape: ExpectedShape,
    ) -> Result<SynthesisResult, StageError> {
        let deadline = self.cfg.timeout();
        let generation = tokio::time::timeout(deadline, self.generator.generate(req))
            .await
            .map_err(|_| StageError::Timeout { secs: deadline.as_secs() })??;
        normalize::normalize_detailed(&generation.text, original, shape)
    }

    async fn run_intent<T, F>(&self, request: PromptRequest, extract: F) -> Result<T, SynthesisError>
    where
        F: Fn(SynthesisResult) -> Result<T, String>,
    {
        let strategy = Strategy::select(request.intent, request.target_model.as_deref(), &self.cfg);
        let template = self.template_for(&strategy)?;
        let user = self.user_message(&request, &strategy);
        self.run(&strategy, &template, user, &request.source_text, extract).await
    }

    /// Three clarifying questions. Fails open to [`fallback_questions`].
    pub async fn analyze_ambiguity(&self, prompt: &str) -> AmbiguityQuestions {
        let request = PromptRequest::new(Intent::Analyze, prompt);
        match self.run_intent(request, SynthesisResult::into_questions).await {
            Ok(q) => q,
            Err(e) => {
                warn!(error = %e, "ambiguity analysis failed; serving fallback questions");
                fallback_questions()
            }
        }
    }

    pub async fn finalize(
        &self,
        prompt: &str,
        answers: impl Into<Answers>,
        model: &str,
    ) -> Result<Finalized, SynthesisError> {
        let request = PromptRequest::new(Intent::Finalize, prompt)
            .with_answers(answers)
            .with_target(model);
        let enhanced = self.run_intent(request, SynthesisResult::into_text).await?;
        Ok(Finalized { enhanced })
    }

    pub async fn audit(&self, prompt: &str) -> Result<AuditResult, SynthesisError> {
        self.run_intent(PromptRequest::new(Intent::Audit, prompt), SynthesisResult::into_audit)
            .await
    }

    pub async fn enhance_variations(&self, prompt: &str) -> Result<Variations, SynthesisError> {
        self.run_intent(PromptRequest::new(Intent::Enhance, prompt), SynthesisResult::into_variations)
            .await
    }

    pub async fn simulate(&self, prompt: &str, model: Option<&str>) -> Result<Simulation, SynthesisError> {
        let mut request = PromptRequest::new(Intent::Simulate, prompt);
        request.target_model = model.map(str::to_string);
        let result = self.run_intent(request, SynthesisResult::into_text).await?;
        Ok(Simulation { result })
    }

    /// Remix a template. Exhausted retries and dropped protected tokens both
    /// resolve to the template body unchanged; only a missing template file
    /// is an error.
    pub async fn remix_template(&self, ctx: &RemixContext) -> Result<Remixed, SynthesisError> {
        let strategy = Strategy::select(Intent::Remix, None, &self.cfg);
        let template = self.template_for(&strategy)?;

        let remixed_prompt = match self.synthesize_remix(ctx, &template).await {
            Ok(text) => safety::enforce(&text, &ctx.protected_tokens, &ctx.template_body),
            Err(e) => {
                warn!(error = %e, "remix failed; returning template unchanged");
                ctx.template_body.clone()
            }
        };
        Ok(Remixed { remixed_prompt })
    }
}
