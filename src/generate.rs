//! # Generation orchestrator
//! Ties the pipeline together for one request: template lookup, input
//! validation, config resolution, rendering, the backend call with wall-clock
//! latency measurement, and optional structured-output validation.
//!
//! Output validation is deliberately soft: a response that fails JSON parsing
//! or field checks still produced a successful model call, so the result is
//! returned with a failed [ValidationStatus] in its metadata instead of being
//! discarded. Every other failure aborts the call with no partial result.

use std::time::Instant;

use log::{debug, warn};

use crate::assign::{try_assign, Assignment};
use crate::backend::{BackendError, ModelBackend};
use crate::config::ConfigSet;
use crate::render::{render, RenderError};
use crate::template::errors::{DefinitionError, TemplateNotFound};
use crate::template::TemplateLibrary;
use crate::utils::{JsonMap, Variables};
use crate::validate::input::{validate_variables, InputError};
use crate::validate::output::parse_json;

/// What to do with the model's raw response.
#[derive(Debug, Clone, Copy)]
pub enum OutputCheck<'a> {
    /// Return the response text as-is.
    Skip,
    /// Parse the response as a JSON object, optionally requiring fields.
    Json(Option<&'a [&'a str]>),
}

/// Outcome of structured-output validation, recorded in metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationStatus {
    Passed,
    Failed(String),
}

/// Call metadata attached to every [GenerationResult].
#[derive(Debug, Clone)]
pub struct GenerationMetadata {
    pub template: String,
    /// Effective config preset name, after any fallback.
    pub config: String,
    pub model: String,
    pub latency_ms: u64,
    /// Present only when output validation was requested.
    pub validation: Option<ValidationStatus>,
}

/// The structured result of one generation call. Created once per call and
/// handed to the caller; the pipeline retains nothing.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// The model's raw text response.
    pub response: String,
    pub metadata: GenerationMetadata,
    /// Parsed JSON object, present when output validation passed.
    pub parsed_output: Option<JsonMap>,
}

/// Result of an A/B test call: the generation outcome plus which variant the
/// user was assigned to.
#[derive(Debug, Clone)]
pub struct AbTestResult {
    pub result: GenerationResult,
    pub user_id: String,
    pub assignment: Assignment,
}

/// The generation pipeline: a template library, a config preset set, and a
/// model backend. Request-at-a-time: each call runs to completion before the
/// caller regains control, with no internal queuing or retries.
pub struct PromptSystem<B: ModelBackend> {
    library: TemplateLibrary,
    configs: ConfigSet,
    backend: B,
}

impl<B: ModelBackend> PromptSystem<B> {
    /// Builds a pipeline over a loaded template library with the built-in
    /// config presets.
    pub fn new(library: TemplateLibrary, backend: B) -> Self {
        Self { library, configs: ConfigSet::presets(), backend }
    }

    /// Builds a pipeline with a custom config preset set.
    pub fn with_configs(library: TemplateLibrary, configs: ConfigSet, backend: B) -> Self {
        Self { library, configs, backend }
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    pub fn configs(&self) -> &ConfigSet {
        &self.configs
    }

    /// Hot-swaps the template set. See [TemplateLibrary::reload_from_json_str]
    /// for the atomicity guarantee; a concurrent host must guard this call.
    pub fn reload_templates(&mut self, source: &str) -> Result<(), DefinitionError> {
        self.library.reload_from_json_str(source)
    }

    /// Runs one generation request.
    ///
    /// Sequence: template lookup, input validation against the template's
    /// declared variables, config resolution (unknown names fall back to the
    /// default preset), rendering, backend invocation with latency
    /// measurement, then optional output validation per `output_check`.
    pub async fn generate(
        &self,
        template_name: &str,
        variables: &Variables,
        config_name: &str,
        output_check: OutputCheck<'_>,
    ) -> Result<GenerationResult, GenerateError> {
        let template = self.library.get(template_name)?;
        validate_variables(variables, &template.input_variables)?;
        let (config_name, config) = self.configs.resolve(config_name);
        let messages = render(template, variables)?;

        debug!("invoking {} with template {:?} (config {:?})",
               self.backend.model_id(), template_name, config_name);
        let start = Instant::now();
        let response = self.backend.invoke(&messages, config).await?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let mut result = GenerationResult {
            response,
            metadata: GenerationMetadata {
                template: template_name.to_string(),
                config: config_name.to_string(),
                model: self.backend.model_id().to_string(),
                latency_ms,
                validation: None,
            },
            parsed_output: None,
        };

        if let OutputCheck::Json(required_fields) = output_check {
            match parse_json(&result.response, required_fields) {
                Ok(parsed) => {
                    result.parsed_output = Some(parsed);
                    result.metadata.validation = Some(ValidationStatus::Passed);
                }
                Err(e) => {
                    // the model call itself succeeded; keep the raw response
                    warn!("output validation failed for template {:?}: {}", template_name, e);
                    result.metadata.validation = Some(ValidationStatus::Failed(e.to_string()));
                }
            }
        }

        Ok(result)
    }

    /// Runs an A/B test call: assigns the user to one of `variants`, resolves
    /// `"{base_template}_{variant}"`, and generates with output validation.
    ///
    /// Assignment is deterministic per user id, see [crate::assign].
    pub async fn ab_test(
        &self,
        user_id: &str,
        base_template: &str,
        variables: &Variables,
        variants: &[&str],
        config_name: &str,
    ) -> Result<AbTestResult, GenerateError> {
        let assignment = try_assign(user_id, variants)
            .ok_or(GenerateError::NoVariants)?;
        let template_name = format!("{}_{}", base_template, assignment.variant);
        debug!("A/B test: user {:?} assigned to {:?}", user_id, assignment.variant);
        let result = self
            .generate(&template_name, variables, config_name, OutputCheck::Json(None))
            .await?;
        Ok(AbTestResult {
            result,
            user_id: user_id.to_string(),
            assignment,
        })
    }
}

/// Error raised by [PromptSystem::generate]. Each variant wraps the failing
/// component's own error type, so callers can branch on kind.
#[derive(Debug)]
pub enum GenerateError {
    Template(TemplateNotFound),
    Input(InputError),
    Render(RenderError),
    Backend(BackendError),
    /// An A/B test was requested with an empty variant list.
    NoVariants,
}

impl std::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerateError::Template(e) => e.fmt(f),
            GenerateError::Input(e) => e.fmt(f),
            GenerateError::Render(e) => e.fmt(f),
            GenerateError::Backend(e) => e.fmt(f),
            GenerateError::NoVariants => write!(f, "A/B test requires at least one variant"),
        }
    }
}

impl std::error::Error for GenerateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerateError::Template(e) => Some(e),
            GenerateError::Input(e) => Some(e),
            GenerateError::Render(e) => Some(e),
            GenerateError::Backend(e) => Some(e),
            GenerateError::NoVariants => None,
        }
    }
}

impl From<TemplateNotFound> for GenerateError {
    fn from(e: TemplateNotFound) -> Self {
        GenerateError::Template(e)
    }
}

impl From<InputError> for GenerateError {
    fn from(e: InputError) -> Self {
        GenerateError::Input(e)
    }
}

impl From<RenderError> for GenerateError {
    fn from(e: RenderError) -> Self {
        GenerateError::Render(e)
    }
}

impl From<BackendError> for GenerateError {
    fn from(e: BackendError) -> Self {
        GenerateError::Backend(e)
    }
}

#[cfg(test)]
mod generate_tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use crate::backend::{BackendError, ModelBackend};
    use crate::config::GenerationConfig;
    use crate::render::Message;
    use crate::template::TemplateLibrary;
    use crate::utils::Variables;
    use crate::validate::input::InputError;
    use super::{GenerateError, OutputCheck, PromptSystem, ValidationStatus};

    const SOURCE: &str = r#"{
        "sentiment_v2": {
            "pattern": "Structured Output",
            "input_variables": ["text"],
            "messages": [
                {"role": "system", "content": "Reply with JSON: sentiment, confidence."},
                {"role": "user", "content": "{[text]}"}
            ]
        },
        "sentiment_v3": {
            "pattern": "Structured Output",
            "input_variables": ["text"],
            "messages": [
                {"role": "system", "content": "Reply with JSON: sentiment, confidence, reasoning."},
                {"role": "user", "content": "{[text]}"}
            ]
        }
    }"#;

    /// Echoes a canned reply and records nothing. Stands in for a provider.
    struct StubBackend {
        reply: String,
    }

    #[async_trait]
    impl ModelBackend for StubBackend {
        fn model_id(&self) -> &str {
            "stub-model"
        }

        async fn invoke(&self, _messages: &[Message], _config: &GenerationConfig)
            -> Result<String, BackendError> {
            Ok(self.reply.clone())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl ModelBackend for FailingBackend {
        fn model_id(&self) -> &str {
            "stub-model"
        }

        async fn invoke(&self, _messages: &[Message], _config: &GenerationConfig)
            -> Result<String, BackendError> {
            Err(BackendError::RateLimit("429 slow down".to_string()))
        }
    }

    fn system_with_reply(reply: &str) -> PromptSystem<StubBackend> {
        let library = TemplateLibrary::from_json_str(SOURCE).unwrap();
        PromptSystem::new(library, StubBackend { reply: reply.to_string() })
    }

    fn text_variables(text: &str) -> Variables {
        HashMap::from([("text".to_string(), text.to_string())])
    }

    #[tokio::test]
    async fn test_end_to_end_with_output_validation() {
        let system = system_with_reply(r#"{"sentiment":"positive","confidence":1.0,"reasoning":"stub"}"#);
        let result = system
            .generate(
                "sentiment_v3",
                &text_variables("I love it!"),
                "factual",
                OutputCheck::Json(Some(&["sentiment", "confidence", "reasoning"])),
            )
            .await
            .unwrap();

        assert_eq!("sentiment_v3", result.metadata.template);
        assert_eq!("factual", result.metadata.config);
        assert_eq!("stub-model", result.metadata.model);
        assert_eq!(Some(ValidationStatus::Passed), result.metadata.validation);
        let parsed = result.parsed_output.unwrap();
        assert_eq!("positive", parsed["sentiment"]);
    }

    #[tokio::test]
    async fn test_validation_failure_keeps_the_response() {
        let system = system_with_reply("sorry, I cannot answer in JSON today");
        let result = system
            .generate("sentiment_v3", &text_variables("meh"), "balanced", OutputCheck::Json(None))
            .await
            .unwrap();

        assert_eq!("sorry, I cannot answer in JSON today", result.response);
        assert!(result.parsed_output.is_none());
        assert!(matches!(result.metadata.validation, Some(ValidationStatus::Failed(_))));
    }

    #[tokio::test]
    async fn test_unknown_config_falls_back_to_balanced() {
        let system = system_with_reply("fine");
        let result = system
            .generate("sentiment_v3", &text_variables("ok"), "nonexistent", OutputCheck::Skip)
            .await
            .unwrap();
        assert_eq!("balanced", result.metadata.config);
        assert_eq!(None, result.metadata.validation);
    }

    #[tokio::test]
    async fn test_input_validation_aborts_before_the_backend() {
        let system = system_with_reply("never reached");
        let err = system
            .generate("sentiment_v3", &HashMap::new(), "balanced", OutputCheck::Skip)
            .await
            .unwrap_err();
        match err {
            GenerateError::Input(InputError::MissingFields(fields)) =>
                assert_eq!(vec!["text".to_string()], fields),
            other => panic!("expected missing-fields error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_template_is_an_error() {
        let system = system_with_reply("never reached");
        let err = system
            .generate("sentiment_v9", &text_variables("hi"), "balanced", OutputCheck::Skip)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Template(_)));
    }

    #[tokio::test]
    async fn test_backend_errors_propagate_by_kind() {
        let library = TemplateLibrary::from_json_str(SOURCE).unwrap();
        let system = PromptSystem::new(library, FailingBackend);
        let err = system
            .generate("sentiment_v3", &text_variables("hi"), "balanced", OutputCheck::Skip)
            .await
            .unwrap_err();
        match err {
            GenerateError::Backend(BackendError::RateLimit(msg)) => assert!(msg.contains("429")),
            other => panic!("expected rate-limit error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ab_test_assignment_is_deterministic() {
        let system = system_with_reply(r#"{"sentiment":"neutral","confidence":0.5}"#);
        let variables = text_variables("The service was okay.");

        let first = system
            .ab_test("user123", "sentiment", &variables, &["v2", "v3"], "balanced")
            .await
            .unwrap();
        let second = system
            .ab_test("user123", "sentiment", &variables, &["v2", "v3"], "balanced")
            .await
            .unwrap();

        assert_eq!(first.assignment, second.assignment);
        assert_eq!("user123", first.user_id);
        assert_eq!(
            format!("sentiment_{}", first.assignment.variant),
            first.result.metadata.template
        );
    }

    #[tokio::test]
    async fn test_ab_test_with_no_variants() {
        let system = system_with_reply("unused");
        let err = system
            .ab_test("user123", "sentiment", &text_variables("hi"), &[], "balanced")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::NoVariants));
    }
}
