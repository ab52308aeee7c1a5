//! # promptsmith
//!
//! Template-driven prompt generation and validation pipeline for LLM
//! applications in Rust.
//!
//! ## Why `promptsmith`
//!
//! Prompt engineering starts with prompts, not with provider SDKs. The prompt
//! text here is configuration data: it lives in a JSON definition source,
//! gets loaded once into an immutable [template::TemplateLibrary], and can be
//! edited, versioned and A/B-tested without touching orchestration code.
//!
//! ## Concepts and Design
//!
//! ### Template and Placeholder
//!
//! A template is a named sequence of role-tagged message fragments with
//! declared required variables. Fragment content uses `{[name]}`
//! placeholders:
//!
//! ```text
//! You are a helpful assistant. Analyze the sentiment of: {[text]}
//! ```
//!
//! Templates carry no behavior; all logic lives in the components below.
//!
//! ### Validation and Rendering
//!
//! [validate::input] rejects bindings with missing fields, blank values, or
//! denylisted injection phrases before anything is formatted. [render] then
//! substitutes every placeholder, producing the ordered message sequence for
//! the backend. The placeholders actually present in the fragments are
//! authoritative; the declared variable list is advisory metadata used for
//! early validation.
//!
//! ### Backend
//!
//! The LLM is an opaque asynchronous call behind [backend::ModelBackend]:
//! messages plus a [config::GenerationConfig] in, text out, or a classified
//! [backend::BackendError]. The pipeline never retries; retry policy belongs
//! to the caller.
//!
//! ### Orchestration
//!
//! [generate::PromptSystem] runs the whole sequence per request and returns a
//! [generate::GenerationResult] with latency and validation metadata.
//! Structured-output validation degrades to a status flag instead of
//! discarding a successful model call.
//!
//! ### A/B assignment
//!
//! [assign] maps a user id to a template variant with a fixed, documented
//! FNV-1a hash, so assignment is reproducible across runs.
//!
//! ## Example
//!
//! ```no_run
//! use promptsmith::generate::{OutputCheck, PromptSystem};
//! use promptsmith::template::TemplateLibrary;
//! # use promptsmith::backend::{BackendError, ModelBackend};
//! # use promptsmith::config::GenerationConfig;
//! # use promptsmith::render::Message;
//! # struct MyBackend;
//! # #[async_trait::async_trait]
//! # impl ModelBackend for MyBackend {
//! #     fn model_id(&self) -> &str { "my-model" }
//! #     async fn invoke(&self, _m: &[Message], _c: &GenerationConfig) -> Result<String, BackendError> {
//! #         Ok(String::new())
//! #     }
//! # }
//!
//! # async fn run() -> anyhow::Result<()> {
//! let library = TemplateLibrary::from_json_file("templates/templates.json")?;
//! let system = PromptSystem::new(library, MyBackend);
//! let result = system
//!     .generate(
//!         "sentiment_v3",
//!         &[("text".to_string(), "I love it!".to_string())].into(),
//!         "factual",
//!         OutputCheck::Json(Some(&["sentiment", "confidence", "reasoning"])),
//!     )
//!     .await?;
//! println!("{} ({} ms)", result.response, result.metadata.latency_ms);
//! # Ok(())
//! # }
//! ```

pub mod assign;
pub mod backend;
pub mod config;
pub mod generate;
pub mod history;
pub mod render;
pub mod template;
pub mod utils;
pub mod validate;
