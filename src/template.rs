//! # Template store
//! Prompt content lives outside code, in a JSON definition source that maps a
//! template name to role-tagged message fragments, the variables the template
//! declares, and free-form metadata. [TemplateLibrary] loads that source once
//! and is read-only afterwards, so prompt text can be edited, versioned and
//! A/B-tested without touching orchestration logic.
//!
//! ## Definition source
//! ```json
//! {
//!     "sentiment_v1": {
//!         "pattern": "Zero-Shot",
//!         "description": "Simple sentiment classification",
//!         "input_variables": ["text"],
//!         "messages": [
//!             {"role": "system", "content": "You classify sentiment."},
//!             {"role": "user", "content": ["Text:", "{[text]}"]}
//!         ]
//!     }
//! }
//! ```
//! `content` is either a single string or a list of strings joined with
//! newlines at load time. A template entry without a `messages` list fails
//! the whole load; no partial set is ever installed.
//!
//! Placeholders use the `{[name]}` syntax, see [crate::utils::placeholders].

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::template::errors::{DefinitionError, TemplateNotFound};
use crate::utils::placeholders::get_placeholders;

/// Role tag of a message fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One role-tagged piece of a template, still holding unbound placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFragment {
    pub role: Role,
    pub content: String,
}

/// A named, immutable prompt skeleton: ordered message fragments plus the
/// variables the author declared and free-form metadata.
///
/// The declared `input_variables` drive early input validation; the
/// placeholders actually present in the fragments remain authoritative for
/// rendering (see [crate::render]).
#[derive(Debug, Clone)]
#[readonly::make]
pub struct Template {
    #[readonly]
    pub name: String,

    /// Prompt pattern label, informational (e.g. "Zero-Shot", "Few-Shot").
    #[readonly]
    pub pattern: String,

    /// Human description, informational.
    #[readonly]
    pub description: String,

    /// Variables the author declared as required.
    #[readonly]
    pub input_variables: Vec<String>,

    #[readonly]
    pub fragments: Vec<MessageFragment>,
}

impl Template {
    /// Union of all placeholder names referenced by the fragments.
    pub fn placeholders(&self) -> HashSet<String> {
        let mut all = HashSet::new();
        for fragment in &self.fragments {
            all.extend(get_placeholders(&fragment.content));
        }
        all
    }
}

#[derive(Deserialize)]
struct TemplateDef {
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    input_variables: Vec<String>,
    // Option so that an absent list is reported as a DefinitionError of our
    // own instead of a generic serde message.
    #[serde(default)]
    messages: Option<Vec<MessageDef>>,
}

#[derive(Deserialize)]
struct MessageDef {
    role: Role,
    content: ContentDef,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContentDef {
    Line(String),
    Lines(Vec<String>),
}

impl ContentDef {
    fn join(self) -> String {
        match self {
            ContentDef::Line(line) => line,
            ContentDef::Lines(lines) => lines.join("\n"),
        }
    }
}

/// The in-memory template set, keyed by template name.
///
/// Loading is all-or-nothing: any malformed entry aborts the whole load and
/// the library under construction is discarded. The reload methods only
/// replace the current set after the new one parsed completely, so readers
/// never observe a partially loaded set. A concurrent host must still guard
/// reloads itself, e.g. by swapping a single shared reference to the library.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: BTreeMap<String, Template>,
}

impl TemplateLibrary {
    /// Parses a JSON definition source into a fresh library.
    pub fn from_json_str(source: &str) -> Result<Self, DefinitionError> {
        let defs: BTreeMap<String, TemplateDef> = serde_json::from_str(source)
            .map_err(DefinitionError::Parse)?;
        let mut templates = BTreeMap::new();
        for (name, def) in defs {
            let message_defs = def.messages.ok_or_else(|| DefinitionError::MissingMessages {
                template: name.clone(),
            })?;
            let fragments: Vec<MessageFragment> = message_defs
                .into_iter()
                .map(|m| MessageFragment { role: m.role, content: m.content.join() })
                .collect();
            let template = Template {
                name: name.clone(),
                pattern: def.pattern.unwrap_or_else(|| "Unknown".to_string()),
                description: def.description.unwrap_or_default(),
                input_variables: def.input_variables,
                fragments,
            };
            if template.placeholders().is_empty() {
                warn!("template {:?} has no placeholder; if this is intended, ignore this message", name);
            }
            for placeholder in template.placeholders() {
                if !template.input_variables.contains(&placeholder) {
                    warn!("template {:?} references placeholder {:?} that is not in its declared input_variables",
                          name, placeholder);
                }
            }
            templates.insert(name, template);
        }
        info!("loaded {} templates", templates.len());
        Ok(Self { templates })
    }

    /// Reads and parses a JSON definition file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DefinitionError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| DefinitionError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&source)
    }

    /// Looks a template up by name.
    pub fn get(&self, name: &str) -> Result<&Template, TemplateNotFound> {
        self.templates.get(name).ok_or_else(|| TemplateNotFound {
            name: name.to_string(),
            available: self.templates.keys().cloned().collect(),
        })
    }

    /// Lists template names, sorted, optionally restricted to those starting
    /// with the given category prefix (e.g. "sentiment").
    pub fn list(&self, category: Option<&str>) -> Vec<&str> {
        self.templates
            .keys()
            .map(String::as_str)
            .filter(|name| category.map_or(true, |prefix| name.starts_with(prefix)))
            .collect()
    }

    /// Groups template names by category, the part of the name before its
    /// first `_` separator (e.g. "sentiment_v1" belongs to "sentiment").
    pub fn categories(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for name in self.templates.keys() {
            let category = name.split('_').next().unwrap_or(name.as_str());
            grouped.entry(category).or_default().push(name.as_str());
        }
        grouped
    }

    /// Replaces the whole template set from a JSON string. On failure the
    /// previous set stays in place.
    pub fn reload_from_json_str(&mut self, source: &str) -> Result<(), DefinitionError> {
        let fresh = Self::from_json_str(source)?;
        *self = fresh;
        info!("reloaded {} templates", self.templates.len());
        Ok(())
    }

    /// Replaces the whole template set from a JSON file. On failure the
    /// previous set stays in place.
    pub fn reload_from_json_file(&mut self, path: impl AsRef<Path>) -> Result<(), DefinitionError> {
        let fresh = Self::from_json_file(path)?;
        *self = fresh;
        info!("reloaded {} templates", self.templates.len());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

pub mod errors {
    use std::error::Error;
    use std::fmt;
    use std::fmt::Formatter;

    /// Error when the template definition source is absent or malformed.
    /// The whole load is aborted; no partial template set is retained.
    #[derive(Debug)]
    pub enum DefinitionError {
        /// The definition file could not be read.
        Read { path: String, source: std::io::Error },
        /// The definition source is not valid JSON of the expected shape.
        Parse(serde_json::Error),
        /// A template entry lacks its `messages` list.
        MissingMessages { template: String },
    }

    impl fmt::Display for DefinitionError {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            match self {
                DefinitionError::Read { path, source } =>
                    write!(f, "cannot read template definition file {}: {}", path, source),
                DefinitionError::Parse(e) =>
                    write!(f, "invalid template definition source: {}", e),
                DefinitionError::MissingMessages { template } =>
                    write!(f, "template {:?} is missing its 'messages' list", template),
            }
        }
    }

    impl Error for DefinitionError {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            match self {
                DefinitionError::Read { source, .. } => Some(source),
                DefinitionError::Parse(e) => Some(e),
                DefinitionError::MissingMessages { .. } => None,
            }
        }
    }

    /// Error when looking up a template name that is not in the library.
    /// Enumerates the available names to make typos easy to spot.
    #[derive(Debug)]
    pub struct TemplateNotFound {
        pub name: String,
        pub available: Vec<String>,
    }

    impl fmt::Display for TemplateNotFound {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "template {:?} not found, available templates: {}",
                   self.name, self.available.join(", "))
        }
    }

    impl Error for TemplateNotFound {}
}

#[cfg(test)]
mod template_tests {
    use super::{Role, TemplateLibrary};
    use super::errors::DefinitionError;

    const SOURCE: &str = r#"{
        "sentiment_v1": {
            "pattern": "Zero-Shot",
            "description": "Simple sentiment",
            "input_variables": ["text"],
            "messages": [
                {"role": "system", "content": "You classify sentiment."},
                {"role": "user", "content": ["Text:", "{[text]}"]}
            ]
        },
        "sentiment_v2": {
            "input_variables": ["text"],
            "messages": [
                {"role": "user", "content": "Classify: {[text]}"}
            ]
        },
        "support_v1": {
            "input_variables": ["query"],
            "messages": [
                {"role": "system", "content": "You are a support agent."},
                {"role": "user", "content": "{[query]}"}
            ]
        }
    }"#;

    #[test]
    fn test_load_preserves_fragments_and_roles() {
        let library = TemplateLibrary::from_json_str(SOURCE).unwrap();
        assert_eq!(3, library.len());

        let template = library.get("sentiment_v1").unwrap();
        assert_eq!(2, template.fragments.len());
        assert_eq!(Role::System, template.fragments[0].role);
        assert_eq!(Role::User, template.fragments[1].role);
        // list content joined with newlines at load time
        assert_eq!("Text:\n{[text]}", template.fragments[1].content);
        assert_eq!(vec!["text".to_string()], template.input_variables);
        assert_eq!("Zero-Shot", template.pattern);
    }

    #[test]
    fn test_get_unknown_enumerates_available() {
        let library = TemplateLibrary::from_json_str(SOURCE).unwrap();
        let err = library.get("sentiment_v9").unwrap_err();
        assert_eq!("sentiment_v9", err.name);
        assert_eq!(
            vec!["sentiment_v1".to_string(), "sentiment_v2".to_string(), "support_v1".to_string()],
            err.available
        );
        assert!(err.to_string().contains("sentiment_v1"));
    }

    #[test]
    fn test_list_sorted_and_filtered() {
        let library = TemplateLibrary::from_json_str(SOURCE).unwrap();
        assert_eq!(vec!["sentiment_v1", "sentiment_v2", "support_v1"], library.list(None));
        assert_eq!(vec!["sentiment_v1", "sentiment_v2"], library.list(Some("sentiment")));
        assert!(library.list(Some("code")).is_empty());
    }

    #[test]
    fn test_categories_split_on_first_separator() {
        let library = TemplateLibrary::from_json_str(SOURCE).unwrap();
        let categories = library.categories();
        assert_eq!(vec!["sentiment_v1", "sentiment_v2"], categories["sentiment"]);
        assert_eq!(vec!["support_v1"], categories["support"]);
    }

    #[test]
    fn test_missing_messages_fails_whole_load() {
        let source = r#"{
            "ok_v1": {"input_variables": [], "messages": [{"role": "user", "content": "hi"}]},
            "broken_v1": {"input_variables": ["text"]}
        }"#;
        let err = TemplateLibrary::from_json_str(source).unwrap_err();
        match err {
            DefinitionError::MissingMessages { template } => assert_eq!("broken_v1", template),
            other => panic!("expected MissingMessages, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_source_is_parse_error() {
        let err = TemplateLibrary::from_json_str("not json at all").unwrap_err();
        assert!(matches!(err, DefinitionError::Parse(_)));

        let err = TemplateLibrary::from_json_str(r#"{"t": {"messages": [{"role": "robot", "content": "hi"}]}}"#)
            .unwrap_err();
        assert!(matches!(err, DefinitionError::Parse(_)));
    }

    #[test]
    fn test_reload_failure_keeps_previous_set() {
        let mut library = TemplateLibrary::from_json_str(SOURCE).unwrap();
        assert!(library.reload_from_json_str("{broken").is_err());
        assert_eq!(3, library.len());
        assert!(library.get("sentiment_v1").is_ok());

        library
            .reload_from_json_str(r#"{"other_v1": {"messages": [{"role": "user", "content": "{[x]}"}]}}"#)
            .unwrap();
        assert_eq!(1, library.len());
        assert!(library.get("sentiment_v1").is_err());
    }
}
