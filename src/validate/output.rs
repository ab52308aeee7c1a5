use std::error::Error;
use std::fmt;
use std::fmt::Formatter;

use serde_json::Value;

use crate::utils::JsonMap;

/// Strips a markdown code fence around a model response.
///
/// Models often wrap JSON in a fenced block, optionally language-tagged
/// (```` ```json ````). This removes a leading fence marker with its tag, a
/// trailing fence marker, and surrounding whitespace. Idempotent: cleaning
/// already-clean text is a no-op.
///
/// # Example
/// ```
/// use promptsmith::validate::output::clean_fenced;
/// assert_eq!("{\"a\": 1}", clean_fenced("```json\n{\"a\": 1}\n```"));
/// assert_eq!("{\"a\": 1}", clean_fenced("{\"a\": 1}"));
/// ```
pub fn clean_fenced(response: &str) -> &str {
    let mut text = response.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // drop the language tag glued to the fence, e.g. "json"
        let tag_len = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .map(char::len_utf8)
            .sum::<usize>();
        text = &rest[tag_len..];
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Cleans a raw model response and parses it as a JSON object.
///
/// If `required_fields` is given, every listed field must be present in the
/// parsed object; all absent fields are reported together.
pub fn parse_json(response: &str, required_fields: Option<&[&str]>) -> Result<JsonMap, OutputError> {
    let cleaned = clean_fenced(response);
    let value: Value = serde_json::from_str(cleaned).map_err(OutputError::Parse)?;
    let map = match value {
        Value::Object(map) => map,
        _ => return Err(OutputError::NotAnObject),
    };
    if let Some(required) = required_fields {
        let missing: Vec<String> = required
            .iter()
            .filter(|field| !map.contains_key(**field))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(OutputError::MissingFields(missing));
        }
    }
    Ok(map)
}

/// Error raised when a model response fails structured-output validation.
#[derive(Debug)]
pub enum OutputError {
    /// The cleaned response is not valid JSON; carries the parse diagnostic.
    Parse(serde_json::Error),
    /// The cleaned response is valid JSON but not an object at the top level.
    NotAnObject,
    /// Required fields absent from the parsed object, in declaration order.
    MissingFields(Vec<String>),
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::Parse(e) => write!(f, "invalid JSON response: {}", e),
            OutputError::NotAnObject => write!(f, "response is not a JSON object at the top level"),
            OutputError::MissingFields(fields) =>
                write!(f, "missing required fields in output: {}", fields.join(", ")),
        }
    }
}

impl Error for OutputError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            OutputError::Parse(e) => Some(e),
            _ => None,
        }
    }
}
