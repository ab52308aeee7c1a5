use std::error::Error;
use std::fmt;
use std::fmt::Formatter;

use crate::utils::Variables;

/// Upper bound on a single variable value, in characters.
pub const MAX_VALUE_CHARS: usize = 10_000;

/// Phrases that mark a value as a likely prompt-injection attempt. Matching
/// is case-insensitive. This is a best-effort heuristic guard, not a security
/// boundary.
const INJECTION_DENYLIST: &[&str] = &[
    "ignore previous instructions",
    "ignore all previous instructions",
    "disregard previous instructions",
];

/// Checks a variable binding against a template's declared required names.
///
/// All problems of one kind are reported together: a missing-fields error
/// lists every absent name, an empty-values error lists every blank field.
/// Pure: no side effects, the binding is left untouched.
pub fn validate_variables(variables: &Variables, required: &[String]) -> Result<(), InputError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !variables.contains_key(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(InputError::MissingFields(missing));
    }

    let mut empty: Vec<String> = variables
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name.clone())
        .collect();
    if !empty.is_empty() {
        empty.sort();
        return Err(InputError::EmptyValues(empty));
    }

    for (name, value) in variables {
        if value.chars().count() > MAX_VALUE_CHARS {
            return Err(InputError::OversizedValue { field: name.clone() });
        }
        let lowered = value.to_lowercase();
        if INJECTION_DENYLIST.iter().any(|phrase| lowered.contains(phrase)) {
            return Err(InputError::InjectionSuspected { field: name.clone() });
        }
    }

    Ok(())
}

/// Error raised by [validate_variables]. Each variant aborts the call before
/// any template rendering or backend invocation happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Required fields absent from the binding, in declaration order.
    MissingFields(Vec<String>),
    /// Fields whose value is empty or all-whitespace, sorted.
    EmptyValues(Vec<String>),
    /// A field value exceeds [MAX_VALUE_CHARS].
    OversizedValue { field: String },
    /// A field value matched the injection denylist.
    InjectionSuspected { field: String },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InputError::MissingFields(fields) =>
                write!(f, "missing required fields: {}", fields.join(", ")),
            InputError::EmptyValues(fields) =>
                write!(f, "empty values for fields: {}", fields.join(", ")),
            InputError::OversizedValue { field } =>
                write!(f, "value for {:?} is too long (max {} characters)", field, MAX_VALUE_CHARS),
            InputError::InjectionSuspected { field } =>
                write!(f, "suspicious input detected in {:?}", field),
        }
    }
}

impl Error for InputError {}
