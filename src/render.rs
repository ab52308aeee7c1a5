//! # Template renderer
//! Binds a validated variable set into a template's message fragments,
//! producing the ordered message sequence a model backend consumes. The
//! placeholders found in fragment content are authoritative: rendering fails
//! if any of them has no binding, even when the template's declared
//! `input_variables` list did not mention it.

use crate::template::{Role, Template};
use crate::utils::placeholders::replace_placeholders;
use crate::utils::Variables;

/// One rendered, role-tagged message, ready for a backend call. Transient:
/// owned by a single generation call and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Substitutes every placeholder in every fragment, preserving fragment order
/// and role tags.
pub fn render(template: &Template, variables: &Variables) -> Result<Vec<Message>, RenderError> {
    template
        .fragments
        .iter()
        .map(|fragment| {
            replace_placeholders(&fragment.content, variables)
                .map(|content| Message { role: fragment.role, content })
                .map_err(|unbound| RenderError {
                    template: template.name.clone(),
                    unbound,
                })
        })
        .collect()
}

/// Error when a fragment references a placeholder absent from the binding.
#[derive(Debug)]
pub struct RenderError {
    pub template: String,
    /// Placeholder names with no binding, sorted.
    pub unbound: Vec<String>,
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot render template {:?}, unbound placeholders: {}",
               self.template, self.unbound.join(", "))
    }
}

impl std::error::Error for RenderError {}
