//! # Input and output validation
//! [input] checks a per-call variable binding against a template's declared
//! requirements before any rendering happens. [output] post-processes raw
//! model responses: fence stripping and JSON parsing with required-field
//! checks. Both sides are pure functions with typed errors, so callers can
//! branch on error kind instead of matching on message text.

pub mod input;
pub mod output;
