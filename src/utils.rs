pub mod placeholders;

use std::collections::HashMap;
use serde_json::{Map, Value};

pub type JsonMap = Map<String, Value>;

/// Per-call binding from variable name to value. Not retained after a call.
pub type Variables = HashMap<String, String>;
