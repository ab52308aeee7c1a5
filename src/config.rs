//! # Generation config presets
//! A config preset is a named bundle of generation parameters. The process
//! carries a fixed set of presets ("factual", "balanced", "creative"),
//! immutable after construction and passed by reference into the
//! orchestrator. An unrecognized preset name resolves to the default with a
//! warning instead of failing.

use std::collections::BTreeMap;

use log::warn;

/// Preset resolved when a requested name is unknown.
pub const DEFAULT_CONFIG: &str = "balanced";

/// Parameters handed to the model backend for one generation call.
#[derive(Debug, Clone, PartialEq)]
#[readonly::make]
pub struct GenerationConfig {
    /// Sampling temperature, in [0.0, 2.0].
    #[readonly]
    pub temperature: f32,

    /// Upper bound on generated tokens, positive.
    #[readonly]
    pub max_output_tokens: u32,

    /// Human description, informational.
    #[readonly]
    pub description: &'static str,
}

impl GenerationConfig {
    /// Creates a config for use with [ConfigSet::with_config]. The struct is
    /// readonly, so this is the only way to build one outside this module.
    pub fn new(temperature: f32, max_output_tokens: u32, description: &'static str) -> Self {
        Self { temperature, max_output_tokens, description }
    }
}

/// The immutable, process-wide set of named presets.
#[derive(Debug, Clone)]
pub struct ConfigSet {
    configs: BTreeMap<String, GenerationConfig>,
}

impl Default for ConfigSet {
    fn default() -> Self {
        Self::presets()
    }
}

impl ConfigSet {
    /// The fixed built-in presets.
    pub fn presets() -> Self {
        let configs = BTreeMap::from([
            ("factual".to_string(), GenerationConfig {
                temperature: 0.0,
                max_output_tokens: 500,
                description: "Deterministic, factual responses",
            }),
            ("balanced".to_string(), GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 1000,
                description: "Balanced creativity and consistency",
            }),
            ("creative".to_string(), GenerationConfig {
                temperature: 1.0,
                max_output_tokens: 1500,
                description: "Maximum creativity",
            }),
        ]);
        Self { configs }
    }

    /// Adds or replaces a named preset. The default preset cannot be removed,
    /// so [ConfigSet::resolve] always has a fallback.
    pub fn with_config(mut self, name: impl Into<String>, config: GenerationConfig) -> Self {
        self.configs.insert(name.into(), config);
        self
    }

    pub fn get(&self, name: &str) -> Option<&GenerationConfig> {
        self.configs.get(name)
    }

    /// Resolves a preset by name, falling back to [DEFAULT_CONFIG] with a
    /// warning when the name is unknown. Returns the effective name together
    /// with the config, so call metadata records what actually ran.
    pub fn resolve(&self, name: &str) -> (&str, &GenerationConfig) {
        match self.configs.get_key_value(name) {
            Some((key, config)) => (key, config),
            None => {
                warn!("unknown config preset {:?}, falling back to {:?}", name, DEFAULT_CONFIG);
                let (key, config) = self
                    .configs
                    .get_key_value(DEFAULT_CONFIG)
                    .expect("the default preset is always present");
                (key, config)
            }
        }
    }

    /// Preset names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.configs.keys().map(String::as_str).collect()
    }
}
