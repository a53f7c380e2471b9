//! Trace Configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which attribute keys carry the canonical input/output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoKeys {
    /// `braintrust.input_json` / `braintrust.output_json`
    #[default]
    Json,
    /// `braintrust.input` / `braintrust.output`
    Plain,
}

/// Trace configuration
///
/// Controls what data is recorded on the spans produced by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Enable or disable tracing. When disabled every request is forwarded untouched.
    pub enabled: bool,

    /// Record input messages and prompts
    ///
    /// You might want to disable this to avoid recording sensitive information,
    /// to reduce data transfers, or to increase performance.
    pub record_inputs: bool,

    /// Record output messages and completions
    ///
    /// You might want to disable this to avoid recording sensitive information,
    /// to reduce data transfers, or to increase performance.
    pub record_outputs: bool,

    /// Record usage/token metrics
    pub record_usage: bool,

    /// Attribute keys used for input/output
    pub io_keys: IoKeys,

    /// Static metadata merged into every span's metadata
    pub metadata: BTreeMap<String, String>,

    /// Tags attached to every span
    pub tags: Vec<String>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            record_inputs: true,
            record_outputs: true,
            record_usage: true,
            io_keys: IoKeys::Json,
            metadata: BTreeMap::new(),
            tags: Vec::new(),
        }
    }
}

impl TraceConfig {
    /// Create a new builder
    pub fn builder() -> TraceConfigBuilder {
        TraceConfigBuilder::default()
    }

    /// Create a configuration for development (all recording enabled)
    pub fn development() -> Self {
        Self::default()
    }

    /// Create a configuration for production (inputs and outputs not recorded)
    pub fn production() -> Self {
        Self {
            record_inputs: false,
            record_outputs: false,
            ..Default::default()
        }
    }

    /// Create a disabled configuration
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Attribute key for the canonical input
    pub fn input_key(&self) -> &'static str {
        match self.io_keys {
            IoKeys::Json => super::attributes::INPUT_JSON,
            IoKeys::Plain => super::attributes::INPUT,
        }
    }

    /// Attribute key for the canonical output
    pub fn output_key(&self) -> &'static str {
        match self.io_keys {
            IoKeys::Json => super::attributes::OUTPUT_JSON,
            IoKeys::Plain => super::attributes::OUTPUT,
        }
    }
}

/// Builder for TraceConfig
#[derive(Debug, Clone)]
pub struct TraceConfigBuilder {
    enabled: bool,
    record_inputs: bool,
    record_outputs: bool,
    record_usage: bool,
    io_keys: IoKeys,
    metadata: BTreeMap<String, String>,
    tags: Vec<String>,
}

impl Default for TraceConfigBuilder {
    fn default() -> Self {
        let defaults = TraceConfig::default();
        Self {
            enabled: defaults.enabled,
            record_inputs: defaults.record_inputs,
            record_outputs: defaults.record_outputs,
            record_usage: defaults.record_usage,
            io_keys: defaults.io_keys,
            metadata: defaults.metadata,
            tags: defaults.tags,
        }
    }
}

impl TraceConfigBuilder {
    /// Enable or disable tracing
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Record input messages and prompts
    pub fn record_inputs(mut self, record: bool) -> Self {
        self.record_inputs = record;
        self
    }

    /// Record output messages and completions
    pub fn record_outputs(mut self, record: bool) -> Self {
        self.record_outputs = record;
        self
    }

    /// Record usage/token metrics
    pub fn record_usage(mut self, record: bool) -> Self {
        self.record_usage = record;
        self
    }

    /// Select the input/output attribute keys
    pub fn io_keys(mut self, keys: IoKeys) -> Self {
        self.io_keys = keys;
        self
    }

    /// Add metadata
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add a tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add multiple tags
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Build the configuration
    pub fn build(self) -> TraceConfig {
        TraceConfig {
            enabled: self.enabled,
            record_inputs: self.record_inputs,
            record_outputs: self.record_outputs,
            record_usage: self.record_usage,
            io_keys: self.io_keys,
            metadata: self.metadata,
            tags: self.tags,
        }
    }
}
