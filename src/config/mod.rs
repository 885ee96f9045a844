//! # TensorFlow Processor Configuration
//!
//! Settings for a stream processor that runs a pre-trained TensorFlow model
//! against inbound messages. The record is populated once at startup, validated,
//! and then shared read-only with the message pipeline.
//!
//! ## Options
//!
//! All options live under the `tensorflow` prefix:
//!
//! - `model` - locator of the frozen model graph (required)
//! - `model-fetch` - operation names whose output tensors are fetched
//! - `expression` - how to derive the model input from the message (default: payload)
//! - `mode` - `payload`, `header` or `tuple` (default: `payload`)
//! - `output-name` - key for the output in header and tuple modes (default: `result`)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tensorflow_processor_config::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new()
//!     .with_file("config/tensorflow.yaml")
//!     .load_validated()?;
//!
//! println!("model: {}", config.model());
//! println!("mode: {}", config.mode());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod expression;
pub mod loader;
pub mod locator;
pub mod output_mode;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use error::{ConfigResult, ConfigurationError};
pub use expression::{ExpressionCompiler, InputExpression, InputSource};
pub use loader::ConfigLoader;
pub use locator::{ArchiveEntry, LocatorScheme, ModelLocator, MODEL_FILE_EXTENSION};
pub use output_mode::{OutputMode, ORIGINAL_INPUT_DATA_KEY};

/// Prefix shared by every option of the processor
pub const CONFIG_PREFIX: &str = "tensorflow";

/// Output key used when `output-name` is not configured
pub const DEFAULT_OUTPUT_NAME: &str = "result";

const VALIDATION_CONTEXT: &str = "model processor configuration";

fn default_mode() -> Option<OutputMode> {
    Some(OutputMode::default())
}

fn default_output_name() -> String {
    DEFAULT_OUTPUT_NAME.to_string()
}

/// Fields that must be present before the configuration is usable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredField {
    Model,
    Mode,
}

impl RequiredField {
    /// Fully qualified option name, e.g. `tensorflow.model`
    pub fn option_name(&self) -> &'static str {
        match self {
            RequiredField::Model => "tensorflow.model",
            RequiredField::Mode => "tensorflow.mode",
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.option_name())
    }
}

/// Configuration record for the TensorFlow processor
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelProcessorConfig {
    /// Location of the pre-trained model. `file`, `http`, `https` and
    /// `classpath` schemes are supported. For archives the first `.pb` entry
    /// is used unless the fragment names one, e.g.
    /// `https://foo/bar/model.tar.gz#frozen_inference_graph.pb`.
    #[serde(default)]
    model: Option<ModelLocator>,

    /// Operation names to fetch the output tensors from, in fetch order
    #[serde(default)]
    model_fetch: Vec<String>,

    /// How to obtain the input data from the inbound message
    #[serde(default)]
    expression: InputExpression,

    /// How to store the output data and whether the input is passed through
    #[serde(default = "default_mode")]
    mode: Option<OutputMode>,

    /// Output key used by the header and tuple modes
    #[serde(default = "default_output_name")]
    output_name: String,
}

impl Default for ModelProcessorConfig {
    fn default() -> Self {
        Self {
            model: None,
            model_fetch: Vec::new(),
            expression: InputExpression::Payload,
            mode: default_mode(),
            output_name: default_output_name(),
        }
    }
}

impl ModelProcessorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(&self) -> Option<&ModelLocator> {
        self.model.as_ref()
    }

    pub fn set_model(&mut self, model: Option<ModelLocator>) {
        self.model = model;
    }

    pub fn with_model(mut self, model: ModelLocator) -> Self {
        self.model = Some(model);
        self
    }

    pub fn model_fetch(&self) -> &[String] {
        &self.model_fetch
    }

    pub fn set_model_fetch(&mut self, model_fetch: Vec<String>) {
        self.model_fetch = model_fetch;
    }

    pub fn with_model_fetch<I, S>(mut self, model_fetch: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model_fetch = model_fetch.into_iter().map(Into::into).collect();
        self
    }

    pub fn expression(&self) -> &InputExpression {
        &self.expression
    }

    pub fn set_expression(&mut self, expression: InputExpression) {
        self.expression = expression;
    }

    pub fn with_expression(mut self, expression: InputExpression) -> Self {
        self.expression = expression;
        self
    }

    pub fn mode(&self) -> Option<OutputMode> {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Option<OutputMode>) {
        self.mode = mode;
    }

    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn set_output_name<S: Into<String>>(&mut self, output_name: S) {
        self.output_name = output_name.into();
    }

    pub fn with_output_name<S: Into<String>>(mut self, output_name: S) -> Self {
        self.output_name = output_name.into();
        self
    }

    /// Required fields that are currently absent, in declaration order
    pub fn missing_required_fields(&self) -> Vec<RequiredField> {
        let mut missing = Vec::new();
        if self.model.is_none() {
            missing.push(RequiredField::Model);
        }
        if self.mode.is_none() {
            missing.push(RequiredField::Mode);
        }
        missing
    }

    /// Check that every required field is present
    pub fn validate(&self) -> ConfigResult<()> {
        if self.missing_required_fields().is_empty() {
            Ok(())
        } else {
            Err(self.missing_fields_error())
        }
    }

    /// Validate and freeze the record for the pipeline
    pub fn into_validated(self) -> ConfigResult<ValidatedConfig> {
        let (Some(model), Some(mode)) = (self.model.clone(), self.mode) else {
            return Err(self.missing_fields_error());
        };

        Ok(ValidatedConfig {
            model,
            mode,
            config: self,
        })
    }

    fn missing_fields_error(&self) -> ConfigurationError {
        ConfigurationError::missing_required_fields(
            self.missing_required_fields()
                .iter()
                .map(RequiredField::option_name),
            VALIDATION_CONTEXT,
        )
    }
}

/// Configuration that passed validation; required fields are guaranteed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    model: ModelLocator,
    mode: OutputMode,
    config: ModelProcessorConfig,
}

impl ValidatedConfig {
    pub fn model(&self) -> &ModelLocator {
        &self.model
    }

    pub fn model_fetch(&self) -> &[String] {
        self.config.model_fetch()
    }

    pub fn expression(&self) -> &InputExpression {
        self.config.expression()
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn output_name(&self) -> &str {
        self.config.output_name()
    }

    /// Compile the input expression with the pipeline's compiler
    pub fn compile_input<C: ExpressionCompiler>(
        &self,
        compiler: &C,
    ) -> ConfigResult<InputSource<C::Compiled>> {
        self.config.expression().compile(compiler)
    }

    /// JSON view for logging, with credentials in the model locator masked
    pub fn to_log_value(&self) -> serde_json::Value {
        serde_json::json!({
            "model": self.model.redacted(),
            "model_fetch": self.model_fetch(),
            "expression": self.expression().source(),
            "mode": self.mode.as_str(),
            "output_name": self.output_name(),
        })
    }

    pub fn as_config(&self) -> &ModelProcessorConfig {
        &self.config
    }

    pub fn into_inner(self) -> ModelProcessorConfig {
        self.config
    }
}
