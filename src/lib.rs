#![allow(clippy::doc_markdown)] // Allow technical terms like TensorFlow in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # TensorFlow Processor Configuration
//!
//! Configuration for a stream processor that feeds inbound messages to a
//! pre-trained TensorFlow model and attaches the model output to the outbound
//! message.
//!
//! ## Overview
//!
//! The crate declares the processor's options, their defaults and their
//! validation rules. It does not load models or evaluate expressions; the
//! message pipeline reads the validated configuration and does that work.
//!
//! ## Module Organization
//!
//! - [`config`] - Configuration record, loader and validation
//! - [`logging`] - Structured logging bootstrap
//!
//! ## Quick Start
//!
//! ```rust
//! use tensorflow_processor_config::{ModelLocator, ModelProcessorConfig, OutputMode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ModelProcessorConfig::new()
//!     .with_model(ModelLocator::parse("https://foo/bar/model.tar.gz#frozen_inference_graph.pb")?)
//!     .with_model_fetch(["detection_boxes", "detection_scores"])
//!     .with_mode(OutputMode::Tuple)
//!     .into_validated()?;
//!
//! assert_eq!(config.output_name(), "result");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod logging;

pub use crate::config::{
    ConfigLoader, ConfigResult, ConfigurationError, ExpressionCompiler, InputExpression,
    InputSource, ModelLocator, ModelProcessorConfig, OutputMode, RequiredField, ValidatedConfig,
};
