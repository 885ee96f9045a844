//! Configuration Error Types
//!
//! Error handling for loading and validating the processor configuration.
//! Every failure names the option or file it relates to so that a process
//! initializer can report it and abort startup.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Explicitly requested configuration file does not exist
    #[error("Configuration file not found. Searched paths: {searched_paths:?}")]
    ConfigFileNotFound { searched_paths: Vec<PathBuf> },

    /// Invalid YAML syntax in configuration file
    #[error("Invalid YAML in configuration file '{file_path}': {error}")]
    InvalidYaml { file_path: String, error: String },

    /// File I/O errors during configuration loading
    #[error("Failed to read configuration file '{file_path}': {error}")]
    FileReadError { file_path: String, error: String },

    /// One or more required fields are absent at validation time
    #[error("Missing required configuration field(s) {} in {context}", quoted(.fields))]
    MissingRequiredField {
        fields: Vec<String>,
        context: String,
    },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// Unknown configuration option
    #[error("Unknown configuration field: {field} in component {component}")]
    UnknownField { field: String, component: String },

    /// Failure while merging or deserializing the layered sources
    #[error("Failed to build configuration from sources: {error}")]
    SourceError { error: String },

    /// The input expression was rejected by the expression compiler
    #[error("Invalid input expression '{expression}': {error}")]
    InvalidExpression { expression: String, error: String },
}

fn quoted(fields: &[String]) -> String {
    fields
        .iter()
        .map(|field| format!("'{field}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ConfigurationError {
    /// Create a configuration file not found error
    pub fn config_file_not_found(searched_paths: Vec<PathBuf>) -> Self {
        Self::ConfigFileNotFound { searched_paths }
    }

    /// Create an invalid YAML error
    pub fn invalid_yaml<P: Into<String>, E: std::fmt::Display>(file_path: P, error: E) -> Self {
        Self::InvalidYaml {
            file_path: file_path.into(),
            error: error.to_string(),
        }
    }

    /// Create a file read error
    pub fn file_read_error<P: Into<String>, E: std::fmt::Display>(file_path: P, error: E) -> Self {
        Self::FileReadError {
            file_path: file_path.into(),
            error: error.to_string(),
        }
    }

    /// Create a missing required field error for a single field
    pub fn missing_required_field<F: Into<String>, C: Into<String>>(field: F, context: C) -> Self {
        Self::MissingRequiredField {
            fields: vec![field.into()],
            context: context.into(),
        }
    }

    /// Create a missing required field error naming several fields
    pub fn missing_required_fields<I, F, C>(fields: I, context: C) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
        C: Into<String>,
    {
        Self::MissingRequiredField {
            fields: fields.into_iter().map(Into::into).collect(),
            context: context.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value<F: Into<String>, V: Into<String>, C: Into<String>>(
        field: F,
        value: V,
        context: C,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }

    /// Create an unknown field error
    pub fn unknown_field<F: Into<String>, C: Into<String>>(field: F, component: C) -> Self {
        Self::UnknownField {
            field: field.into(),
            component: component.into(),
        }
    }

    /// Create a source error
    pub fn source_error<E: std::fmt::Display>(error: E) -> Self {
        Self::SourceError {
            error: error.to_string(),
        }
    }

    /// Create an invalid expression error
    pub fn invalid_expression<X: Into<String>, E: std::fmt::Display>(
        expression: X,
        error: E,
    ) -> Self {
        Self::InvalidExpression {
            expression: expression.into(),
            error: error.to_string(),
        }
    }

    /// Names of the missing fields, empty for every other variant
    pub fn missing_fields(&self) -> &[String] {
        match self {
            Self::MissingRequiredField { fields, .. } => fields,
            _ => &[],
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(error: config::ConfigError) -> Self {
        Self::source_error(error)
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigurationError>;
