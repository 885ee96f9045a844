//! Input expression handling
//!
//! The processor derives the model input either from the raw message payload
//! or from an expression evaluated against the inbound message, for example
//! `payload.image` or `headers[frame]`. Parsing and evaluating the expression
//! belongs to the message pipeline; this module only carries the source text
//! and hands it to an [`ExpressionCompiler`].

use super::error::{ConfigResult, ConfigurationError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Where the model input comes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputExpression {
    /// No expression configured; the raw payload is the input
    #[default]
    Payload,
    /// Expression source to evaluate against the inbound message
    Expression(String),
}

impl InputExpression {
    /// Blank sources mean no expression
    pub fn from_source<S: Into<String>>(source: S) -> Self {
        let source = source.into();
        if source.trim().is_empty() {
            InputExpression::Payload
        } else {
            InputExpression::Expression(source)
        }
    }

    pub fn source(&self) -> Option<&str> {
        match self {
            InputExpression::Payload => None,
            InputExpression::Expression(source) => Some(source),
        }
    }

    pub fn is_payload(&self) -> bool {
        matches!(self, InputExpression::Payload)
    }

    /// Compile the expression with the pipeline's compiler
    pub fn compile<C: ExpressionCompiler>(
        &self,
        compiler: &C,
    ) -> ConfigResult<InputSource<C::Compiled>> {
        match self {
            InputExpression::Payload => Ok(InputSource::Payload),
            InputExpression::Expression(source) => compiler
                .compile(source)
                .map(InputSource::Expression)
                .map_err(|e| ConfigurationError::invalid_expression(source.as_str(), e)),
        }
    }
}

impl fmt::Display for InputExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputExpression::Payload => f.write_str("<payload>"),
            InputExpression::Expression(source) => f.write_str(source),
        }
    }
}

impl Serialize for InputExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.source().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for InputExpression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source: Option<String> = Option::deserialize(deserializer)?;
        Ok(source.map_or(InputExpression::Payload, InputExpression::from_source))
    }
}

/// Turns expression source text into a handle the pipeline can evaluate
pub trait ExpressionCompiler {
    type Compiled;
    type Error: fmt::Display;

    fn compile(&self, source: &str) -> Result<Self::Compiled, Self::Error>;
}

/// Compiled form of [`InputExpression`], ready for evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource<E> {
    Payload,
    Expression(E),
}

impl<E> InputSource<E> {
    pub fn expression(&self) -> Option<&E> {
        match self {
            InputSource::Payload => None,
            InputSource::Expression(compiled) => Some(compiled),
        }
    }
}
