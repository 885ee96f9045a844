//! Output attachment modes

use super::error::{ConfigResult, ConfigurationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tuple key under which the original input is kept in [`OutputMode::Tuple`]
pub const ORIGINAL_INPUT_DATA_KEY: &str = "original.input.data";

/// How the model output is attached to the outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutputMode {
    /// Output replaces the payload; the input is discarded
    #[default]
    Payload,
    /// Output is stored in the `output_name` header; the input passes through
    Header,
    /// Output is stored under `output_name` in a tuple payload that also keeps
    /// the input under [`ORIGINAL_INPUT_DATA_KEY`]. An input tuple that already
    /// carries that key is copied into the new tuple.
    Tuple,
}

impl OutputMode {
    pub const ALL: [OutputMode; 3] = [OutputMode::Payload, OutputMode::Header, OutputMode::Tuple];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Payload => "payload",
            OutputMode::Header => "header",
            OutputMode::Tuple => "tuple",
        }
    }

    /// Whether the inbound payload survives into the outbound message
    pub fn passes_input_through(&self) -> bool {
        !matches!(self, OutputMode::Payload)
    }

    /// Whether `output_name` is consulted when attaching the output
    pub fn uses_output_name(&self) -> bool {
        matches!(self, OutputMode::Header | OutputMode::Tuple)
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for OutputMode {
    type Error = ConfigurationError;

    fn try_from(value: String) -> ConfigResult<Self> {
        value.parse()
    }
}

impl From<OutputMode> for String {
    fn from(mode: OutputMode) -> Self {
        mode.as_str().to_string()
    }
}

impl FromStr for OutputMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        OutputMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| {
                ConfigurationError::invalid_value(
                    "tensorflow.mode",
                    s,
                    "expected one of: payload, header, tuple",
                )
            })
    }
}
