//! Configuration Loader
//!
//! Builds a [`ModelProcessorConfig`] from layered sources, lowest precedence
//! first:
//!
//! 1. Defaults of the record
//! 2. An optional YAML file, read from its `tensorflow:` section when present
//! 3. `TENSORFLOW_*` environment variables
//! 4. Explicit overrides, typically bound from the command line
//!
//! The YAML file may carry per-environment sections (`development`, `test`,
//! `production`, ...) inside the options, which are merged over the base
//! values for the active environment.

use super::error::{ConfigResult, ConfigurationError};
use super::{ModelProcessorConfig, ValidatedConfig, CONFIG_PREFIX};
use config::{Config, Environment, File, FileFormat, Map};
use serde_yaml::{Mapping, Value as YamlValue};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Options recognized under the `tensorflow` prefix, in snake_case
pub const KNOWN_OPTIONS: [&str; 5] = ["model", "model_fetch", "expression", "mode", "output_name"];

/// Prefix of the environment variables read by the loader
const ENV_PREFIX: &str = "TENSORFLOW";

/// Environment names whose sections are stripped from the file after merging
const ENVIRONMENT_SECTIONS: [&str; 3] = ["development", "test", "production"];

const MAX_CONFIG_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB limit

/// Layered configuration loader for the processor
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    environment: String,
    use_env_vars: bool,
    overrides: Vec<(String, String)>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader reading environment variables, with the environment auto-detected
    pub fn new() -> Self {
        Self {
            file: None,
            environment: Self::detect_environment(),
            use_env_vars: true,
            overrides: Vec::new(),
        }
    }

    /// Read options from a YAML file; the file must exist
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Use an explicit environment instead of the detected one
    /// This is useful for testing without modifying global environment variables
    pub fn with_environment<E: Into<String>>(mut self, environment: E) -> Self {
        self.environment = environment.into();
        self
    }

    /// Ignore `TENSORFLOW_*` environment variables
    pub fn without_env_vars(mut self) -> Self {
        self.use_env_vars = false;
        self
    }

    /// Highest precedence value for one option, e.g. `model-fetch=a,b`
    pub fn with_override<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Detect the active environment from `TENSORFLOW_ENV`, then `APP_ENV`
    pub fn detect_environment() -> String {
        crate::logging::get_environment()
    }

    /// Load the record without validating it
    pub fn load(&self) -> ConfigResult<ModelProcessorConfig> {
        debug!(
            environment = %self.environment,
            file = ?self.file,
            use_env_vars = self.use_env_vars,
            overrides = self.overrides.len(),
            "Loading model processor configuration"
        );

        let mut builder = Config::builder();

        if let Some(path) = &self.file {
            let options = self.load_file_options(path)?;
            let yaml = serde_yaml::to_string(&options).map_err(|e| {
                ConfigurationError::invalid_yaml(path.display().to_string(), e)
            })?;
            builder = builder.add_source(File::from_str(&yaml, FileFormat::Yaml));
        }

        if self.use_env_vars {
            let (vars, fetch) = environment_options(std::env::vars());
            // Values stay strings so `007` or `true` reach the record verbatim
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .source(Some(vars)),
            );
            // Env outranks the file; explicit overrides below replace this key
            if let Some(list) = fetch {
                builder = builder.set_override("model_fetch", split_list(&list))?;
            }
        }

        for (key, value) in &self.overrides {
            let option = normalize_override_key(key)?;
            builder = if option == "model_fetch" {
                builder.set_override(option, split_list(value))?
            } else {
                builder.set_override(option, value.as_str())?
            };
        }

        let config: ModelProcessorConfig = builder.build()?.try_deserialize()?;

        crate::log_config!(debug, "Model processor configuration loaded",
            environment: self.environment,
            model: config.model().map(|m| m.redacted()),
            mode: config.mode(),
            model_fetch: config.model_fetch()
        );

        Ok(config)
    }

    /// Load and validate, ready to be shared with the pipeline
    pub fn load_validated(&self) -> ConfigResult<Arc<ValidatedConfig>> {
        let config = self.load()?.into_validated()?;

        crate::log_config!(info, "Model processor configuration validated",
            environment: self.environment,
            model: config.model().redacted(),
            mode: config.mode(),
            output_name: config.output_name()
        );
        debug!(
            "Effective configuration: {}",
            serde_json::to_string_pretty(&config.to_log_value())
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        Ok(Arc::new(config))
    }

    /// Read the file, pick the options section and merge the environment section
    fn load_file_options(&self, path: &Path) -> ConfigResult<Mapping> {
        let content = read_config_file_safely(path)?;

        let document: YamlValue = serde_yaml::from_str(&content)
            .map_err(|e| ConfigurationError::invalid_yaml(path.display().to_string(), e))?;

        let mut options = match options_section(document) {
            Some(YamlValue::Mapping(map)) => normalize_keys(map),
            Some(YamlValue::Null) | None => Mapping::new(),
            Some(other) => {
                return Err(ConfigurationError::invalid_yaml(
                    path.display().to_string(),
                    format!(
                        "'{CONFIG_PREFIX}' section must be a mapping, found {}",
                        yaml_kind(&other)
                    ),
                ))
            }
        };

        let env_key = YamlValue::String(self.environment.clone());
        if let Some(env_overrides) = options.get(&env_key).cloned() {
            debug!(
                "Applying environment-specific overrides for: {}",
                self.environment
            );
            match env_overrides {
                YamlValue::Mapping(section) => {
                    for (key, value) in section {
                        if let Some(existing_value) = options.get_mut(&key) {
                            merge_yaml_values(existing_value, value);
                        } else {
                            options.insert(key, value);
                        }
                    }
                }
                YamlValue::Null => {}
                other => {
                    return Err(ConfigurationError::invalid_yaml(
                        path.display().to_string(),
                        format!(
                            "environment section '{}' must be a mapping, found {}",
                            self.environment,
                            yaml_kind(&other)
                        ),
                    ))
                }
            }
        }

        // Remove environment sections to avoid confusion
        options.remove(&env_key);
        for section in ENVIRONMENT_SECTIONS {
            options.remove(YamlValue::String(section.to_string()));
        }

        // model-fetch may be written as a comma separated string or left empty
        let fetch_key = YamlValue::String("model_fetch".to_string());
        match options.get(&fetch_key) {
            Some(YamlValue::String(list)) => {
                let items = split_list(list).into_iter().map(YamlValue::String).collect();
                options.insert(fetch_key, YamlValue::Sequence(items));
            }
            Some(YamlValue::Null) => {
                options.remove(&fetch_key);
            }
            _ => {}
        }

        for key in options.keys() {
            if let Some(name) = key.as_str() {
                if !KNOWN_OPTIONS.contains(&name) {
                    warn!(
                        option = name,
                        file = %path.display(),
                        "Ignoring unknown configuration option"
                    );
                }
            }
        }

        Ok(options)
    }
}

/// Safely read a configuration file with size limits
fn read_config_file_safely(path: &Path) -> ConfigResult<String> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigurationError::config_file_not_found(vec![path.to_path_buf()])
        } else {
            ConfigurationError::file_read_error(path.display().to_string(), e)
        }
    })?;

    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigurationError::invalid_value(
            "file_size",
            metadata.len().to_string(),
            format!(
                "Configuration file too large ({}MB > {}MB limit)",
                metadata.len() / (1024 * 1024),
                MAX_CONFIG_FILE_SIZE / (1024 * 1024)
            ),
        ));
    }

    if !metadata.is_file() {
        return Err(ConfigurationError::invalid_value(
            "file_type",
            "directory or special file",
            "Configuration path must point to a regular file",
        ));
    }

    std::fs::read_to_string(path)
        .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))
}

/// The `tensorflow:` section when present, the whole document otherwise
fn options_section(document: YamlValue) -> Option<YamlValue> {
    match document {
        YamlValue::Mapping(mut map) => {
            let prefixed = map.remove(YamlValue::String(CONFIG_PREFIX.to_string()));
            Some(prefixed.unwrap_or(YamlValue::Mapping(map)))
        }
        YamlValue::Null => None,
        other => Some(other),
    }
}

/// Lowercase keys and turn kebab-case into snake_case, recursively
fn normalize_keys(map: Mapping) -> Mapping {
    map.into_iter()
        .map(|(key, value)| {
            let key = match key {
                YamlValue::String(name) => YamlValue::String(normalize_option_name(&name)),
                other => other,
            };
            let value = match value {
                YamlValue::Mapping(nested) => YamlValue::Mapping(normalize_keys(nested)),
                other => other,
            };
            (key, value)
        })
        .collect()
}

fn normalize_option_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('-', "_")
}

/// Map a command-line style key onto a known option
fn normalize_override_key(key: &str) -> ConfigResult<&'static str> {
    let name = normalize_option_name(key);
    let name = name
        .strip_prefix(CONFIG_PREFIX)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(&name);

    KNOWN_OPTIONS
        .into_iter()
        .find(|option| *option == name)
        .ok_or_else(|| ConfigurationError::unknown_field(key, CONFIG_PREFIX))
}

/// Recursively merge YAML values (environment overrides into base config)
fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) {
    match (&mut *base, override_value) {
        (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
            for (key, value) in override_map {
                if let Some(existing_value) = base_map.get_mut(&key) {
                    merge_yaml_values(existing_value, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_ref, override_val) => {
            // For non-mapping values, override completely
            *base_ref = override_val;
        }
    }
}

fn yaml_kind(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "a boolean",
        YamlValue::Number(_) => "a number",
        YamlValue::String(_) => "a string",
        YamlValue::Sequence(_) => "a sequence",
        YamlValue::Mapping(_) => "a mapping",
        YamlValue::Tagged(_) => "a tagged value",
    }
}

/// Comma separated option value into trimmed, non-empty names
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Recognized `TENSORFLOW_*` variables, with `model_fetch` held back for list splitting
fn environment_options<I>(vars: I) -> (Map<String, String>, Option<String>)
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut options = Map::new();
    let mut fetch = None;

    for (name, value) in vars {
        let Some(option) = name
            .strip_prefix(ENV_PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .map(str::to_ascii_lowercase)
        else {
            continue;
        };

        if option == "model_fetch" {
            fetch = Some(value);
        } else if KNOWN_OPTIONS.contains(&option.as_str()) {
            options.insert(name, value);
        }
    }

    (options, fetch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LocatorScheme, OutputMode};
    use std::fs;
    use tempfile::TempDir;

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tensorflow.yaml");
        fs::write(&path, content).unwrap();
        (temp_dir, path)
    }

    fn file_loader(path: &Path, environment: &str) -> ConfigLoader {
        ConfigLoader::new()
            .without_env_vars()
            .with_environment(environment)
            .with_file(path)
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = ConfigLoader::new().without_env_vars().load().unwrap();
        assert_eq!(config, ModelProcessorConfig::default());
    }

    #[test]
    fn test_prefixed_section_with_kebab_keys() {
        let (_dir, path) = write_config(
            r#"
server:
  port: 8080
tensorflow:
  model: https://foo/bar/model.tar.gz#frozen_inference_graph.pb
  model-fetch:
    - detection_scores
    - detection_boxes
  expression: payload.image
  mode: tuple
  output-name: detections
"#,
        );

        let config = file_loader(&path, "development").load().unwrap();

        let model = config.model().unwrap();
        assert_eq!(model.scheme(), LocatorScheme::Https);
        assert_eq!(model.fragment(), Some("frozen_inference_graph.pb"));
        assert_eq!(config.model_fetch(), ["detection_scores", "detection_boxes"]);
        assert_eq!(config.expression().source(), Some("payload.image"));
        assert_eq!(config.mode(), Some(OutputMode::Tuple));
        assert_eq!(config.output_name(), "detections");
    }

    #[test]
    fn test_flat_document_and_comma_list() {
        let (_dir, path) = write_config(
            "model: /models/graph.pb\nmodel_fetch: \"scores, boxes,,classes\"\nmode: HEADER\n",
        );

        let config = file_loader(&path, "development").load().unwrap();
        assert_eq!(config.model_fetch(), ["scores", "boxes", "classes"]);
        assert_eq!(config.mode(), Some(OutputMode::Header));
        assert_eq!(config.output_name(), "result");
    }

    #[test]
    fn test_environment_section_overrides_base() {
        let (_dir, path) = write_config(
            r#"
tensorflow:
  model: file:/models/dev.pb
  mode: header
  production:
    model: https://models.example.com/prod.tgz
    output-name: prod_result
  test:
    mode: payload
"#,
        );

        let config = file_loader(&path, "production").load().unwrap();
        assert_eq!(config.model().unwrap().as_str(), "https://models.example.com/prod.tgz");
        assert_eq!(config.mode(), Some(OutputMode::Header));
        assert_eq!(config.output_name(), "prod_result");

        let config = file_loader(&path, "test").load().unwrap();
        assert_eq!(config.model().unwrap().as_str(), "file:/models/dev.pb");
        assert_eq!(config.mode(), Some(OutputMode::Payload));

        let config = file_loader(&path, "development").load().unwrap();
        assert_eq!(config.mode(), Some(OutputMode::Header));
        assert_eq!(config.output_name(), "result");
    }

    #[test]
    fn test_scalar_environment_section_is_rejected() {
        let (_dir, path) = write_config(
            "tensorflow:\n  model: /models/graph.pb\n  mode: tuple\n  production: oops\n",
        );

        let err = file_loader(&path, "production").load().unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidYaml { .. }));
        assert!(err
            .to_string()
            .contains("environment section 'production' must be a mapping, found a string"));

        // Other environments never look at the malformed section
        let config = file_loader(&path, "development").load().unwrap();
        assert_eq!(config.mode(), Some(OutputMode::Tuple));
    }

    #[test]
    fn test_empty_environment_section_keeps_base() {
        let (_dir, path) = write_config("tensorflow:\n  model: /models/graph.pb\n  production:\n");

        let config = file_loader(&path, "production").load().unwrap();
        assert_eq!(config.model().unwrap().as_str(), "/models/graph.pb");
    }

    #[test]
    fn test_sequence_items_are_kept_verbatim() {
        let (_dir, path) = write_config(
            "tensorflow:\n  model: /models/graph.pb\n  model-fetch:\n    - \"a,b\"\n    - \"\"\n    - scores\n",
        );

        let config = file_loader(&path, "development").load().unwrap();
        assert_eq!(config.model_fetch(), ["a,b", "", "scores"]);
    }

    #[test]
    fn test_environment_options_filtering() {
        let vars = [
            ("TENSORFLOW_OUTPUT_NAME", "007"),
            ("TENSORFLOW_MODEL_FETCH", "a, b"),
            ("TENSORFLOW_ENV", "test"),
            ("TENSORFLOW_LOG_FORMAT", "json"),
            ("TENSORFLOWMODE", "tuple"),
            ("PATH", "/usr/bin"),
        ]
        .map(|(name, value)| (name.to_string(), value.to_string()));

        let (options, fetch) = environment_options(vars);
        assert_eq!(options.len(), 1);
        assert_eq!(options.get("TENSORFLOW_OUTPUT_NAME").map(String::as_str), Some("007"));
        assert_eq!(fetch.as_deref(), Some("a, b"));
    }

    #[test]
    fn test_override_takes_precedence_over_file() {
        let (_dir, path) = write_config("tensorflow:\n  model: /models/a.pb\n  mode: tuple\n");

        let config = file_loader(&path, "development")
            .with_override("tensorflow.mode", "header")
            .with_override("model-fetch", "out_a,out_b")
            .with_override("OUTPUT_NAME", "label")
            .load()
            .unwrap();

        assert_eq!(config.mode(), Some(OutputMode::Header));
        assert_eq!(config.model_fetch(), ["out_a", "out_b"]);
        assert_eq!(config.output_name(), "label");
        assert_eq!(config.model().unwrap().as_str(), "/models/a.pb");
    }

    #[test]
    fn test_unknown_override_is_rejected() {
        let err = ConfigLoader::new()
            .without_env_vars()
            .with_override("tensorflow.batch-size", "8")
            .load()
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigurationError::UnknownField { ref field, .. } if field == "tensorflow.batch-size"
        ));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("absent.yaml");

        let err = file_loader(&missing, "development").load().unwrap_err();
        match err {
            ConfigurationError::ConfigFileNotFound { searched_paths } => {
                assert_eq!(searched_paths, vec![missing]);
            }
            other => panic!("Expected ConfigFileNotFound error, got {other:?}"),
        }
    }

    #[test]
    fn test_directory_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let err = file_loader(temp_dir.path(), "development")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { ref field, .. } if field == "file_type"));
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let (_dir, path) = write_config("tensorflow:\n  model: [unclosed\n");
        let err = file_loader(&path, "development").load().unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidYaml { .. }));
    }

    #[test]
    fn test_section_must_be_mapping() {
        let (_dir, path) = write_config("tensorflow: /models/graph.pb\n");
        let err = file_loader(&path, "development").load().unwrap_err();
        assert!(err.to_string().contains("must be a mapping"));
    }

    #[test]
    fn test_invalid_values_fail_to_load() {
        let (_dir, path) = write_config("tensorflow:\n  model: s3://bucket/graph.pb\n");
        let err = file_loader(&path, "development").load().unwrap_err();
        assert!(matches!(err, ConfigurationError::SourceError { .. }));
        assert!(err.to_string().contains("unsupported scheme"));

        let (_dir, path) = write_config("tensorflow:\n  model: /m.pb\n  mode: stream\n");
        let err = file_loader(&path, "development").load().unwrap_err();
        assert!(err.to_string().contains("expected one of: payload, header, tuple"));
    }

    #[test]
    fn test_explicit_null_mode_fails_validation() {
        let (_dir, path) = write_config("tensorflow:\n  model: /models/graph.pb\n  mode: ~\n  model-fetch:\n");

        let config = file_loader(&path, "development").load().unwrap();
        assert_eq!(config.mode(), None);
        assert!(config.model_fetch().is_empty());

        let err = config.validate().unwrap_err();
        assert_eq!(err.missing_fields(), ["tensorflow.mode"]);
    }

    #[test]
    fn test_load_validated_requires_model() {
        let (_dir, path) = write_config("tensorflow:\n  mode: header\n");
        let err = file_loader(&path, "development")
            .load_validated()
            .unwrap_err();
        assert_eq!(err.missing_fields(), ["tensorflow.model"]);
    }

    #[test]
    fn test_normalize_override_key() {
        assert_eq!(normalize_override_key("model").unwrap(), "model");
        assert_eq!(normalize_override_key("tensorflow.model-fetch").unwrap(), "model_fetch");
        assert_eq!(normalize_override_key(" Output-Name ").unwrap(), "output_name");
        assert!(normalize_override_key("tensorflow").is_err());
        assert!(normalize_override_key("tensorflowmodel").is_err());
    }

    #[test]
    fn test_merge_yaml_values() {
        let mut base: YamlValue = serde_yaml::from_str("a: 1\nnested:\n  x: 1\n  y: 2\n").unwrap();
        let overrides: YamlValue = serde_yaml::from_str("nested:\n  y: 3\nb: 4\n").unwrap();

        merge_yaml_values(&mut base, overrides);

        let expected: YamlValue =
            serde_yaml::from_str("a: 1\nnested:\n  x: 1\n  y: 3\nb: 4\n").unwrap();
        assert_eq!(base, expected);
    }
}
