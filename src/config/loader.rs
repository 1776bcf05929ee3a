// src/config/loader.rs
//! Configuration loader: layered TOML files plus environment overrides

use crate::config::constants::paths;
use crate::config::AcquisitionConfig;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Prefix of environment overrides. Sections are separated by a double
/// underscore, e.g. `EEG_CONNECTION__ADDRESS=/dev/rfcomm0`.
pub const ENV_PREFIX: &str = "EEG_";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("configuration parse error: {0}")]
    Parse(String),

    #[error("configuration validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("configuration io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Loads [`AcquisitionConfig`] from an ordered list of files.
///
/// Files later in the list override keys of earlier ones; missing files are
/// skipped. Environment variables starting with [`ENV_PREFIX`] are applied
/// last.
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    apply_env: bool,
    current_config: Arc<RwLock<AcquisitionConfig>>,
}

impl ConfigLoader {
    /// Loader over the default search path
    pub fn new() -> Self {
        Self::with_paths(vec![
            PathBuf::from(paths::DEFAULT_CONFIG_FILE),
            PathBuf::from(paths::LOCAL_CONFIG_FILE),
        ])
    }

    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            apply_env: true,
            current_config: Arc::new(RwLock::new(AcquisitionConfig::default())),
        }
    }

    /// Disable environment overrides
    pub fn without_env(mut self) -> Self {
        self.apply_env = false;
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load, merge and validate; the result becomes the current configuration
    pub fn load(&self) -> Result<AcquisitionConfig, ConfigError> {
        let config = self.load_and_merge_configs()?;
        *self.current_config.write() = config.clone();
        info!(files = self.config_paths.len(), "configuration loaded");
        Ok(config)
    }

    pub fn current(&self) -> AcquisitionConfig {
        self.current_config.read().clone()
    }

    /// Parse and validate a single file without touching the current configuration
    pub fn validate_file<P: AsRef<Path>>(&self, path: P) -> Result<AcquisitionConfig, ConfigError> {
        let value = Self::load_config_file(path.as_ref())?;
        let mut merged = Self::default_value()?;
        Self::merge_toml_values(&mut merged, value);
        Self::finish(merged)
    }

    /// Write the current configuration as TOML
    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(&self.current())?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn default_value() -> Result<toml::Value, ConfigError> {
        Ok(toml::Value::try_from(AcquisitionConfig::default())?)
    }

    fn load_and_merge_configs(&self) -> Result<AcquisitionConfig, ConfigError> {
        let mut merged = Self::default_value()?;

        for config_path in &self.config_paths {
            match Self::load_config_file(config_path) {
                Ok(file_config) => {
                    debug!(path = %config_path.display(), "merging configuration file");
                    Self::merge_toml_values(&mut merged, file_config);
                }
                Err(ConfigError::FileNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        if self.apply_env {
            Self::apply_environment_overrides(&mut merged, std::env::vars());
        }

        Self::finish(merged)
    }

    fn finish(merged: toml::Value) -> Result<AcquisitionConfig, ConfigError> {
        let config: AcquisitionConfig = merged.try_into()?;
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    fn load_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            Err(err) => return Err(err.into()),
        };
        if metadata.len() > paths::MAX_CONFIG_FILE_SIZE_BYTES {
            return Err(ConfigError::Validation(vec![format!(
                "{} exceeds {} bytes",
                path.display(),
                paths::MAX_CONFIG_FILE_SIZE_BYTES
            )]));
        }

        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
        match (base, overlay) {
            (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
                for (key, value) in overlay_table {
                    if let Some(base_value) = base_table.get_mut(&key) {
                        Self::merge_toml_values(base_value, value);
                    } else {
                        base_table.insert(key, value);
                    }
                }
            }
            (base_value, overlay_value) => {
                *base_value = overlay_value;
            }
        }
    }

    fn apply_environment_overrides(
        config: &mut toml::Value,
        vars: impl Iterator<Item = (String, String)>,
    ) {
        for (key, value) in vars {
            let Some(path) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let path = path.to_lowercase();
            let parts: Vec<&str> = path.split("__").collect();
            debug!(key = %key, "applying environment override");
            Self::set_nested_value(config, &parts, Self::parse_env_value(&value));
        }
    }

    fn parse_env_value(value: &str) -> toml::Value {
        if let Ok(int_val) = value.parse::<i64>() {
            toml::Value::Integer(int_val)
        } else if let Ok(float_val) = value.parse::<f64>() {
            toml::Value::Float(float_val)
        } else if let Ok(bool_val) = value.parse::<bool>() {
            toml::Value::Boolean(bool_val)
        } else {
            toml::Value::String(value.to_string())
        }
    }

    fn set_nested_value(config: &mut toml::Value, parts: &[&str], value: toml::Value) {
        let Some((last, sections)) = parts.split_last() else {
            return;
        };
        let mut current = config;
        for part in sections {
            let toml::Value::Table(table) = current else {
                return;
            };
            current = table
                .entry(part.to_string())
                .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
        }
        if let toml::Value::Table(table) = current {
            table.insert(last.to_string(), value);
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BufferModeConfig;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_missing_files_yield_defaults() {
        let dir = tempdir().unwrap();
        let loader = ConfigLoader::with_paths(vec![dir.path().join("absent.toml")]).without_env();
        assert_eq!(loader.load().unwrap(), AcquisitionConfig::default());
    }

    #[test]
    fn test_later_files_override_earlier() {
        let base = write_config(
            r#"
[buffer]
mode = "roll"
roll_width_samples = 1000

[connection]
address = "/dev/rfcomm0"
"#,
        );
        let local = write_config(
            r#"
[buffer]
roll_width_samples = 250
"#,
        );

        let loader = ConfigLoader::with_paths(vec![
            base.path().to_path_buf(),
            local.path().to_path_buf(),
        ])
        .without_env();
        let config = loader.load().unwrap();

        assert_eq!(config.buffer.mode, BufferModeConfig::Roll);
        assert_eq!(config.buffer.roll_width_samples, 250);
        assert_eq!(config.connection.address, "/dev/rfcomm0");
        assert_eq!(loader.current(), config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let file = write_config(
            r#"
[channels]
gain_multiplier = 7
"#,
        );
        let loader = ConfigLoader::with_paths(vec![]).without_env();
        match loader.validate_file(file.path()) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_toml() {
        let file = write_config("[buffer\nmode = ");
        let loader = ConfigLoader::with_paths(vec![file.path().to_path_buf()]).without_env();
        assert!(matches!(loader.load(), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_file_not_found() {
        let dir = tempdir().unwrap();
        let loader = ConfigLoader::with_paths(vec![]);
        assert!(matches!(
            loader.validate_file(dir.path().join("nope.toml")),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        std::env::set_var("EEG_CONNECTION__ADDRESS", "sim://bench");
        std::env::set_var("EEG_CHANNELS__GAIN_MULTIPLIER", "24");

        let loader = ConfigLoader::with_paths(vec![]);
        let config = loader.load();

        std::env::remove_var("EEG_CONNECTION__ADDRESS");
        std::env::remove_var("EEG_CHANNELS__GAIN_MULTIPLIER");

        let config = config.unwrap();
        assert_eq!(config.connection.address, "sim://bench");
        assert_eq!(config.channels.gain_multiplier, 24);
    }

    #[test]
    fn test_export_round_trip() {
        let dir = tempdir().unwrap();
        let exported = dir.path().join("exported.toml");

        let loader = ConfigLoader::with_paths(vec![]).without_env();
        loader.load().unwrap();
        loader.export(&exported).unwrap();

        let content = std::fs::read_to_string(&exported).unwrap();
        assert!(content.contains("[buffer]"));

        let reloaded = ConfigLoader::with_paths(vec![exported]).without_env();
        assert_eq!(reloaded.load().unwrap(), loader.current());
    }
}
