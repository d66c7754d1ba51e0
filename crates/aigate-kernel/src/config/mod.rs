//! Multi-format configuration loading.
//!
//! Supports YAML, TOML, JSON, INI, RON and JSON5 files with:
//!
//! - auto-detection of the format from the file extension
//! - environment variable substitution (`${VAR}` and `$VAR`)
//! - layering of several sources, later ones overriding earlier ones
//! - optional environment overrides with a prefix (`AIGATE_RETRY__MAX_ATTEMPTS=5`)

use config::{Config as Cfg, Environment, File, FileFormat};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::path::Path;

pub use config::FileFormat as Format;


/// Configuration loading error
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Detect configuration format from file extension.
///
/// `.yaml`/`.yml`, `.toml`, `.json`, `.ini`, `.ron` and `.json5` are supported.
pub fn detect_format(path: &str) -> ConfigResult<FileFormat> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        "ini" => Ok(FileFormat::Ini),
        "ron" => Ok(FileFormat::Ron),
        "json5" => Ok(FileFormat::Json5),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Replace `${NAME}` and `$NAME` with the value of the environment variable.
/// Unset variables are left as written.
pub fn substitute_env_vars(content: &str) -> ConfigResult<String> {
    let pattern = Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .map_err(|e| ConfigError::Parse(e.to_string()))?;
    let substituted = pattern.replace_all(content, |caps: &regex::Captures| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .and_then(|name| std::env::var(name.as_str()).ok())
            .unwrap_or_else(|| caps[0].to_string())
    });
    Ok(substituted.into_owned())
}

fn deserialize<T: DeserializeOwned>(builder: config::ConfigBuilder<config::builder::DefaultState>) -> ConfigResult<T> {
    let config = builder
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

/// Load configuration from a file, detecting the format from its extension.
pub fn load_config<T>(path: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    from_str(&content, format)
}

/// Load configuration from a string with an explicit format.
pub fn from_str<T>(content: &str, format: FileFormat) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let substituted = substitute_env_vars(content)?;
    deserialize(Cfg::builder().add_source(File::from_str(&substituted, format)))
}

/// Merge several in-memory sources; later sources override earlier ones.
pub fn merge_configs<T>(sources: &[(&str, FileFormat)]) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let builder = sources
        .iter()
        .try_fold(Cfg::builder(), |builder, (content, format)| {
            let layer = substitute_env_vars(content)?;
            Ok::<_, ConfigError>(builder.add_source(File::from_str(&layer, *format)))
        })?;
    deserialize(builder)
}

/// Load a string source and then apply `PREFIX_`-prefixed environment
/// overrides, using `__` as the nesting separator.
pub fn from_str_with_env<T>(content: &str, format: FileFormat, env_prefix: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let substituted = substitute_env_vars(content)?;
    deserialize(
        Cfg::builder()
            .add_source(File::from_str(&substituted, format))
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            ),
    )
}

/// Like [`load_config`], with environment overrides applied on top.
pub fn load_config_with_env<T>(path: &str, env_prefix: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    from_str_with_env(&content, format, env_prefix)
}
