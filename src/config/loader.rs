//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

use crate::config::schema::{RelayConfig, DEFAULT_PORT};
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("could not parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("could not parse config at {path}: YAML parse error: {yaml}, JSON parse error: {json}")]
    Unrecognized {
        path: String,
        yaml: serde_yaml::Error,
        json: serde_json::Error,
    },

    #[error("invalid URI \"{uri}\": {reason}")]
    Uri { uri: String, reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Port variable substituted into config files.
pub const PORT_VAR: &str = "RELAY_PORT";

/// Fallback for [`PORT_VAR`] when it is unset or not a number.
pub const PUBLIC_PORT_VAR: &str = "RELAY_PUBLIC_PORT";

/// Load and validate configuration from a file.
///
/// `$VAR` and `${VAR}` placeholders are substituted from the environment
/// before parsing. The format follows the extension: `.toml`, `.json`,
/// `.yaml`/`.yml`; anything else is tried as YAML, then JSON.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let content = expand_env(&content, |name| std::env::var(name).ok());

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let config = parse_config(&content, extension).map_err(|e| match e {
        ConfigError::Unrecognized { yaml, json, .. } => ConfigError::Unrecognized {
            path: path.display().to_string(),
            yaml,
            json,
        },
        other => other,
    })?;

    config.validate()?;
    tracing::debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Parse a configuration document in the format named by `extension`.
pub fn parse_config(content: &str, extension: &str) -> Result<RelayConfig, ConfigError> {
    match extension.to_ascii_lowercase().as_str() {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(content)?),
        _ => serde_yaml::from_str(content).or_else(|yaml| {
            serde_json::from_str(content).map_err(|json| ConfigError::Unrecognized {
                path: String::new(),
                yaml,
                json,
            })
        }),
    }
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
            .expect("placeholder pattern is valid")
    })
}

/// Substitute `$VAR`/`${VAR}` using `lookup`; unknown variables expand to
/// the empty string.
///
/// When [`PORT_VAR`] is unset, empty or not numeric it defaults to
/// [`PUBLIC_PORT_VAR`] if that is a number, else to the default port.
pub fn expand_env(content: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let is_port = |v: &str| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit());

    let port = lookup(PORT_VAR).filter(|p| is_port(p)).unwrap_or_else(|| {
        lookup(PUBLIC_PORT_VAR)
            .and_then(|p| p.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT)
            .to_string()
    });

    placeholder()
        .replace_all(content, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            if name == PORT_VAR {
                port.clone()
            } else {
                lookup(name).unwrap_or_default()
            }
        })
        .into_owned()
}
