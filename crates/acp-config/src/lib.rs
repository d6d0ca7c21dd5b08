//! Configuration management for ACP.
//!
//! Parses `acp.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `docs.source_dir`
//! - `convert.template_dir`
//! - `convert.output_dir`
//! - every `convert.attributes` value

mod expand;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override docs source directory.
    pub source_dir: Option<PathBuf>,
    /// Override template directory.
    pub template_dir: Option<PathBuf>,
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
    /// Override source text encoding label.
    pub source_encoding: Option<String>,
    /// Attribute bindings merged over the configured ones.
    pub attributes: BTreeMap<String, String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "acp.toml";

/// Default source text encoding.
pub const DEFAULT_SOURCE_ENCODING: &str = "utf-8";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Documentation configuration (paths are relative strings from TOML).
    docs: DocsConfigRaw,
    /// Conversion configuration (paths are relative strings from TOML).
    convert: ConvertConfigRaw,

    /// Resolved docs configuration (set after loading).
    #[serde(skip)]
    pub docs_resolved: DocsConfig,
    /// Resolved conversion configuration (set after loading).
    #[serde(skip)]
    pub convert_resolved: ConvertConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw docs configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocsConfigRaw {
    source_dir: Option<String>,
}

/// Resolved documentation configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DocsConfig {
    /// Root directory of the AsciiDoc page tree.
    pub source_dir: PathBuf,
}

/// Attribute value as written in TOML.
///
/// AsciiDoc attributes are strings; booleans follow the AsciiDoc convention
/// where `true` sets an empty attribute and `false` leaves it unset.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
enum AttributeValue {
    Text(String),
    Flag(bool),
    Integer(i64),
    Float(f64),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Flag(_) => Ok(()),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
        }
    }
}

/// Raw conversion configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConvertConfigRaw {
    template_dir: Option<String>,
    source_encoding: Option<String>,
    output_dir: Option<String>,
    attributes: BTreeMap<String, AttributeValue>,
}

/// Resolved conversion configuration.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Directory holding template overrides, if any.
    pub template_dir: Option<PathBuf>,
    /// Encoding label used to decode source documents.
    pub source_encoding: String,
    /// Directory converted pages are written to.
    pub output_dir: PathBuf,
    /// Attribute bindings passed to the rendering engine.
    pub attributes: BTreeMap<String, String>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            template_dir: None,
            source_encoding: DEFAULT_SOURCE_ENCODING.to_owned(),
            output_dir: PathBuf::from("build"),
            attributes: BTreeMap::new(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`convert.template_dir`").
        field: String,
        /// Error message (e.g., "${`TEMPLATES`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `acp.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.docs_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(template_dir) = &settings.template_dir {
            self.convert_resolved.template_dir = Some(template_dir.clone());
        }
        if let Some(output_dir) = &settings.output_dir {
            self.convert_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(encoding) = &settings.source_encoding {
            self.convert_resolved.source_encoding.clone_from(encoding);
        }
        for (name, value) in &settings.attributes {
            self.convert_resolved
                .attributes
                .insert(name.clone(), value.clone());
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            docs: DocsConfigRaw::default(),
            convert: ConvertConfigRaw::default(),
            docs_resolved: DocsConfig {
                source_dir: base.join("docs"),
            },
            convert_resolved: ConvertConfig {
                output_dir: base.join("build"),
                ..ConvertConfig::default()
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let convert = &self.convert_resolved;
        require_non_empty(&convert.source_encoding, "convert.source_encoding")?;
        if encoding_rs::Encoding::for_label(convert.source_encoding.as_bytes()).is_none() {
            return Err(ConfigError::Validation(format!(
                "convert.source_encoding: unknown encoding '{}'",
                convert.source_encoding
            )));
        }
        if let Some(name) = convert.attributes.keys().find(|name| name.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "convert.attributes: invalid attribute name '{name}'"
            )));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref dir) = self.docs.source_dir {
            self.docs.source_dir = Some(expand::expand_env(dir, "docs.source_dir")?);
        }
        if let Some(ref dir) = self.convert.template_dir {
            self.convert.template_dir = Some(expand::expand_env(dir, "convert.template_dir")?);
        }
        if let Some(ref dir) = self.convert.output_dir {
            self.convert.output_dir = Some(expand::expand_env(dir, "convert.output_dir")?);
        }
        for (name, value) in &mut self.convert.attributes {
            if let AttributeValue::Text(text) = value {
                *text = expand::expand_env(text, &format!("convert.attributes.{name}"))?;
            }
        }
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.docs_resolved = DocsConfig {
            source_dir: resolve(self.docs.source_dir.as_deref(), "docs"),
        };

        let attributes = self
            .convert
            .attributes
            .iter()
            .filter(|(_, value)| **value != AttributeValue::Flag(false))
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();

        self.convert_resolved = ConvertConfig {
            template_dir: self
                .convert
                .template_dir
                .as_deref()
                .map(|dir| config_dir.join(dir)),
            source_encoding: self
                .convert
                .source_encoding
                .clone()
                .unwrap_or_else(|| DEFAULT_SOURCE_ENCODING.to_owned()),
            output_dir: resolve(self.convert.output_dir.as_deref(), "build"),
            attributes,
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.docs_resolved.source_dir, PathBuf::from("/test/docs"));
        assert_eq!(
            config.convert_resolved.output_dir,
            PathBuf::from("/test/build")
        );
        assert_eq!(config.convert_resolved.source_encoding, "utf-8");
        assert!(config.convert_resolved.template_dir.is_none());
        assert!(config.convert_resolved.attributes.is_empty());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.docs.source_dir.is_none());
        assert!(config.convert.attributes.is_empty());
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[docs]
source_dir = "documentation"

[convert]
template_dir = "templates"
output_dir = "out"
source_encoding = "windows-1252"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.docs_resolved.source_dir,
            PathBuf::from("/project/documentation")
        );
        assert_eq!(
            config.convert_resolved.template_dir,
            Some(PathBuf::from("/project/templates"))
        );
        assert_eq!(
            config.convert_resolved.output_dir,
            PathBuf::from("/project/out")
        );
        assert_eq!(config.convert_resolved.source_encoding, "windows-1252");
    }

    #[test]
    fn test_attribute_values() {
        let toml = r#"
[convert.attributes]
product = "ACP"
version = 3
ratio = 1.5
toc = true
draft = false
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        let attrs = &config.convert_resolved.attributes;
        assert_eq!(attrs.get("product").map(String::as_str), Some("ACP"));
        assert_eq!(attrs.get("version").map(String::as_str), Some("3"));
        assert_eq!(attrs.get("ratio").map(String::as_str), Some("1.5"));
        assert_eq!(attrs.get("toc").map(String::as_str), Some(""));
        assert!(!attrs.contains_key("draft"));
    }

    #[test]
    fn test_apply_cli_settings_template_dir() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            template_dir: Some(PathBuf::from("/custom/templates")),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(
            config.convert_resolved.template_dir,
            Some(PathBuf::from("/custom/templates"))
        );
        assert_eq!(config.docs_resolved.source_dir, PathBuf::from("/test/docs")); // Unchanged
    }

    #[test]
    fn test_apply_cli_settings_attributes_merge() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config
            .convert_resolved
            .attributes
            .insert("product".to_owned(), "ACP".to_owned());
        config
            .convert_resolved
            .attributes
            .insert("env".to_owned(), "prod".to_owned());

        let overrides = CliSettings {
            attributes: BTreeMap::from([("env".to_owned(), "staging".to_owned())]),
            ..Default::default()
        };
        config.apply_cli_settings(&overrides);

        let attrs = &config.convert_resolved.attributes;
        assert_eq!(attrs.get("product").map(String::as_str), Some("ACP"));
        assert_eq!(attrs.get("env").map(String::as_str), Some("staging"));
    }

    #[test]
    fn test_apply_cli_settings_multiple() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            source_dir: Some(PathBuf::from("/src")),
            output_dir: Some(PathBuf::from("/out")),
            source_encoding: Some("iso-8859-1".to_owned()),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.docs_resolved.source_dir, PathBuf::from("/src"));
        assert_eq!(config.convert_resolved.output_dir, PathBuf::from("/out"));
        assert_eq!(config.convert_resolved.source_encoding, "iso-8859-1");
    }

    #[test]
    fn test_expand_env_vars_template_dir() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("ACP_TEST_TEMPLATES", "/opt/templates");
        }

        let toml = r#"
[convert]
template_dir = "${ACP_TEST_TEMPLATES}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(
            config.convert.template_dir,
            Some("/opt/templates".to_owned())
        );

        unsafe {
            std::env::remove_var("ACP_TEST_TEMPLATES");
        }
    }

    #[test]
    fn test_expand_env_vars_attribute_default() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("ACP_TEST_RELEASE");
        }

        let toml = r#"
[convert.attributes]
release = "${ACP_TEST_RELEASE:-dev}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(
            config.convert.attributes.get("release"),
            Some(&AttributeValue::Text("dev".to_owned()))
        );
    }

    #[test]
    fn test_expand_env_vars_keeps_bare_dollar() {
        let toml = r#"
[convert.attributes]
price = "costs $5"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(
            config.convert.attributes.get("price"),
            Some(&AttributeValue::Text("costs $5".to_owned()))
        );
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MISSING_VAR_ACP_CONFIG_TEST");
        }

        let toml = r#"
[convert]
output_dir = "${MISSING_VAR_ACP_CONFIG_TEST}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("MISSING_VAR_ACP_CONFIG_TEST"));
        assert!(err.to_string().contains("convert.output_dir"));
    }

    // Validation tests

    /// Assert that validation fails with expected substrings in the error message.
    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let result = config.validate();
        assert!(result.is_err(), "Expected validation to fail");
        let err = result.unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(
                msg.contains(s),
                "Expected error to contain '{s}', got: {msg}"
            );
        }
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_unknown_encoding() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.convert_resolved.source_encoding = "klingon-8".to_owned();
        assert_validation_error(&config, &["source_encoding", "klingon-8"]);
    }

    #[test]
    fn test_validate_empty_encoding() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.convert_resolved.source_encoding = String::new();
        assert_validation_error(&config, &["source_encoding", "empty"]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acp.toml");
        std::fs::write(
            &path,
            r#"
[docs]
source_dir = "pages"

[convert.attributes]
product = "ACP"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.docs_resolved.source_dir, dir.path().join("pages"));
        assert_eq!(config.config_path, Some(path));
        assert_eq!(
            config
                .convert_resolved
                .attributes
                .get("product")
                .map(String::as_str),
            Some("ACP")
        );
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/acp.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
