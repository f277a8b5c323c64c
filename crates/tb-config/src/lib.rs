//! Configuration management for textbook builds.
//!
//! Parses `textbook.toml` with serde and discovers it in the current
//! directory or its parents. CLI settings are applied during load via
//! [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! `${VAR}` and `${VAR:-default}` are expanded in:
//! - `content.resource_prefix`
//! - `content.emoji_path`
//! - `math.command`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override content source directory.
    pub source_dir: Option<PathBuf>,
    /// Override build output directory.
    pub output_dir: Option<PathBuf>,
    /// Override cache enabled flag.
    pub cache_enabled: Option<bool>,
    /// Override the external equation renderer.
    pub math_command: Option<String>,
}

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "textbook.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    content: ContentConfigRaw,
    cache: CacheConfigRaw,
    /// Equation rendering.
    pub math: MathConfig,
    /// Section duration estimate.
    pub duration: DurationConfig,

    /// Resolved content configuration (set after loading).
    #[serde(skip)]
    pub content_resolved: ContentConfig,
    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ContentConfigRaw {
    source_dir: Option<String>,
    output_dir: Option<String>,
    resource_prefix: Option<String>,
    emoji_path: Option<String>,
}

/// Resolved content configuration with absolute paths.
#[derive(Debug, Default)]
pub struct ContentConfig {
    /// Directory holding one subdirectory per chapter.
    pub source_dir: PathBuf,
    /// Directory build output is written to.
    pub output_dir: PathBuf,
    /// Prefix of per-chapter resource URLs.
    pub resource_prefix: String,
    /// URL directory of emoji images.
    pub emoji_path: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    enabled: Option<bool>,
    dir: Option<String>,
}

/// Resolved cache configuration.
#[derive(Debug, Default)]
pub struct CacheConfig {
    /// Whether rendered equations are persisted.
    pub enabled: bool,
    /// Cache root directory.
    pub dir: PathBuf,
}

impl CacheConfig {
    /// Directory of the persisted equation cache.
    #[must_use]
    pub fn equations_dir(&self) -> PathBuf {
        self.dir.join("equations")
    }
}

/// External equation renderer.
///
/// Without a `command` equations are emitted as delimited TeX.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MathConfig {
    /// Program reading TeX on stdin and writing markup to stdout.
    pub command: Option<String>,
    /// Arguments for display equations.
    pub args: Vec<String>,
    /// Arguments for inline equations.
    pub inline_args: Vec<String>,
}

/// Section duration estimate parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DurationConfig {
    /// Fixed minutes for every section.
    pub baseline_minutes: f64,
    /// Reading speed.
    pub words_per_minute: f64,
    /// Minutes per interactive goal.
    pub minutes_per_goal: f64,
    /// Rounding bucket in minutes.
    pub bucket_minutes: u32,
    /// Lower bound in minutes.
    pub minimum_minutes: u32,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            baseline_minutes: 0.5,
            words_per_minute: 150.0,
            minutes_per_goal: 0.25,
            bucket_minutes: 5,
            minimum_minutes: 5,
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
        /// Config field path (e.g., "`math.command`").
        field: String,
        /// Error message (e.g., "${`KATEX_BIN`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_url_path(value: &str, field: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') && !value.starts_with("http://") && !value.starts_with("https://")
    {
        return Err(ConfigError::Validation(format!(
            "{field} must be an absolute path or an http(s) URL"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise,
    /// searches for `textbook.toml` in the current directory and parents.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails
    /// or a value is invalid.
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
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.content_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.content_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(enabled) = settings.cache_enabled {
            self.cache_resolved.enabled = enabled;
        }
        if let Some(command) = &settings.math_command {
            self.math.command = Some(command.clone());
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::discover_from(&current)
    }

    fn discover_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .find(|candidate| candidate.exists())
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    fn default_with_base(base: &Path) -> Self {
        let mut config = Self {
            content: ContentConfigRaw::default(),
            cache: CacheConfigRaw::default(),
            math: MathConfig::default(),
            duration: DurationConfig::default(),
            content_resolved: ContentConfig::default(),
            cache_resolved: CacheConfig::default(),
            config_path: None,
        };
        config.resolve_paths(base);
        config
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

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
        self.validate_content()?;
        self.validate_math()?;
        self.validate_duration()?;
        Ok(())
    }

    fn validate_content(&self) -> Result<(), ConfigError> {
        let content = &self.content_resolved;
        require_non_empty(&content.resource_prefix, "content.resource_prefix")?;
        require_url_path(&content.resource_prefix, "content.resource_prefix")?;
        require_non_empty(&content.emoji_path, "content.emoji_path")?;
        require_url_path(&content.emoji_path, "content.emoji_path")?;
        Ok(())
    }

    fn validate_math(&self) -> Result<(), ConfigError> {
        if let Some(command) = &self.math.command {
            require_non_empty(command, "math.command")?;
        }
        Ok(())
    }

    fn validate_duration(&self) -> Result<(), ConfigError> {
        let duration = &self.duration;
        if duration.words_per_minute <= 0.0 {
            return Err(ConfigError::Validation(
                "duration.words_per_minute must be greater than 0".to_owned(),
            ));
        }
        if duration.baseline_minutes < 0.0 || duration.minutes_per_goal < 0.0 {
            return Err(ConfigError::Validation(
                "duration minutes cannot be negative".to_owned(),
            ));
        }
        if duration.bucket_minutes == 0 {
            return Err(ConfigError::Validation(
                "duration.bucket_minutes must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(prefix) = &self.content.resource_prefix {
            self.content.resource_prefix =
                Some(expand::expand_env(prefix, "content.resource_prefix")?);
        }
        if let Some(path) = &self.content.emoji_path {
            self.content.emoji_path = Some(expand::expand_env(path, "content.emoji_path")?);
        }
        if let Some(command) = &self.math.command {
            self.math.command = Some(expand::expand_env(command, "math.command")?);
        }
        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.content_resolved = ContentConfig {
            source_dir: resolve(self.content.source_dir.as_deref(), "content"),
            output_dir: resolve(self.content.output_dir.as_deref(), "public"),
            resource_prefix: self
                .content
                .resource_prefix
                .clone()
                .unwrap_or_else(|| "/resources".to_owned()),
            emoji_path: self
                .content
                .emoji_path
                .clone()
                .unwrap_or_else(|| "/images/emoji".to_owned()),
        };

        self.cache_resolved = CacheConfig {
            enabled: self.cache.enabled.unwrap_or(true),
            dir: resolve(self.cache.dir.as_deref(), ".textbook/cache"),
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/book"));
        assert_eq!(
            config.content_resolved.source_dir,
            PathBuf::from("/book/content")
        );
        assert_eq!(
            config.content_resolved.output_dir,
            PathBuf::from("/book/public")
        );
        assert_eq!(config.content_resolved.resource_prefix, "/resources");
        assert_eq!(config.content_resolved.emoji_path, "/images/emoji");
        assert!(config.cache_resolved.enabled);
        assert_eq!(
            config.cache_resolved.equations_dir(),
            PathBuf::from("/book/.textbook/cache/equations")
        );
        assert!(config.math.command.is_none());
        assert_eq!(config.duration, DurationConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[content]
source_dir = "chapters"
resource_prefix = "https://cdn.example.com/res"

[cache]
enabled = false

[math]
command = "tex2svg"
args = ["--display"]
inline_args = ["--inline"]

[duration]
words_per_minute = 200.0
bucket_minutes = 10
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/book"));

        assert_eq!(
            config.content_resolved.source_dir,
            PathBuf::from("/book/chapters")
        );
        assert_eq!(
            config.content_resolved.resource_prefix,
            "https://cdn.example.com/res"
        );
        assert!(!config.cache_resolved.enabled);
        assert_eq!(config.math.command.as_deref(), Some("tex2svg"));
        assert_eq!(config.math.args, vec!["--display"]);
        assert_eq!(config.math.inline_args, vec!["--inline"]);
        assert!((config.duration.words_per_minute - 200.0).abs() < f64::EPSILON);
        assert_eq!(config.duration.bucket_minutes, 10);
        assert_eq!(config.duration.minimum_minutes, 5);
        config.validate().unwrap();
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default_with_base(Path::new("/book"));
        config.content_resolved.resource_prefix = "resources".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("content.resource_prefix"));

        let mut config = Config::default_with_base(Path::new("/book"));
        config.duration.bucket_minutes = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));

        let mut config = Config::default_with_base(Path::new("/book"));
        config.math.command = Some(String::new());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("math.command"));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/book"));
        config.apply_cli_settings(&CliSettings {
            output_dir: Some(PathBuf::from("/tmp/out")),
            cache_enabled: Some(false),
            ..Default::default()
        });

        assert_eq!(config.content_resolved.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(
            config.content_resolved.source_dir,
            PathBuf::from("/book/content")
        );
        assert!(!config.cache_resolved.enabled);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[content]\noutput_dir = \"dist\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.content_resolved.output_dir, dir.path().join("dist"));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/textbook.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_discover_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("content").join("chapter");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();

        assert_eq!(
            Config::discover_from(&nested),
            Some(dir.path().join(CONFIG_FILENAME))
        );
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[content\n").unwrap();
        assert!(matches!(
            Config::load(Some(&path), None),
            Err(ConfigError::Parse(_))
        ));
    }
}
