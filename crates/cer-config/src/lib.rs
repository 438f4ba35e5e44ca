//! Configuration management for the CER pipeline.
//!
//! Parses `cer.toml` with serde and auto-discovers it in the current
//! directory and its parents. CLI flags override file values through
//! [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `diagrams.kroki_url`
//! - `print.browser`, `print.header_text`
//! - `author.*`
//! - `generation.api_url`, `generation.model`, `generation.api_key`

mod expand;

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "cer.toml";

/// Default diagram server.
const DEFAULT_KROKI_URL: &str = "https://kroki.io";

/// Upper bound for the print settle delay.
const MAX_SETTLE_MS: u64 = 60_000;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
    /// Override Kroki URL for diagram rendering.
    pub kroki_url: Option<String>,
    /// Override diagram rendering enabled flag.
    pub diagrams_enabled: Option<bool>,
    /// Override diagram cache enabled flag.
    pub cache_enabled: Option<bool>,
    /// Override browser executable used for printing.
    pub browser: Option<String>,
    /// Override generation API key.
    pub api_key: Option<String>,
    /// Override generation model.
    pub model: Option<String>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output configuration (paths are relative strings from TOML).
    output: OutputConfigRaw,
    /// Diagram rendering configuration.
    pub diagrams: DiagramsConfig,
    /// PDF printing configuration.
    pub print: PrintConfig,
    /// Author details for the cover page and prompt.
    pub author: AuthorConfig,
    /// Report generation service configuration.
    pub generation: GenerationConfig,

    /// Resolved output configuration (set after loading).
    #[serde(skip)]
    pub output_resolved: OutputConfig,
    /// Project directory for cer data (`.cer/`).
    #[serde(skip)]
    pub project_dir: PathBuf,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw output configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OutputConfigRaw {
    dir: Option<String>,
    diagrams_dir: Option<String>,
    basename: Option<String>,
}

/// Resolved output configuration.
#[derive(Debug, Default)]
pub struct OutputConfig {
    /// Directory receiving exported artifacts.
    pub dir: PathBuf,
    /// Diagram image directory, relative to `dir`.
    pub diagrams_dir: String,
    /// Artifact file name without extension.
    pub basename: String,
}

impl OutputConfig {
    /// Absolute diagram image directory.
    #[must_use]
    pub fn diagrams_path(&self) -> PathBuf {
        self.dir.join(&self.diagrams_dir)
    }
}

/// Diagram rendering configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiagramsConfig {
    /// Whether diagram blocks are rendered at all.
    pub enabled: bool,
    /// Kroki server URL.
    pub kroki_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Whether rendered diagrams are cached on disk.
    pub cache_enabled: bool,
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kroki_url: DEFAULT_KROKI_URL.to_owned(),
            timeout_secs: 30,
            cache_enabled: true,
        }
    }
}

/// PDF printing configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    /// Browser executable; auto-detected when unset.
    pub browser: Option<String>,
    /// Time given to the page to finish in-page rendering before capture.
    pub settle_ms: u64,
    /// Running header text.
    pub header_text: String,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            browser: None,
            settle_ms: 7000,
            header_text: "CER - Compte-Rendu".to_owned(),
        }
    }
}

/// Author details. Unset fields fall back to placeholders at use site.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthorConfig {
    pub name: Option<String>,
    pub promo: Option<String>,
    pub bloc: Option<String>,
    pub title: Option<String>,
    /// `dd/mm/yyyy` or ISO `yyyy-mm-dd`.
    pub date: Option<String>,
}

/// Report generation service configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// API base URL.
    pub api_url: String,
    /// Model name.
    pub model: String,
    /// API key, usually `${GEMINI_API_KEY}`.
    pub api_key: Option<String>,
    /// Maximum tokens in the generated report.
    pub max_output_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout.
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: "https://generativelanguage.googleapis.com/v1beta".to_owned(),
            model: "gemini-2.5-flash".to_owned(),
            api_key: None,
            max_output_tokens: 65536,
            temperature: 0.7,
            timeout_secs: 300,
        }
    }
}

impl GenerationConfig {
    /// API key, required for generation.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if no key is configured.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ConfigError::Validation(
                "generation.api_key is required (set it in cer.toml or GEMINI_API_KEY)".to_owned(),
            )),
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
        /// Config field path (e.g., "`generation.api_key`").
        field: String,
        /// Error message (e.g., "${`GEMINI_API_KEY`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `cer.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, then the
    /// result is validated.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing or
    /// expansion fails, or a value is invalid.
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
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML text, resolving paths against `base`.
    ///
    /// # Errors
    ///
    /// Returns error if parsing, expansion or validation fails.
    pub fn from_toml(content: &str, base: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.expand_env_vars()?;
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    /// Directory for the rendered diagram cache (`.cer/cache/`).
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.project_dir.join("cache")
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(dir) = &settings.output_dir {
            self.output_resolved.dir.clone_from(dir);
        }
        if let Some(kroki_url) = &settings.kroki_url {
            self.diagrams.kroki_url.clone_from(kroki_url);
        }
        if let Some(enabled) = settings.diagrams_enabled {
            self.diagrams.enabled = enabled;
        }
        if let Some(enabled) = settings.cache_enabled {
            self.diagrams.cache_enabled = enabled;
        }
        if let Some(browser) = &settings.browser {
            self.print.browser = Some(browser.clone());
        }
        if let Some(key) = &settings.api_key {
            self.generation.api_key = Some(key.clone());
        }
        if let Some(model) = &settings.model {
            self.generation.model.clone_from(model);
        }
    }

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

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    fn default_with_base(base: &Path) -> Self {
        let mut config = Self {
            output: OutputConfigRaw::default(),
            diagrams: DiagramsConfig::default(),
            print: PrintConfig::default(),
            author: AuthorConfig::default(),
            generation: GenerationConfig::default(),
            output_resolved: OutputConfig::default(),
            project_dir: PathBuf::new(),
            config_path: None,
        };
        config.resolve_paths(base);
        config
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config: Self = toml::from_str(&content)?;
        config.expand_env_vars()?;
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.output_resolved.basename, "output.basename")?;
        if self.output_resolved.basename.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "output.basename cannot contain path separators".to_owned(),
            ));
        }
        require_non_empty(&self.output_resolved.diagrams_dir, "output.diagrams_dir")?;

        if self.diagrams.enabled {
            require_non_empty(&self.diagrams.kroki_url, "diagrams.kroki_url")?;
            require_http_url(&self.diagrams.kroki_url, "diagrams.kroki_url")?;
        }
        if self.diagrams.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "diagrams.timeout_secs must be greater than 0".to_owned(),
            ));
        }

        if self.print.settle_ms > MAX_SETTLE_MS {
            return Err(ConfigError::Validation(format!(
                "print.settle_ms cannot exceed {MAX_SETTLE_MS}"
            )));
        }

        require_http_url(&self.generation.api_url, "generation.api_url")?;
        require_non_empty(&self.generation.model, "generation.model")?;
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Validation(
                "generation.temperature must be between 0 and 2".to_owned(),
            ));
        }

        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.diagrams.kroki_url =
            expand::expand_env(&self.diagrams.kroki_url, "diagrams.kroki_url")?;

        expand::expand_opt(&mut self.print.browser, "print.browser")?;
        self.print.header_text =
            expand::expand_env(&self.print.header_text, "print.header_text")?;

        expand::expand_opt(&mut self.author.name, "author.name")?;
        expand::expand_opt(&mut self.author.promo, "author.promo")?;
        expand::expand_opt(&mut self.author.bloc, "author.bloc")?;
        expand::expand_opt(&mut self.author.title, "author.title")?;
        expand::expand_opt(&mut self.author.date, "author.date")?;

        self.generation.api_url =
            expand::expand_env(&self.generation.api_url, "generation.api_url")?;
        self.generation.model = expand::expand_env(&self.generation.model, "generation.model")?;
        expand::expand_opt(&mut self.generation.api_key, "generation.api_key")?;

        Ok(())
    }

    fn resolve_paths(&mut self, config_dir: &Path) {
        self.output_resolved = OutputConfig {
            dir: config_dir.join(self.output.dir.as_deref().unwrap_or("output")),
            diagrams_dir: self
                .output
                .diagrams_dir
                .clone()
                .unwrap_or_else(|| "diagrams".to_owned()),
            basename: self
                .output
                .basename
                .clone()
                .unwrap_or_else(|| "CER_Prosit_Retour".to_owned()),
        };
        self.project_dir = config_dir.join(".cer");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/work"));
        assert_eq!(config.output_resolved.dir, PathBuf::from("/work/output"));
        assert_eq!(
            config.output_resolved.diagrams_path(),
            PathBuf::from("/work/output/diagrams")
        );
        assert_eq!(config.output_resolved.basename, "CER_Prosit_Retour");
        assert_eq!(config.cache_dir(), PathBuf::from("/work/.cer/cache"));
        assert_eq!(config.diagrams.kroki_url, "https://kroki.io");
        assert!(config.diagrams.enabled);
        assert_eq!(config.print.settle_ms, 7000);
        assert_eq!(config.generation.model, "gemini-2.5-flash");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[output]
dir = "exports"
diagrams_dir = "img"
basename = "CER_Prosit_3"

[diagrams]
kroki_url = "http://localhost:8000"
timeout_secs = 10
cache_enabled = false

[print]
browser = "/usr/bin/chromium"
settle_ms = 2000
header_text = "Prosit 3"

[author]
name = "Jean Dupont"
date = "2026-10-19"

[generation]
model = "gemini-2.5-pro"
"#;
        let config = Config::from_toml(toml, Path::new("/work")).unwrap();

        assert_eq!(config.output_resolved.dir, PathBuf::from("/work/exports"));
        assert_eq!(config.output_resolved.diagrams_dir, "img");
        assert_eq!(config.output_resolved.basename, "CER_Prosit_3");
        assert_eq!(config.diagrams.kroki_url, "http://localhost:8000");
        assert_eq!(config.diagrams.timeout_secs, 10);
        assert!(!config.diagrams.cache_enabled);
        assert_eq!(config.print.browser.as_deref(), Some("/usr/bin/chromium"));
        assert_eq!(config.print.settle_ms, 2000);
        assert_eq!(config.author.name.as_deref(), Some("Jean Dupont"));
        assert_eq!(config.author.promo, None);
        assert_eq!(config.generation.model, "gemini-2.5-pro");
        assert_eq!(config.generation.max_output_tokens, 65536);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cer.toml");
        std::fs::write(&path, "[output]\ndir = \"out\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.output_resolved.dir, dir.path().join("out"));
        assert_eq!(config.project_dir, dir.path().join(".cer"));
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Some(Path::new("/nonexistent/cer.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_parse_error() {
        let result = Config::from_toml("[diagrams\nenabled = true", Path::new("/work"));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/work"));
        config.apply_cli_settings(&CliSettings {
            output_dir: Some(PathBuf::from("/tmp/out")),
            kroki_url: Some("http://kroki.local".to_owned()),
            diagrams_enabled: Some(false),
            cache_enabled: Some(false),
            browser: Some("chrome".to_owned()),
            api_key: Some("key".to_owned()),
            model: Some("gemini-2.5-pro".to_owned()),
        });

        assert_eq!(config.output_resolved.dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.diagrams.kroki_url, "http://kroki.local");
        assert!(!config.diagrams.enabled);
        assert!(!config.diagrams.cache_enabled);
        assert_eq!(config.print.browser.as_deref(), Some("chrome"));
        assert_eq!(config.generation.require_api_key().unwrap(), "key");
        assert_eq!(config.generation.model, "gemini-2.5-pro");
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/work"));
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.diagrams.kroki_url, "https://kroki.io");
        assert!(config.generation.api_key.is_none());
    }

    #[test]
    fn test_expand_api_key() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("CER_CONFIG_TEST_KEY", "abc123");
        }
        let config = Config::from_toml(
            "[generation]\napi_key = \"${CER_CONFIG_TEST_KEY}\"\n",
            Path::new("/work"),
        )
        .unwrap();
        assert_eq!(config.generation.api_key.as_deref(), Some("abc123"));
        unsafe {
            std::env::remove_var("CER_CONFIG_TEST_KEY");
        }
    }

    #[test]
    fn test_expand_missing_var_fails() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("CER_CONFIG_TEST_MISSING");
        }
        let result = Config::from_toml(
            "[author]\nname = \"${CER_CONFIG_TEST_MISSING}\"\n",
            Path::new("/work"),
        );
        assert!(matches!(result, Err(ConfigError::EnvVar { field, .. }) if field == "author.name"));
    }

    #[test]
    fn test_require_api_key_missing() {
        let config = Config::default_with_base(Path::new("/work"));
        assert!(matches!(
            config.generation.require_api_key(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_kroki_url_scheme() {
        let result = Config::from_toml("[diagrams]\nkroki_url = \"kroki.io\"\n", Path::new("/w"));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("diagrams.kroki_url"));
    }

    #[test]
    fn test_validate_kroki_url_ignored_when_disabled() {
        let result = Config::from_toml(
            "[diagrams]\nenabled = false\nkroki_url = \"\"\n",
            Path::new("/w"),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_settle_ms_limit() {
        let result = Config::from_toml("[print]\nsettle_ms = 120000\n", Path::new("/w"));
        assert!(matches!(result, Err(ConfigError::Validation(msg)) if msg.contains("settle_ms")));
    }

    #[test]
    fn test_validate_timeout_zero() {
        let result = Config::from_toml("[diagrams]\ntimeout_secs = 0\n", Path::new("/w"));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_basename_separator() {
        let result = Config::from_toml("[output]\nbasename = \"../x\"\n", Path::new("/w"));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
