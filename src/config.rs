use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::graph::Notation;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub notation: NotationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Traversal budget and politeness settings
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Maximum number of terms explored (fetched) in one run.
    #[serde(default = "default_budget_limit")]
    pub budget_limit: usize,
    /// Pause after every fetch, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Terms ending in any of these are never explored.
    #[serde(default = "default_terminal_suffixes")]
    pub terminal_suffixes: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            budget_limit: default_budget_limit(),
            delay_ms: default_delay_ms(),
            terminal_suffixes: default_terminal_suffixes(),
        }
    }
}

/// Upstream encyclopedia settings
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path prefix identifying internal article links, e.g. `/wiki/`.
    #[serde(default = "default_article_path")]
    pub article_path: String,
    /// CSS selector for the introductory content region; the first match is used.
    #[serde(default = "default_content_selector")]
    pub content_selector: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            article_path: default_article_path(),
            content_selector: default_content_selector(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Persisted graph settings
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_save")]
    pub save: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            save: default_save(),
        }
    }
}

/// Characters appended to closed labels
#[derive(Debug, Clone, Deserialize)]
pub struct NotationConfig {
    #[serde(default = "default_excluded_marker")]
    pub excluded: char,
    #[serde(default = "default_resolved_marker")]
    pub resolved: char,
}

impl Default for NotationConfig {
    fn default() -> Self {
        Self {
            excluded: default_excluded_marker(),
            resolved: default_resolved_marker(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_budget_limit() -> usize {
    10
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_terminal_suffixes() -> Vec<String> {
    // Generic category words ("language", "study") in Japanese article titles
    vec!["語".to_string(), "学".to_string()]
}

fn default_base_url() -> String {
    "https://ja.wikipedia.org".to_string()
}

fn default_article_path() -> String {
    "/wiki/".to_string()
}

fn default_content_selector() -> String {
    "#mw-content-text > div.mw-parser-output > p".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("wikitree/{}", env!("CARGO_PKG_VERSION"))
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_save() -> bool {
    true
}

fn default_excluded_marker() -> char {
    '$'
}

fn default_resolved_marker() -> char {
    '@'
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in WIKITREE_CONFIG environment variable (must exist)
    /// 2. ./config.toml in current directory (built-in defaults when absent)
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config = match Self::location() {
            Some(path) => Self::from_file(&path)?,
            None => Config::default(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Config file `load` reads, or None when built-in defaults apply
    pub fn location() -> Option<PathBuf> {
        match std::env::var("WIKITREE_CONFIG") {
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => {
                let default_path = PathBuf::from("config.toml");
                default_path.exists().then_some(default_path)
            }
        }
    }

    /// Parse a config file without validating it
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.source.base_url)
            .with_context(|| format!("source.base_url is not a valid URL: {}", self.source.base_url))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            anyhow::bail!("source.base_url must use http or https: {}", self.source.base_url);
        }

        let path = &self.source.article_path;
        if !path.starts_with('/') || !path.ends_with('/') {
            anyhow::bail!("source.article_path must start and end with '/': {}", path);
        }

        if self.source.content_selector.trim().is_empty() {
            anyhow::bail!("source.content_selector must not be empty");
        }

        if self.source.timeout_secs == 0 {
            anyhow::bail!("source.timeout_secs must be greater than 0");
        }

        if self.crawl.terminal_suffixes.iter().any(|s| s.is_empty()) {
            anyhow::bail!("crawl.terminal_suffixes must not contain empty strings");
        }

        if self.notation.excluded == self.notation.resolved {
            anyhow::bail!(
                "notation.excluded and notation.resolved must differ (both '{}')",
                self.notation.excluded
            );
        }

        Ok(())
    }

    /// Marker characters used for rendering and persistence
    pub fn notation(&self) -> Notation {
        Notation {
            excluded: self.notation.excluded,
            resolved: self.notation.resolved,
        }
    }

    /// Fixed pause applied after each fetch
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.crawl.delay_ms)
    }

    /// Get the output directory for persisted graphs
    pub fn output_dir(&self) -> &Path {
        &self.output.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide cwd and env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn create_test_config() -> String {
        r#"
[crawl]
budget_limit = 25
delay_ms = 0
terminal_suffixes = ["語", "学", "史"]

[source]
base_url = "https://en.wikipedia.org"

[output]
dir = "out"
save = false

[logging]
level = "debug"
"#
        .to_string()
    }

    /// Restores cwd when dropped (e.g. on panic).
    struct CwdGuard(std::path::PathBuf);
    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.0);
        }
    }

    fn with_config_env(config_path: Option<&Path>, f: impl FnOnce()) {
        let original = std::env::var("WIKITREE_CONFIG").ok();
        match config_path {
            Some(p) => std::env::set_var("WIKITREE_CONFIG", p.to_str().unwrap()),
            None => std::env::remove_var("WIKITREE_CONFIG"),
        }
        f();
        std::env::remove_var("WIKITREE_CONFIG");
        if let Some(val) = original {
            std::env::set_var("WIKITREE_CONFIG", val);
        }
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, create_test_config()).unwrap();
        with_config_env(Some(&config_path), || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.crawl.budget_limit, 25);
            assert_eq!(config.crawl.terminal_suffixes.len(), 3);
            assert_eq!(config.source.base_url, "https://en.wikipedia.org");
            // Unspecified fields fall back to defaults
            assert_eq!(config.source.article_path, "/wiki/");
            assert_eq!(config.notation.excluded, '$');
            assert_eq!(config.output.dir, PathBuf::from("out"));
            assert!(!config.output.save);
            assert_eq!(config.logging.level, "debug");
        });
    }

    #[test]
    fn test_config_defaults_without_file() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        let _cwd = CwdGuard(original_dir);
        std::env::set_current_dir(temp_dir.path()).unwrap();
        with_config_env(None, || {
            let config = Config::load().unwrap();
            assert_eq!(config.crawl.budget_limit, 10);
            assert_eq!(config.crawl.delay_ms, 1000);
            assert_eq!(config.crawl.terminal_suffixes, vec!["語", "学"]);
            assert_eq!(config.source.base_url, "https://ja.wikipedia.org");
            assert_eq!(config.notation.resolved, '@');
            assert!(config.output.save);
        });
    }

    #[test]
    fn test_config_location() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        let _cwd = CwdGuard(original_dir);
        std::env::set_current_dir(temp_dir.path()).unwrap();

        with_config_env(None, || {
            assert_eq!(Config::location(), None);
            fs::write("config.toml", "").unwrap();
            assert_eq!(Config::location(), Some(PathBuf::from("config.toml")));
        });

        let explicit = temp_dir.path().join("other.toml");
        with_config_env(Some(&explicit), || {
            assert_eq!(Config::location(), Some(explicit.clone()));
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_config_env(Some(Path::new("nonexistent.toml")), || {
            let config = Config::load();
            assert!(config.is_err());
            assert!(config.unwrap_err().to_string().contains("nonexistent.toml"));
        });
    }

    #[test]
    fn test_validate_rejects_bad_article_path() {
        let mut config = Config::default();
        config.source.article_path = "wiki".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("article_path"));
    }

    #[test]
    fn test_validate_rejects_non_http_base_url() {
        let mut config = Config::default();
        config.source.base_url = "ftp://example.org".to_string();
        assert!(config.validate().is_err());

        config.source.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_suffix() {
        let mut config = Config::default();
        config.crawl.terminal_suffixes.push(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_identical_markers() {
        let mut config = Config::default();
        config.notation.resolved = '$';
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
        assert_eq!(Config::default().delay(), Duration::from_secs(1));
    }
}
