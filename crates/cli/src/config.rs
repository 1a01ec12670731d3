use proto::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tools::SessionOptions;
use tracing::debug;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_TOOL_ROUNDS: usize = 25;
const DEFAULT_ELEMENT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_TARGET_URL: &str = "http://localhost:5000";
const CONFIG_FILE_NAME: &str = "webprobe.toml";

/// Top-level CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM model and credential configuration.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Browser launch and timeout configuration.
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Site under test.
    #[serde(default)]
    pub target: TargetConfig,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tool_rounds() -> usize {
    DEFAULT_MAX_TOOL_ROUNDS
}

fn default_element_timeout_ms() -> u64 {
    DEFAULT_ELEMENT_TIMEOUT_MS
}

fn default_navigation_timeout_ms() -> u64 {
    DEFAULT_NAVIGATION_TIMEOUT_MS
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_target_url() -> String {
    DEFAULT_TARGET_URL.to_string()
}

/// Agent model/provider config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Chat model id.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key (env overrides applied at load time; see `Config::load`).
    #[serde(default)]
    pub api_key: String,
    /// OpenAI-compatible API base URL. `None` uses api.openai.com.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,
    /// Maximum tool-call rounds per instruction before bailing out.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: String::new(),
            base_url: None,
            temperature: 0.0,
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

/// Browser config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run Chromium without a window.
    #[serde(default)]
    pub headless: bool,
    /// How long click/fill wait for their element.
    #[serde(default = "default_element_timeout_ms")]
    pub element_timeout_ms: u64,
    /// Upper bound for one page load.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
    /// Directory relative screenshot names resolve under.
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,
    /// Explicit Chrome/Chromium executable.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            element_timeout_ms: default_element_timeout_ms(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            screenshot_dir: default_screenshot_dir(),
            chrome_path: None,
        }
    }
}

impl BrowserConfig {
    /// Facade timeouts derived from this section.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            navigation_timeout: Duration::from_millis(self.navigation_timeout_ms),
            element_timeout: Duration::from_millis(self.element_timeout_ms),
            ..SessionOptions::default()
        }
    }
}

/// Site under test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Base URL the system prompt points the agent at.
    #[serde(default = "default_target_url")]
    pub base_url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_target_url(),
        }
    }
}

/// Parses a boolean env value such as `1`, `true`, `yes`, `off`.
fn parse_bool(field: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

/// `~/.webprobe`, falling back to `./.webprobe` without a home directory.
pub fn webprobe_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".webprobe")
}

impl Config {
    /// Loads configuration from explicit path, fallback locations, and env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(|p| p.to_path_buf()).or_else(|| {
            // Look in current dir, then home dir
            let cwd = std::env::current_dir().ok()?.join(CONFIG_FILE_NAME);
            if cwd.exists() {
                return Some(cwd);
            }
            let home_config = webprobe_home().join("config.toml");
            if home_config.exists() {
                return Some(home_config);
            }
            None
        });
        debug!(path = ?config_path, "Config file resolved");

        let mut config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(&path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(|e| ConfigError::Toml(e.to_string()))?
        } else {
            Config::default()
        };

        // Environment variable overrides
        if let Ok(key) = std::env::var("WEBPROBE_API_KEY") {
            config.agent.api_key = key;
        }
        if let Ok(model) = std::env::var("WEBPROBE_MODEL") {
            config.agent.model = model;
        }
        if let Ok(url) = std::env::var("WEBPROBE_BASE_URL") {
            config.agent.base_url = Some(url);
        }
        if let Ok(raw) = std::env::var("WEBPROBE_HEADLESS") {
            config.browser.headless = parse_bool("WEBPROBE_HEADLESS", &raw)?;
        }
        if let Ok(url) = std::env::var("WEBPROBE_TARGET_URL") {
            config.target.base_url = url;
        }

        config.validate()?;
        debug!(
            model = %config.agent.model,
            base_url = ?config.agent.effective_base_url(),
            headless = config.browser.headless,
            target = %config.target.base_url,
            "Config loaded"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_tool_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "agent.max_tool_rounds".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.agent.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "agent.model".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        let target = &self.target.base_url;
        if !(target.starts_with("http://") || target.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "target.base_url".to_string(),
                reason: format!("'{target}' is not an http(s) URL"),
            });
        }
        Ok(())
    }

    /// Resolves the API key: `agent.api_key` (or `WEBPROBE_API_KEY` applied at
    /// load time), then `OPENAI_API_KEY`. May be empty; the provider rejects
    /// empty and placeholder keys when it is first used.
    pub fn resolve_api_key(&self) -> String {
        if !self.agent.api_key.trim().is_empty() {
            debug!(source = "config", "API key resolved");
            return self.agent.api_key.clone();
        }
        let fallback = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        if fallback.is_empty() {
            debug!("No API key found from any source");
        } else {
            debug!(source = "env", "API key resolved from OPENAI_API_KEY");
        }
        fallback
    }
}

impl AgentConfig {
    /// Returns the explicit base URL when one is set and non-empty.
    pub fn effective_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{remove_env_var, set_env_var, with_locked_env};

    const ENV_KEYS: &[&str] = &[
        "WEBPROBE_API_KEY",
        "WEBPROBE_MODEL",
        "WEBPROBE_BASE_URL",
        "WEBPROBE_HEADLESS",
        "WEBPROBE_TARGET_URL",
        "OPENAI_API_KEY",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            remove_env_var(key);
        }
    }

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, content).expect("write config");
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = Config::default();
        assert_eq!(cfg.agent.model, "gpt-4o-mini");
        assert_eq!(cfg.agent.temperature, 0.0);
        assert_eq!(cfg.agent.max_tool_rounds, 25);
        assert!(cfg.agent.effective_base_url().is_none());
        assert!(!cfg.browser.headless);
        assert_eq!(cfg.browser.element_timeout_ms, 10_000);
        assert_eq!(cfg.browser.navigation_timeout_ms, 30_000);
        assert_eq!(cfg.browser.screenshot_dir, PathBuf::from("."));
        assert_eq!(cfg.target.base_url, "http://localhost:5000");
    }

    #[test]
    fn load_reads_explicit_file_path() {
        with_locked_env(|| {
            clear_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("webprobe.toml");
            write_file(
                &config_path,
                r#"
[agent]
model = "gpt-4.1-mini"
api_key = "from_file"
max_tool_rounds = 7
base_url = "https://example.com/v1"

[browser]
headless = true
element_timeout_ms = 2500
screenshot_dir = "/tmp/shots"
chrome_path = "/usr/bin/chromium"

[target]
base_url = "http://127.0.0.1:8080"
"#,
            );
            let cfg = Config::load(Some(&config_path)).expect("config should parse");
            assert_eq!(cfg.agent.model, "gpt-4.1-mini");
            assert_eq!(cfg.agent.api_key, "from_file");
            assert_eq!(cfg.agent.max_tool_rounds, 7);
            assert_eq!(cfg.agent.effective_base_url(), Some("https://example.com/v1"));
            assert!(cfg.browser.headless);
            assert_eq!(cfg.browser.element_timeout_ms, 2500);
            assert_eq!(cfg.browser.navigation_timeout_ms, 30_000);
            assert_eq!(cfg.browser.screenshot_dir, PathBuf::from("/tmp/shots"));
            assert_eq!(
                cfg.browser.chrome_path.as_deref(),
                Some(Path::new("/usr/bin/chromium"))
            );
            assert_eq!(cfg.target.base_url, "http://127.0.0.1:8080");
        });
    }

    #[test]
    fn load_rejects_invalid_toml() {
        with_locked_env(|| {
            clear_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("webprobe.toml");
            write_file(&config_path, "[agent\nmodel = ");
            let err = Config::load(Some(&config_path)).expect_err("should fail");
            assert!(matches!(err, ConfigError::Toml(_)));
        });
    }

    #[test]
    fn load_missing_explicit_file_is_io_error() {
        with_locked_env(|| {
            clear_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let err = Config::load(Some(&tmp.path().join("nope.toml"))).expect_err("missing");
            assert!(matches!(err, ConfigError::Io(_)));
        });
    }

    #[test]
    fn load_applies_env_overrides() {
        with_locked_env(|| {
            clear_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("webprobe.toml");
            write_file(&config_path, "[agent]\nmodel = \"from-file\"\n");

            set_env_var("WEBPROBE_API_KEY", "env-api");
            set_env_var("WEBPROBE_MODEL", "env-model");
            set_env_var("WEBPROBE_BASE_URL", "http://localhost:11434/v1");
            set_env_var("WEBPROBE_HEADLESS", "yes");
            set_env_var("WEBPROBE_TARGET_URL", "http://localhost:5001");

            let cfg = Config::load(Some(&config_path)).expect("config load");
            assert_eq!(cfg.agent.api_key, "env-api");
            assert_eq!(cfg.agent.model, "env-model");
            assert_eq!(
                cfg.agent.effective_base_url(),
                Some("http://localhost:11434/v1")
            );
            assert!(cfg.browser.headless);
            assert_eq!(cfg.target.base_url, "http://localhost:5001");

            clear_env();
        });
    }

    #[test]
    fn invalid_headless_env_is_rejected() {
        with_locked_env(|| {
            clear_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("webprobe.toml");
            write_file(&config_path, "");
            set_env_var("WEBPROBE_HEADLESS", "sometimes");

            let err = Config::load(Some(&config_path)).expect_err("bad bool");
            assert!(
                matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "WEBPROBE_HEADLESS")
            );
            clear_env();
        });
    }

    #[test]
    fn validation_rejects_bad_values() {
        with_locked_env(|| {
            clear_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let config_path = tmp.path().join("webprobe.toml");

            write_file(&config_path, "[agent]\nmax_tool_rounds = 0\n");
            let err = Config::load(Some(&config_path)).expect_err("zero rounds");
            assert!(err.to_string().contains("agent.max_tool_rounds"));

            write_file(&config_path, "[target]\nbase_url = \"localhost:5000\"\n");
            let err = Config::load(Some(&config_path)).expect_err("no scheme");
            assert!(err.to_string().contains("target.base_url"));
        });
    }

    #[test]
    fn resolve_api_key_prefers_config_then_openai_env() {
        with_locked_env(|| {
            clear_env();
            let mut cfg = Config::default();
            assert_eq!(cfg.resolve_api_key(), "");

            set_env_var("OPENAI_API_KEY", "legacy-key");
            assert_eq!(cfg.resolve_api_key(), "legacy-key");

            cfg.agent.api_key = "config-key".to_string();
            assert_eq!(cfg.resolve_api_key(), "config-key");

            clear_env();
        });
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for raw in ["1", "true", "YES", " on "] {
            assert!(parse_bool("f", raw).expect(raw));
        }
        for raw in ["0", "false", "No", "off"] {
            assert!(!parse_bool("f", raw).expect(raw));
        }
        assert!(parse_bool("f", "").is_err());
    }

    #[test]
    fn session_options_follow_browser_section() {
        let browser = BrowserConfig {
            element_timeout_ms: 1200,
            navigation_timeout_ms: 4500,
            ..BrowserConfig::default()
        };
        let options = browser.session_options();
        assert_eq!(options.element_timeout, Duration::from_millis(1200));
        assert_eq!(options.navigation_timeout, Duration::from_millis(4500));
        assert_eq!(options.poll_interval, SessionOptions::default().poll_interval);
    }
}
