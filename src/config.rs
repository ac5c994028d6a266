use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub insights: InsightsConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
}

/// Results store (PocketBase) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_admin_email_env")]
    pub admin_email_env: String,
    #[serde(default = "default_admin_password_env")]
    pub admin_password_env: String,
    #[serde(default = "default_runs_page_size")]
    pub runs_page_size: usize,
    #[serde(default = "default_results_page_size")]
    pub results_page_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            admin_email_env: default_admin_email_env(),
            admin_password_env: default_admin_password_env(),
            runs_page_size: default_runs_page_size(),
            results_page_size: default_results_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Admin credentials for the results store, resolved from the environment
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl StoreConfig {
    /// Resolve admin credentials from the configured environment variables.
    ///
    /// Resolved lazily so commands that never touch the store run without them.
    pub fn credentials(&self) -> crate::error::Result<Credentials> {
        let lookup = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    crate::error::EvalError::Config(format!(
                        "Environment variable {} not set. \
                         Set it in .env.local or as an environment variable.",
                        name
                    ))
                })
        };
        Ok(Credentials {
            email: lookup(&self.admin_email_env)?,
            password: lookup(&self.admin_password_env)?,
        })
    }
}

/// Token pricing used for run cost estimates (USD per million tokens)
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_search_price")]
    pub search_usd_per_million: f64,
    #[serde(default = "default_tester_price")]
    pub tester_usd_per_million: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            search_usd_per_million: default_search_price(),
            tester_usd_per_million: default_tester_price(),
        }
    }
}

/// Experiment-tracking (Weights & Biases) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_tracking_project")]
    pub project: String,
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default = "default_tracking_base_url")]
    pub base_url: String,
    #[serde(default = "default_tracking_api_key_env")]
    pub api_key_env: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            project: default_tracking_project(),
            entity: None,
            base_url: default_tracking_base_url(),
            api_key_env: default_tracking_api_key_env(),
        }
    }
}

/// Chat-completion insights configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InsightsConfig {
    #[serde(default = "default_insights_enabled")]
    pub enabled: bool,
    #[serde(default = "default_insights_base_url")]
    pub base_url: String,
    #[serde(default = "default_insights_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_insights_model")]
    pub model: String,
    #[serde(default = "default_insights_temperature")]
    pub temperature: f32,
    #[serde(default = "default_insights_max_tokens")]
    pub max_tokens: u32,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            enabled: default_insights_enabled(),
            base_url: default_insights_base_url(),
            api_key_env: default_insights_api_key_env(),
            model: default_insights_model(),
            temperature: default_insights_temperature(),
            max_tokens: default_insights_max_tokens(),
        }
    }
}

/// Report output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReportsConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Run-name patterns to leave out of full exports. A run matches when its
    /// name contains every whitespace-separated fragment of a pattern.
    #[serde(default = "default_excluded_runs")]
    pub excluded_runs: Vec<String>,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            excluded_runs: default_excluded_runs(),
        }
    }
}

fn default_store_url() -> String {
    "http://localhost:8090".to_string()
}

fn default_admin_email_env() -> String {
    "POCKETBASE_ADMIN_EMAIL".to_string()
}

fn default_admin_password_env() -> String {
    "POCKETBASE_ADMIN_PASSWORD".to_string()
}

fn default_runs_page_size() -> usize {
    100
}

fn default_results_page_size() -> usize {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_search_price() -> f64 {
    0.02
}

fn default_tester_price() -> f64 {
    0.15
}

fn default_tracking_project() -> String {
    "rekwizytor-embedding-tests".to_string()
}

fn default_tracking_base_url() -> String {
    "https://api.wandb.ai".to_string()
}

fn default_tracking_api_key_env() -> String {
    "WANDB_API_KEY".to_string()
}

fn default_insights_enabled() -> bool {
    true
}

fn default_insights_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_insights_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_insights_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_insights_temperature() -> f32 {
    0.3
}

fn default_insights_max_tokens() -> u32 {
    200
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// The first g25f_oai3l run searched only two groups, so its accuracy is void.
fn default_excluded_runs() -> Vec<String> {
    vec!["g25f_oai3l #1".to_string()]
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads `.env.local` and `.env` (both optional) before reading the config.
    /// Looks for the config file in this order:
    /// 1. Path specified in EMBEDEVAL_CONFIG environment variable (must exist)
    /// 2. ./config.toml in current directory (built-in defaults when absent)
    ///
    /// POCKETBASE_URL and WANDB_PROJECT override the file values.
    pub fn load() -> Result<Self> {
        // dotenv does not overwrite variables that are already set, so
        // .env.local takes precedence over .env
        let _ = dotenv::from_filename(".env.local");
        let _ = dotenv::dotenv();

        let mut config = match std::env::var("EMBEDEVAL_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                let default_path = PathBuf::from("config.toml");
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    log::debug!("No config.toml found, using built-in defaults");
                    Config::default()
                }
            }
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("POCKETBASE_URL") {
            if !url.trim().is_empty() {
                self.store.url = url;
            }
        }
        if let Ok(project) = std::env::var("WANDB_PROJECT") {
            if !project.trim().is_empty() {
                self.tracking.project = project;
            }
        }
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("store.url", &self.store.url),
            ("tracking.base_url", &self.tracking.base_url),
            ("insights.base_url", &self.insights.base_url),
        ] {
            url::Url::parse(value)
                .with_context(|| format!("{} is not a valid URL: {}", name, value))?;
        }

        if self.store.runs_page_size == 0 {
            anyhow::bail!("store.runs_page_size must be greater than 0");
        }

        if self.store.results_page_size == 0 {
            anyhow::bail!("store.results_page_size must be greater than 0");
        }

        if self.pricing.search_usd_per_million < 0.0 || self.pricing.tester_usd_per_million < 0.0 {
            anyhow::bail!("pricing values must not be negative");
        }

        if self.tracking.project.trim().is_empty() {
            anyhow::bail!("tracking.project must not be empty");
        }

        Ok(())
    }

    /// Path of a report file inside the configured output directory
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.reports.output_dir.join(file_name)
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

    const ENV_VARS: [&str; 5] = [
        "EMBEDEVAL_CONFIG",
        "POCKETBASE_URL",
        "WANDB_PROJECT",
        "POCKETBASE_ADMIN_EMAIL",
        "POCKETBASE_ADMIN_PASSWORD",
    ];

    /// Restores cwd and the touched env vars when dropped (e.g. on panic).
    struct EnvGuard {
        cwd: PathBuf,
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn enter(dir: &Path) -> Self {
            let cwd = std::env::current_dir().unwrap();
            let saved = ENV_VARS
                .iter()
                .map(|name| (*name, std::env::var(name).ok()))
                .collect();
            for name in ENV_VARS {
                std::env::remove_var(name);
            }
            std::env::set_current_dir(dir).unwrap();
            Self { cwd, saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.cwd);
            for (name, value) in &self.saved {
                match value {
                    Some(v) => std::env::set_var(name, v),
                    None => std::env::remove_var(name),
                }
            }
        }
    }

    #[test]
    fn test_config_defaults_without_file() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let _env = EnvGuard::enter(temp_dir.path());

        let config = Config::load().unwrap();
        assert_eq!(config.store.url, "http://localhost:8090");
        assert_eq!(config.store.results_page_size, 1000);
        assert_eq!(config.tracking.project, "rekwizytor-embedding-tests");
        assert!((config.pricing.tester_usd_per_million - 0.15).abs() < 1e-12);
        assert_eq!(config.reports.excluded_runs, vec!["g25f_oai3l #1".to_string()]);
    }

    #[test]
    fn test_config_load_from_file() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("config.toml"),
            r#"
[store]
url = "http://pb.internal:8090"
runs_page_size = 50

[pricing]
search_usd_per_million = 0.13

[reports]
output_dir = "out"
excluded_runs = ["smoke"]
"#,
        )
        .unwrap();
        let _env = EnvGuard::enter(temp_dir.path());

        let config = Config::load().unwrap();
        assert_eq!(config.store.url, "http://pb.internal:8090");
        assert_eq!(config.store.runs_page_size, 50);
        assert_eq!(config.store.results_page_size, 1000);
        assert!((config.pricing.search_usd_per_million - 0.13).abs() < 1e-12);
        assert_eq!(config.reports.excluded_runs, vec!["smoke".to_string()]);
        assert_eq!(config.output_path("r.md"), PathBuf::from("out").join("r.md"));
    }

    #[test]
    fn test_config_env_overrides() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let _env = EnvGuard::enter(temp_dir.path());
        std::env::set_var("POCKETBASE_URL", "http://override:9000");
        std::env::set_var("WANDB_PROJECT", "other-project");

        let config = Config::load().unwrap();
        assert_eq!(config.store.url, "http://override:9000");
        assert_eq!(config.tracking.project, "other-project");
    }

    #[test]
    fn test_config_loads_env_local_file() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(".env.local"),
            "POCKETBASE_ADMIN_EMAIL=admin@example.com\nPOCKETBASE_ADMIN_PASSWORD=secret\n",
        )
        .unwrap();
        let _env = EnvGuard::enter(temp_dir.path());

        let config = Config::load().unwrap();
        let credentials = config.store.credentials().unwrap();
        assert_eq!(credentials.email, "admin@example.com");
        assert_eq!(credentials.password, "secret");
    }

    #[test]
    fn test_missing_credentials() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let _env = EnvGuard::enter(temp_dir.path());

        let config = Config::load().unwrap();
        let err = config.store.credentials().unwrap_err();
        assert!(err.to_string().contains("POCKETBASE_ADMIN_EMAIL"));
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let _env = EnvGuard::enter(temp_dir.path());
        std::env::set_var("EMBEDEVAL_CONFIG", "nonexistent.toml");

        assert!(Config::load().is_err());
    }

    #[test]
    fn test_config_rejects_bad_url() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("config.toml"),
            "[store]\nurl = \"not a url\"\n",
        )
        .unwrap();
        let _env = EnvGuard::enter(temp_dir.path());

        let err = Config::load().unwrap_err();
        assert!(err.to_string().contains("store.url"));
    }

    #[test]
    fn test_config_rejects_zero_page_size() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("config.toml"),
            "[store]\nresults_page_size = 0\n",
        )
        .unwrap();
        let _env = EnvGuard::enter(temp_dir.path());

        assert!(Config::load().is_err());
    }
}
