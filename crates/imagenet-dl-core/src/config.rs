use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::class_id::ClassIdError;
use crate::fetch::FetchOptions;
use crate::retry::RetryPolicy;
use crate::url_model::UrlTemplate;

/// Default host serving one tar archive per WordNet id.
pub const DEFAULT_BASE_URL: &str = "https://image-net.org/data/winter21_whole";

/// Fatal setup errors. Any of these aborts the run before a worker starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot locate config directory: {0}")]
    Xdg(#[from] xdg::BaseDirectoriesError),
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("cannot serialize default config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("CSV file not found: {}", path.display())]
    CsvMissing { path: PathBuf },
    #[error("malformed CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("CSV file {} must contain a 'wnid' column (found: {})", path.display(), found.join(", "))]
    MissingColumn { path: PathBuf, found: Vec<String> },
    #[error("CSV line {line}: {source}")]
    InvalidIdentifier {
        line: u64,
        #[source]
        source: ClassIdError,
    },
    #[error("no class identifiers found in {}", path.display())]
    NoIdentifiers { path: PathBuf },
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per archive (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1.0,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Configuration loaded from `~/.config/imagenet-dl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Base URL, or a template containing `{wnid}`.
    pub base_url: String,
    /// Remove each archive once it has been extracted.
    pub delete_archives: bool,
    pub connect_timeout_secs: u64,
    /// Hard cap on a single request, headers to last byte.
    pub request_timeout_secs: u64,
    /// Abort a transfer that stays below 1 KiB/s for this long.
    pub stall_timeout_secs: u64,
    pub user_agent: String,
    /// Resize extracted images to N x N pixels (None = write entries verbatim).
    #[serde(default)]
    pub resize: Option<u32>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for DlConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            base_url: DEFAULT_BASE_URL.to_string(),
            delete_archives: true,
            connect_timeout_secs: 30,
            request_timeout_secs: 520,
            stall_timeout_secs: 60,
            user_agent: concat!("imagenet-dl/", env!("CARGO_PKG_VERSION")).to_string(),
            resize: None,
            retry: None,
        }
    }
}

impl DlConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default().to_policy()
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            stall_timeout: Duration::from_secs(self.stall_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Fully resolved settings for one run (config file merged with CLI flags).
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub target_dir: PathBuf,
    pub workers: usize,
    pub url_template: UrlTemplate,
    pub delete_archives: bool,
    pub resize: Option<u32>,
    pub fetch: FetchOptions,
    pub retry: RetryPolicy,
}

impl RunOptions {
    /// Builds run options from a config, validating the values a run depends on.
    pub fn from_config(cfg: &DlConfig, target_dir: PathBuf) -> Result<Self, ConfigError> {
        if cfg.workers == 0 {
            return Err(ConfigError::InvalidSetting("workers must be at least 1".into()));
        }
        let retry = cfg.retry_policy();
        if retry.max_attempts == 0 {
            return Err(ConfigError::InvalidSetting(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if cfg.resize == Some(0) {
            return Err(ConfigError::InvalidSetting("resize must be positive".into()));
        }
        Ok(Self {
            target_dir,
            workers: cfg.workers,
            url_template: UrlTemplate::parse(&cfg.base_url)?,
            delete_archives: cfg.delete_archives,
            resize: cfg.resize,
            fetch: cfg.fetch_options(),
            retry,
        })
    }
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("imagenet-dl")?;
    xdg_dirs
        .place_config_file("config.toml")
        .map_err(|source| ConfigError::Io {
            path: xdg_dirs.get_config_home(),
            source,
        })
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DlConfig, ConfigError> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, toml).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit file.
pub fn load_from(path: &Path) -> Result<DlConfig, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = DlConfig::default();
        assert_eq!(cfg.workers, 10);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert!(cfg.delete_archives);
        assert_eq!(cfg.request_timeout_secs, 520);
        assert!(cfg.resize.is_none());
        assert_eq!(cfg.retry_policy().max_attempts, 3);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = DlConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: DlConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.workers, cfg.workers);
        assert_eq!(parsed.base_url, cfg.base_url);
        assert_eq!(parsed.user_agent, cfg.user_agent);
    }

    #[test]
    fn config_toml_retry_section() {
        let toml = r#"
            workers = 4
            base_url = "http://mirror.local/archives/{wnid}.tar"
            delete_archives = false
            connect_timeout_secs = 5
            request_timeout_secs = 60
            stall_timeout_secs = 10
            user_agent = "test"
            resize = 256

            [retry]
            max_attempts = 5
            base_delay_secs = 0.5
            max_delay_secs = 15
        "#;
        let cfg: DlConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.resize, Some(256));
        let policy = cfg.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(15));
    }

    #[test]
    fn run_options_reject_zero_workers() {
        let mut cfg = DlConfig::default();
        cfg.workers = 0;
        let err = RunOptions::from_config(&cfg, PathBuf::from("/tmp/x")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting(_)));
    }

    #[test]
    fn run_options_reject_bad_base_url() {
        let mut cfg = DlConfig::default();
        cfg.base_url = "not a url".into();
        let err = RunOptions::from_config(&cfg, PathBuf::from("/tmp/x")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "workers = \"many\"").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::Parse { .. })));
    }
}
