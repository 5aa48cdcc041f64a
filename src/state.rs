use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::api::http::HttpBackend;
use crate::api::Backend;
use crate::cache::QueryCache;
use crate::error::ClientError;
use crate::session::Session;
use crate::types::Config;

/// Environment variable that overrides the configured API base URL.
pub const BASE_URL_ENV: &str = "WARROOM_BASE_URL";

const MAX_NOTICES: usize = 5;

/// Process-wide state shared by every page.
pub struct AppState {
    pub config: Config,
    pub backend: Arc<dyn Backend>,
    pub cache: QueryCache,
    pub session: Session,
    pub notices: Notices,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn Backend>) -> Arc<Self> {
        let cache = QueryCache::new(
            Arc::clone(&backend),
            Duration::from_secs(config.stale_after_secs),
        );
        Arc::new(Self {
            config,
            backend,
            cache,
            session: Session::new(),
            notices: Notices::default(),
        })
    }

    /// State backed by the real HTTP transport.
    pub fn connect(config: Config) -> Result<Arc<Self>, ClientError> {
        let backend = HttpBackend::new(&config.base_url)?;
        log::info!("AppState: using API at {}", backend.base_url());
        Ok(Self::new(config, Arc::new(backend)))
    }

    pub fn color(&self) -> bool {
        self.config.color
    }
}

// =============================================================================
// Notices (transient success / failure messages)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Most recent notices, oldest dropped first.
#[derive(Debug, Default)]
pub struct Notices {
    queue: Mutex<VecDeque<Notice>>,
}

impl Notices {
    pub fn success(&self, message: impl Into<String>) {
        self.push(NoticeKind::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(NoticeKind::Error, message.into());
    }

    fn push(&self, kind: NoticeKind, message: String) {
        match kind {
            NoticeKind::Success => log::info!("Notice: {}", message),
            NoticeKind::Error => log::warn!("Notice: {}", message),
        }
        let mut queue = self.queue.lock();
        queue.push_back(Notice { kind, message });
        while queue.len() > MAX_NOTICES {
            queue.pop_front();
        }
    }

    /// Take everything shown so far.
    pub fn drain(&self) -> Vec<Notice> {
        self.queue.lock().drain(..).collect()
    }

    pub fn last(&self) -> Option<Notice> {
        self.queue.lock().back().cloned()
    }
}

// =============================================================================
// Config file
// =============================================================================

/// Default location: ~/.warroom/config.json
pub fn config_path() -> Result<PathBuf, ClientError> {
    let home = dirs::home_dir()
        .ok_or_else(|| ClientError::Config("Could not find home directory".to_string()))?;
    Ok(home.join(".warroom").join("config.json"))
}

/// Load configuration. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ClientError> {
    if !path.exists() {
        log::debug!("Config: {} not found, using defaults", path.display());
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)
        .map_err(|e| ClientError::Config(format!("Failed to read config: {}", e)))?;
    serde_json::from_str(&content)
        .map_err(|e| ClientError::Config(format!("Failed to parse config: {}", e)))
}

pub fn save_config_to(path: &Path, config: &Config) -> Result<(), ClientError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| ClientError::Config(format!("Failed to create config dir: {}", e)))?;
        }
    }
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("Failed to serialize config: {}", e)))?;
    fs::write(path, content)
        .map_err(|e| ClientError::Config(format!("Failed to write config: {}", e)))
}

/// Apply overrides in precedence order: file < environment < command line.
pub fn apply_overrides(mut config: Config, env_base_url: Option<String>, cli_base_url: Option<String>) -> Config {
    if let Some(url) = env_base_url.filter(|u| !u.trim().is_empty()) {
        config.base_url = url;
    }
    if let Some(url) = cli_base_url.filter(|u| !u.trim().is_empty()) {
        config.base_url = url;
    }
    config
}

/// Load from the default path, then apply `WARROOM_BASE_URL` and the CLI value.
pub fn load_config(cli_base_url: Option<String>) -> Result<Config, ClientError> {
    let config = load_config_from(&config_path()?)?;
    Ok(apply_overrides(
        config,
        std::env::var(BASE_URL_ENV).ok(),
        cli_base_url,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn test_missing_config_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.polling.signals_secs, 30);
    }

    #[test]
    fn test_config_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = Config::default();
        config.base_url = "https://intel.example.com".to_string();
        config.dev_login = Some(crate::types::DevLoginConfig {
            email: "ana@example.com".to_string(),
            role: Role::Admin,
        });
        save_config_to(&path, &config).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"baseUrl\""));
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.base_url, "https://intel.example.com");
        assert_eq!(loaded.dev_login.unwrap().role, Role::Admin);
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config_from(&path), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_override_precedence() {
        let config = apply_overrides(
            Config::default(),
            Some("http://env:1".to_string()),
            None,
        );
        assert_eq!(config.base_url, "http://env:1");
        let config = apply_overrides(
            Config::default(),
            Some("http://env:1".to_string()),
            Some("http://cli:2".to_string()),
        );
        assert_eq!(config.base_url, "http://cli:2");
    }

    #[test]
    fn test_notices_are_bounded() {
        let notices = Notices::default();
        for i in 0..8 {
            notices.success(format!("n{}", i));
        }
        notices.error("Failed to create deal");
        let all = notices.drain();
        assert_eq!(all.len(), MAX_NOTICES);
        assert_eq!(all.last().unwrap().kind, NoticeKind::Error);
        assert!(notices.drain().is_empty());
    }
}
