//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/selsync/config.toml)
//! 3. Environment variables (SELSYNC_* prefix)
//!
//! Environment variables take precedence over config file values.
//!
//! `Settings` wraps a `Config` with persistence and change notification and
//! is what the running service consumes.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::SyncError;

/// Environment variable prefix
const ENV_PREFIX: &str = "SELSYNC";

/// Default TCP port the sync server listens on
pub const DEFAULT_LISTEN_PORT: u32 = 8765;

/// Default pull interval in seconds
pub const DEFAULT_POLL_INTERVAL: u64 = 10;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// TCP port for the sync server (1-65535)
    #[serde(default = "default_listen_port")]
    pub listen_port: u32,

    /// Peer URI, e.g. `tcp://laptop.local:8765`
    #[serde(default)]
    pub peer_endpoint: Option<String>,

    /// Shared secret sent with every message
    #[serde(default)]
    pub shared_secret: String,

    /// Seconds between pulls from the peer, 0 disables polling
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Whether the PRIMARY selection is synced
    #[serde(default)]
    pub sync_primary: bool,

    /// Stable identifier of this node, written once by `NodeIdentity`
    #[serde(default)]
    pub node_id: Option<String>,

    /// Log file path (stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_LISTEN_PORT,
            peer_endpoint: None,
            shared_secret: String::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            sync_primary: false,
            node_id: None,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (SELSYNC_LISTEN_PORT, SELSYNC_PEER_ENDPOINT, ...)
    /// 2. Config file (~/.config/selsync/config.toml or SELSYNC_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = Self::read_from_path(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Default values with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Read only the config file, without environment overrides
    ///
    /// If the file doesn't exist, defaults are used.
    pub fn read_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Unparsable numeric values are ignored.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_LISTEN_PORT", ENV_PREFIX)) {
            if let Ok(port) = val.trim().parse() {
                self.listen_port = port;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_PEER_ENDPOINT", ENV_PREFIX)) {
            self.peer_endpoint = if val.is_empty() { None } else { Some(val) };
        }

        if let Ok(val) = std::env::var(format!("{}_SHARED_SECRET", ENV_PREFIX)) {
            self.shared_secret = val;
        }

        if let Ok(val) = std::env::var(format!("{}_POLL_INTERVAL", ENV_PREFIX)) {
            if let Ok(secs) = val.trim().parse() {
                self.poll_interval = secs;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_SYNC_PRIMARY", ENV_PREFIX)) {
            self.sync_primary = val.eq_ignore_ascii_case("true") || val == "1";
        }
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with SELSYNC_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("selsync")
            .join("config.toml")
    }

    /// Validated listen port
    pub fn listen_port(&self) -> Result<u16, SyncError> {
        match u16::try_from(self.listen_port) {
            Ok(port) if port != 0 => Ok(port),
            _ => Err(SyncError::Configuration(format!(
                "Invalid listen port {} (expected 1-65535)",
                self.listen_port
            ))),
        }
    }

    /// Peer endpoint, if set to something non-blank
    pub fn peer_endpoint(&self) -> Option<&str> {
        self.peer_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Node id, if set to something non-blank
    pub fn node_id(&self) -> Option<&str> {
        self.node_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn default_listen_port() -> u32 {
    DEFAULT_LISTEN_PORT
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL
}

/// Live configuration store
///
/// Keeps the file layer (what gets saved) apart from the effective
/// configuration handed out by `get()`, which also carries the `SELSYNC_*`
/// environment overrides. Updates change the file layer only, so values
/// that come from the environment are never written to disk.
#[derive(Debug)]
pub struct Settings {
    path: Option<PathBuf>,
    file: Mutex<Config>,
    tx: watch::Sender<Config>,
}

impl Settings {
    /// Load settings backed by a config file
    pub fn open(path: PathBuf) -> Result<Self> {
        let file = Config::read_from_path(&path)?;
        let mut effective = file.clone();
        effective.apply_env_overrides();

        let (tx, _rx) = watch::channel(effective);
        Ok(Self {
            path: Some(path),
            file: Mutex::new(file),
            tx,
        })
    }

    /// Settings that live only in memory
    ///
    /// No environment overrides are applied.
    pub fn in_memory(config: Config) -> Self {
        let (tx, _rx) = watch::channel(config.clone());
        Self {
            path: None,
            file: Mutex::new(config),
            tx,
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Snapshot of the effective configuration
    pub fn get(&self) -> Config {
        self.tx.borrow().clone()
    }

    /// Snapshot of the file layer, without environment overrides
    pub fn file_config(&self) -> Config {
        self.lock_file().clone()
    }

    /// Modify the file layer, persist it and notify subscribers
    ///
    /// The in-memory value is only replaced once persisting succeeds.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut file = self.lock_file();
        let mut next = file.clone();
        f(&mut next);

        if let Some(ref path) = self.path {
            next.save_to_path(path)?;
        }

        *file = next;
        self.publish(&file);
        Ok(())
    }

    /// Re-read the backing file and notify subscribers if anything changed
    pub fn reload(&self) -> Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        let next = Config::read_from_path(path)?;
        let mut file = self.lock_file();
        *file = next;
        self.publish(&file);
        Ok(())
    }

    /// Subscribe to configuration changes
    pub fn subscribe(&self) -> watch::Receiver<Config> {
        self.tx.subscribe()
    }

    fn lock_file(&self) -> MutexGuard<'_, Config> {
        self.file.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Send the effective configuration for a new file layer
    fn publish(&self, file: &Config) {
        let mut effective = file.clone();
        if self.path.is_some() {
            effective.apply_env_overrides();
        }

        self.tx.send_if_modified(|current| {
            if *current == effective {
                false
            } else {
                *current = effective;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "SELSYNC_LISTEN_PORT",
        "SELSYNC_PEER_ENDPOINT",
        "SELSYNC_SHARED_SECRET",
        "SELSYNC_POLL_INTERVAL",
        "SELSYNC_SYNC_PRIMARY",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen_port, DEFAULT_LISTEN_PORT);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(!config.sync_primary);
        assert!(config.peer_endpoint.is_none());
        assert!(config.node_id.is_none());
    }

    #[test]
    fn test_listen_port_validation() {
        let mut config = Config::default();
        assert_eq!(config.listen_port().unwrap(), 8765);

        config.listen_port = 0;
        assert!(matches!(
            config.listen_port(),
            Err(SyncError::Configuration(_))
        ));

        config.listen_port = 70000;
        assert!(config.listen_port().is_err());

        config.listen_port = 65535;
        assert_eq!(config.listen_port().unwrap(), 65535);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = Config {
            peer_endpoint: Some("   ".to_string()),
            node_id: Some(String::new()),
            ..Config::default()
        };
        assert!(config.peer_endpoint().is_none());
        assert!(config.node_id().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("SELSYNC_LISTEN_PORT", "9000");
        env::set_var("SELSYNC_PEER_ENDPOINT", "tcp://peer:9000");
        env::set_var("SELSYNC_SHARED_SECRET", "hunter2");
        env::set_var("SELSYNC_POLL_INTERVAL", "0");
        env::set_var("SELSYNC_SYNC_PRIMARY", "1");
        config.apply_env_overrides();

        assert_eq!(config.listen_port, 9000);
        assert_eq!(config.peer_endpoint(), Some("tcp://peer:9000"));
        assert_eq!(config.shared_secret, "hunter2");
        assert_eq!(config.poll_interval, 0);
        assert!(config.sync_primary);
    }

    #[test]
    fn test_env_override_ignores_garbage_numbers() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("SELSYNC_LISTEN_PORT", "not-a-port");
        env::set_var("SELSYNC_POLL_INTERVAL", "-3");
        config.apply_env_overrides();

        assert_eq!(config.listen_port, DEFAULT_LISTEN_PORT);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_env_override_empty_endpoint_clears() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config {
            peer_endpoint: Some("tcp://peer".to_string()),
            ..Config::default()
        };
        env::set_var("SELSYNC_PEER_ENDPOINT", "");
        config.apply_env_overrides();
        assert!(config.peer_endpoint.is_none());
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            listen_port = 4000
            peer_endpoint = "tcp://desktop:4000"
            shared_secret = "s"
            poll_interval = 3
            sync_primary = true
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.listen_port, 4000);
        assert_eq!(config.peer_endpoint(), Some("tcp://desktop:4000"));
        assert_eq!(config.shared_secret, "s");
        assert_eq!(config.poll_interval, 3);
        assert!(config.sync_primary);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::load_from_path(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = Config {
            shared_secret: "abc".to_string(),
            node_id: Some("node-1".to_string()),
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_settings_update_persists_and_notifies() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let settings = Settings::open(path.clone()).unwrap();
        let mut rx = settings.subscribe();
        assert!(!rx.has_changed().unwrap());

        settings.update(|c| c.poll_interval = 42).unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().poll_interval, 42);
        assert_eq!(Config::load_from_path(&path).unwrap().poll_interval, 42);
    }

    #[test]
    fn test_settings_noop_update_does_not_notify() {
        let settings = Settings::in_memory(Config::default());
        let rx = settings.subscribe();

        settings.update(|c| c.sync_primary = false).unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_settings_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let settings = Settings::open(path.clone()).unwrap();
        let mut rx = settings.subscribe();

        let edited = Config {
            sync_primary: true,
            ..Config::default()
        };
        edited.save_to_path(&path).unwrap();
        settings.reload().unwrap();

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().sync_primary);
    }

    #[test]
    fn test_env_overrides_are_not_persisted() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        Config {
            shared_secret: "from-file".to_string(),
            ..Config::default()
        }
        .save_to_path(&path)
        .unwrap();

        env::set_var("SELSYNC_SHARED_SECRET", "from-env-only");
        env::set_var("SELSYNC_LISTEN_PORT", "9100");
        let settings = Settings::open(path.clone()).unwrap();
        assert_eq!(settings.get().shared_secret, "from-env-only");
        assert_eq!(settings.file_config().shared_secret, "from-file");

        settings.update(|c| c.poll_interval = 5).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("from-env-only"));
        assert!(!content.contains("9100"));
        let saved = Config::read_from_path(&path).unwrap();
        assert_eq!(saved.shared_secret, "from-file");
        assert_eq!(saved.listen_port, DEFAULT_LISTEN_PORT);
        assert_eq!(saved.poll_interval, 5);

        // The environment still wins for the running configuration
        let effective = settings.get();
        assert_eq!(effective.shared_secret, "from-env-only");
        assert_eq!(effective.listen_port, 9100);
        assert_eq!(effective.poll_interval, 5);
    }

    #[test]
    fn test_reload_keeps_env_overrides() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        env::set_var("SELSYNC_SHARED_SECRET", "from-env-only");
        let settings = Settings::open(path.clone()).unwrap();

        Config {
            shared_secret: "edited".to_string(),
            poll_interval: 7,
            ..Config::default()
        }
        .save_to_path(&path)
        .unwrap();
        settings.reload().unwrap();

        assert_eq!(settings.get().shared_secret, "from-env-only");
        assert_eq!(settings.get().poll_interval, 7);
        assert_eq!(settings.file_config().shared_secret, "edited");
    }

    #[test]
    fn test_first_run_identity_does_not_save_env_secret() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        env::set_var("SELSYNC_SHARED_SECRET", "from-env-only");
        let settings = Settings::open(path.clone()).unwrap();
        let identity = crate::identity::NodeIdentity::ensure(&settings).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(identity.id()));
        assert!(!content.contains("from-env-only"));
    }

    #[test]
    fn test_from_env() {
        let _guard = EnvGuard::new(ENV_VARS);
        assert_eq!(Config::from_env(), Config::default());

        env::set_var("SELSYNC_POLL_INTERVAL", "2");
        assert_eq!(Config::from_env().poll_interval, 2);
    }
}
