//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/keyvault/config.toml)
//! 3. Environment variables (KEYVAULT_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
const ENV_PREFIX: &str = "KEYVAULT";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the key file and its backups
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Name of the key file inside `data_dir`
    #[serde(default = "default_data_file")]
    pub data_file: String,

    /// Shared secret expected in the `X-API-Key` header
    #[serde(default)]
    pub api_key: Option<String>,

    /// Address the REST API binds to
    #[serde(default = "default_api_host")]
    pub api_host: String,

    /// Port the REST API listens on
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Write logs here instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            data_file: default_data_file(),
            api_key: None,
            api_host: default_api_host(),
            api_port: default_api_port(),
            log_file: None,
        }
    }
}

impl Config {
    /// Defaults with a specific data directory (no env or file lookup)
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (KEYVAULT_DATA_DIR, KEYVAULT_API_KEY, ...)
    /// 2. Config file (~/.config/keyvault/config.toml or KEYVAULT_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used. A data directory that
    /// cannot be created is logged and left for the store to deal with.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        if let Err(e) = config.ensure_data_dir() {
            tracing::warn!("{:#}", e);
        }
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_DATA_FILE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.data_file = val;
            }
        }

        // Empty string clears the key
        if let Ok(val) = std::env::var(format!("{}_API_KEY", ENV_PREFIX)) {
            self.api_key = if val.is_empty() { None } else { Some(val) };
        }

        if let Ok(val) = std::env::var(format!("{}_API_HOST", ENV_PREFIX)) {
            if !val.is_empty() {
                self.api_host = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_API_PORT", ENV_PREFIX)) {
            match val.parse() {
                Ok(port) => self.api_port = port,
                Err(_) => tracing::warn!("Ignoring invalid {}_API_PORT: {}", ENV_PREFIX, val),
            }
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
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
    /// Can be overridden with KEYVAULT_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keyvault")
            .join("config.toml")
    }

    /// Get the path to the key file
    pub fn data_path(&self) -> PathBuf {
        self.data_dir.join(&self.data_file)
    }
}

/// Get the default data directory
///
/// Falls back to the current directory when the platform has no data dir.
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("keyvault"))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_data_file() -> String {
    "keys.csv".to_string()
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8080
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

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
        "KEYVAULT_DATA_DIR",
        "KEYVAULT_DATA_FILE",
        "KEYVAULT_API_KEY",
        "KEYVAULT_API_HOST",
        "KEYVAULT_API_PORT",
        "KEYVAULT_LOG_FILE",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.api_host, "127.0.0.1");
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.data_file, "keys.csv");
        assert!(config.data_path().ends_with("keys.csv"));
    }

    #[test]
    fn test_with_data_dir() {
        let config = Config::with_data_dir("/srv/keys");
        assert_eq!(config.data_path(), PathBuf::from("/srv/keys/keys.csv"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("KEYVAULT_DATA_DIR", "/tmp/keyvault-test");
        env::set_var("KEYVAULT_DATA_FILE", "licenses.txt");
        config.apply_env_overrides();

        assert_eq!(
            config.data_path(),
            PathBuf::from("/tmp/keyvault-test/licenses.txt")
        );
    }

    #[test]
    fn test_env_override_api_key() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("KEYVAULT_API_KEY", "s3cret");
        config.apply_env_overrides();
        assert_eq!(config.api_key.as_deref(), Some("s3cret"));

        // Empty string clears it
        env::set_var("KEYVAULT_API_KEY", "");
        config.apply_env_overrides();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_env_override_api_port() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("KEYVAULT_API_PORT", "9090");
        config.apply_env_overrides();
        assert_eq!(config.api_port, 9090);

        // Invalid values are ignored
        env::set_var("KEYVAULT_API_PORT", "not-a-port");
        config.apply_env_overrides();
        assert_eq!(config.api_port, 9090);
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/keyvault"),
            data_file: "keys.csv".to_string(),
            api_key: Some("abc".to_string()),
            api_host: "0.0.0.0".to_string(),
            api_port: 3000,
            log_file: None,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("api_key"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            api_key = "from-file"
            api_port = 9000
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.api_port, 9000);
        // Unspecified fields keep defaults
        assert_eq!(config.api_host, "127.0.0.1");
    }

    #[test]
    fn test_load_from_path_missing_file_creates_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");

        env::set_var("KEYVAULT_DATA_DIR", &data_dir);
        let config = Config::load_from_path(&temp_dir.path().join("missing.toml")).unwrap();

        assert_eq!(config.data_dir, data_dir);
        assert!(data_dir.is_dir());
    }

    #[test]
    fn test_uncreatable_data_dir_still_loads() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let data_dir = blocker.join("data");

        env::set_var("KEYVAULT_DATA_DIR", &data_dir);
        let config = Config::load_from_path(&temp_dir.path().join("missing.toml")).unwrap();

        assert_eq!(config.data_dir, data_dir);
        assert!(!data_dir.exists());
        assert!(crate::KeyStore::open(&config).is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::with_data_dir(temp_dir.path());
        config.api_key = Some("persisted".to_string());
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
