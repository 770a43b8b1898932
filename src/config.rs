use serde::Deserialize;
use std::path::Path;

/// Top-level configuration loaded from memwatch.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub watchdog: WatchdogConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

/// Memory watchdog settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Master switch. Off by default so a bare config never kills a process.
    pub active: bool,
    /// Requests between memory checks. No sensible universal default exists,
    /// so it must be supplied whenever `active` is true.
    pub check_interval: Option<u64>,
    /// Warm-up: no checks until this many requests have been handled. Keeps a
    /// process whose baseline footprint already sits above the ceiling from
    /// being restarted in a loop.
    pub min_handled_requests: u64,
    /// Ceiling on process virtual memory, in bytes. (An earlier incarnation
    /// documented this as bits, but the 500 MB default magnitude and the
    /// process-table units only make sense as bytes.)
    pub max_memory_bytes: u64,
}

/// Errors produced while loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file exists but could not be read.
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    /// Config file is not valid TOML for this schema.
    Parse {
        path: std::path::PathBuf,
        source: toml::de::Error,
    },
    /// Watchdog is active but `check_interval` is missing or zero.
    MissingCheckInterval,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {}", path.display(), source)
            }
            ConfigError::MissingCheckInterval => {
                write!(
                    f,
                    "watchdog.active is true but watchdog.check_interval is missing or zero"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::MissingCheckInterval => None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file is not an error: every field has a default (the
    /// watchdog defaults to inactive). Missing fields within an existing file
    /// likewise fall back to their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that can never tick.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.watchdog.validate()
    }
}

impl WatchdogConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.active && self.check_interval.unwrap_or(0) == 0 {
            return Err(ConfigError::MissingCheckInterval);
        }
        Ok(())
    }
}

// --- Default implementations ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            // Port 0 picks an ephemeral port; the bound address is logged.
            port: 0,
        }
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            active: false,
            check_interval: None,
            min_handled_requests: 500,
            max_memory_bytes: 524_288_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(!config.watchdog.active);
        assert_eq!(config.watchdog.check_interval, None);
        assert_eq!(config.watchdog.min_handled_requests, 500);
        assert_eq!(config.watchdog.max_memory_bytes, 524_288_000);
        assert_eq!(config.server.bind, "127.0.0.1");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("nonexistent.toml")).unwrap();
        assert!(!config.watchdog.active);
        assert_eq!(config.watchdog.min_handled_requests, 500);
    }

    #[test]
    fn test_full_config_parses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memwatch.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "0.0.0.0"
port = 8080

[watchdog]
active = true
check_interval = 20
min_handled_requests = 150
max_memory_bytes = 1000
"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(config.watchdog.active);
        assert_eq!(config.watchdog.check_interval, Some(20));
        assert_eq!(config.watchdog.min_handled_requests, 150);
        assert_eq!(config.watchdog.max_memory_bytes, 1000);
    }

    #[test]
    fn test_partial_config_keeps_field_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memwatch.toml");
        std::fs::write(
            &path,
            r#"
[watchdog]
active = true
check_interval = 100
"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert!(config.watchdog.active);
        assert_eq!(config.watchdog.check_interval, Some(100));
        // Omitted fields resolve to the documented defaults.
        assert_eq!(config.watchdog.min_handled_requests, 500);
        assert_eq!(config.watchdog.max_memory_bytes, 524_288_000);
    }

    #[test]
    fn test_active_without_interval_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memwatch.toml");
        std::fs::write(&path, "[watchdog]\nactive = true\n").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCheckInterval));
    }

    #[test]
    fn test_active_with_zero_interval_is_rejected() {
        let config = WatchdogConfig {
            active: true,
            check_interval: Some(0),
            ..WatchdogConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCheckInterval)
        ));
    }

    #[test]
    fn test_inactive_without_interval_is_fine() {
        let config = WatchdogConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memwatch.toml");
        std::fs::write(&path, "[watchdog\nactive = maybe").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
