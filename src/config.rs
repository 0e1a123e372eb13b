use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

// ============================================================
// Upload Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}

impl UploadConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

fn default_batch_size() -> usize {
    500
}

fn default_max_file_size_mb() -> u64 {
    100
}

// ============================================================
// Scoring Config
// ============================================================

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Score in-process with the simulated model.
    #[default]
    Builtin,
    /// Score through a remote endpoint.
    Remote,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    #[serde(default)]
    pub mode: ScoringMode,
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub seed: Option<u64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mode: ScoringMode::Builtin,
            endpoint: None,
            timeout_secs: default_timeout_secs(),
            seed: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

// ============================================================
// History Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
        }
    }
}

fn default_history_capacity() -> usize {
    100
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            host: default_api_host(),
        }
    }
}

fn default_api_port() -> u16 {
    3000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> eyre::Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else {
            tracing::warn!(path, "Config file not found, using defaults");
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.upload.batch_size == 0 {
            return Err(eyre::eyre!("upload.batch_size must be greater than zero"));
        }
        if self.upload.max_file_size_mb == 0 {
            return Err(eyre::eyre!("upload.max_file_size_mb must be greater than zero"));
        }
        if self.history.capacity == 0 {
            return Err(eyre::eyre!("history.capacity must be greater than zero"));
        }
        if self.scoring.mode == ScoringMode::Remote {
            match &self.scoring.endpoint {
                Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
                Some(url) => {
                    return Err(eyre::eyre!("Invalid scoring endpoint '{}'", url));
                }
                None => {
                    return Err(eyre::eyre!(
                        "scoring.endpoint is required when scoring.mode = \"remote\""
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[upload]
batch_size = 250

[scoring]
mode = "remote"
endpoint = "http://localhost:9000/score"
seed = 7

[api]
port = 8080
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.upload.batch_size, 250);
        assert_eq!(config.upload.max_file_size_mb, 100); // default
        assert_eq!(config.scoring.mode, ScoringMode::Remote);
        assert_eq!(config.scoring.seed, Some(7));
        assert_eq!(config.scoring.timeout_secs, 30); // default
        assert_eq!(config.history.capacity, 100); // default
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.host, "0.0.0.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.upload.batch_size, 500);
        assert_eq!(config.upload.max_file_size_bytes(), 100 * 1024 * 1024);
        assert_eq!(config.scoring.mode, ScoringMode::Builtin);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_batch_size() {
        let mut config = Config::default();
        config.upload.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_remote_without_endpoint() {
        let mut config = Config::default();
        config.scoring.mode = ScoringMode::Remote;
        assert!(config.validate().is_err());

        config.scoring.endpoint = Some("ftp://scoring".to_string());
        assert!(config.validate().is_err());

        config.scoring.endpoint = Some("https://scoring.internal/v1".to_string());
        assert!(config.validate().is_ok());
    }
}
