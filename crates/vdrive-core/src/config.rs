//! Configuration module for vdrive.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading and defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for vdrive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub fuse: FuseConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// Drive API endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the drive API gateway (e.g. `https://drive.example.com`).
    pub base_url: String,
    /// Bearer token used on every request.
    pub token: String,
}

/// FUSE mount settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuseConfig {
    /// Directory where the filesystem will be mounted.
    pub mount_point: String,
    /// Whether to pass the auto-unmount option to the kernel.
    pub auto_unmount: bool,
}

/// Upload strategy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest declared size (in bytes) still sent as a one-shot simple
    /// upload; anything above goes through a resumable upload session.
    pub simple_max_bytes: u64,
    /// Chunk granularity (in bytes) used to size the resumable upload
    /// channel: the channel holds `declared_size / chunk_bytes` entries,
    /// with a minimum of one.
    pub chunk_bytes: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/vdrive/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vdrive")
            .join("config.yaml")
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
        }
    }
}

impl Default for FuseConfig {
    fn default() -> Self {
        Self {
            mount_point: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("Drive")
                .to_string_lossy()
                .into_owned(),
            auto_unmount: true,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            simple_max_bytes: 5 * 1024 * 1024,
            chunk_bytes: 1024 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_upload_threshold_is_5_mib() {
        let config = Config::default();
        assert_eq!(config.upload.simple_max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.upload.chunk_bytes, 1024 * 1024);
    }

    #[test]
    fn loads_partial_yaml_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api:\n  base_url: http://localhost:9000\n  token: secret"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:9000");
        assert_eq!(config.api.token, "secret");
        // Unspecified sections fall back to defaults.
        assert_eq!(config.upload.simple_max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn load_or_default_on_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/vdrive.yaml"));
        assert!(config.api.base_url.is_empty());
        assert!(config.fuse.auto_unmount);
    }

    #[test]
    fn yaml_round_trip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.upload.simple_max_bytes, config.upload.simple_max_bytes);
        assert_eq!(parsed.fuse.mount_point, config.fuse.mount_point);
    }
}
