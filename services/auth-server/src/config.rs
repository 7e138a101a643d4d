//! Configuration: optional TOML file layered under environment variables

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::port::PortSpec;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATA_DIR: &str = "./auth-data";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: PortSpec,
    pub data_dir: PathBuf,
    /// Whether resetting a password also clears the user's tokens and rotation chain.
    pub reset_clears_tokens: bool,
    pub rate_limit_max_attempts: u32,
    pub rate_limit_window_ms: u64,
}

/// On-disk shape of an optional TOML config file; every field overlays
/// the built-in defaults, which are themselves overlaid by environment
/// variables for port and data directory.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    port: Option<PortSpecFile>,
    data_dir: Option<PathBuf>,
    reset_clears_tokens: Option<bool>,
    rate_limit_max_attempts: Option<u32>,
    rate_limit_window_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortSpecFile {
    Single(u16),
    Many(Vec<u16>),
}

impl Config {
    /// Resolve `--config <path>` from argv, falling back to `AUTH_CONFIG` or nothing.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        cli_path.map(PathBuf::from).or_else(|| std::env::var("AUTH_CONFIG").ok().map(PathBuf::from))
    }

    /// Load `path` (if given and present) and overlay `AUTH_PORT`/`AUTH_DATA_DIR`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path)?;
                toml::from_str(&text)?
            }
            _ => FileConfig::default(),
        };

        let port = match std::env::var("AUTH_PORT").ok().and_then(|v| v.parse().ok()) {
            Some(port) => PortSpec::Single(port),
            None => match file.port {
                Some(PortSpecFile::Single(port)) => PortSpec::Single(port),
                Some(PortSpecFile::Many(ports)) if ports.len() == 2 => PortSpec::Range(ports[0], ports[1]),
                Some(PortSpecFile::Many(ports)) => PortSpec::List(ports),
                None => PortSpec::Single(DEFAULT_PORT),
            },
        };

        let data_dir = std::env::var("AUTH_DATA_DIR")
            .ok()
            .map(PathBuf::from)
            .or(file.data_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        Ok(Config {
            port,
            data_dir,
            reset_clears_tokens: file.reset_clears_tokens.unwrap_or(true),
            rate_limit_max_attempts: file.rate_limit_max_attempts.unwrap_or(10),
            rate_limit_window_ms: file.rate_limit_window_ms.unwrap_or(1_000),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_with_no_file_and_no_env() {
        // SAFETY: test runs single-threaded within this process's env access.
        unsafe {
            std::env::remove_var("AUTH_PORT");
            std::env::remove_var("AUTH_DATA_DIR");
        }
        let config = Config::load(None).unwrap();
        assert_eq!(config.port, PortSpec::Single(DEFAULT_PORT));
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert!(config.reset_clears_tokens);
    }

    #[test]
    fn loads_range_port_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.toml");
        std::fs::write(&path, "port = [3000, 3005]\ndata_dir = \"/tmp/data\"\n").unwrap();

        unsafe {
            std::env::remove_var("AUTH_PORT");
            std::env::remove_var("AUTH_DATA_DIR");
        }
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.port, PortSpec::Range(3000, 3005));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/data"));
    }

    #[test]
    fn env_var_overrides_file_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.toml");
        std::fs::write(&path, "port = 4000\n").unwrap();

        unsafe {
            std::env::set_var("AUTH_PORT", "5000");
        }
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.port, PortSpec::Single(5000));
        unsafe {
            std::env::remove_var("AUTH_PORT");
        }
    }
}
