//! Host configuration: a top-level struct of `#[serde(default)]`
//! sub-structs, a `load(path) -> Self` that falls back to defaults with a
//! warning on parse failure, and a `write_default(path)` for `--gen-config`.

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use relay_core::quantise::QuantiserKind;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub network: NetworkConfig,
    pub session: SessionSettings,
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP port the host listens on for a viewer's control connection.
    pub control_port: u16,
}

/// Codec and capture parameters that aren't part of the wire handshake
/// itself (K and scale percent are negotiated per §4.8; these control how
/// the host builds its side of the pipeline once it knows them).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub quantiser: QuantiserKind,
    /// Directory the RGB-palette quantiser's disk-backed LUT cache lives in.
    pub palette_cache_dir: String,
    /// zlib compression level, 0..=9.
    pub compression_level: u32,
    /// Encoder's request-gate poll timeout, per §4.8.
    pub request_gate_timeout_ms: u64,
    /// Monitor index to capture (0 = primary).
    pub monitor_index: u32,
    /// DXGI `AcquireNextFrame` timeout in milliseconds.
    pub capture_timeout_ms: u32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            session: SessionSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { control_port: 7332 }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            quantiser: QuantiserKind::default(),
            palette_cache_dir: "./palette-cache".into(),
            compression_level: 6,
            request_gate_timeout_ms: 10,
            monitor_index: 0,
            capture_timeout_ms: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

impl HostConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = HostConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("control_port"));
        assert!(text.contains("quantiser"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = HostConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: HostConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.control_port, 7332);
        assert_eq!(parsed.session.compression_level, 6);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = HostConfig::load(Path::new("/nonexistent/relay-host.toml"));
        assert_eq!(cfg.network.control_port, 7332);
    }
}
