//! Viewer configuration: a top-level struct of `#[serde(default)]`
//! sub-structs, `load`/`write_default` for TOML round-tripping.

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use relay_core::quantise::QuantiserKind;

/// Top-level configuration for the viewer client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub network: NetworkConfig,
    pub session: SessionSettings,
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host control address (`ip:port`) to connect to for the TCP handshake.
    pub host_address: String,
}

/// The parameters the viewer proposes during the handshake, plus how it
/// builds its side of the decode pipeline once connected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Palette size `K` sent to the host during the handshake.
    pub k: u16,
    /// Scale percent `s` sent to the host during the handshake.
    pub scale_percent: u8,
    pub quantiser: QuantiserKind,
    /// Directory the RGB-palette quantiser's disk-backed LUT cache lives in.
    pub palette_cache_dir: String,
    /// zlib compression level, 0..=9.
    pub compression_level: u32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ViewerConfig {
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
        Self { host_address: "127.0.0.1:7332".into() }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            k: 16,
            scale_percent: 60,
            quantiser: QuantiserKind::Greyscale,
            palette_cache_dir: "./palette-cache".into(),
            compression_level: 6,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

impl ViewerConfig {
    /// Load from a TOML file, falling back to defaults.
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

    /// Write default config to a file.
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
        let cfg = ViewerConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("host_address"));
        assert!(text.contains("scale_percent"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = ViewerConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ViewerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.session.k, 16);
        assert_eq!(parsed.session.scale_percent, 60);
    }
}
