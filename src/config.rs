//! Configuration types for GhostRelay

use crate::error::{Error, Result};
use crate::types::{BorderColor, FrameFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default grace window before a superseded swap chain handle is closed
pub const DEFAULT_STALE_TIMEOUT_MS: u64 = 2000;

/// Renderer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// How long a superseded handle stays open for the foreground process
    pub stale_timeout_ms: u64,
    /// Engine output surface format
    pub output_format: FrameFormat,
    /// Run the engine in real-time (low latency) mode
    pub real_time_mode: bool,
    /// Mirror the output on adapters with the known scaling defect
    pub adapter_mirror_workaround: bool,
    /// Scheme used for source URLs handed to the engine
    pub url_scheme: String,
    /// Colour used for areas outside the video
    pub border_color: BorderColor,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            stale_timeout_ms: DEFAULT_STALE_TIMEOUT_MS,
            output_format: FrameFormat::Nv12,
            real_time_mode: true,
            adapter_mirror_workaround: true,
            url_scheme: "webrtc".to_string(),
            border_color: BorderColor::OPAQUE_BLACK,
        }
    }
}

impl RendererConfig {
    pub fn with_stale_timeout(mut self, timeout: Duration) -> Self {
        self.stale_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_border_color(mut self, color: BorderColor) -> Self {
        self.border_color = color;
        self
    }

    pub fn with_output_format(mut self, format: FrameFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_real_time_mode(mut self, enabled: bool) -> Self {
        self.real_time_mode = enabled;
        self
    }

    pub fn with_adapter_mirror_workaround(mut self, enabled: bool) -> Self {
        self.adapter_mirror_workaround = enabled;
        self
    }

    pub fn with_url_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.url_scheme = scheme.into();
        self
    }

    pub fn stale_timeout(&self) -> Duration {
        Duration::from_millis(self.stale_timeout_ms)
    }

    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded renderer config from {}", path.display());
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.url_scheme.is_empty()
            || !self
                .url_scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(Error::Config(format!(
                "invalid url_scheme '{}'",
                self.url_scheme
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.stale_timeout(), Duration::from_millis(2000));
        assert_eq!(config.border_color, BorderColor::OPAQUE_BLACK);
        assert_eq!(config.output_format, FrameFormat::Nv12);
        assert!(config.real_time_mode);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = RendererConfig::from_toml_str("stale_timeout_ms = 500\n").unwrap();
        assert_eq!(config.stale_timeout_ms, 500);
        assert_eq!(config.url_scheme, "webrtc");
    }

    #[test]
    fn test_invalid_scheme_rejected() {
        let err = RendererConfig::from_toml_str("url_scheme = \"web rtc\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "output_format = \"bgra\"").unwrap();
        writeln!(file, "[border_color]\nr = 16\ng = 16\nb = 16\na = 255").unwrap();

        let config = RendererConfig::load(file.path()).unwrap();
        assert_eq!(config.output_format, FrameFormat::Bgra);
        assert_eq!(config.border_color.r, 16);
    }

    #[test]
    fn test_toml_round_trip_of_builder() {
        let config = RendererConfig::default()
            .with_stale_timeout(Duration::from_millis(750))
            .with_url_scheme("ghost");
        let text = config.to_toml_string().unwrap();
        assert_eq!(RendererConfig::from_toml_str(&text).unwrap(), config);
    }
}
