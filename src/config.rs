use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8765";
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;
pub const DEFAULT_RAW_CHUNK_SAMPLES: usize = 512;
pub const DEFAULT_OPUS_CHUNK_SAMPLES: usize = 640;
pub const DEFAULT_OPUS_BITRATE: i32 = 30_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub codec: CodecConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Samples per outbound chunk. When unset, the codec picks its default:
    /// 512 for raw PCM, 640 (40 ms) for Opus.
    #[serde(default)]
    pub chunk_samples: Option<usize>,
    /// Input device index as listed by --list-devices; default device if unset.
    #[serde(default)]
    pub device: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    pub mode: CodecMode,
    pub bitrate: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CodecMode {
    /// Send raw little-endian 16-bit PCM chunks unmodified.
    None,
    /// Compress each chunk with a stateful Opus encoder in VOIP mode.
    Opus,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            chunk_samples: None,
            device: None,
        }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            mode: CodecMode::None,
            bitrate: DEFAULT_OPUS_BITRATE,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            audio: AudioConfig::default(),
            codec: CodecConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save()?;
            Ok(default_config)
        } else {
            let contents = fs::read_to_string(&config_path)?;
            let config: AppConfig = toml::from_str(&contents)
                .map_err(|e| anyhow!("Failed to parse {}: {}", config_path.display(), e))?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Samples per chunk after applying the per-codec default.
    pub fn chunk_samples(&self) -> usize {
        self.audio.chunk_samples.unwrap_or(match self.codec.mode {
            CodecMode::None => DEFAULT_RAW_CHUNK_SAMPLES,
            CodecMode::Opus => DEFAULT_OPUS_CHUNK_SAMPLES,
        })
    }

    /// Bytes per chunk (2 bytes per 16-bit sample).
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_samples() * 2
    }

    pub fn validate(&self) -> Result<()> {
        if !self.server.url.starts_with("ws://") && !self.server.url.starts_with("wss://") {
            return Err(anyhow!(
                "server url must start with 'ws://' or 'wss://', got '{}'",
                self.server.url
            ));
        }

        if self.audio.sample_rate == 0 {
            return Err(anyhow!("sample_rate must be positive"));
        }

        let chunk_samples = self.chunk_samples();
        if chunk_samples == 0 {
            return Err(anyhow!("chunk_samples must be positive"));
        }

        if self.codec.mode == CodecMode::Opus {
            // Opus only accepts frames of 2.5, 5, 10, 20, 40 or 60 ms.
            let rate = self.audio.sample_rate as usize;
            let valid = [
                rate / 400,
                rate / 200,
                rate / 100,
                rate / 50,
                rate / 25,
                3 * rate / 50,
            ];
            if !valid.contains(&chunk_samples) {
                return Err(anyhow!(
                    "chunk_samples {} is not a valid Opus frame size at {} Hz (expected one of {:?})",
                    chunk_samples,
                    rate,
                    valid
                ));
            }
            if self.codec.bitrate <= 0 {
                return Err(anyhow!("codec bitrate must be positive"));
            }
        }

        Ok(())
    }
}

fn get_config_path() -> Result<PathBuf> {
    let config_dir = if let Some(xdg_config_home) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config_home)
    } else {
        dirs::config_dir().ok_or_else(|| anyhow!("Cannot determine config directory"))?
    };

    Ok(config_dir.join("lt-client").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_raw_pcm_at_16k() {
        let config = AppConfig::default();
        assert_eq!(config.server.url, "ws://127.0.0.1:8765");
        assert_eq!(config.audio.sample_rate, 16_000);
        assert_eq!(config.codec.mode, CodecMode::None);
        assert_eq!(config.chunk_samples(), 512);
        assert_eq!(config.chunk_bytes(), 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn opus_mode_defaults_to_40ms_frames() {
        let mut config = AppConfig::default();
        config.codec.mode = CodecMode::Opus;
        assert_eq!(config.chunk_samples(), 640);
        assert_eq!(config.chunk_bytes(), 1280);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_websocket_url() {
        let mut config = AppConfig::default();
        config.server.url = "http://127.0.0.1:8765".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ws://"));
    }

    #[test]
    fn rejects_invalid_opus_frame_size() {
        let mut config = AppConfig::default();
        config.codec.mode = CodecMode::Opus;
        config.audio.chunk_samples = Some(512);
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_explicit_opus_frame_sizes() {
        let mut config = AppConfig::default();
        config.codec.mode = CodecMode::Opus;
        for samples in [40, 80, 160, 320, 640, 960] {
            config.audio.chunk_samples = Some(samples);
            assert!(config.validate().is_ok(), "{} should be valid", samples);
        }
    }

    #[test]
    fn raw_mode_allows_arbitrary_chunk_sizes() {
        let mut config = AppConfig::default();
        config.audio.chunk_samples = Some(300);
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_bytes(), 600);
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let mut config = AppConfig::default();
        config.codec.mode = CodecMode::Opus;
        config.audio.device = Some(2);
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.codec.mode, CodecMode::Opus);
        assert_eq!(parsed.audio.device, Some(2));
    }
}
