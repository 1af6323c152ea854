//! Per-chunk encoding for the outbound audio path.
//!
//! Raw mode passes chunk bytes through untouched. Opus mode runs every chunk
//! through one stateful encoder constructed at startup; Opus carries inter-
//! frame prediction state, so packets must be produced and sent in order by
//! the same encoder instance.

use anyhow::{Context, Result};

use crate::config::{AppConfig, CodecMode};

pub enum ChunkEncoder {
    Raw,
    Opus(OpusFrameEncoder),
}

impl ChunkEncoder {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        match config.codec.mode {
            CodecMode::None => Ok(Self::Raw),
            CodecMode::Opus => Ok(Self::Opus(OpusFrameEncoder::new(
                config.audio.sample_rate,
                config.chunk_samples(),
                config.codec.bitrate,
            )?)),
        }
    }

    /// Turns one full chunk into one outbound message payload.
    pub fn encode(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Raw => Ok(chunk.to_vec()),
            Self::Opus(encoder) => encoder.encode(chunk),
        }
    }
}

pub struct OpusFrameEncoder {
    encoder: opus::Encoder,
    chunk_samples: usize,
}

impl OpusFrameEncoder {
    pub fn new(sample_rate: u32, chunk_samples: usize, bitrate: i32) -> Result<Self> {
        let mut encoder =
            opus::Encoder::new(sample_rate, opus::Channels::Mono, opus::Application::Voip)
                .context("failed to create Opus encoder")?;
        encoder
            .set_bitrate(opus::Bitrate::Bits(bitrate))
            .context("failed to set Opus bitrate")?;
        Ok(Self {
            encoder,
            chunk_samples,
        })
    }

    /// Encodes one chunk of little-endian 16-bit PCM bytes into a single Opus
    /// packet, returning exactly the bytes the encoder produced.
    pub fn encode(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        let pcm: Vec<i16> = chunk
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        // One byte per sample is a generous cap: at voice bitrates a 40 ms
        // packet is a small fraction of this.
        let mut packet = vec![0u8; self.chunk_samples];
        let written = self
            .encoder
            .encode(&pcm, &mut packet)
            .context("Opus encode failed")?;
        packet.truncate(written);
        Ok(packet)
    }
}
