use anyhow::Result;
use clap::Parser;
use lt_client::config::{AppConfig, CodecMode};
use lt_client::{audio, client};

#[derive(Parser)]
#[command(author, version, about = "Stream microphone audio to a live transcription/translation server")]
struct Cli {
    /// List available audio input devices
    #[arg(long)]
    list_devices: bool,

    /// Select audio input device by index
    #[arg(long)]
    device: Option<usize>,

    /// Override the server WebSocket URL
    #[arg(long)]
    server: Option<String>,

    /// Outbound audio codec: raw PCM or Opus voice compression
    #[arg(long, value_enum)]
    codec: Option<CodecMode>,

    /// Samples per outbound chunk (defaults: 512 raw, 640 opus)
    #[arg(long)]
    chunk_samples: Option<usize>,

    /// Opus bitrate in bits per second
    #[arg(long)]
    bitrate: Option<i32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_devices {
        return audio::list_audio_devices();
    }

    let mut config = AppConfig::load()?;
    if let Some(server) = cli.server {
        config.server.url = server;
    }
    if let Some(device) = cli.device {
        config.audio.device = Some(device);
    }
    if let Some(codec) = cli.codec {
        config.codec.mode = codec;
    }
    if let Some(chunk_samples) = cli.chunk_samples {
        config.audio.chunk_samples = Some(chunk_samples);
    }
    if let Some(bitrate) = cli.bitrate {
        config.codec.bitrate = bitrate;
    }

    client::run(config).await
}
