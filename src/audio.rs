//! Microphone capture on a dedicated thread.
//!
//! cpal streams are not `Send`, so the stream is built, started and dropped
//! on one thread. Captured blocks are forwarded as `Vec<i16>` over a
//! crossbeam channel; block sizes are whatever the backend delivers.

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use crate::config::AudioConfig;

pub fn list_audio_devices() -> Result<()> {
    let host = cpal::default_host();

    println!("Available input devices:");
    for (i, device) in host.input_devices()?.enumerate() {
        let name = device.name().unwrap_or("Unknown".to_string());
        println!("  {}: {}", i, name);
    }

    Ok(())
}

/// Runs capture until `stop_rx` fires, then drops the stream (which stops the
/// device) before returning. The startup outcome is reported once over
/// `ready_tx`: device acquisition or stream-start failures arrive there as
/// errors and the caller treats them as fatal.
pub fn run_capture(
    config: AudioConfig,
    audio_tx: Sender<Vec<i16>>,
    ready_tx: Sender<Result<()>>,
    stop_rx: Receiver<()>,
) {
    let stream = match build_input_stream(&config, audio_tx) {
        Ok(stream) => stream,
        Err(err) => {
            let _ = ready_tx.send(Err(err));
            return;
        }
    };

    if let Err(err) = stream.play() {
        let _ = ready_tx.send(Err(anyhow!(err).context("failed to start capture stream")));
        return;
    }
    let _ = ready_tx.send(Ok(()));

    // Block until shutdown. A recv error means the main task is gone, which
    // also means it is time to stop.
    let _ = stop_rx.recv();
    drop(stream);
}

fn build_input_stream(config: &AudioConfig, audio_tx: Sender<Vec<i16>>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = if let Some(index) = config.device {
        host.input_devices()?
            .nth(index)
            .ok_or_else(|| anyhow!("Device index {} not found", index))?
    } else {
        host.default_input_device()
            .ok_or_else(|| anyhow!("No input device available"))?
    };

    let supported = device
        .default_input_config()
        .context("failed to query input device config")?;

    eprintln!(
        "Using input device: {}",
        device.name().unwrap_or("Unknown".to_string())
    );

    let stream_config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let err_fn = |err| eprintln!("Audio stream error: {}", err);

    // The callback sends into an unbounded channel and never blocks. Send
    // failures mean the forwarder is gone (shutdown in progress) and are
    // ignored.
    let stream = match supported.sample_format() {
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let _ = audio_tx.send(data.to_vec());
            },
            err_fn,
            None,
        )?,
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let samples: Vec<i16> = data
                    .iter()
                    .map(|s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                    .collect();
                let _ = audio_tx.send(samples);
            },
            err_fn,
            None,
        )?,
        other => {
            return Err(anyhow!(
                "Unsupported sample format {:?}. Only I16 and F32 are supported.",
                other
            ));
        }
    };

    Ok(stream)
}
