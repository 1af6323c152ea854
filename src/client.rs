//! Streaming session: one WebSocket connection, a capture-to-network path and
//! a network-to-console path running concurrently until Ctrl-C.

use anyhow::{Context, Result};
use crossbeam_channel::unbounded;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::thread;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
};

use crate::audio;
use crate::chunker::ChunkBuffer;
use crate::codec::ChunkEncoder;
use crate::config::AppConfig;
use crate::output::{ServerEvent, print_event};

pub async fn run(config: AppConfig) -> Result<()> {
    config.validate()?;

    // Connecting. Any failure from here until the device starts is fatal.
    eprintln!("Connecting to {}...", config.server.url);
    let (ws_stream, _) = connect_async(&config.server.url)
        .await
        .with_context(|| format!("failed to connect to {}", config.server.url))?;
    eprintln!("Connected");
    let (mut ws_writer, mut ws_reader) = ws_stream.split();

    // Receive path: runs for the connection's lifetime. A read failure or a
    // server close ends this task only; the capture path keeps going.
    let receiver = tokio::spawn(async move {
        receive_events(&mut ws_reader, |event| print_event(&event)).await;
    });

    // Writer task: sole owner of the sink.
    let (frame_tx, frame_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let writer = tokio::spawn(async move {
        forward_frames(frame_rx, &mut ws_writer).await;
        let _ = ws_writer.close().await;
    });

    // Built once at startup: the Opus encoder is stateful across chunks.
    let mut encoder = ChunkEncoder::from_config(&config)?;
    let mut buffer = ChunkBuffer::new(config.chunk_bytes());

    let (audio_tx, audio_rx) = unbounded::<Vec<i16>>();
    let (ready_tx, ready_rx) = unbounded();
    let (stop_tx, stop_rx) = unbounded::<()>();

    let audio_config = config.audio.clone();
    let capture = thread::spawn(move || {
        audio::run_capture(audio_config, audio_tx, ready_tx, stop_rx);
    });

    // Forwarder: drains capture blocks, extracts full chunks in arrival
    // order, encodes and hands them to the writer. Ends when the capture
    // thread drops its sender.
    let forwarder = thread::spawn(move || {
        while let Ok(samples) = audio_rx.recv() {
            buffer.push_samples(&samples);
            while let Some(chunk) = buffer.pop_chunk() {
                match encoder.encode(&chunk) {
                    Ok(frame) => {
                        if frame_tx.send(frame).is_err() {
                            return;
                        }
                    }
                    Err(err) => eprintln!("Failed to encode chunk: {}", err),
                }
            }
        }
    });

    // Device acquisition and stream start happen on the capture thread;
    // surface the outcome here so startup failures exit the process.
    tokio::task::spawn_blocking(move || ready_rx.recv())
        .await?
        .context("capture thread exited before reporting status")?
        .context("audio capture failed to start")?;

    // Running.
    eprintln!("Recording... Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    // Shutting down: stop the device first, then let the channel chain drain
    // in pipeline order (capture -> forwarder -> writer -> socket close).
    eprintln!("Stopping capture...");
    let _ = stop_tx.send(());
    let _ = capture.join();
    let _ = forwarder.join();
    let _ = writer.await;
    receiver.abort();
    let _ = receiver.await;

    Ok(())
}

/// Drains encoded frames into the outbound sink. Frames are fire-and-forget:
/// a failed send is logged and that frame dropped, later frames still get
/// attempted (and keep failing if the connection is dead). Returns once the
/// frame channel closes.
async fn forward_frames<S>(mut frame_rx: mpsc::UnboundedReceiver<Vec<u8>>, sink: &mut S)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    while let Some(frame) = frame_rx.recv().await {
        if let Err(err) = sink.send(Message::Binary(frame)).await {
            eprintln!("Failed to send audio chunk: {}", err);
        }
    }
}

/// Reads inbound messages until a read error or close frame. Malformed
/// payloads are skipped with a warning; valid events are handed to
/// `on_event` in arrival order.
async fn receive_events<S, F>(stream: &mut S, mut on_event: F)
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
    F: FnMut(ServerEvent),
{
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(payload)) => match ServerEvent::parse(&payload) {
                Ok(event) => on_event(event),
                Err(err) => eprintln!("Skipping malformed server message: {}", err),
            },
            Ok(Message::Close(_)) => {
                eprintln!("Server closed the connection");
                break;
            }
            Ok(_) => {}
            Err(err) => {
                eprintln!("WebSocket read error: {}", err);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::pin::Pin;
    use std::task::{Context as TaskContext, Poll};

    /// Sink that records every attempted send and fails on chosen frames.
    struct FlakySink {
        sent: Vec<Vec<u8>>,
        attempts: usize,
        fail_on: Vec<usize>,
    }

    impl FlakySink {
        fn new(fail_on: Vec<usize>) -> Self {
            Self {
                sent: Vec::new(),
                attempts: 0,
                fail_on,
            }
        }
    }

    impl Sink<Message> for FlakySink {
        type Error = WsError;

        fn poll_ready(
            self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
        ) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
            let this = self.get_mut();
            let index = this.attempts;
            this.attempts += 1;
            if this.fail_on.contains(&index) {
                return Err(WsError::ConnectionClosed);
            }
            if let Message::Binary(bytes) = item {
                this.sent.push(bytes);
            }
            Ok(())
        }

        fn poll_flush(
            self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
        ) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(
            self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
        ) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn send_failure_does_not_abort_later_frames() {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        for frame in [vec![1u8; 4], vec![2u8; 4], vec![3u8; 4]] {
            frame_tx.send(frame).unwrap();
        }
        drop(frame_tx);

        let mut sink = FlakySink::new(vec![1]);
        forward_frames(frame_rx, &mut sink).await;

        // The second frame failed and was dropped; the first and third were
        // still attempted and delivered.
        assert_eq!(sink.attempts, 3);
        assert_eq!(sink.sent, vec![vec![1u8; 4], vec![3u8; 4]]);
    }

    #[tokio::test]
    async fn dead_sink_keeps_consuming_frames() {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        for frame in [vec![1u8; 2], vec![2u8; 2], vec![3u8; 2]] {
            frame_tx.send(frame).unwrap();
        }
        drop(frame_tx);

        let mut sink = FlakySink::new(vec![0, 1, 2]);
        forward_frames(frame_rx, &mut sink).await;

        assert_eq!(sink.attempts, 3);
        assert!(sink.sent.is_empty());
    }

    #[tokio::test]
    async fn malformed_message_does_not_end_receive_loop() {
        let mut incoming = stream::iter(vec![
            Ok(Message::Text(r#"{"transcription":"hello"}"#.to_string())),
            Ok(Message::Text("not-a-json".to_string())),
            Ok(Message::Text(r#"{"translation":"hola"}"#.to_string())),
        ]);

        let mut events = Vec::new();
        receive_events(&mut incoming, |event| events.push(event)).await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].transcription.as_deref(), Some("hello"));
        assert_eq!(events[1].translation.as_deref(), Some("hola"));
    }

    #[tokio::test]
    async fn read_error_ends_receive_loop() {
        let mut incoming = stream::iter(vec![
            Ok(Message::Text(r#"{"transcription":"first"}"#.to_string())),
            Err(WsError::ConnectionClosed),
            Ok(Message::Text(r#"{"transcription":"after"}"#.to_string())),
        ]);

        let mut events = Vec::new();
        receive_events(&mut incoming, |event| events.push(event)).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].transcription.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn close_frame_ends_receive_loop() {
        let mut incoming = stream::iter(vec![
            Ok(Message::Close(None)),
            Ok(Message::Text(r#"{"transcription":"after"}"#.to_string())),
        ]);

        let mut events = Vec::new();
        receive_events(&mut incoming, |event| events.push(event)).await;

        assert!(events.is_empty());
    }
}
