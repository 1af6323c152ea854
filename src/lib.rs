//! Streaming microphone client for live transcription/translation servers.
//!
//! # Wire contract
//!
//! Outbound (client -> server): binary WebSocket messages carrying
//! microphone audio.
//!
//! - `codec = "none"`: each message is exactly `chunk_samples * 2` bytes of
//!   raw little-endian signed 16-bit mono PCM at the configured sample rate
//!   (1024 bytes per message with the 512-sample / 16 kHz defaults).
//! - `codec = "opus"`: each message is one Opus packet encoding
//!   `chunk_samples` samples (40 ms with the 640-sample default), produced
//!   by a single stateful encoder in VOIP mode. Packets are variable-length
//!   and must reach the server's decoder in send order.
//!
//! Inbound (server -> client): text WebSocket messages containing a JSON
//! object:
//!
//! ```json
//! { "transcription": "hello world", "translation": "hola mundo" }
//! ```
//!
//! Both fields are optional; unrecognized fields are ignored. Malformed
//! messages are skipped with a warning and never terminate the session.

pub mod audio;
pub mod chunker;
pub mod client;
pub mod codec;
pub mod config;
pub mod output;

pub use chunker::ChunkBuffer;
pub use codec::ChunkEncoder;
pub use config::AppConfig;
pub use output::ServerEvent;
