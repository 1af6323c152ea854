//! Parsing and printing of server result messages.

use serde::Deserialize;

/// One result message from the server. Either field may be missing or empty;
/// unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerEvent {
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub translation: Option<String>,
}

impl ServerEvent {
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// Lines to print for one event: transcription first, then translation,
/// skipping absent or empty fields.
pub fn render_lines(event: &ServerEvent) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(text) = &event.transcription {
        if !text.is_empty() {
            lines.push(format!("📝 {}", text));
        }
    }
    if let Some(text) = &event.translation {
        if !text.is_empty() {
            lines.push(format!("🌍 {}", text));
        }
    }
    lines
}

pub fn print_event(event: &ServerEvent) {
    for line in render_lines(event) {
        println!("{}", line);
    }
}
