use serde::{Deserialize, Serialize};

use super::audio_models::UplinkDiagnostics;

/// Result returned when a streaming session closes cleanly.
///
/// Serializable for the JSON sidecar written next to a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: String,
    pub duration_secs: f64,
    pub diagnostics: UplinkDiagnostics,
    /// Final transcripts in the order the recognizer produced them.
    pub transcripts: Vec<String>,
    pub recording: Option<RecordingInfo>,
}

impl SessionSummary {
    pub fn new(session_id: &str, started_at: chrono::DateTime<chrono::Utc>, duration_secs: f64) -> Self {
        Self {
            session_id: session_id.to_string(),
            started_at: started_at.to_rfc3339(),
            duration_secs,
            diagnostics: UplinkDiagnostics::default(),
            transcripts: Vec::new(),
            recording: None,
        }
    }

    /// All final transcripts joined with spaces.
    pub fn full_transcript(&self) -> String {
        self.transcripts.join(" ")
    }
}

/// WAV copy of the audio that was sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingInfo {
    pub file_path: String,
    /// SHA-256 of the finished file, lowercase hex.
    pub checksum: String,
    /// PCM bytes after the WAV header.
    pub data_bytes: u64,
}
