use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::StreamError;
use crate::models::session_summary::SessionSummary;

/// Sidecar path for a recording: `session.wav` → `session.summary.json`.
pub fn summary_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("summary.json")
}

/// Write a session summary as a JSON sidecar next to the recording.
pub fn write_summary(summary: &SessionSummary, recording_path: &Path) -> Result<PathBuf, StreamError> {
    let path = summary_path(recording_path);
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| StreamError::StorageError(format!("failed to serialize summary: {}", e)))?;
    fs::write(&path, json).map_err(|e| StreamError::StorageError(format!("failed to write summary: {}", e)))?;
    Ok(path)
}

/// Read a session summary from its JSON sidecar.
pub fn read_summary(recording_path: &Path) -> Result<SessionSummary, StreamError> {
    let path = summary_path(recording_path);
    let json = fs::read_to_string(&path)
        .map_err(|e| StreamError::StorageError(format!("failed to read summary: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| StreamError::StorageError(format!("failed to parse summary: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session_summary::RecordingInfo;

    #[test]
    fn sidecar_round_trip() {
        let recording = std::env::temp_dir().join(format!("session_{}.wav", uuid::Uuid::new_v4()));
        let mut summary = SessionSummary::new("session-1", chrono::Utc::now(), 3.0);
        summary.transcripts.push("テスト".into());
        summary.recording = Some(RecordingInfo {
            file_path: recording.to_string_lossy().into_owned(),
            checksum: "00".repeat(32),
            data_bytes: 96000,
        });

        let path = write_summary(&summary, &recording).unwrap();
        assert!(path.to_string_lossy().ends_with(".summary.json"));
        assert_eq!(read_summary(&recording).unwrap(), summary);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_sidecar_is_storage_error() {
        let recording = std::env::temp_dir().join(format!("absent_{}.wav", uuid::Uuid::new_v4()));
        assert!(matches!(read_summary(&recording), Err(StreamError::StorageError(_))));
    }
}
