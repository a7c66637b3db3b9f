use std::sync::Arc;

use parking_lot::Mutex;

use speech_stream_core::{AudioLevels, SessionSummary, StreamError, UplinkDelegate, UplinkState};

/// Delegate that logs session events for a terminal user.
pub struct ConsoleDelegate {
    transcripts: Mutex<Vec<String>>,
    loudest: Mutex<f32>,
}

impl ConsoleDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            transcripts: Mutex::new(Vec::new()),
            loudest: Mutex::new(0.0),
        })
    }

    pub fn transcript_count(&self) -> usize {
        self.transcripts.lock().len()
    }
}

impl UplinkDelegate for ConsoleDelegate {
    fn on_state_changed(&self, state: &UplinkState) {
        log::info!("State: {}", state.name());
    }

    fn on_levels_updated(&self, levels: &AudioLevels) {
        let mut loudest = self.loudest.lock();
        if levels.peak > *loudest {
            *loudest = levels.peak;
            log::debug!("New peak level {:.3}", levels.peak);
        }
    }

    fn on_transcript(&self, transcript: &str) {
        log::info!("> {}", transcript);
        self.transcripts.lock().push(transcript.to_string());
    }

    fn on_error(&self, error: &StreamError) {
        log::error!("Session failed: {}", error);
    }

    fn on_session_finished(&self, summary: &SessionSummary) {
        log::info!(
            "Session {} closed: {} bytes sent, peak level {:.3}",
            summary.session_id,
            summary.diagnostics.audio_bytes_sent,
            *self.loudest.lock()
        );
    }
}
