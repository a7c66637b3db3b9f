use crate::models::audio_models::AudioLevels;
use crate::models::error::StreamError;
use crate::models::session_summary::SessionSummary;
use crate::models::state::UplinkState;

/// Event delegate for streaming session notifications.
///
/// State and level callbacks run on the thread that drives `tick()`;
/// transcript callbacks run on the uplink's receiver task. Implementations
/// must not block.
pub trait UplinkDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &UplinkState);

    /// Called after each tick that drained audio.
    fn on_levels_updated(&self, levels: &AudioLevels);

    /// Called once per final transcript; interim results never reach here.
    fn on_transcript(&self, transcript: &str);

    /// Called when a setup or mid-stream error ends the session.
    fn on_error(&self, error: &StreamError);

    /// Called when the session closed cleanly.
    fn on_session_finished(&self, summary: &SessionSummary);
}

/// Delegate that writes every event to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelegate;

impl UplinkDelegate for LogDelegate {
    fn on_state_changed(&self, state: &UplinkState) {
        log::debug!("Session state: {}", state.name());
    }

    fn on_levels_updated(&self, levels: &AudioLevels) {
        log::trace!("Input level rms={:.3} peak={:.3}", levels.rms, levels.peak);
    }

    fn on_transcript(&self, transcript: &str) {
        log::info!("Transcript: {}", transcript);
    }

    fn on_error(&self, error: &StreamError) {
        log::error!("Session error: {}", error);
    }

    fn on_session_finished(&self, summary: &SessionSummary) {
        log::info!(
            "Session {} finished after {:.1}s: {} audio bytes sent, {} final results",
            summary.session_id,
            summary.duration_secs,
            summary.diagnostics.audio_bytes_sent,
            summary.diagnostics.final_results
        );
    }
}
