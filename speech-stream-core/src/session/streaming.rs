use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::credentials::ServiceAccountKey;
use crate::models::audio_models::{AudioChunk, AudioLevels, UplinkDiagnostics};
use crate::models::config::{StreamConfiguration, MONO_CHANNELS};
use crate::models::error::StreamError;
use crate::models::recognition::{AudioEncoding, StreamingRecognitionConfig};
use crate::models::session_summary::SessionSummary;
use crate::models::state::UplinkState;
use crate::processing::drainer::{OverrunDetector, OverrunPolicy, RingBufferDrainer};
use crate::processing::pcm;
use crate::traits::capture_device::CaptureDevice;
use crate::traits::recognition::RecognitionConnector;
use crate::traits::uplink_delegate::{LogDelegate, UplinkDelegate};
use crate::uplink::queue::PushOutcome;
use crate::uplink::streaming::{StreamingUplink, UplinkOptions};

/// Per-recording bookkeeping, rebuilt on every `start()`.
struct SessionState {
    state: UplinkState,
    levels: AudioLevels,
    session_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    capture_start: Option<Instant>,
    next_sequence: u64,
}

impl SessionState {
    fn new() -> Self {
        Self {
            state: UplinkState::Idle,
            levels: AudioLevels::default(),
            session_id: None,
            started_at: None,
            capture_start: None,
            next_sequence: 0,
        }
    }

    fn elapsed_duration(&self) -> f64 {
        self.capture_start
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// One microphone-to-recognizer streaming session.
///
/// Owns the capture device, the recognition connector and, while recording,
/// the uplink. The host drives it: `start()` once, `tick()` on a steady
/// cadence (e.g. every 20-100 ms), then `stop()`.
///
/// ```text
/// [CaptureDevice ring] ─cursor─> [RingBufferDrainer] ─> [PCM16] ─> [StreamingUplink] ─> sink
///                                                                       │
///                                          delegate.on_transcript <─────┘
/// ```
pub struct StreamingSession<D: CaptureDevice, C: RecognitionConnector> {
    credential: Arc<ServiceAccountKey>,
    device: D,
    connector: C,
    config: StreamConfiguration,
    delegate: Arc<dyn UplinkDelegate>,
    session: SessionState,
    diagnostics: Arc<Mutex<UplinkDiagnostics>>,
    drainer: Option<RingBufferDrainer>,
    overruns: Option<OverrunDetector>,
    uplink: Option<StreamingUplink>,
    /// Cancelled after a failure; joined by the next `stop()`.
    closing: Option<StreamingUplink>,
}

impl<D: CaptureDevice, C: RecognitionConnector> StreamingSession<D, C> {
    pub fn new(credential: Arc<ServiceAccountKey>, device: D, connector: C, config: StreamConfiguration) -> Self {
        Self {
            credential,
            device,
            connector,
            config,
            delegate: Arc::new(LogDelegate),
            session: SessionState::new(),
            diagnostics: Arc::new(Mutex::new(UplinkDiagnostics::default())),
            drainer: None,
            overruns: None,
            uplink: None,
            closing: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn UplinkDelegate>) {
        self.delegate = delegate;
    }

    pub fn state(&self) -> UplinkState {
        self.session.state.clone()
    }

    pub fn current_levels(&self) -> AudioLevels {
        self.session.levels
    }

    pub fn diagnostics(&self) -> UplinkDiagnostics {
        self.diagnostics.lock().clone()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.session_id.as_deref()
    }

    pub fn config(&self) -> &StreamConfiguration {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Connect, start the device and open the uplink. Transitions: idle → recording.
    ///
    /// Setup failures move the session to `Failed` and are returned; nothing
    /// is retried.
    pub async fn start(&mut self) -> Result<(), StreamError> {
        if !self.session.state.is_idle() {
            return Err(StreamError::InvalidState(format!(
                "can only start from idle state, not {}",
                self.session.state.name()
            )));
        }

        match self.open_stream().await {
            Ok(()) => Ok(()),
            Err(error) => {
                self.fail(error.clone());
                Err(error)
            }
        }
    }

    async fn open_stream(&mut self) -> Result<(), StreamError> {
        self.config.validate().map_err(StreamError::ConfigurationFailed)?;
        self.credential.validate()?;

        if !self.device.is_available() {
            return Err(StreamError::DeviceNotAvailable);
        }
        if let Some(wanted) = &self.config.device_id {
            if self.device.device_info().id != *wanted {
                return Err(StreamError::DeviceNotAvailable);
            }
        }

        let stream = self.connector.connect(&self.credential).await?;
        let buffer = self.device.start(self.config.buffer_secs, self.config.sample_rate)?;
        if buffer.capacity == 0 {
            let _ = self.device.stop();
            return Err(StreamError::ConfigurationFailed(
                "capture device reported an empty buffer".into(),
            ));
        }

        let recognition_config = StreamingRecognitionConfig {
            recognizer: self
                .credential
                .recognizer_path(&self.config.location, &self.config.recognizer_id),
            sample_rate_hertz: buffer.sample_rate,
            encoding: AudioEncoding::Linear16,
            audio_channel_count: MONO_CHANNELS,
            language_codes: self.config.language_codes.clone(),
            model: self.config.model.clone(),
        };

        self.diagnostics = Arc::new(Mutex::new(UplinkDiagnostics::default()));
        let options = UplinkOptions {
            queue_policy: self.config.queue_policy,
            close_timeout: self.config.close_timeout,
            recording_path: self.config.recording_path.clone(),
        };
        let uplink = match StreamingUplink::open(
            stream,
            recognition_config,
            Arc::clone(&self.delegate),
            Arc::clone(&self.diagnostics),
            options,
        ) {
            Ok(uplink) => uplink,
            Err(e) => {
                let _ = self.device.stop();
                return Err(e);
            }
        };

        let now = Instant::now();
        self.drainer = Some(RingBufferDrainer::new(buffer.capacity));
        self.overruns = match self.config.overrun_policy {
            OverrunPolicy::DetectAndLog => Some(OverrunDetector::new(buffer.capacity, buffer.sample_rate, now)),
            OverrunPolicy::Ignore => None,
        };
        self.uplink = Some(uplink);

        self.session = SessionState::new();
        self.session.session_id = Some(uuid::Uuid::new_v4().to_string());
        self.session.started_at = Some(Utc::now());
        self.session.capture_start = Some(now);

        log::info!(
            "Streaming session {} started on {}: {} Hz, {} sample buffer, languages {:?}",
            self.session.session_id.as_deref().unwrap_or_default(),
            self.device.device_info().name,
            buffer.sample_rate,
            buffer.capacity,
            self.config.language_codes
        );
        self.set_state(UplinkState::Recording { duration_secs: 0.0 });
        Ok(())
    }

    /// Foreground poll: forward everything the device wrote since the last
    /// tick. Never blocks. No-op unless recording.
    ///
    /// Returns the number of samples drained.
    pub fn tick(&mut self) -> usize {
        if !self.session.state.is_recording() {
            return 0;
        }
        if let Some(error) = self.uplink.as_ref().and_then(|u| u.error()) {
            self.fail(error);
            return 0;
        }

        let drained = self.drain_once();
        self.session.state = UplinkState::Recording {
            duration_secs: self.session.elapsed_duration(),
        };
        drained
    }

    fn drain_once(&mut self) -> usize {
        let (Some(drainer), Some(uplink)) = (self.drainer.as_mut(), self.uplink.as_ref()) else {
            return 0;
        };

        let cursor = self.device.current_write_position();
        let drain = drainer.poll(cursor);
        let now = Instant::now();

        let mut drained = 0usize;
        let mut level_samples = Vec::with_capacity(drain.sample_count());
        let mut outcomes = Vec::with_capacity(2);
        for range in drain.ranges() {
            let samples = match self.device.read_samples(range.start, range.len()) {
                Ok(samples) => samples,
                Err(e) => {
                    log::warn!("Failed to read samples {}..{}: {}", range.start, range.end, e);
                    continue;
                }
            };
            drained += samples.len();

            let data = pcm::convert_to_pcm16le(&samples, self.config.pcm_policy);
            let sequence = self.session.next_sequence;
            self.session.next_sequence += 1;
            outcomes.push(uplink.push(AudioChunk::new(sequence, data)));
            level_samples.extend_from_slice(&samples);
        }

        let overrun = self
            .overruns
            .as_mut()
            .and_then(|detector| detector.observe(drained, now));

        {
            let mut diagnostics = self.diagnostics.lock();
            diagnostics.ticks += 1;
            diagnostics.samples_drained += drained as u64;
            for outcome in &outcomes {
                match outcome {
                    PushOutcome::Queued => diagnostics.chunks_queued += 1,
                    PushOutcome::DroppedClosed => diagnostics.chunks_dropped_closed += 1,
                    PushOutcome::DroppedFull => diagnostics.chunks_dropped_full += 1,
                }
            }
            if let Some(overrun) = &overrun {
                diagnostics.overruns += 1;
                diagnostics.samples_lost_estimate += overrun.lost_samples();
            }
        }

        if let Some(overrun) = overrun {
            log::warn!(
                "Capture buffer overrun: ~{} samples expected since last tick, {} drained",
                overrun.expected_samples,
                overrun.drained_samples
            );
        }
        if outcomes.contains(&PushOutcome::DroppedFull) {
            log::warn!("Uplink queue full; dropped audio");
        }

        if !level_samples.is_empty() {
            self.session.levels = AudioLevels {
                rms: pcm::rms_level(&level_samples),
                peak: pcm::peak_level(&level_samples),
            };
            self.delegate.on_levels_updated(&self.session.levels);
        }
        drained
    }

    /// Flush, stop the device and close the uplink.
    /// Transitions: recording → draining → closed/failed.
    ///
    /// On a failed session this joins the cancelled uplink tasks and returns
    /// the failure.
    pub async fn stop(&mut self) -> Result<SessionSummary, StreamError> {
        let failure = match &self.session.state {
            UplinkState::Recording { .. } => None,
            UplinkState::Failed(error) => Some(error.clone()),
            other => {
                return Err(StreamError::InvalidState(format!(
                    "can only stop from recording state, not {}",
                    other.name()
                )))
            }
        };
        if let Some(error) = failure {
            self.join_closing().await;
            return Err(error);
        }

        self.drain_once();
        if let Err(e) = self.device.stop() {
            log::warn!("Failed to stop capture device: {}", e);
        }
        let duration = self.session.elapsed_duration();
        self.set_state(UplinkState::Draining);

        let Some(uplink) = self.uplink.take() else {
            let error = StreamError::InvalidState("uplink not open".into());
            self.fail(error.clone());
            return Err(error);
        };

        let report = match uplink.close().await {
            Ok(report) => report,
            Err(error) => {
                self.fail(error.clone());
                return Err(error);
            }
        };

        let mut summary = SessionSummary::new(
            self.session.session_id.as_deref().unwrap_or_default(),
            self.session.started_at.unwrap_or_else(Utc::now),
            duration,
        );
        summary.diagnostics = self.diagnostics();
        summary.transcripts = report.transcripts;
        summary.recording = report.recording;

        self.drainer = None;
        self.overruns = None;
        self.set_state(UplinkState::Closed(Box::new(summary.clone())));
        self.delegate.on_session_finished(&summary);
        Ok(summary)
    }

    /// Return a closed or failed session to idle so it can start again.
    ///
    /// Also recovers a session left draining by a `stop()` future that was
    /// dropped before it finished; the uplink it was closing is already
    /// cancelled.
    pub fn reset(&mut self) -> Result<(), StreamError> {
        if self.session.state.is_idle() {
            return Ok(());
        }
        let abandoned = self.session.state.is_draining() && self.uplink.is_none();
        if !self.session.state.is_terminal() && !abandoned {
            return Err(StreamError::InvalidState(format!(
                "can only reset from a terminal state, not {}",
                self.session.state.name()
            )));
        }
        if abandoned {
            log::warn!("Resetting a session whose stop() was abandoned while draining");
        }
        if let Some(uplink) = self.closing.take() {
            log::debug!("Dropping cancelled uplink without joining it");
            uplink.cancel();
        }
        if self.device.is_recording() {
            if let Err(e) = self.device.stop() {
                log::warn!("Failed to stop capture device: {}", e);
            }
        }
        self.drainer = None;
        self.overruns = None;
        self.session = SessionState::new();
        self.set_state(UplinkState::Idle);
        Ok(())
    }

    // --- Internal helpers ---

    fn set_state(&mut self, new_state: UplinkState) {
        self.session.state = new_state;
        self.delegate.on_state_changed(&self.session.state);
    }

    fn fail(&mut self, error: StreamError) {
        if let Some(uplink) = self.uplink.take() {
            uplink.cancel();
            self.closing = Some(uplink);
        }
        if self.device.is_recording() {
            if let Err(e) = self.device.stop() {
                log::warn!("Failed to stop capture device: {}", e);
            }
        }
        self.drainer = None;
        self.overruns = None;

        self.set_state(UplinkState::Failed(error.clone()));
        self.delegate.on_error(&error);
    }

    async fn join_closing(&mut self) {
        if let Some(uplink) = self.closing.take() {
            match uplink.close().await {
                Ok(_) => log::debug!("Cancelled uplink closed"),
                Err(e) => log::debug!("Cancelled uplink closed: {}", e),
            }
        }
    }
}
