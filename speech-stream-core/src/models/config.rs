use std::path::PathBuf;
use std::time::Duration;

use crate::processing::drainer::OverrunPolicy;
use crate::processing::pcm::PcmOverflowPolicy;
use crate::uplink::queue::QueuePolicy;

/// Audio is always captured and sent as a single channel.
pub const MONO_CHANNELS: u16 = 1;

/// Configuration for a streaming recognition session.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfiguration {
    /// Capture and recognition sample rate in Hz (default: 16000).
    pub sample_rate: u32,

    /// Length of the capture device's circular buffer in seconds (default: 5).
    pub buffer_secs: u32,

    /// BCP-47 language codes passed to the recognizer (default: `["ja-JP"]`).
    pub language_codes: Vec<String>,

    /// Recognition model name (default: "long").
    pub model: String,

    /// Recognizer location (default: "global").
    pub location: String,

    /// Recognizer id inside the location; "_" selects the implicit recognizer.
    pub recognizer_id: String,

    /// Bound and drop behaviour of the uplink queue (default: unbounded).
    pub queue_policy: QueuePolicy,

    /// How out-of-range float samples become PCM16 (default: clamp).
    pub pcm_policy: PcmOverflowPolicy,

    /// Whether missed buffer laps are detected and logged.
    pub overrun_policy: OverrunPolicy,

    /// Upper bound on closing the uplink. None waits for the recognizer
    /// indefinitely.
    pub close_timeout: Option<Duration>,

    /// Write the audio sent upstream to this WAV file.
    pub recording_path: Option<PathBuf>,

    /// Specific capture device id, or None for the default device.
    pub device_id: Option<String>,
}

impl StreamConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.buffer_secs == 0 {
            return Err("buffer length must be positive".into());
        }
        if (self.sample_rate as u64)
            .checked_mul(self.buffer_secs as u64)
            .and_then(|n| usize::try_from(n).ok())
            .is_none()
        {
            return Err(format!(
                "buffer of {}s at {} Hz is too large",
                self.buffer_secs, self.sample_rate
            ));
        }
        if self.language_codes.is_empty() || self.language_codes.iter().any(|l| l.trim().is_empty()) {
            return Err("at least one non-empty language code is required".into());
        }
        if self.model.trim().is_empty() {
            return Err("model must not be empty".into());
        }
        if self.location.trim().is_empty() || self.recognizer_id.trim().is_empty() {
            return Err("recognizer location and id must not be empty".into());
        }
        if let QueuePolicy::Bounded { capacity: 0 } = self.queue_policy {
            return Err("bounded queue capacity must be positive".into());
        }
        Ok(())
    }

    /// Capacity of the circular capture buffer in samples.
    pub fn buffer_capacity(&self) -> usize {
        self.sample_rate as usize * self.buffer_secs as usize
    }
}

impl Default for StreamConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            buffer_secs: 5,
            language_codes: vec!["ja-JP".to_string()],
            model: "long".to_string(),
            location: "global".to_string(),
            recognizer_id: "_".to_string(),
            queue_policy: QueuePolicy::Unbounded,
            pcm_policy: PcmOverflowPolicy::Clamp,
            overrun_policy: OverrunPolicy::DetectAndLog,
            close_timeout: None,
            recording_path: None,
            device_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = StreamConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_capacity(), 80_000);
    }

    #[test]
    fn rejects_zero_rate_and_empty_language() {
        let config = StreamConfiguration {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = StreamConfiguration {
            language_codes: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_capacity_bounded_queue() {
        let config = StreamConfiguration {
            queue_policy: QueuePolicy::Bounded { capacity: 0 },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("capacity"));
    }
}
