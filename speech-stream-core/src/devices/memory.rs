use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{CircularBufferInfo, DeviceInfo};
use crate::models::error::StreamError;
use crate::traits::capture_device::CaptureDevice;

struct LoopBuffer {
    samples: Vec<f32>,
    cursor: usize,
    recording: bool,
    sample_rate: u32,
}

/// In-process capture device backed by a looping `Vec<f32>`.
///
/// Clones share the same buffer: hand one clone to the session and keep
/// another to [`write`](Self::write) samples into, from an audio callback,
/// a signal generator, or a test.
#[derive(Clone)]
pub struct MemoryCaptureDevice {
    info: DeviceInfo,
    available: Arc<AtomicBool>,
    buffer: Arc<Mutex<LoopBuffer>>,
}

impl MemoryCaptureDevice {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            info: DeviceInfo {
                id: id.into(),
                name: name.into(),
                is_default: false,
            },
            available: Arc::new(AtomicBool::new(true)),
            buffer: Arc::new(Mutex::new(LoopBuffer {
                samples: Vec::new(),
                cursor: 0,
                recording: false,
                sample_rate: 0,
            })),
        }
    }

    /// The default in-memory microphone.
    pub fn default_device() -> Self {
        let mut device = Self::new("memory-mic", "Memory Microphone");
        device.info.is_default = true;
        device
    }

    /// Mark the device as (un)plugged.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Write samples at the cursor, wrapping at capacity like a looping
    /// microphone clip. Returns how many were written (0 when not recording).
    pub fn write(&self, samples: &[f32]) -> usize {
        let mut buf = self.buffer.lock();
        if !buf.recording || buf.samples.is_empty() {
            return 0;
        }
        let capacity = buf.samples.len();
        for &sample in samples {
            let cursor = buf.cursor;
            buf.samples[cursor] = sample;
            buf.cursor = (cursor + 1) % capacity;
        }
        samples.len()
    }

    /// Copy of the whole loop buffer, in storage order.
    pub fn snapshot(&self) -> Vec<f32> {
        self.buffer.lock().samples.clone()
    }

    /// Sample rate the device was last started with (0 before the first start).
    pub fn sample_rate(&self) -> u32 {
        self.buffer.lock().sample_rate
    }
}

impl CaptureDevice for MemoryCaptureDevice {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn device_info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn start(&mut self, buffer_secs: u32, sample_rate: u32) -> Result<CircularBufferInfo, StreamError> {
        if !self.is_available() {
            return Err(StreamError::DeviceNotAvailable);
        }

        let capacity = buffer_secs as usize * sample_rate as usize;
        if capacity == 0 {
            return Err(StreamError::ConfigurationFailed(
                "capture buffer must hold at least one sample".into(),
            ));
        }

        let mut buf = self.buffer.lock();
        if buf.recording {
            return Err(StreamError::ConfigurationFailed(format!(
                "{} is already recording",
                self.info.name
            )));
        }
        buf.samples = vec![0.0; capacity];
        buf.cursor = 0;
        buf.sample_rate = sample_rate;
        buf.recording = true;

        log::debug!("{} recording into {} sample loop", self.info.name, capacity);
        Ok(CircularBufferInfo { capacity, sample_rate })
    }

    fn current_write_position(&self) -> usize {
        self.buffer.lock().cursor
    }

    fn read_samples(&self, offset: usize, count: usize) -> Result<Vec<f32>, StreamError> {
        let buf = self.buffer.lock();
        let end = offset
            .checked_add(count)
            .filter(|&end| end <= buf.samples.len())
            .ok_or_else(|| {
                StreamError::InvalidState(format!(
                    "read of {} samples at {} exceeds buffer of {}",
                    count,
                    offset,
                    buf.samples.len()
                ))
            })?;
        Ok(buf.samples[offset..end].to_vec())
    }

    fn is_recording(&self) -> bool {
        self.buffer.lock().recording
    }

    fn stop(&mut self) -> Result<(), StreamError> {
        self.buffer.lock().recording = false;
        Ok(())
    }
}
