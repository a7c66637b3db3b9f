use serde::{Deserialize, Serialize};

/// Half-open range `[start, end)` of sample offsets inside the circular buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleRange {
    pub start: usize,
    pub end: usize,
}

impl SampleRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "sample range start {} past end {}", start, end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A block of mono 16-bit little-endian PCM, ready for the uplink.
///
/// `sequence` counts up from 0 within a session; chunks must reach the
/// recognizer in sequence order to rebuild the signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub sequence: u64,
    pub data: Vec<u8>,
}

impl AudioChunk {
    pub fn new(sequence: u64, data: Vec<u8>) -> Self {
        Self { sequence, data }
    }

    /// Number of PCM16 samples carried by this chunk.
    pub fn sample_count(&self) -> usize {
        self.data.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Handle describing the circular buffer a capture device writes into.
///
/// The write cursor lives in `[0, capacity)` and wraps to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircularBufferInfo {
    pub capacity: usize,
    pub sample_rate: u32,
}

/// A capture device available to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Input metering for the samples drained on the last tick (0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioLevels {
    pub rms: f32,
    pub peak: f32,
}

/// Counters for debugging a streaming session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UplinkDiagnostics {
    pub ticks: u64,
    pub samples_drained: u64,
    pub chunks_queued: u64,
    pub chunks_dropped_closed: u64,
    pub chunks_dropped_full: u64,
    pub overruns: u64,
    pub samples_lost_estimate: u64,
    pub requests_sent: u64,
    pub audio_bytes_sent: u64,
    pub interim_results: u64,
    pub final_results: u64,
}
