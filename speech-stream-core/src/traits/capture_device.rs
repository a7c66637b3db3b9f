use crate::models::audio_models::{CircularBufferInfo, DeviceInfo};
use crate::models::error::StreamError;

/// A capture source that records into a fixed-size circular buffer.
///
/// The device owns the buffer and its write cursor; a session only reads.
/// The cursor advances as samples arrive and wraps to 0 at `capacity`, so
/// callers must never treat it as monotonic.
///
/// Implemented by:
/// - `MemoryCaptureDevice` (in-process buffer fed by a producer)
pub trait CaptureDevice: Send {
    /// Whether this capture source can currently be started.
    fn is_available(&self) -> bool;

    /// Information about the device backing this source.
    fn device_info(&self) -> DeviceInfo;

    /// Start recording into a looping buffer of `buffer_secs` seconds.
    fn start(&mut self, buffer_secs: u32, sample_rate: u32) -> Result<CircularBufferInfo, StreamError>;

    /// Offset at which the next sample will be written, in `[0, capacity)`.
    ///
    /// Called from the foreground tick; must not block.
    fn current_write_position(&self) -> usize;

    /// Copy `count` samples starting at `offset` out of the buffer.
    ///
    /// `offset + count` never exceeds the capacity; reads do not wrap.
    fn read_samples(&self, offset: usize, count: usize) -> Result<Vec<f32>, StreamError>;

    fn is_recording(&self) -> bool;

    /// Stop recording and release the buffer.
    fn stop(&mut self) -> Result<(), StreamError>;
}
