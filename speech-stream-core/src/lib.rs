//! # speech-stream-core
//!
//! Streams microphone audio to a speech recognizer while it is being
//! captured.
//!
//! A capture device records into a fixed-size circular buffer. On every
//! foreground tick the session reads the device's write cursor, drains the
//! samples written since the previous tick (tail before head when the cursor
//! wrapped), converts them to 16-bit little-endian PCM and pushes them onto
//! a non-blocking queue. A sender task forwards the queue to the recognizer
//! in order; a receiver task surfaces final transcripts.
//!
//! ## Architecture
//!
//! ```text
//! speech-stream-core (this crate)
//! ├── traits/       ← CaptureDevice, RecognitionConnector, RequestSink, UplinkDelegate
//! ├── models/       ← StreamError, UplinkState, StreamConfiguration, recognition messages
//! ├── processing/   ← RingBufferDrainer, OverrunDetector, PCM16 conversion, WAV header
//! ├── uplink/       ← UplinkQueue, StreamingUplink (sender + receiver tasks)
//! ├── session/      ← StreamingSession (start / tick / stop orchestration)
//! ├── storage/      ← WavRecorder tap, JSON session summary
//! ├── devices/      ← MemoryCaptureDevice
//! ├── sinks/        ← MemoryRecognizer
//! └── credentials   ← ServiceAccountKey
//! ```

pub mod credentials;
pub mod devices;
pub mod models;
pub mod processing;
pub mod session;
pub mod sinks;
pub mod storage;
pub mod traits;
pub mod uplink;

// Re-export key types at crate root for convenience.
pub use credentials::ServiceAccountKey;
pub use devices::memory::MemoryCaptureDevice;
pub use models::audio_models::{AudioChunk, AudioLevels, CircularBufferInfo, DeviceInfo, SampleRange, UplinkDiagnostics};
pub use models::config::StreamConfiguration;
pub use models::error::StreamError;
pub use models::recognition::{
    RecognitionAlternative, RecognitionRequest, RecognitionResponse, RecognitionResult, StreamingRecognitionConfig,
};
pub use models::session_summary::{RecordingInfo, SessionSummary};
pub use models::state::UplinkState;
pub use processing::drainer::{Drain, OverrunDetector, OverrunPolicy, RingBufferDrainer};
pub use processing::pcm::{convert_to_pcm16le, PcmOverflowPolicy};
pub use session::streaming::StreamingSession;
pub use sinks::memory::{AckMode, MemoryRecognizer, MemoryRecognizerHandle};
pub use traits::capture_device::CaptureDevice;
pub use traits::recognition::{RecognitionConnector, RecognitionStream, RequestSink, ResponseStream};
pub use traits::uplink_delegate::{LogDelegate, UplinkDelegate};
pub use uplink::queue::{PushOutcome, QueuePolicy};
pub use uplink::streaming::{StreamingUplink, UplinkOptions, UplinkReport};
