//! Messages exchanged with a streaming recognizer.
//!
//! Outbound: exactly one [`RecognitionRequest::Config`] followed by any number
//! of [`RecognitionRequest::Audio`] messages, then end-of-input (signalled by
//! the transport, see `RequestSink::complete`). Inbound: a sequence of
//! [`RecognitionResponse`]s whose results are either interim or final.

use serde::{Deserialize, Serialize};

/// Audio encoding announced in the configuration message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    /// Uncompressed signed 16-bit little-endian PCM.
    Linear16,
}

/// Initial message of a recognition stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingRecognitionConfig {
    /// Full recognizer resource name, e.g. `projects/p/locations/global/recognizers/_`.
    pub recognizer: String,
    pub sample_rate_hertz: u32,
    pub encoding: AudioEncoding,
    pub audio_channel_count: u16,
    pub language_codes: Vec<String>,
    pub model: String,
}

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecognitionRequest {
    Config(StreamingRecognitionConfig),
    Audio(Vec<u8>),
}

impl RecognitionRequest {
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Audio payload, if this is an audio message.
    pub fn audio(&self) -> Option<&[u8]> {
        match self {
            Self::Audio(data) => Some(data),
            Self::Config(_) => None,
        }
    }
}

/// A candidate transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionAlternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: f32,
}

/// Recognition result for one audio segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    #[serde(default)]
    pub alternatives: Vec<RecognitionAlternative>,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub language_code: Option<String>,
}

impl RecognitionResult {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self::with_transcript(transcript, false)
    }

    pub fn final_result(transcript: impl Into<String>) -> Self {
        Self::with_transcript(transcript, true)
    }

    fn with_transcript(transcript: impl Into<String>, is_final: bool) -> Self {
        Self {
            alternatives: vec![RecognitionAlternative {
                transcript: transcript.into(),
                confidence: 0.0,
            }],
            is_final,
            language_code: None,
        }
    }
}

/// One inbound message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecognitionResponse {
    #[serde(default)]
    pub results: Vec<RecognitionResult>,
}

impl RecognitionResponse {
    pub fn new(results: Vec<RecognitionResult>) -> Self {
        Self { results }
    }

    /// Transcripts of every alternative of every final result; interim results are skipped.
    pub fn final_transcripts(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.is_final)
            .flat_map(|r| r.alternatives.iter().map(|a| a.transcript.as_str()))
    }
}
