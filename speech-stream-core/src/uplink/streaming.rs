use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::models::audio_models::{AudioChunk, UplinkDiagnostics};
use crate::models::error::StreamError;
use crate::models::recognition::{RecognitionRequest, StreamingRecognitionConfig};
use crate::models::session_summary::RecordingInfo;
use crate::processing::wav_format::WavSpec;
use crate::storage::wav_recorder::WavRecorder;
use crate::traits::recognition::{RecognitionStream, RequestSink, ResponseStream};
use crate::traits::uplink_delegate::UplinkDelegate;

use super::queue::{uplink_queue, PushOutcome, QueuePolicy, UplinkReceiver, UplinkSender};

/// Knobs for [`StreamingUplink::open`].
#[derive(Debug, Clone, Default)]
pub struct UplinkOptions {
    pub queue_policy: QueuePolicy,
    /// Bound on [`StreamingUplink::close`]. None waits indefinitely.
    pub close_timeout: Option<Duration>,
    /// Tap every audio message sent into this WAV file.
    pub recording_path: Option<PathBuf>,
}

/// What a cleanly closed uplink delivered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UplinkReport {
    /// Final transcripts in arrival order.
    pub transcripts: Vec<String>,
    /// Audio messages sent (the configuration message is not counted).
    pub chunks_sent: u64,
    pub bytes_sent: u64,
    pub recording: Option<RecordingInfo>,
}

struct SenderReport {
    chunks_sent: u64,
    bytes_sent: u64,
    recording: Option<RecordingInfo>,
}

/// State shared by the uplink handle and both of its tasks.
struct UplinkShared {
    token: CancellationToken,
    first_error: Mutex<Option<StreamError>>,
    diagnostics: Arc<Mutex<UplinkDiagnostics>>,
    /// Written by the sender, finalized by whoever stops the uplink last.
    recorder: Mutex<Option<WavRecorder>>,
}

impl UplinkShared {
    /// Record `error` if it is the first one and stop both directions.
    fn fail(&self, error: StreamError) {
        {
            let mut first = self.first_error.lock();
            if first.is_none() {
                log::error!("Uplink failed: {}", error);
                *first = Some(error);
            }
        }
        self.token.cancel();
    }

    fn first_error(&self) -> Option<StreamError> {
        self.first_error.lock().clone()
    }

    /// Patch the recording header and checksum the file. No-op once done.
    fn finish_recording(&self) -> Option<RecordingInfo> {
        let mut recorder = self.recorder.lock().take()?;
        match recorder.close() {
            Ok(info) => Some(info),
            Err(e) => {
                log::warn!("Failed to finalize recording: {}", e);
                None
            }
        }
    }
}

/// Live two-way pipe between the capture loop and a recognition stream.
///
/// ```text
/// tick() ──push──> [queue] ──sender task──> RequestSink
///                                               │
///    delegate <──receiver task── ResponseStream <┘
/// ```
///
/// The sender writes the configuration message first, then one audio message
/// per chunk in push order, then end-of-input once the queue is closed and
/// drained. The receiver forwards final transcripts until the recognizer ends
/// the inbound stream. An error in either direction cancels the other.
pub struct StreamingUplink {
    queue: UplinkSender,
    shared: Arc<UplinkShared>,
    sender: JoinHandle<Result<SenderReport, StreamError>>,
    receiver: JoinHandle<Result<Vec<String>, StreamError>>,
    close_timeout: Option<Duration>,
}

impl StreamingUplink {
    /// Spawn the sender and receiver tasks. Must be called inside a tokio runtime.
    ///
    /// `diagnostics` is updated in place as messages flow, so the caller can
    /// read live counters while the session runs.
    pub fn open(
        stream: RecognitionStream,
        config: StreamingRecognitionConfig,
        delegate: Arc<dyn UplinkDelegate>,
        diagnostics: Arc<Mutex<UplinkDiagnostics>>,
        options: UplinkOptions,
    ) -> Result<Self, StreamError> {
        let recorder = match &options.recording_path {
            Some(path) => {
                let spec = WavSpec {
                    sample_rate: config.sample_rate_hertz,
                    channels: config.audio_channel_count,
                    bits_per_sample: 16,
                };
                let mut recorder = WavRecorder::new(path.clone(), spec);
                recorder.open()?;
                log::info!("Recording uplink audio to {}", path.display());
                Some(recorder)
            }
            None => None,
        };

        let (queue, receiver_queue) = uplink_queue(options.queue_policy);
        let shared = Arc::new(UplinkShared {
            token: CancellationToken::new(),
            first_error: Mutex::new(None),
            diagnostics,
            recorder: Mutex::new(recorder),
        });

        let RecognitionStream { requests, responses } = stream;

        let sender = tokio::spawn(run_sender(
            requests,
            receiver_queue,
            config,
            Arc::clone(&shared),
        ));
        let receiver = tokio::spawn(run_receiver(responses, delegate, Arc::clone(&shared)));

        Ok(Self {
            queue,
            shared,
            sender,
            receiver,
            close_timeout: options.close_timeout,
        })
    }

    /// Hand a chunk to the sender task. Never blocks.
    pub fn push(&self, chunk: AudioChunk) -> PushOutcome {
        self.queue.push(chunk)
    }

    /// First error seen by either task, if any.
    pub fn error(&self) -> Option<StreamError> {
        self.shared.first_error()
    }

    /// Whether the uplink has been cancelled or has failed.
    pub fn is_cancelled(&self) -> bool {
        self.shared.token.is_cancelled()
    }

    /// Abort both directions without sending end-of-input.
    pub fn cancel(&self) {
        log::debug!("Uplink cancelled");
        self.shared.token.cancel();
    }

    /// Close the queue and wait for everything queued to be sent and
    /// acknowledged.
    ///
    /// Dropping the returned future before it completes cancels both tasks.
    /// On timeout the recording, if any, is still finalized.
    pub async fn close(mut self) -> Result<UplinkReport, StreamError> {
        self.queue.close();

        let guard = self.shared.token.clone().drop_guard();
        let result = match self.close_timeout {
            None => join_tasks(&mut self.sender, &mut self.receiver, &self.shared).await,
            Some(limit) => {
                let joined = join_tasks(&mut self.sender, &mut self.receiver, &self.shared);
                let outcome = tokio::time::timeout(limit, joined).await;
                match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        log::warn!("Uplink did not close within {:?}; aborting", limit);
                        self.shared.token.cancel();
                        self.sender.abort();
                        self.receiver.abort();
                        if let Some(info) = self.shared.finish_recording() {
                            log::info!(
                                "Recording finalized after timeout: {} bytes",
                                info.data_bytes
                            );
                        }
                        Err(StreamError::Timeout)
                    }
                }
            }
        };
        guard.disarm();
        result
    }
}

async fn join_tasks(
    sender: &mut JoinHandle<Result<SenderReport, StreamError>>,
    receiver: &mut JoinHandle<Result<Vec<String>, StreamError>>,
    shared: &UplinkShared,
) -> Result<UplinkReport, StreamError> {
    let sent = flatten(sender.await);
    let received = flatten(receiver.await);

    if let Some(error) = shared.first_error() {
        return Err(error);
    }
    let sent = sent?;
    let transcripts = received?;

    log::debug!(
        "Uplink closed: {} chunks, {} bytes, {} transcripts",
        sent.chunks_sent,
        sent.bytes_sent,
        transcripts.len()
    );
    Ok(UplinkReport {
        transcripts,
        chunks_sent: sent.chunks_sent,
        bytes_sent: sent.bytes_sent,
        recording: sent.recording,
    })
}

fn flatten<T>(joined: Result<Result<T, StreamError>, JoinError>) -> Result<T, StreamError> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Err(StreamError::Cancelled),
        Err(e) => Err(StreamError::Unknown(format!("uplink task panicked: {}", e))),
    }
}

async fn run_sender(
    mut sink: Box<dyn RequestSink>,
    mut queue: UplinkReceiver,
    config: StreamingRecognitionConfig,
    shared: Arc<UplinkShared>,
) -> Result<SenderReport, StreamError> {
    let token = shared.token.clone();
    let result = tokio::select! {
        biased;
        _ = token.cancelled() => Err(StreamError::Cancelled),
        sent = send_all(sink.as_mut(), &mut queue, config, &shared) => sent,
    };

    let recording = shared.finish_recording();

    match result {
        Ok((chunks_sent, bytes_sent)) => Ok(SenderReport {
            chunks_sent,
            bytes_sent,
            recording,
        }),
        Err(error) => {
            if error != StreamError::Cancelled {
                shared.fail(error.clone());
            }
            Err(error)
        }
    }
}

async fn send_all(
    sink: &mut dyn RequestSink,
    queue: &mut UplinkReceiver,
    config: StreamingRecognitionConfig,
    shared: &UplinkShared,
) -> Result<(u64, u64), StreamError> {
    sink.send(RecognitionRequest::Config(config)).await?;
    shared.diagnostics.lock().requests_sent += 1;

    let mut chunks_sent = 0u64;
    let mut bytes_sent = 0u64;
    while let Some(chunk) = queue.recv().await {
        let len = chunk.data.len() as u64;
        let tap = shared.recorder.lock().is_some().then(|| chunk.data.clone());

        sink.send(RecognitionRequest::Audio(chunk.data)).await?;
        chunks_sent += 1;
        bytes_sent += len;
        {
            let mut diagnostics = shared.diagnostics.lock();
            diagnostics.requests_sent += 1;
            diagnostics.audio_bytes_sent += len;
        }

        if let Some(pcm) = tap {
            let mut recorder = shared.recorder.lock();
            if let Some(Err(e)) = recorder.as_mut().map(|r| r.write(&pcm)) {
                log::warn!("Recording disabled after write failure: {}", e);
                *recorder = None;
            }
        }
    }

    sink.complete().await?;
    log::debug!("End of input sent after {} chunks", chunks_sent);
    Ok((chunks_sent, bytes_sent))
}

async fn run_receiver(
    mut responses: ResponseStream,
    delegate: Arc<dyn UplinkDelegate>,
    shared: Arc<UplinkShared>,
) -> Result<Vec<String>, StreamError> {
    let token = shared.token.clone();
    let result = tokio::select! {
        biased;
        _ = token.cancelled() => Err(StreamError::Cancelled),
        received = receive_all(&mut responses, delegate.as_ref(), &shared) => received,
    };

    if let Err(error) = &result {
        if *error != StreamError::Cancelled {
            shared.fail(error.clone());
        }
    }
    result
}

async fn receive_all(
    responses: &mut ResponseStream,
    delegate: &dyn UplinkDelegate,
    shared: &UplinkShared,
) -> Result<Vec<String>, StreamError> {
    let mut transcripts = Vec::new();
    while let Some(item) = responses.next().await {
        let response = item?;

        {
            let mut diagnostics = shared.diagnostics.lock();
            for result in &response.results {
                if result.is_final {
                    diagnostics.final_results += 1;
                } else {
                    diagnostics.interim_results += 1;
                }
            }
        }

        for transcript in response.final_transcripts() {
            delegate.on_transcript(transcript);
            transcripts.push(transcript.to_string());
        }
    }
    Ok(transcripts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::ServiceAccountKey;
    use crate::models::audio_models::AudioLevels;
    use crate::models::recognition::{AudioEncoding, RecognitionResponse, RecognitionResult};
    use crate::models::session_summary::SessionSummary;
    use crate::models::state::UplinkState;
    use crate::sinks::memory::{AckMode, MemoryRecognizer};
    use crate::traits::recognition::RecognitionConnector;

    const KEY: &str = r#"{"type":"service_account","project_id":"p","private_key":"k","client_email":"e@p"}"#;

    #[derive(Default)]
    struct Collecting {
        transcripts: Mutex<Vec<String>>,
    }

    impl UplinkDelegate for Collecting {
        fn on_state_changed(&self, _: &UplinkState) {}
        fn on_levels_updated(&self, _: &AudioLevels) {}
        fn on_transcript(&self, transcript: &str) {
            self.transcripts.lock().push(transcript.to_string());
        }
        fn on_error(&self, _: &StreamError) {}
        fn on_session_finished(&self, _: &SessionSummary) {}
    }

    fn config() -> StreamingRecognitionConfig {
        StreamingRecognitionConfig {
            recognizer: "projects/p/locations/global/recognizers/_".into(),
            sample_rate_hertz: 16000,
            encoding: AudioEncoding::Linear16,
            audio_channel_count: 1,
            language_codes: vec!["ja-JP".into()],
            model: "long".into(),
        }
    }

    async fn connect(recognizer: &MemoryRecognizer) -> RecognitionStream {
        let key = ServiceAccountKey::from_json(KEY).unwrap();
        recognizer.connect(&key).await.unwrap()
    }

    #[tokio::test]
    async fn sends_config_then_audio_in_order() {
        let (recognizer, handle) = MemoryRecognizer::new();
        let stream = connect(&recognizer).await;
        let diagnostics = Arc::new(Mutex::new(UplinkDiagnostics::default()));
        let delegate = Arc::new(Collecting::default());

        let uplink = StreamingUplink::open(
            stream,
            config(),
            delegate.clone(),
            Arc::clone(&diagnostics),
            UplinkOptions::default(),
        )
        .unwrap();

        for (seq, bytes) in [vec![1u8, 0], vec![2, 0], vec![3, 0]].into_iter().enumerate() {
            assert!(uplink.push(AudioChunk::new(seq as u64, bytes)).is_queued());
        }
        handle.push_response(RecognitionResponse::new(vec![
            RecognitionResult::interim("he"),
            RecognitionResult::final_result("hello"),
        ]));

        let report = uplink.close().await.unwrap();

        let requests = handle.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests[0].is_config());
        assert_eq!(handle.audio(), vec![1, 0, 2, 0, 3, 0]);
        assert!(handle.is_input_complete());

        assert_eq!(report.transcripts, vec!["hello".to_string()]);
        assert_eq!(report.chunks_sent, 3);
        assert_eq!(report.bytes_sent, 6);
        assert_eq!(*delegate.transcripts.lock(), vec!["hello".to_string()]);

        let diagnostics = diagnostics.lock();
        assert_eq!(diagnostics.requests_sent, 4);
        assert_eq!(diagnostics.interim_results, 1);
        assert_eq!(diagnostics.final_results, 1);
    }

    #[tokio::test]
    async fn inbound_error_fails_close() {
        let (recognizer, handle) = MemoryRecognizer::new();
        let recognizer = recognizer.with_ack(AckMode::Never);
        let stream = connect(&recognizer).await;
        let uplink = StreamingUplink::open(
            stream,
            config(),
            Arc::new(Collecting::default()),
            Arc::default(),
            UplinkOptions::default(),
        )
        .unwrap();

        handle.push_error(StreamError::Stream("quota exceeded".into()));

        assert_eq!(
            uplink.close().await,
            Err(StreamError::Stream("quota exceeded".into()))
        );
    }

    #[tokio::test]
    async fn close_times_out_without_ack() {
        let (recognizer, handle) = MemoryRecognizer::new();
        let recognizer = recognizer.with_ack(AckMode::Never);
        let stream = connect(&recognizer).await;
        let uplink = StreamingUplink::open(
            stream,
            config(),
            Arc::new(Collecting::default()),
            Arc::default(),
            UplinkOptions {
                close_timeout: Some(Duration::from_millis(50)),
                ..UplinkOptions::default()
            },
        )
        .unwrap();

        uplink.push(AudioChunk::new(0, vec![0, 0]));
        assert_eq!(uplink.close().await, Err(StreamError::Timeout));
        assert!(handle.is_input_complete());
    }

    /// Accepts the configuration and the first audio message, then stalls.
    struct StallingSink {
        accepted: usize,
    }

    #[async_trait::async_trait]
    impl RequestSink for StallingSink {
        async fn send(&mut self, _: RecognitionRequest) -> Result<(), StreamError> {
            if self.accepted == 2 {
                futures::future::pending::<()>().await;
            }
            self.accepted += 1;
            Ok(())
        }

        async fn complete(&mut self) -> Result<(), StreamError> {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn timed_out_close_still_finalizes_recording() {
        let path = std::env::temp_dir().join(format!("stalled_uplink_{}.wav", uuid::Uuid::new_v4()));
        let stream = RecognitionStream::new(
            Box::new(StallingSink { accepted: 0 }),
            futures::stream::pending().boxed(),
        );
        let uplink = StreamingUplink::open(
            stream,
            config(),
            Arc::new(Collecting::default()),
            Arc::default(),
            UplinkOptions {
                close_timeout: Some(Duration::from_millis(50)),
                recording_path: Some(path.clone()),
                ..UplinkOptions::default()
            },
        )
        .unwrap();

        uplink.push(AudioChunk::new(0, vec![1, 0, 2, 0]));
        uplink.push(AudioChunk::new(1, vec![3, 0]));
        assert_eq!(uplink.close().await, Err(StreamError::Timeout));

        let file = std::fs::read(&path).unwrap();
        let (_, data_size) = crate::processing::wav_format::parse_header(&file).unwrap();
        assert_eq!(data_size, 4);
        assert_eq!(file.len(), crate::processing::wav_format::WAV_HEADER_SIZE + 4);
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn dropped_close_cancels_both_tasks() {
        let (recognizer, handle) = MemoryRecognizer::new();
        let recognizer = recognizer.with_ack(AckMode::Never);
        let stream = connect(&recognizer).await;
        let diagnostics = Arc::new(Mutex::new(UplinkDiagnostics::default()));
        let uplink = StreamingUplink::open(
            stream,
            config(),
            Arc::new(Collecting::default()),
            Arc::clone(&diagnostics),
            UplinkOptions::default(),
        )
        .unwrap();
        let shared = Arc::clone(&uplink.shared);

        uplink.push(AudioChunk::new(0, vec![0, 0]));
        let abandoned = tokio::time::timeout(Duration::from_millis(30), uplink.close()).await;
        assert!(abandoned.is_err());

        assert!(shared.token.is_cancelled());
        assert!(handle.is_input_complete());
        assert_eq!(diagnostics.lock().audio_bytes_sent, 2);
    }

    #[tokio::test]
    async fn cancel_reports_cancelled() {
        let (recognizer, handle) = MemoryRecognizer::new();
        let recognizer = recognizer.with_ack(AckMode::Never);
        let stream = connect(&recognizer).await;
        let uplink = StreamingUplink::open(
            stream,
            config(),
            Arc::new(Collecting::default()),
            Arc::default(),
            UplinkOptions::default(),
        )
        .unwrap();

        uplink.cancel();
        assert!(uplink.is_cancelled());
        assert_eq!(uplink.close().await, Err(StreamError::Cancelled));
        assert!(!handle.is_input_complete());
    }
}
