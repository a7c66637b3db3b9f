use std::time::Duration;

use speech_stream_core::{MemoryRecognizerHandle, RecognitionResponse, RecognitionResult};

/// Play the recognizer: one interim and one final result per second of
/// audio received. Runs until aborted.
pub async fn run(handle: MemoryRecognizerHandle, sample_rate: u32) {
    let bytes_per_second = (sample_rate as usize * 2).max(1);
    let mut answered = 0usize;
    let mut ticker = tokio::time::interval(Duration::from_millis(50));
    loop {
        ticker.tick().await;
        let seconds = handle.audio_bytes() / bytes_per_second;
        while answered < seconds {
            answered += 1;
            let segment = format!("segment {}", answered);
            handle.push_response(RecognitionResponse::new(vec![RecognitionResult::interim(
                segment.clone(),
            )]));
            handle.push_response(RecognitionResponse::new(vec![RecognitionResult::final_result(
                segment,
            )]));
        }
    }
}
