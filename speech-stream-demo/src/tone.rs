use std::f32::consts::TAU;
use std::time::Duration;

use speech_stream_core::MemoryCaptureDevice;

/// Sine wave written into the memory microphone in 10 ms bursts.
#[derive(Debug, Clone, Copy)]
pub struct Tone {
    pub frequency: f32,
    pub amplitude: f32,
    pub sample_rate: u32,
}

impl Tone {
    fn burst(&self, phase: &mut f32, len: usize) -> Vec<f32> {
        let step = TAU * self.frequency / self.sample_rate as f32;
        (0..len)
            .map(|_| {
                let sample = self.amplitude * phase.sin();
                *phase = (*phase + step) % TAU;
                sample
            })
            .collect()
    }
}

/// Feed `mic` until aborted.
pub async fn run(mic: MemoryCaptureDevice, tone: Tone) {
    let burst_len = (tone.sample_rate / 100).max(1) as usize;
    let mut ticker = tokio::time::interval(Duration::from_millis(10));
    let mut phase = 0.0f32;
    loop {
        ticker.tick().await;
        let samples = tone.burst(&mut phase, burst_len);
        if mic.write(&samples) == 0 {
            log::debug!("Microphone stopped; tone generator idle");
        }
    }
}
