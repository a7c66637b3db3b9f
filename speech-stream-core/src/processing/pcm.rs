//! Float → PCM16 conversion and level metering.
//!
//! Samples are scaled by `i16::MAX` and rounded down, so the output is
//! deterministic across platforms: `0.5 → 16383`, `-1.0 → -32767`.

const PCM16_SCALE: f32 = i16::MAX as f32;

/// What to do with float samples outside `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PcmOverflowPolicy {
    /// Clamp to `[-1.0, 1.0]` before scaling.
    #[default]
    Clamp,
    /// Scale without clamping and keep the low 16 bits (two's complement
    /// wrap), matching capture pipelines that cast without range checks.
    Wrap,
}

/// Convert one float sample to a signed 16-bit value. NaN becomes silence.
pub fn sample_to_i16(sample: f32, policy: PcmOverflowPolicy) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    match policy {
        PcmOverflowPolicy::Clamp => (sample.clamp(-1.0, 1.0) * PCM16_SCALE).floor() as i16,
        PcmOverflowPolicy::Wrap => ((sample * PCM16_SCALE).floor() as i64) as i16,
    }
}

/// Convert f32 samples to 16-bit little-endian PCM.
///
/// Output length = `samples.len() * 2` bytes, low byte first.
pub fn convert_to_pcm16le(samples: &[f32], policy: PcmOverflowPolicy) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        data.extend_from_slice(&sample_to_i16(sample, policy).to_le_bytes());
    }
    data
}

/// Compute RMS level of samples (0.0–1.0 range for normalized audio).
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Compute peak absolute level of samples.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}
