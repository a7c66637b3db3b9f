//! RIFF/WAVE header helpers for the uplink recording tap.
//!
//! Only canonical 44-byte PCM headers are produced or understood.

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// PCM layout of a WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl WavSpec {
    /// Mono 16-bit PCM, the only layout the uplink produces.
    pub fn pcm16_mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
            bits_per_sample: 16,
        }
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Build a 44-byte header for `data_size` bytes of PCM.
    ///
    /// ```text
    /// [0-3]    "RIFF"          [4-7]    36 + data_size
    /// [8-11]   "WAVE"          [12-15]  "fmt "
    /// [16-19]  16              [20-21]  1 (PCM)
    /// [22-23]  channels        [24-27]  sample_rate
    /// [28-31]  byte_rate       [32-33]  block_align
    /// [34-35]  bits/sample     [36-39]  "data"
    /// [40-43]  data_size
    /// ```
    pub fn header(&self, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
        let mut header = [0u8; WAV_HEADER_SIZE];

        header[0..4].copy_from_slice(b"RIFF");
        header[8..12].copy_from_slice(b"WAVE");

        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes());
        header[20..22].copy_from_slice(&1u16.to_le_bytes());
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());

        header[36..40].copy_from_slice(b"data");
        patch_sizes(&mut header, data_size);

        header
    }
}

/// Rewrite the RIFF chunk size (offset 4) and data size (offset 40).
pub fn patch_sizes(header: &mut [u8], data_size: u32) {
    let chunk_size = data_size.saturating_add(36);
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
}

/// Parse a canonical PCM header, returning its layout and declared data size.
pub fn parse_header(bytes: &[u8]) -> Option<(WavSpec, u32)> {
    if bytes.len() < WAV_HEADER_SIZE
        || &bytes[0..4] != b"RIFF"
        || &bytes[8..12] != b"WAVE"
        || &bytes[12..16] != b"fmt "
        || &bytes[36..40] != b"data"
    {
        return None;
    }
    if u16::from_le_bytes([bytes[20], bytes[21]]) != 1 {
        return None;
    }

    let spec = WavSpec {
        channels: u16::from_le_bytes([bytes[22], bytes[23]]),
        sample_rate: u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
        bits_per_sample: u16::from_le_bytes([bytes[34], bytes[35]]),
    };
    let data_size = u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]);
    Some((spec, data_size))
}
