use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::StreamError;
use crate::models::session_summary::RecordingInfo;
use crate::processing::wav_format::{self, WavSpec};

/// Streaming WAV writer for the audio a session sends upstream.
///
/// ## File Format
/// ```text
/// [44-byte WAV header, sizes patched on close]
/// [raw 16-bit PCM data, in send order...]
/// ```
pub struct WavRecorder {
    file_path: PathBuf,
    spec: WavSpec,
    file: Option<BufWriter<File>>,
    data_bytes: u64,
}

impl WavRecorder {
    pub fn new(file_path: PathBuf, spec: WavSpec) -> Self {
        Self {
            file_path,
            spec,
            file: None,
            data_bytes: 0,
        }
    }

    /// Create the file and write a placeholder header.
    pub fn open(&mut self) -> Result<(), StreamError> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StreamError::StorageError(format!("failed to create directory: {}", e)))?;
            }
        }

        let file = File::create(&self.file_path)
            .map_err(|e| StreamError::StorageError(format!("failed to create file: {}", e)))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&self.spec.header(0))
            .map_err(|e| StreamError::StorageError(format!("failed to write header: {}", e)))?;

        self.file = Some(writer);
        self.data_bytes = 0;
        Ok(())
    }

    /// Append PCM bytes.
    pub fn write(&mut self, pcm: &[u8]) -> Result<(), StreamError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| StreamError::StorageError("recording is not open".into()))?;
        file.write_all(pcm)
            .map_err(|e| StreamError::StorageError(format!("write failed: {}", e)))?;
        self.data_bytes += pcm.len() as u64;
        Ok(())
    }

    /// Patch header sizes, flush, and checksum the finished file.
    pub fn close(&mut self) -> Result<RecordingInfo, StreamError> {
        let mut writer = self
            .file
            .take()
            .ok_or_else(|| StreamError::StorageError("recording is not open".into()))?;

        let data_size = u32::try_from(self.data_bytes)
            .map_err(|_| StreamError::StorageError("recording exceeds 4 GiB WAV limit".into()))?;
        let mut header = self.spec.header(0);
        wav_format::patch_sizes(&mut header, data_size);

        writer
            .seek(SeekFrom::Start(0))
            .and_then(|_| writer.write_all(&header))
            .and_then(|_| writer.flush())
            .map_err(|e| StreamError::StorageError(format!("failed to finalize header: {}", e)))?;
        drop(writer);

        let checksum = sha256_file(&self.file_path)?;
        Ok(RecordingInfo {
            file_path: self.file_path.to_string_lossy().into_owned(),
            checksum,
            data_bytes: self.data_bytes,
        })
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// PCM bytes written so far (header excluded).
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, StreamError> {
    let data = fs::read(path)
        .map_err(|e| StreamError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
