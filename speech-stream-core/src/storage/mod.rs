pub mod summary;
pub mod wav_recorder;
