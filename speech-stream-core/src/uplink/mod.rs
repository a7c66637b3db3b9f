pub mod queue;
pub mod streaming;
