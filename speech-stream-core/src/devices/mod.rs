//! Capture device implementations.

pub mod memory;
