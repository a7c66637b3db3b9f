//! Recognition service implementations.

pub mod memory;
