//! Input data for the demo binary.

pub mod sample;

pub use sample::*;
