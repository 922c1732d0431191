//! Clipsplice - cut time ranges out of a video and splice them back together
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod pipeline;
pub mod timestamps;
