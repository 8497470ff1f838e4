//! r-photobooth: photo strip compositing
//!
//! The library holds the domain types and the compositing engine; the binary
//! wraps them in a small HTTP API.

pub mod config;
pub mod domain;
pub mod engine;
