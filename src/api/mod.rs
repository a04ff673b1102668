//! MusicXML first pass WASM API
//!
//! This module provides the JavaScript-facing API of the crate.
//!
//! # Module Structure
//!
//! - `helpers`: Shared utilities for serialization, settings parsing and logging
//! - `first_pass`: The `analyzeMusicXML` entry point

pub mod helpers;
pub mod first_pass;

pub use first_pass::analyze_musicxml;
