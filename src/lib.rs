//! MusicXML First Pass
//!
//! A single scan over a MusicXML document that precomputes what the score
//! builder needs before it can start: voice to staff and voice slot mapping,
//! measure lengths, instrument changes and octave shifts.
//! Usable natively and as a WASM module.

pub mod api;
pub mod diagnostics;
pub mod musicxml_import;

// Re-export commonly used types
pub use diagnostics::{Diagnostic, DiagnosticSeverity, Diagnostics, SourceLocation};
pub use musicxml_import::{run_first_pass, FirstPass, FirstPassError, FirstPassReport, FirstPassSettings};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    init_logger();

    log::info!("MusicXML first pass WASM module initialized");
}

#[cfg(feature = "console_log")]
fn init_logger() {
    if let Err(e) = console_log::init_with_level(log::Level::Debug) {
        api::helpers::log_error(&format!("failed to initialize logger: {}", e));
    }
}

#[cfg(not(feature = "console_log"))]
fn init_logger() {}
