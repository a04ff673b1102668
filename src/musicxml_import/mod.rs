//! MusicXML first pass
//!
//! This module scans a MusicXML 3.x score-partwise document once, before the
//! score itself is built, and settles what a single linear read cannot:
//!
//! - which staff and voice slot every MusicXML voice ends up in
//! - the real length of every measure, despite inconsistent durations
//! - which instrument is in effect at any time
//! - the octave shift in effect on each staff at any time
//!
//! # Overview
//!
//! ```text
//! MusicXML String
//!   ↓ [Parse with roxmltree]
//! XML DOM
//!   ↓ [Scan each part: tick cursor, duration resolver, overlap detector]
//! MusicXmlPart (voices, measure durations, instruments, octave shifts)
//!   ↓ [Allocate staves and voices]
//!   ↓ [Reduce measure durations over all parts]
//! FirstPass
//! ```
//!
//! The scan is best-effort: only malformed XML or a non-partwise document
//! fails. Everything else is worked around and recorded as a diagnostic.
//!
//! # Basic Usage
//!
//! ```ignore
//! use musicxml_first_pass::musicxml_import::run_first_pass;
//!
//! let first_pass = run_first_pass(musicxml, None)?;
//! for part in first_pass.parts() {
//!     println!("{}", part);
//! }
//! ```

pub mod errors;
pub mod types;
pub mod parser;
pub mod duration;
pub mod tick_cursor;
pub mod overlap;
pub mod interval_map;
pub mod voice;
pub mod allocator;
pub mod part;
pub mod first_pass;

// Re-export main API
pub use errors::{FirstPassError, Result};
pub use first_pass::{FirstPass, FirstPassReport};
pub use interval_map::{InstrumentList, OctaveShiftList};
pub use part::MusicXmlPart;
pub use types::{FirstPassSettings, Rational, Ticks, TimeSig, TimeSigType, DIVISION, MAX_STAVES, VOICES};
pub use voice::{StaffAllocation, StaffAssignment, VoiceDesc, VoiceList};

/// Run the first pass over a MusicXML document.
///
/// # Arguments
///
/// * `musicxml` - MusicXML score-partwise document as string
/// * `settings` - Optional settings (uses defaults if None)
///
/// # Returns
///
/// * `Ok(FirstPass)` - Per-part results, measure-length table and diagnostics
/// * `Err(FirstPassError)` - The document could not be read at all
pub fn run_first_pass(musicxml: &str, settings: Option<FirstPassSettings>) -> Result<FirstPass> {
    let settings = settings.unwrap_or_default();
    FirstPass::parse(musicxml, &settings)
}
