//! Shared types for the MusicXML first pass
//!
//! This module defines:
//! - The fixed tick resolution and capacity constants
//! - Exact rational durations and their tick conversions
//! - Time signature derivation
//! - Settings for the known-format-deviation heuristics

use num_rational::Rational64;
use serde::{Deserialize, Serialize};

/// Exact duration in whole notes (1/4 = one quarter note)
pub type Rational = Rational64;

/// Ticks per quarter note
pub const DIVISION: i64 = 480;

/// Maximum number of staves per part
pub const MAX_STAVES: usize = 4;

/// Maximum number of voices per staff
pub const VOICES: usize = 4;

/// Measure lengths are rounded up to a multiple of this (a 1/64 note)
pub const RASTER_TICKS: i64 = DIVISION / 16;

/// Conversion between rational durations and integer ticks
pub trait Ticks {
    /// Length in ticks, rounded to the nearest tick
    ///
    /// Lengths beyond the `i64` range saturate.
    fn ticks(&self) -> i64;
}

impl Ticks for Rational {
    fn ticks(&self) -> i64 {
        let numer = i128::from(*self.numer());
        let den = i128::from(*self.denom());
        let ticks = (numer * i128::from(DIVISION * 4) + den / 2) / den;
        i64::try_from(ticks).unwrap_or(if ticks < 0 { i64::MIN } else { i64::MAX })
    }
}

/// Duration of `ticks` ticks, reduced
pub fn from_ticks(ticks: i64) -> Rational {
    Rational::new(ticks, DIVISION * 4)
}

/// Zero duration
pub fn zero() -> Rational {
    Rational::from_integer(0)
}

/// Printable form of a possibly-invalid duration
pub fn describe(value: Option<Rational>) -> String {
    match value {
        Some(f) => format!("{}/{}", f.numer(), f.denom()),
        None => "invalid".to_string(),
    }
}

// ============================================================================
// TIME SIGNATURE
// ============================================================================

/// Time signature symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSigType {
    Normal,
    /// 2/2 written as a cut-time symbol
    AllaBreve,
    /// 4/4 written as a common-time symbol
    FourFour,
}

/// A time signature as far as measure lengths are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSig {
    pub sig_type: TimeSigType,
    /// Sum of all beats ("3+2" gives 5)
    pub beats: i64,
    /// Beat type, the denominator of the signature
    pub beat_type: i64,
}

impl TimeSig {
    /// Derive a time signature from the `<beats>`, `<beat-type>` and symbol texts.
    ///
    /// Returns `None` when the combination is malformed: an unknown symbol,
    /// unparsable numbers, a zero beat count or beat type, or a beat sum
    /// that does not fit an `i64`.
    pub fn determine(beats: &str, beat_type: &str, symbol: &str) -> Option<TimeSig> {
        if beats == "2" && beat_type == "2" && symbol == "cut" {
            return Some(TimeSig {
                sig_type: TimeSigType::AllaBreve,
                beats: 2,
                beat_type: 2,
            });
        }
        if beats == "4" && beat_type == "4" && symbol == "common" {
            return Some(TimeSig {
                sig_type: TimeSigType::FourFour,
                beats: 4,
                beat_type: 4,
            });
        }
        if !symbol.is_empty() && symbol != "normal" {
            return None;
        }

        let btp: i64 = beat_type.trim().parse().ok()?;
        let mut bts = 0i64;
        for part in beats.split('+') {
            bts = bts.checked_add(part.trim().parse::<i64>().ok()?)?;
        }
        if bts <= 0 || btp <= 0 {
            return None;
        }

        Some(TimeSig {
            sig_type: TimeSigType::Normal,
            beats: bts,
            beat_type: btp,
        })
    }

    /// Nominal measure length
    pub fn fraction(&self) -> Rational {
        Rational::new_raw(self.beats, self.beat_type)
    }

    /// Nominal measure length in ticks
    pub fn ticks(&self) -> i64 {
        self.fraction().ticks()
    }
}

// ============================================================================
// SETTINGS
// ============================================================================

/// Configuration options for the first pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirstPassSettings {
    /// Use the time signature length for measures that contain no duration at all
    pub fill_empty_measures: bool,

    /// Round measure lengths up to a whole number of 1/64 notes
    pub round_to_raster: bool,
}

impl Default for FirstPassSettings {
    fn default() -> Self {
        Self {
            fill_empty_measures: true,
            round_to_raster: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_round_trip() {
        assert_eq!(Rational::new(1, 4).ticks(), 480);
        assert_eq!(Rational::new(3, 4).ticks(), 1440);
        assert_eq!(from_ticks(480), Rational::new(1, 4));
        assert_eq!(from_ticks(1920).ticks(), 1920);
    }

    #[test]
    fn test_ticks_rounds_to_nearest() {
        // an eighth-note triplet is 160 ticks exactly, a 1/12 quarter is 40
        assert_eq!(Rational::new(1, 12).ticks(), 160);
        // 1/7 of a whole note is 274.28 ticks
        assert_eq!(Rational::new(1, 7).ticks(), 274);
    }

    #[test]
    fn test_time_sig_ticks() {
        for (beats, beat_type) in [(4, 4), (3, 4), (6, 8), (2, 2), (5, 16), (7, 8)] {
            let ts = TimeSig::determine(&beats.to_string(), &beat_type.to_string(), "").unwrap();
            assert_eq!(ts.ticks(), beats * DIVISION * 4 / beat_type);
        }
    }

    #[test]
    fn test_time_sig_additive_beats() {
        let ts = TimeSig::determine("3+2", "8", "").unwrap();
        assert_eq!(ts.beats, 5);
        assert_eq!(ts.beat_type, 8);
        assert_eq!(ts.ticks(), 1200);
    }

    #[test]
    fn test_time_sig_symbols() {
        let cut = TimeSig::determine("2", "2", "cut").unwrap();
        assert_eq!(cut.sig_type, TimeSigType::AllaBreve);

        let common = TimeSig::determine("4", "4", "common").unwrap();
        assert_eq!(common.sig_type, TimeSigType::FourFour);

        let normal = TimeSig::determine("3", "4", "normal").unwrap();
        assert_eq!(normal.sig_type, TimeSigType::Normal);
    }

    #[test]
    fn test_time_sig_rejects_malformed() {
        assert!(TimeSig::determine("3", "4", "cut").is_none());
        assert!(TimeSig::determine("4", "4", "single-number").is_none());
        assert!(TimeSig::determine("x", "4", "").is_none());
        assert!(TimeSig::determine("3", "0", "").is_none());
        assert!(TimeSig::determine("0", "4", "").is_none());
        assert!(TimeSig::determine("9223372036854775807+1", "4", "").is_none());
    }

    #[test]
    fn test_ticks_saturate() {
        assert_eq!(Rational::from_integer(i64::MAX).ticks(), i64::MAX);
        assert_eq!(Rational::from_integer(i64::MIN).ticks(), i64::MIN);
        assert_eq!(Rational::new(i64::MAX, 1920).ticks(), i64::MAX);

        let ts = TimeSig::determine("1", "9223372036854775807", "").unwrap();
        assert_eq!(ts.ticks(), 0);
    }

    #[test]
    fn test_settings_default_and_partial_json() {
        let settings: FirstPassSettings = serde_json::from_str(r#"{"round_to_raster": false}"#).unwrap();
        assert!(settings.fill_empty_measures);
        assert!(!settings.round_to_raster);
        assert_eq!(FirstPassSettings::default().round_to_raster, true);
    }
}
