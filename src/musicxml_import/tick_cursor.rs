//! Running time position within a part
//!
//! `<backup>` lets voices move backwards in time, so besides the current
//! position the cursor keeps the furthest point any voice has reached.

use crate::diagnostics::DiagnosticSeverity;
use crate::musicxml_import::duration::NoteDuration;
use crate::musicxml_import::types::{describe, zero, Rational};
use num_traits::{CheckedAdd, CheckedSub};
use thiserror::Error;

/// Anomalies the cursor worked around while moving
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CursorIssue {
    #[error("calculated duration not equal to specified duration ({description})")]
    DurationMismatch { description: String },

    #[error("calculated duration invalid, using specified duration ({description})")]
    CalculatedInvalid { description: String },

    #[error("specified duration invalid, using calculated duration ({description})")]
    SpecifiedInvalid { description: String },

    #[error("calculated and specified duration invalid ({description})")]
    BothInvalid { description: String },

    #[error("backup beyond start of measure ({amount})")]
    BackupBeyondStart { amount: String },

    #[error("position out of range, move by {amount} ignored")]
    PositionOverflow { amount: String },
}

impl CursorIssue {
    /// Kind identifier used for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            CursorIssue::DurationMismatch { .. } => "duration_mismatch",
            CursorIssue::CalculatedInvalid { .. } | CursorIssue::SpecifiedInvalid { .. } => {
                "duration_substituted"
            }
            CursorIssue::BothInvalid { .. } => "duration_invalid",
            CursorIssue::BackupBeyondStart { .. } => "backup_beyond_start",
            CursorIssue::PositionOverflow { .. } => "position_overflow",
        }
    }

    pub fn severity(&self) -> DiagnosticSeverity {
        match self {
            CursorIssue::BothInvalid { .. } | CursorIssue::PositionOverflow { .. } => {
                DiagnosticSeverity::Error
            }
            CursorIssue::CalculatedInvalid { .. } => DiagnosticSeverity::Info,
            _ => DiagnosticSeverity::Warning,
        }
    }
}

/// Current tick and high-water mark of a part scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickCursor {
    tick: Rational,
    max_tick: Rational,
}

impl Default for TickCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl TickCursor {
    pub fn new() -> Self {
        Self {
            tick: zero(),
            max_tick: zero(),
        }
    }

    pub fn tick(&self) -> Rational {
        self.tick
    }

    pub fn max_tick(&self) -> Rational {
        self.max_tick
    }

    /// Move forward by `duration` (a `<forward>` element)
    pub fn forward(&mut self, duration: Rational) -> Result<(), CursorIssue> {
        self.advance(duration)
    }

    /// Move backward by `duration` (a `<backup>` element)
    ///
    /// Backing up past tick zero clamps the position to zero.
    pub fn backup(&mut self, duration: Rational) -> Result<(), CursorIssue> {
        if duration > self.tick {
            self.tick = zero();
            return Err(CursorIssue::BackupBeyondStart {
                amount: describe(Some(duration)),
            });
        }
        self.tick = self
            .tick
            .checked_sub(&duration)
            .ok_or_else(|| CursorIssue::PositionOverflow {
                amount: describe(Some(duration)),
            })?;
        Ok(())
    }

    /// Advance past a note, preferring the specified over the calculated duration
    ///
    /// The cursor still moves when a reconciliation issue is returned, unless
    /// neither duration is valid or the new position is out of range.
    pub fn note(&mut self, duration: &NoteDuration) -> Option<CursorIssue> {
        let description = duration.description.clone();
        let (advance, issue) = match (duration.specified, duration.calculated) {
            (Some(specified), Some(calculated)) => (
                specified,
                (specified != calculated).then_some(CursorIssue::DurationMismatch { description }),
            ),
            (Some(specified), None) => (specified, Some(CursorIssue::CalculatedInvalid { description })),
            (None, Some(calculated)) => (calculated, Some(CursorIssue::SpecifiedInvalid { description })),
            (None, None) => return Some(CursorIssue::BothInvalid { description }),
        };
        match self.advance(advance) {
            Ok(()) => issue,
            Err(overflow) => Some(overflow),
        }
    }

    /// Continue from the furthest point reached, at a measure boundary
    ///
    /// The next measure starts at the high-water mark, not at the current
    /// tick, so a measure ending in `<backup>` does not pull it back.
    pub fn close_measure(&mut self) {
        self.tick = self.max_tick;
    }

    fn advance(&mut self, duration: Rational) -> Result<(), CursorIssue> {
        self.tick = self
            .tick
            .checked_add(&duration)
            .ok_or_else(|| CursorIssue::PositionOverflow {
                amount: describe(Some(duration)),
            })?;
        self.update_max();
        Ok(())
    }

    fn update_max(&mut self) {
        if self.tick > self.max_tick {
            self.max_tick = self.tick;
        }
    }
}
