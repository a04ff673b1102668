//! Tick-keyed "value in effect from here on" maps
//!
//! Instruments and octave shifts change at points in time and stay in
//! effect until the next change. Both maps are filled while scanning and
//! frozen afterwards: the builders are consumed by `finish`, and the frozen
//! maps only answer queries.

use crate::musicxml_import::types::{describe, zero, Rational};
use std::collections::BTreeMap;
use thiserror::Error;

/// Ordered map from tick to the value in effect from that tick onward
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalMap<V> {
    entries: BTreeMap<Rational, V>,
}

impl<V> Default for IntervalMap<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> IntervalMap<V> {
    /// Value with the greatest key not after `tick`
    pub fn value_at(&self, tick: Rational) -> Option<&V> {
        self.entries.range(..=tick).next_back().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in tick order
    pub fn iter(&self) -> impl Iterator<Item = (&Rational, &V)> {
        self.entries.iter()
    }
}

// ============================================================================
// INSTRUMENTS
// ============================================================================

/// An instrument was declared twice at the same tick
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("instrument '{rejected}' at tick {tick}: instrument '{kept}' already set")]
pub struct DuplicateInstrument {
    pub tick: String,
    pub kept: String,
    pub rejected: String,
}

/// Instrument changes collected during a part scan
#[derive(Debug, Clone, Default)]
pub struct InstrumentListBuilder {
    map: IntervalMap<String>,
}

impl InstrumentListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instrument in effect at `tick`, empty if none
    pub fn instrument(&self, tick: Rational) -> &str {
        self.map.value_at(tick).map(String::as_str).unwrap_or("")
    }

    /// Set the instrument from `tick` on; the first instrument set at a tick wins
    pub fn set_instrument(&mut self, instrument: &str, tick: Rational) -> Result<(), DuplicateInstrument> {
        if let Some(kept) = self.map.entries.get(&tick) {
            return Err(DuplicateInstrument {
                tick: describe(Some(tick)),
                kept: kept.clone(),
                rejected: instrument.to_string(),
            });
        }
        self.map.entries.insert(tick, instrument.to_string());
        Ok(())
    }

    /// Freeze the list
    ///
    /// A part may open with a `<forward>` before its first note, leaving no
    /// instrument at tick zero; the first instrument is moved there.
    pub fn finish(mut self) -> InstrumentList {
        let first_tick = self.map.entries.keys().next().copied();
        if let Some(first_tick) = first_tick.filter(|&t| t != zero()) {
            if let Some(first) = self.map.entries.remove(&first_tick) {
                self.map.entries.insert(zero(), first);
            }
        }
        InstrumentList { map: self.map }
    }
}

/// Instrument in effect over time, for one part
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentList {
    map: IntervalMap<String>,
}

impl InstrumentList {
    /// Instrument in effect at `tick`, empty if none
    pub fn instrument(&self, tick: Rational) -> &str {
        self.map.value_at(tick).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rational, &String)> {
        self.map.iter()
    }
}

// ============================================================================
// OCTAVE SHIFTS
// ============================================================================

/// Octave shift deltas collected during a part scan, for one staff
#[derive(Debug, Clone, Default)]
pub struct OctaveShiftBuilder {
    map: IntervalMap<i32>,
}

impl OctaveShiftBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `shift` octaves at `tick`; shifts at the same tick accumulate
    pub fn add_octave_shift(&mut self, shift: i32, tick: Rational) {
        let entry = self.map.entries.entry(tick).or_insert(0);
        *entry = entry.saturating_add(shift);
    }

    /// Freeze into running totals
    pub fn finish(mut self) -> OctaveShiftList {
        let mut current = 0i32;
        for value in self.map.entries.values_mut() {
            current = current.saturating_add(*value);
            *value = current;
        }
        OctaveShiftList { map: self.map }
    }
}

/// Total octave shift in effect over time, for one staff
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OctaveShiftList {
    map: IntervalMap<i32>,
}

impl OctaveShiftList {
    /// Total shift in effect at `tick`, 0 if none
    pub fn octave_shift(&self, tick: Rational) -> i32 {
        self.map.value_at(tick).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rational, &i32)> {
        self.map.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::musicxml_import::types::from_ticks;

    #[test]
    fn test_value_at_greatest_key_not_after() {
        let mut builder = InstrumentListBuilder::new();
        builder.set_instrument("P1-I1", zero()).unwrap();
        builder.set_instrument("P1-I2", from_ticks(960)).unwrap();
        let list = builder.finish();

        assert_eq!(list.instrument(zero()), "P1-I1");
        assert_eq!(list.instrument(from_ticks(959)), "P1-I1");
        assert_eq!(list.instrument(from_ticks(960)), "P1-I2");
        assert_eq!(list.instrument(from_ticks(100_000)), "P1-I2");
    }

    #[test]
    fn test_empty_map_returns_default() {
        let list = InstrumentListBuilder::new().finish();
        assert_eq!(list.instrument(from_ticks(480)), "");

        let shifts = OctaveShiftBuilder::new().finish();
        assert_eq!(shifts.octave_shift(from_ticks(480)), 0);
    }

    #[test]
    fn test_query_before_first_key_returns_default() {
        let mut builder = OctaveShiftBuilder::new();
        builder.add_octave_shift(1, from_ticks(960));
        let shifts = builder.finish();
        assert_eq!(shifts.octave_shift(from_ticks(480)), 0);
    }

    #[test]
    fn test_duplicate_instrument_keeps_first() {
        let mut builder = InstrumentListBuilder::new();
        builder.set_instrument("P1-I1", from_ticks(480)).unwrap();

        let err = builder.set_instrument("P1-I2", from_ticks(480)).unwrap_err();
        assert_eq!(err.kept, "P1-I1");
        assert_eq!(err.rejected, "P1-I2");
        assert_eq!(builder.instrument(from_ticks(480)), "P1-I1");
    }

    #[test]
    fn test_first_instrument_moves_to_tick_zero() {
        let mut builder = InstrumentListBuilder::new();
        builder.set_instrument("P1-I1", from_ticks(960)).unwrap();
        builder.set_instrument("P1-I2", from_ticks(1920)).unwrap();
        let list = builder.finish();

        assert_eq!(list.len(), 2);
        assert_eq!(list.iter().next(), Some((&zero(), &"P1-I1".to_string())));
        assert_eq!(list.instrument(from_ticks(480)), "P1-I1");
        assert_eq!(list.instrument(from_ticks(1920)), "P1-I2");
    }

    #[test]
    fn test_octave_shifts_accumulate_at_same_tick() {
        let mut builder = OctaveShiftBuilder::new();
        builder.add_octave_shift(1, from_ticks(480));
        builder.add_octave_shift(1, from_ticks(480));
        let shifts = builder.finish();
        assert_eq!(shifts.octave_shift(from_ticks(480)), 2);
    }

    #[test]
    fn test_octave_shifts_become_running_totals() {
        let mut builder = OctaveShiftBuilder::new();
        builder.add_octave_shift(1, from_ticks(0));
        builder.add_octave_shift(1, from_ticks(960));
        builder.add_octave_shift(-2, from_ticks(1920));
        builder.add_octave_shift(-1, from_ticks(2880));
        let shifts = builder.finish();

        assert_eq!(shifts.octave_shift(from_ticks(0)), 1);
        assert_eq!(shifts.octave_shift(from_ticks(1000)), 2);
        assert_eq!(shifts.octave_shift(from_ticks(1920)), 0);
        assert_eq!(shifts.octave_shift(from_ticks(5000)), -1);

        let totals: Vec<i32> = shifts.iter().map(|(_, v)| *v).collect();
        assert_eq!(totals, vec![1, 2, 0, -1]);
    }
}
