//! Detection of voices spread over several staves at the same time
//!
//! A MusicXML voice normally lives on one staff, but cross-staff writing
//! lets the same voice number sound on two staves simultaneously. Such
//! voices cannot be mapped to a single staff and are allocated per staff.

use crate::musicxml_import::types::MAX_STAVES;
use std::collections::HashMap;

/// Note intervals (start, end) in ticks for one voice, per staff
#[derive(Debug, Clone, Default)]
struct NoteList {
    staves: [Vec<(i64, i64)>; MAX_STAVES],
}

impl NoteList {
    fn add_note(&mut self, start_tick: i64, end_tick: i64, staff: usize) {
        if let Some(notes) = self.staves.get_mut(staff) {
            notes.push((start_tick, end_tick));
        }
    }

    fn staves_overlap(&self, staff1: usize, staff2: usize) -> bool {
        self.staves[staff1].iter().any(|&a| {
            self.staves[staff2].iter().any(|&b| notes_overlap(a, b))
        })
    }

    fn any_staff_overlaps(&self) -> bool {
        (0..MAX_STAVES).any(|i| ((i + 1)..MAX_STAVES).any(|j| self.staves_overlap(i, j)))
    }
}

fn notes_overlap(n1: (i64, i64), n2: (i64, i64)) -> bool {
    !(n1.1 <= n2.0 || n1.0 >= n2.1)
}

/// Collects the notes of the current measure and answers overlap queries
#[derive(Debug, Clone, Default)]
pub struct VoiceOverlapDetector {
    note_lists: HashMap<String, NoteList>,
}

impl VoiceOverlapDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a note of `voice` on `staff` sounding from `start_tick` to `end_tick`
    pub fn add_note(&mut self, start_tick: i64, end_tick: i64, voice: &str, staff: usize) {
        self.note_lists
            .entry(voice.to_string())
            .or_default()
            .add_note(start_tick, end_tick, staff);
    }

    /// Forget everything; overlaps are only detected within one measure
    pub fn new_measure(&mut self) {
        self.note_lists.clear();
    }

    /// Whether `voice` has simultaneous notes on two different staves
    pub fn staves_overlap(&self, voice: &str) -> bool {
        self.note_lists
            .get(voice)
            .map(NoteList::any_staff_overlaps)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_staff_never_overlaps() {
        let mut vod = VoiceOverlapDetector::new();
        vod.add_note(0, 480, "1", 0);
        vod.add_note(0, 480, "1", 0);
        assert!(!vod.staves_overlap("1"));
    }

    #[test]
    fn test_simultaneous_notes_on_two_staves_overlap() {
        let mut vod = VoiceOverlapDetector::new();
        vod.add_note(0, 960, "1", 0);
        vod.add_note(480, 960, "1", 1);
        assert!(vod.staves_overlap("1"));
        assert!(!vod.staves_overlap("2"));
    }

    #[test]
    fn test_touching_intervals_do_not_overlap() {
        let mut vod = VoiceOverlapDetector::new();
        vod.add_note(0, 480, "1", 0);
        vod.add_note(480, 960, "1", 1);
        assert!(!vod.staves_overlap("1"));
    }

    #[test]
    fn test_other_voice_on_other_staff_is_independent() {
        let mut vod = VoiceOverlapDetector::new();
        vod.add_note(0, 960, "1", 0);
        vod.add_note(0, 960, "2", 1);
        assert!(!vod.staves_overlap("1"));
        assert!(!vod.staves_overlap("2"));
    }

    #[test]
    fn test_new_measure_clears_state() {
        let mut vod = VoiceOverlapDetector::new();
        vod.add_note(0, 960, "1", 0);
        vod.add_note(0, 960, "1", 1);
        vod.new_measure();
        assert!(!vod.staves_overlap("1"));
    }

    #[test]
    fn test_out_of_range_staff_is_ignored() {
        let mut vod = VoiceOverlapDetector::new();
        vod.add_note(0, 960, "1", 0);
        vod.add_note(0, 960, "1", MAX_STAVES);
        assert!(!vod.staves_overlap("1"));
    }
}
