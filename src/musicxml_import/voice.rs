//! Per-voice bookkeeping for staff and voice allocation
//!
//! Every distinct `<voice>` identifier of a part gets a `VoiceDesc`. The
//! scan fills in chord/rest counts and the overlap flag; the allocator then
//! decides staff and voice slot.

use crate::musicxml_import::types::MAX_STAVES;
use serde::Serialize;
use std::fmt;

/// Staff decision for a regular (single-staff) voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "staff", rename_all = "snake_case")]
pub enum StaffAssignment {
    Unassigned,
    /// 0-based staff index
    Staff(usize),
    /// The preferred staff was already full
    CapacityExhausted,
}

/// Allocation state of an overlapping voice on one staff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffAllocation {
    Unassigned,
    Allocated,
    CapacityExhausted,
}

/// Everything the first pass learns about one MusicXML voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceDesc {
    chord_rests: [usize; MAX_STAVES],
    overlaps: bool,
    staff: StaffAssignment,
    voice: Option<usize>,
    staff_alloc: [StaffAllocation; MAX_STAVES],
    voices: [Option<usize>; MAX_STAVES],
}

impl Default for VoiceDesc {
    fn default() -> Self {
        Self {
            chord_rests: [0; MAX_STAVES],
            overlaps: false,
            staff: StaffAssignment::Unassigned,
            voice: None,
            staff_alloc: [StaffAllocation::Unassigned; MAX_STAVES],
            voices: [None; MAX_STAVES],
        }
    }
}

impl VoiceDesc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one chord or rest on `staff`; out-of-range staves are ignored
    pub fn incr_chord_rests(&mut self, staff: usize) {
        if let Some(count) = self.chord_rests.get_mut(staff) {
            *count += 1;
        }
    }

    /// Chord/rest count over all staves
    pub fn number_chord_rests(&self) -> usize {
        self.chord_rests.iter().sum()
    }

    /// Chord/rest count on one staff
    pub fn number_chord_rests_on(&self, staff: usize) -> usize {
        self.chord_rests.get(staff).copied().unwrap_or(0)
    }

    /// The staff holding most of this voice's chords and rests (lowest wins ties)
    pub fn preferred_staff(&self) -> usize {
        let mut max = 0;
        let mut preferred = 0;
        for (staff, &count) in self.chord_rests.iter().enumerate() {
            if count > max {
                max = count;
                preferred = staff;
            }
        }
        preferred
    }

    pub fn overlaps(&self) -> bool {
        self.overlaps
    }

    /// Mark as spanning several staves; never cleared once set
    pub fn set_overlap(&mut self) {
        self.overlaps = true;
    }

    pub fn staff(&self) -> StaffAssignment {
        self.staff
    }

    pub fn set_staff(&mut self, staff: StaffAssignment) {
        self.staff = staff;
    }

    pub fn staff_alloc(&self, staff: usize) -> StaffAllocation {
        self.staff_alloc
            .get(staff)
            .copied()
            .unwrap_or(StaffAllocation::Unassigned)
    }

    pub fn set_staff_alloc(&mut self, staff: usize, alloc: StaffAllocation) {
        if let Some(slot) = self.staff_alloc.get_mut(staff) {
            *slot = alloc;
        }
    }

    /// Voice slot of a regular voice on its staff
    pub fn voice(&self) -> Option<usize> {
        self.voice
    }

    pub fn set_voice(&mut self, voice: usize) {
        self.voice = Some(voice);
    }

    /// Voice slot of an overlapping voice on `staff`
    pub fn voice_on(&self, staff: usize) -> Option<usize> {
        self.voices.get(staff).copied().flatten()
    }

    pub fn set_voice_on(&mut self, staff: usize, voice: usize) {
        if let Some(slot) = self.voices.get_mut(staff) {
            *slot = Some(voice);
        }
    }

    pub fn chord_rests(&self) -> [usize; MAX_STAVES] {
        self.chord_rests
    }

    pub fn staff_allocs(&self) -> [StaffAllocation; MAX_STAVES] {
        self.staff_alloc
    }

    pub fn voices(&self) -> [Option<usize>; MAX_STAVES] {
        self.voices
    }
}

/// 1-based display of an optional 0-based index
fn one_based(index: Option<usize>) -> String {
    index.map_or_else(|| "-".to_string(), |i| (i + 1).to_string())
}

impl fmt::Display for VoiceDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for count in &self.chord_rests {
            write!(f, " {}", count)?;
        }
        write!(f, " ] overlaps {}", self.overlaps)?;

        if self.overlaps {
            write!(f, " staff alloc [")?;
            for alloc in &self.staff_alloc {
                let mark = match alloc {
                    StaffAllocation::Unassigned => "-",
                    StaffAllocation::Allocated => "y",
                    StaffAllocation::CapacityExhausted => "x",
                };
                write!(f, " {}", mark)?;
            }
            write!(f, " ] voice [")?;
            for voice in &self.voices {
                write!(f, " {}", one_based(*voice))?;
            }
            write!(f, " ]")
        } else {
            let staff = match self.staff {
                StaffAssignment::Unassigned => "-".to_string(),
                StaffAssignment::Staff(s) => (s + 1).to_string(),
                StaffAssignment::CapacityExhausted => "x".to_string(),
            };
            write!(f, " staff {} voice {}", staff, one_based(self.voice))
        }
    }
}

/// Voices of a part, in the order they were first seen
///
/// Iteration order is the tie-break for the allocator, so it must stay
/// stable and content-defined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceList {
    entries: Vec<(String, VoiceDesc)>,
}

impl VoiceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, voice: &str) -> bool {
        self.get(voice).is_some()
    }

    pub fn get(&self, voice: &str) -> Option<&VoiceDesc> {
        self.entries.iter().find(|(id, _)| id == voice).map(|(_, desc)| desc)
    }

    pub fn get_mut(&mut self, voice: &str) -> Option<&mut VoiceDesc> {
        self.entries
            .iter_mut()
            .find(|(id, _)| id == voice)
            .map(|(_, desc)| desc)
    }

    /// Descriptor for `voice`, appended if not seen before
    pub fn get_or_insert(&mut self, voice: &str) -> &mut VoiceDesc {
        let index = match self.entries.iter().position(|(id, _)| id == voice) {
            Some(index) => index,
            None => {
                self.entries.push((voice.to_string(), VoiceDesc::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VoiceDesc)> {
        self.entries.iter().map(|(id, desc)| (id.as_str(), desc))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut VoiceDesc)> {
        self.entries.iter_mut().map(|(id, desc)| (id.as_str(), desc))
    }

    /// Voice identifiers in first-seen order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }
}
