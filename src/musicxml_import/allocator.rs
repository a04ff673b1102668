//! Staff and voice slot allocation
//!
//! Each staff holds at most `VOICES` voices. Because of cross-staff
//! notation it is not known in advance which staff a MusicXML voice belongs
//! to, so voices are handed out greedily, busiest voice first:
//!
//! 1. Regular voices go to their preferred staff while it has room.
//! 2. Overlapping voices are allocated staff by staff, on every staff they
//!    appear on.
//!
//! Slot numbers are then given per staff in voice list order, regular
//! voices before overlapping ones.

use crate::diagnostics::{DiagnosticScope, DiagnosticSeverity};
use crate::musicxml_import::types::{MAX_STAVES, VOICES};
use crate::musicxml_import::voice::{StaffAllocation, StaffAssignment, VoiceDesc, VoiceList};

/// Identifier of the candidate with the highest positive count
///
/// Ties go to the voice seen first.
fn busiest<F, C>(voices: &VoiceList, candidate: F, count: C) -> Option<String>
where
    F: Fn(&VoiceDesc) -> bool,
    C: Fn(&VoiceDesc) -> usize,
{
    let mut max = 0;
    let mut busiest = None;
    for (id, desc) in voices.iter() {
        if candidate(desc) && count(desc) > max {
            max = count(desc);
            busiest = Some(id);
        }
    }
    busiest.map(str::to_string)
}

/// Assign regular voices to a staff and overlapping voices to every staff they use
pub fn allocate_staves(voices: &mut VoiceList, scope: &mut DiagnosticScope) {
    let mut allocated = [0usize; MAX_STAVES];

    // each round settles exactly one voice
    for _ in 0..voices.len() {
        let Some(id) = busiest(
            voices,
            |d| !d.overlaps() && d.staff() == StaffAssignment::Unassigned,
            VoiceDesc::number_chord_rests,
        ) else {
            break;
        };
        let Some(desc) = voices.get_mut(&id) else {
            break;
        };

        let staff = desc.preferred_staff();
        if allocated[staff] < VOICES {
            desc.set_staff(StaffAssignment::Staff(staff));
            allocated[staff] += 1;
        } else {
            desc.set_staff(StaffAssignment::CapacityExhausted);
            report_exhausted(scope, &id, staff);
        }
    }

    for staff in 0..MAX_STAVES {
        for _ in 0..voices.len() {
            let Some(id) = busiest(
                voices,
                |d| d.overlaps() && d.staff_alloc(staff) == StaffAllocation::Unassigned,
                |d| d.number_chord_rests_on(staff),
            ) else {
                break;
            };
            let Some(desc) = voices.get_mut(&id) else {
                break;
            };

            if allocated[staff] < VOICES {
                desc.set_staff_alloc(staff, StaffAllocation::Allocated);
                allocated[staff] += 1;
            } else {
                desc.set_staff_alloc(staff, StaffAllocation::CapacityExhausted);
                report_exhausted(scope, &id, staff);
            }
        }
    }
}

/// Number the voices on each staff, in voice list order
///
/// Only voices that received a staff in `allocate_staves` get a number.
pub fn allocate_voices(voices: &mut VoiceList) {
    let mut next_voice = [0usize; MAX_STAVES];

    for (_, desc) in voices.iter_mut() {
        if let StaffAssignment::Staff(staff) = desc.staff() {
            desc.set_voice(next_voice[staff]);
            next_voice[staff] += 1;
        }
    }

    for (_, desc) in voices.iter_mut() {
        for (staff, next) in next_voice.iter_mut().enumerate() {
            if desc.staff_alloc(staff) == StaffAllocation::Allocated {
                desc.set_voice_on(staff, *next);
                *next += 1;
            }
        }
    }
}

fn report_exhausted(scope: &mut DiagnosticScope, voice: &str, staff: usize) {
    log::debug!("no voice left on staff {} for voice '{}'", staff + 1, voice);
    scope.report(
        DiagnosticSeverity::Warning,
        "voice_capacity_exhausted",
        format!(
            "voice '{}' not allocated: staff {} already holds {} voices",
            voice,
            staff + 1,
            VOICES
        ),
        None,
    );
}
