//! Document-level driver of the first pass
//!
//! Reads the part list, scans every `<part>`, and once all parts are done
//! reduces their measure durations into one document-wide table.

use crate::diagnostics::{DiagnosticScope, DiagnosticSeverity, Diagnostics};
use crate::musicxml_import::errors::Result;
use crate::musicxml_import::interval_map::InstrumentList;
use crate::musicxml_import::parser::{
    child_elements, get_child_text, get_score_partwise, parse_document, source_location,
};
use crate::musicxml_import::part::{scan_part, MusicXmlPart};
use crate::musicxml_import::types::{describe, zero, FirstPassSettings, Rational, Ticks, MAX_STAVES};
use crate::musicxml_import::voice::{StaffAllocation, StaffAssignment, VoiceList};
use roxmltree::Node;
use serde::Serialize;
use std::collections::HashSet;

/// Results of the first pass over a MusicXML document
#[derive(Debug, Clone, Default)]
pub struct FirstPass {
    parts: Vec<MusicXmlPart>,
    measure_lengths: Vec<Rational>,
    diagnostics: Diagnostics,
}

impl FirstPass {
    /// Run the first pass over a score-partwise document
    ///
    /// Only unreadable XML and non-partwise documents are errors; everything
    /// else is worked around and reported in `diagnostics()`.
    pub fn parse(xml: &str, settings: &FirstPassSettings) -> Result<FirstPass> {
        let doc = parse_document(xml)?;
        let root = get_score_partwise(&doc)?;

        let mut first_pass = FirstPass::default();
        let mut scanned = HashSet::new();

        for child in child_elements(root) {
            match child.tag_name().name() {
                "part-list" => first_pass.parse_part_list(child),
                "part" => first_pass.parse_part(child, settings, &mut scanned),
                _ => {}
            }
        }

        first_pass.measure_lengths = determine_measure_length(&first_pass.parts);

        log::info!(
            "first pass: {} parts, {} measures, {} diagnostics",
            first_pass.parts.len(),
            first_pass.measure_lengths.len(),
            first_pass.diagnostics.len()
        );

        Ok(first_pass)
    }

    /// Create the parts declared in `<part-list>`, in order
    fn parse_part_list(&mut self, part_list: Node) {
        for score_part in child_elements(part_list).filter(|n| n.has_tag_name("score-part")) {
            let id = score_part.attribute("id").unwrap_or("");
            let name = get_child_text(score_part, "part-name").unwrap_or("");
            self.parts.push(MusicXmlPart::new(id, name));
        }
    }

    fn parse_part(&mut self, part_node: Node, settings: &FirstPassSettings, scanned: &mut HashSet<String>) {
        let id = part_node.attribute("id").unwrap_or("").to_string();
        let mut scope = DiagnosticScope::for_part(id.clone());

        if !scanned.insert(id.clone()) {
            scope.report(
                DiagnosticSeverity::Warning,
                "duplicate_part",
                format!("part '{}' already read, skipped", id),
                Some(source_location(part_node)),
            );
            self.diagnostics.extend(scope.into_diagnostics());
            return;
        }

        let index = match self.parts.iter().position(|p| p.id() == id) {
            Some(index) => index,
            None => {
                scope.report(
                    DiagnosticSeverity::Warning,
                    "part_not_in_part_list",
                    format!("part '{}' not declared in part-list", id),
                    Some(source_location(part_node)),
                );
                self.parts.push(MusicXmlPart::new(id.as_str(), ""));
                self.parts.len() - 1
            }
        };

        scan_part(&mut self.parts[index], part_node, settings, &mut scope);
        self.diagnostics.extend(scope.into_diagnostics());
    }

    pub fn n_parts(&self) -> usize {
        self.parts.len()
    }

    pub fn parts(&self) -> &[MusicXmlPart] {
        &self.parts
    }

    pub fn part(&self, index: usize) -> Option<&MusicXmlPart> {
        self.parts.get(index)
    }

    pub fn part_by_id(&self, id: &str) -> Option<&MusicXmlPart> {
        self.parts.iter().find(|p| p.id() == id)
    }

    pub fn voice_list(&self, index: usize) -> Option<&VoiceList> {
        self.part(index).map(MusicXmlPart::voicelist)
    }

    pub fn voice_list_by_id(&self, id: &str) -> Option<&VoiceList> {
        self.part_by_id(id).map(MusicXmlPart::voicelist)
    }

    pub fn instrument_list(&self, id: &str) -> Option<&InstrumentList> {
        self.part_by_id(id).map(MusicXmlPart::instrument_list)
    }

    /// Document-wide measure durations, by measure index
    pub fn measure_lengths(&self) -> &[Rational] {
        &self.measure_lengths
    }

    pub fn measure_length(&self, index: usize) -> Option<Rational> {
        self.measure_lengths.get(index).copied()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Serializable summary of all results
    pub fn report(&self) -> FirstPassReport {
        FirstPassReport {
            parts: self.parts.iter().map(PartReport::from_part).collect(),
            measure_lengths: self
                .measure_lengths
                .iter()
                .map(|&d| DurationReport::from_duration(d))
                .collect(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

/// Longest duration of each measure index over all parts
///
/// The table is as long as the longest part; parts with fewer measures do
/// not contribute to the missing indices.
pub fn determine_measure_length(parts: &[MusicXmlPart]) -> Vec<Rational> {
    let n_measures = parts.iter().map(MusicXmlPart::n_measures).max().unwrap_or(0);

    (0..n_measures)
        .map(|i| {
            let mut max = zero();
            for duration in parts.iter().filter_map(|p| p.measure_duration(i)) {
                if duration > max {
                    max = duration;
                }
            }
            max
        })
        .collect()
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirstPassReport {
    pub parts: Vec<PartReport>,
    pub measure_lengths: Vec<DurationReport>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartReport {
    pub id: String,
    pub name: String,
    pub voices: Vec<VoiceReport>,
    pub measures: Vec<MeasureReport>,
    pub instruments: Vec<InstrumentChange>,
    /// Total octave shift changes, one list per staff
    pub octave_shifts: Vec<Vec<OctaveShiftChange>>,
}

impl PartReport {
    fn from_part(part: &MusicXmlPart) -> Self {
        Self {
            id: part.id().to_string(),
            name: part.name().to_string(),
            voices: part
                .voicelist()
                .iter()
                .map(|(id, desc)| VoiceReport {
                    id: id.to_string(),
                    overlaps: desc.overlaps(),
                    staff: desc.staff(),
                    voice: desc.voice(),
                    chord_rests: desc.chord_rests(),
                    staff_alloc: desc.staff_allocs(),
                    voices: desc.voices(),
                })
                .collect(),
            measures: part
                .measure_numbers()
                .iter()
                .zip(part.measure_durations())
                .map(|(number, &duration)| MeasureReport {
                    number: number.clone(),
                    duration: DurationReport::from_duration(duration),
                })
                .collect(),
            instruments: part
                .instrument_list()
                .iter()
                .map(|(&tick, id)| InstrumentChange {
                    tick: DurationReport::from_duration(tick),
                    instrument: id.clone(),
                })
                .collect(),
            octave_shifts: part
                .octave_shift_lists()
                .iter()
                .map(|shifts| {
                    shifts
                        .iter()
                        .map(|(&tick, &shift)| OctaveShiftChange {
                            tick: DurationReport::from_duration(tick),
                            shift,
                        })
                        .collect()
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceReport {
    pub id: String,
    pub overlaps: bool,
    /// Staff of a regular voice
    pub staff: StaffAssignment,
    /// Voice slot of a regular voice
    pub voice: Option<usize>,
    pub chord_rests: [usize; MAX_STAVES],
    /// Per-staff allocation of an overlapping voice
    pub staff_alloc: [StaffAllocation; MAX_STAVES],
    /// Per-staff voice slots of an overlapping voice
    pub voices: [Option<usize>; MAX_STAVES],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureReport {
    pub number: String,
    #[serde(flatten)]
    pub duration: DurationReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentChange {
    pub tick: DurationReport,
    pub instrument: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OctaveShiftChange {
    pub tick: DurationReport,
    /// Octaves in effect from `tick` on
    pub shift: i32,
}

/// A duration as "n/d" together with its length in ticks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DurationReport {
    pub duration: String,
    pub ticks: i64,
}

impl DurationReport {
    fn from_duration(duration: Rational) -> Self {
        Self {
            duration: describe(Some(duration)),
            ticks: duration.ticks(),
        }
    }
}
