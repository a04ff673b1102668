//! Per-part scan
//!
//! Walks the measures of one `<part>` once, in document order, and records:
//! - chord/rest counts and overlap flags per voice, then staff and voice slots
//! - the effective duration of every measure
//! - instrument changes and octave shifts over time

use crate::diagnostics::{DiagnosticScope, DiagnosticSeverity};
use crate::musicxml_import::allocator::{allocate_staves, allocate_voices};
use crate::musicxml_import::duration::{note_duration, specified_duration};
use crate::musicxml_import::interval_map::{
    InstrumentList, InstrumentListBuilder, OctaveShiftBuilder, OctaveShiftList,
};
use crate::musicxml_import::overlap::VoiceOverlapDetector;
use crate::musicxml_import::parser::{child_elements, get_child, get_child_text, get_text, parse_int, source_location};
use crate::musicxml_import::tick_cursor::{CursorIssue, TickCursor};
use crate::musicxml_import::types::{
    describe, from_ticks, zero, FirstPassSettings, Rational, Ticks, TimeSig, MAX_STAVES, RASTER_TICKS,
};
use crate::musicxml_import::voice::VoiceList;
use num_traits::CheckedSub;
use roxmltree::Node;
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// MEASURE CONTEXT
// ============================================================================

/// Attribute state in effect for the elements being scanned
///
/// Set by `<attributes>` and carried into later measures until changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureContext {
    /// Duration units per quarter note; `None` until a valid `<divisions>` is seen
    pub divisions: Option<i64>,
    pub staves: usize,
    pub time_sig: Option<TimeSig>,
}

impl Default for MeasureContext {
    fn default() -> Self {
        Self {
            divisions: None,
            staves: 1,
            time_sig: None,
        }
    }
}

impl MeasureContext {
    /// Context after an `<attributes>` element
    pub fn apply_attributes(&self, attributes: Node, scope: &mut DiagnosticScope) -> MeasureContext {
        let mut next = *self;

        for child in child_elements(attributes) {
            match child.tag_name().name() {
                "divisions" => {
                    next.divisions = parse_int(get_text(child)).filter(|&d| d > 0);
                    if next.divisions.is_none() {
                        report_bad_number(scope, child);
                    }
                }
                "staves" => {
                    next.staves = match parse_int(get_text(child)) {
                        Some(n) if n > 0 => n as usize,
                        _ => {
                            report_bad_number(scope, child);
                            1
                        }
                    };
                }
                "time" => {
                    if let Some(time_sig) = parse_time(child, scope) {
                        next.time_sig = Some(time_sig);
                    }
                }
                _ => {}
            }
        }

        next
    }
}

/// Time signature of a `<time>` element
///
/// `None` for senza-misura and for signatures that cannot be derived; the
/// latter are reported.
fn parse_time(time: Node, scope: &mut DiagnosticScope) -> Option<TimeSig> {
    let mut beats = "";
    let mut beat_type = "";

    for child in child_elements(time) {
        match child.tag_name().name() {
            "beats" => beats = get_text(child).trim(),
            "beat-type" => beat_type = get_text(child).trim(),
            "senza-misura" => {}
            _ => report_unknown_element(scope, child),
        }
    }

    if beats.is_empty() || beat_type.is_empty() {
        return None;
    }

    let time_sig = TimeSig::determine(beats, beat_type, "");
    if time_sig.is_none() {
        scope.report(
            DiagnosticSeverity::Warning,
            "bad_time_signature",
            format!("bad time signature: beats <{}> beat-type <{}>", beats, beat_type),
            Some(source_location(time)),
        );
    }
    time_sig
}

fn report_bad_number(scope: &mut DiagnosticScope, node: Node) {
    scope.report(
        DiagnosticSeverity::Warning,
        "bad_number",
        format!("bad {} value: <{}>", node.tag_name().name(), get_text(node)),
        Some(source_location(node)),
    );
}

fn report_unknown_element(scope: &mut DiagnosticScope, node: Node) {
    scope.report(
        DiagnosticSeverity::Warning,
        "unknown_element",
        "unexpected element",
        Some(source_location(node)),
    );
}

fn report_cursor_issue(scope: &mut DiagnosticScope, issue: CursorIssue, node: Node) {
    scope.report(
        issue.severity(),
        issue.kind(),
        issue.to_string(),
        Some(source_location(node)),
    );
}

// ============================================================================
// PART
// ============================================================================

/// First-pass results for one part
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MusicXmlPart {
    id: String,
    name: String,
    voicelist: VoiceList,
    measure_numbers: Vec<String>,
    measure_durations: Vec<Rational>,
    instruments: InstrumentList,
    octave_shifts: [OctaveShiftList; MAX_STAVES],
}

impl MusicXmlPart {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn voicelist(&self) -> &VoiceList {
        &self.voicelist
    }

    pub fn measure_numbers(&self) -> &[String] {
        &self.measure_numbers
    }

    pub fn measure_durations(&self) -> &[Rational] {
        &self.measure_durations
    }

    /// Duration of the measure at `index`, `None` past the last measure
    pub fn measure_duration(&self, index: usize) -> Option<Rational> {
        self.measure_durations.get(index).copied()
    }

    pub fn n_measures(&self) -> usize {
        self.measure_durations.len()
    }

    pub fn instrument_list(&self) -> &InstrumentList {
        &self.instruments
    }

    /// Instrument in effect at `tick`, empty if none
    pub fn instrument(&self, tick: Rational) -> &str {
        self.instruments.instrument(tick)
    }

    /// Octave shift totals of every staff, indexed by staff
    pub fn octave_shift_lists(&self) -> &[OctaveShiftList] {
        &self.octave_shifts
    }

    /// Total octave shift on `staff` at `tick`
    ///
    /// Out-of-range staves and negative ticks give 0.
    pub fn octave_shift(&self, staff: usize, tick: Rational) -> i32 {
        if tick < zero() {
            return 0;
        }
        self.octave_shifts
            .get(staff)
            .map_or(0, |shifts| shifts.octave_shift(tick))
    }

    fn add_measure_number_and_duration(&mut self, number: String, duration: Rational) {
        self.measure_numbers.push(number);
        self.measure_durations.push(duration);
    }
}

impl fmt::Display for MusicXmlPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "part id '{}' name '{}'", self.id, self.name)?;
        for (id, desc) in self.voicelist.iter() {
            writeln!(f, "voice '{}' map staff data {}", id, desc)?;
        }
        for (i, (number, duration)) in self
            .measure_numbers
            .iter()
            .zip(&self.measure_durations)
            .enumerate()
        {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "measure {} duration {} ({})",
                number,
                describe(Some(*duration)),
                duration.ticks()
            )?;
        }
        Ok(())
    }
}

// ============================================================================
// MEASURE DURATION
// ============================================================================

/// Express `length` with a denominator of at least `beat_type`
///
/// Numerator and denominator are doubled, without reduction, so that a full
/// 4/4 measure reads 4/4 rather than 1/1. Doubling stops before either
/// leaves the `i64` range.
pub fn measure_duration_as_fraction(length: Rational, beat_type: Option<i64>) -> Rational {
    let Some(beat_type) = beat_type.filter(|&b| b > 0) else {
        return length;
    };

    let mut numer = *length.numer();
    let mut denom = *length.denom();
    while denom < beat_type {
        match (numer.checked_mul(2), denom.checked_mul(2)) {
            (Some(n), Some(d)) => {
                numer = n;
                denom = d;
            }
            _ => break,
        }
    }
    Rational::new_raw(numer, denom)
}

/// Final duration of a measure from its raw length
///
/// Zero-length measures take the time signature length, and lengths are
/// rounded up to the 1/64 raster.
pub fn finalize_measure_duration(
    raw: Rational,
    time_sig: Option<TimeSig>,
    settings: &FirstPassSettings,
) -> Rational {
    let mut duration = raw;

    if duration == zero() && settings.fill_empty_measures {
        if let Some(time_sig) = time_sig {
            duration = from_ticks(time_sig.ticks());
        }
    }

    if settings.round_to_raster {
        let length = duration.ticks();
        if length % RASTER_TICKS != 0 {
            let rounded = (length / RASTER_TICKS).saturating_add(1).saturating_mul(RASTER_TICKS);
            duration = from_ticks(rounded);
        } else {
            duration = from_ticks(length);
        }
    }

    measure_duration_as_fraction(duration, time_sig.map(|t| t.beat_type))
}

// ============================================================================
// SCAN
// ============================================================================

/// State carried across the measures of one part scan
struct PartScanContext<'s> {
    settings: &'s FirstPassSettings,
    attributes: MeasureContext,
    cursor: TickCursor,
    overlaps: VoiceOverlapDetector,
    instruments: InstrumentListBuilder,
    octave_shifts: [OctaveShiftBuilder; MAX_STAVES],
    /// Open octave shifts by (staff, number)
    open_shifts: HashMap<(usize, String), i32>,
}

impl<'s> PartScanContext<'s> {
    fn new(settings: &'s FirstPassSettings) -> Self {
        Self {
            settings,
            attributes: MeasureContext::default(),
            cursor: TickCursor::new(),
            overlaps: VoiceOverlapDetector::new(),
            instruments: InstrumentListBuilder::new(),
            octave_shifts: Default::default(),
            open_shifts: HashMap::new(),
        }
    }
}

/// Scan a `<part>` element into `part`
///
/// Runs staff and voice allocation once all measures are seen; `part` is
/// complete afterwards.
pub fn scan_part(
    part: &mut MusicXmlPart,
    part_node: Node,
    settings: &FirstPassSettings,
    scope: &mut DiagnosticScope,
) {
    log::debug!("first pass: scanning part '{}'", part.id);
    let mut context = PartScanContext::new(settings);

    for measure in child_elements(part_node).filter(|n| n.has_tag_name("measure")) {
        scan_measure(part, measure, &mut context, scope);
    }
    scope.set_measure(None);

    allocate_staves(&mut part.voicelist, scope);
    allocate_voices(&mut part.voicelist);

    let PartScanContext {
        instruments,
        octave_shifts,
        ..
    } = context;
    part.instruments = instruments.finish();
    part.octave_shifts = octave_shifts.map(OctaveShiftBuilder::finish);

    log::debug!(
        "first pass: part '{}' has {} measures and {} voices",
        part.id,
        part.n_measures(),
        part.voicelist.len()
    );
}

fn scan_measure(
    part: &mut MusicXmlPart,
    measure: Node,
    context: &mut PartScanContext,
    scope: &mut DiagnosticScope,
) {
    let number = measure.attribute("number").unwrap_or("").to_string();
    scope.set_measure(Some(number.clone()));

    let measure_start = context.cursor.tick();
    context.overlaps.new_measure();

    for child in child_elements(measure) {
        match child.tag_name().name() {
            "attributes" => {
                context.attributes = context.attributes.apply_attributes(child, scope);
            }
            "note" => scan_note(part, child, context, scope),
            "forward" | "backup" => scan_move(child, context, scope),
            "direction" => scan_direction(child, context, scope),
            _ => {}
        }
    }

    for (id, desc) in part.voicelist.iter_mut() {
        if context.overlaps.staves_overlap(id) {
            desc.set_overlap();
        }
    }

    let raw = context
        .cursor
        .max_tick()
        .checked_sub(&measure_start)
        .unwrap_or_else(|| {
            from_ticks(context.cursor.max_tick().ticks().saturating_sub(measure_start.ticks()))
        });
    let duration = finalize_measure_duration(raw, context.attributes.time_sig, context.settings);
    log::debug!(
        "measure {} duration {} ({})",
        number,
        describe(Some(duration)),
        duration.ticks()
    );
    part.add_measure_number_and_duration(number, duration);

    context.cursor.close_measure();
}

fn scan_note(
    part: &mut MusicXmlPart,
    note: Node,
    context: &mut PartScanContext,
    scope: &mut DiagnosticScope,
) {
    let mut chord = false;
    let mut grace = false;
    let mut voice = "1".to_string();
    let mut staff = 0i64;
    let mut instrument = "";

    for child in child_elements(note) {
        match child.tag_name().name() {
            "chord" => chord = true,
            "grace" => grace = true,
            "voice" => voice = get_text(child).trim().to_string(),
            "staff" => match parse_int(get_text(child)) {
                Some(n) => staff = n.saturating_sub(1),
                None => report_bad_number(scope, child),
            },
            "instrument" => instrument = child.attribute("id").unwrap_or(""),
            _ => {}
        }
    }

    // only the first note of a chord counts
    if chord {
        return;
    }

    let tick = context.cursor.tick();
    if context.instruments.instrument(tick) != instrument {
        if let Err(duplicate) = context.instruments.set_instrument(instrument, tick) {
            scope.report(
                DiagnosticSeverity::Warning,
                "duplicate_instrument",
                duplicate.to_string(),
                Some(source_location(note)),
            );
        }
    }

    // single-staff parts sometimes claim staff 2
    let staff = if staff >= 0 && (staff as usize) < context.attributes.staves {
        staff as usize
    } else {
        0
    };

    if staff < MAX_STAVES {
        part.voicelist.get_or_insert(&voice).incr_chord_rests(staff);
    }

    if grace {
        return;
    }

    let start = context.cursor.tick();
    let duration = note_duration(note, context.attributes.divisions, scope);
    if let Some(issue) = context.cursor.note(&duration) {
        report_cursor_issue(scope, issue, note);
    }
    context
        .overlaps
        .add_note(start.ticks(), context.cursor.tick().ticks(), &voice, staff);
}

/// Handle `<forward>` and `<backup>`
fn scan_move(node: Node, context: &mut PartScanContext, scope: &mut DiagnosticScope) {
    let forward = node.has_tag_name("forward");

    if context.attributes.divisions.is_none() {
        scope.report(
            DiagnosticSeverity::Info,
            "divisions_unknown",
            format!("{} ignored: divisions not known", node.tag_name().name()),
            Some(source_location(node)),
        );
        return;
    }

    for child in child_elements(node) {
        match child.tag_name().name() {
            "duration" => {
                let Some(duration) = specified_duration(context.attributes.divisions, child, scope) else {
                    continue;
                };
                let moved = if forward {
                    context.cursor.forward(duration)
                } else {
                    context.cursor.backup(duration)
                };
                if let Err(issue) = moved {
                    report_cursor_issue(scope, issue, node);
                }
            }
            "voice" | "staff" if forward => {}
            _ => report_unknown_element(scope, child),
        }
    }
}

/// Record the octave shifts of a `<direction>`
fn scan_direction(direction: Node, context: &mut PartScanContext, scope: &mut DiagnosticScope) {
    let staff = match get_child_text(direction, "staff").map(parse_int) {
        None => 0,
        Some(Some(n)) if n >= 1 => (n - 1) as usize,
        Some(_) => {
            if let Some(node) = get_child(direction, "staff") {
                report_bad_number(scope, node);
            }
            return;
        }
    };
    let tick = context.cursor.tick();

    for direction_type in child_elements(direction).filter(|n| n.has_tag_name("direction-type")) {
        for shift in child_elements(direction_type).filter(|n| n.has_tag_name("octave-shift")) {
            scan_octave_shift(shift, staff, tick, context, scope);
        }
    }
}

fn scan_octave_shift(
    shift: Node,
    staff: usize,
    tick: Rational,
    context: &mut PartScanContext,
    scope: &mut DiagnosticScope,
) {
    if staff >= MAX_STAVES || tick < zero() {
        return;
    }

    let number = shift.attribute("number").unwrap_or("1").to_string();
    let kind = shift.attribute("type").unwrap_or("");

    match kind {
        "up" | "down" => {
            let size = shift.attribute("size").map_or(Some(8), parse_int);
            let octaves = match size {
                Some(size @ (8 | 15 | 22)) => ((size - 1) / 7) as i32,
                _ => {
                    scope.report(
                        DiagnosticSeverity::Warning,
                        "bad_octave_shift",
                        format!("unsupported octave-shift size <{}>", shift.attribute("size").unwrap_or("")),
                        Some(source_location(shift)),
                    );
                    return;
                }
            };
            // type "down" means notes are written lower than they sound
            let delta = if kind == "down" { octaves } else { -octaves };
            context.octave_shifts[staff].add_octave_shift(delta, tick);
            context.open_shifts.insert((staff, number), delta);
        }
        "stop" => match context.open_shifts.remove(&(staff, number)) {
            Some(delta) => context.octave_shifts[staff].add_octave_shift(-delta, tick),
            None => scope.report(
                DiagnosticSeverity::Warning,
                "bad_octave_shift",
                "octave-shift stop without matching start",
                Some(source_location(shift)),
            ),
        },
        "continue" => {}
        _ => scope.report(
            DiagnosticSeverity::Warning,
            "bad_octave_shift",
            format!("unknown octave-shift type <{}>", kind),
            Some(source_location(shift)),
        ),
    }
}
