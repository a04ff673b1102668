//! Note duration resolution
//!
//! A MusicXML note carries its length twice: as an explicit `<duration>` in
//! divisions, and implicitly through `<type>`, `<dot>` and
//! `<time-modification>`. Exporters get either one wrong often enough that
//! both are computed here and reconciled by the tick cursor.

use crate::diagnostics::{DiagnosticScope, DiagnosticSeverity};
use crate::musicxml_import::parser::{child_elements, get_text, parse_int, source_location};
use crate::musicxml_import::types::{describe, zero, Rational};
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul};
use roxmltree::Node;

/// Both duration signals of a single note
#[derive(Debug, Clone, PartialEq)]
pub struct NoteDuration {
    /// From `<duration>`; `None` if absent, unparsable, or divisions unknown
    pub specified: Option<Rational>,
    /// From type, dots and tuplet ratio (or the specified value for measure rests)
    pub calculated: Option<Rational>,
    /// Printable summary of both values
    pub description: String,
}

impl NoteDuration {
    /// Duration of chord members and grace notes
    pub fn zero() -> Self {
        Self {
            specified: Some(zero()),
            calculated: Some(zero()),
            description: String::new(),
        }
    }

    /// The value the cursor advances by: specified wins when valid
    pub fn effective(&self) -> Option<Rational> {
        self.specified.or(self.calculated)
    }
}

/// Convert a symbolic note type to its nominal duration
pub fn note_type_to_fraction(note_type: &str) -> Option<Rational> {
    let (n, d) = match note_type {
        "1024th" => (1, 1024),
        "512th" => (1, 512),
        "256th" => (1, 256),
        "128th" => (1, 128),
        "64th" => (1, 64),
        "32nd" => (1, 32),
        "16th" => (1, 16),
        "eighth" => (1, 8),
        "quarter" => (1, 4),
        "half" => (1, 2),
        "whole" => (1, 1),
        "breve" => (2, 1),
        "long" => (4, 1),
        "maxima" => (8, 1),
        _ => return None,
    };
    Some(Rational::new(n, d))
}

/// Duration implied by note type, dots and tuplet ratio
///
/// The tuplet ratio only applies when both `normal_notes` and
/// `actual_notes` are positive. `None` also when the result does not fit
/// a `Rational`.
pub fn calculate_fraction(
    note_type: &str,
    dots: u32,
    normal_notes: i64,
    actual_notes: i64,
) -> Option<Rational> {
    let base = note_type_to_fraction(note_type)?;

    let mut f = base;
    for i in 0..dots {
        let divisor = 2i64.checked_pow(i + 1)?;
        let dot = base.checked_div(&Rational::from_integer(divisor))?;
        f = f.checked_add(&dot)?;
    }

    if actual_notes > 0 && normal_notes > 0 {
        f = f.checked_mul(&Rational::new(normal_notes, actual_notes))?;
    }

    Some(f)
}

/// Value of a `<duration>` element in whole notes
///
/// `divisions` is the number of duration units per quarter note.
pub fn duration_as_fraction(divisions: Option<i64>, duration_node: Node) -> Option<Rational> {
    let divisions = divisions.filter(|&d| d > 0)?;
    let value = parse_int(get_text(duration_node)).filter(|&v| v >= 0)?;
    Some(Rational::new(value, divisions.checked_mul(4)?))
}

/// Read a `<duration>` element, reporting unparsable values
pub fn specified_duration(
    divisions: Option<i64>,
    duration_node: Node,
    scope: &mut DiagnosticScope,
) -> Option<Rational> {
    let text = get_text(duration_node);
    if !parse_int(text).is_some_and(|v| v >= 0) {
        scope.report(
            DiagnosticSeverity::Warning,
            "bad_number",
            format!("bad duration value: <{}>", text),
            Some(source_location(duration_node)),
        );
        return None;
    }
    duration_as_fraction(divisions, duration_node)
}

/// Determine both duration signals of a `<note>` element
///
/// Chord members and grace notes always have zero duration. Rests without
/// a type, and whole rests with a valid `<duration>`, are measure rests whose
/// real length only the specified duration knows.
pub fn note_duration(
    note: Node,
    divisions: Option<i64>,
    scope: &mut DiagnosticScope,
) -> NoteDuration {
    let mut actual_notes = 0i64;
    let mut normal_notes = 0i64;
    let mut chord = false;
    let mut grace = false;
    let mut rest = false;
    let mut dots = 0u32;
    let mut note_type = "";
    let mut specified = None;

    for child in child_elements(note) {
        match child.tag_name().name() {
            "chord" => chord = true,
            "dot" => dots += 1,
            "duration" => specified = specified_duration(divisions, child, scope),
            "grace" => grace = true,
            "rest" => rest = true,
            "time-modification" => {
                for tm in child_elements(child) {
                    match tm.tag_name().name() {
                        "actual-notes" => actual_notes = tuplet_number(tm, scope),
                        "normal-notes" => normal_notes = tuplet_number(tm, scope),
                        _ => {}
                    }
                }
            }
            "type" => note_type = get_text(child).trim(),
            _ => {}
        }
    }

    if chord || grace {
        return NoteDuration::zero();
    }

    let from_type = calculate_fraction(note_type, dots, normal_notes, actual_notes);

    let mut description = format!(
        "dur {} calcdur '{}{}",
        describe(specified),
        describe(note_type_to_fraction(note_type)),
        ".".repeat(dots as usize)
    );
    if actual_notes != 0 || normal_notes != 0 {
        description.push_str(&format!(" norm/act {}/{}", normal_notes, actual_notes));
    }
    description.push_str(&format!(" -> {}'", describe(from_type)));

    let calculated = if rest && note_type.is_empty() {
        specified
    } else if rest && note_type == "whole" && specified.is_some() {
        specified
    } else {
        from_type
    };

    NoteDuration {
        specified,
        calculated,
        description,
    }
}

/// Parse `<actual-notes>` / `<normal-notes>`, 0 meaning unset
fn tuplet_number(node: Node, scope: &mut DiagnosticScope) -> i64 {
    match parse_int(get_text(node)) {
        Some(n) => n,
        None => {
            scope.report(
                DiagnosticSeverity::Warning,
                "bad_number",
                format!("bad {} value: <{}>", node.tag_name().name(), get_text(node)),
                Some(source_location(node)),
            );
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::musicxml_import::parser::parse_document;

    fn resolve(xml: &str, divisions: Option<i64>) -> (NoteDuration, DiagnosticScope) {
        let doc = parse_document(xml).unwrap();
        let mut scope = DiagnosticScope::new();
        let d = note_duration(doc.root_element(), divisions, &mut scope);
        (d, scope)
    }

    #[test]
    fn test_note_type_table() {
        assert_eq!(note_type_to_fraction("quarter"), Some(Rational::new(1, 4)));
        assert_eq!(note_type_to_fraction("breve"), Some(Rational::new(2, 1)));
        assert_eq!(note_type_to_fraction("1024th"), Some(Rational::new(1, 1024)));
        assert_eq!(note_type_to_fraction("crotchet"), None);
        assert_eq!(note_type_to_fraction(""), None);
    }

    #[test]
    fn test_calculate_fraction_dots_and_tuplets() {
        assert_eq!(calculate_fraction("quarter", 1, 0, 0), Some(Rational::new(3, 8)));
        assert_eq!(calculate_fraction("half", 2, 0, 0), Some(Rational::new(7, 8)));
        assert_eq!(calculate_fraction("eighth", 0, 2, 3), Some(Rational::new(1, 12)));
        // only one half of the ratio present: ignored
        assert_eq!(calculate_fraction("eighth", 0, 0, 3), Some(Rational::new(1, 8)));
        assert_eq!(calculate_fraction("bogus", 1, 2, 3), None);
    }

    #[test]
    fn test_calculate_fraction_out_of_range() {
        assert_eq!(calculate_fraction("quarter", 64, 0, 0), None);
        assert_eq!(calculate_fraction("maxima", 0, i64::MAX, 1), None);
        // large but reducible ratios are fine
        assert_eq!(
            calculate_fraction("quarter", 0, i64::MAX, i64::MAX),
            Some(Rational::new(1, 4))
        );
    }

    #[test]
    fn test_duration_out_of_range_is_invalid() {
        let (d, _) = resolve(
            "<note><duration>1</duration><type>quarter</type></note>",
            Some(i64::MAX),
        );
        assert_eq!(d.specified, None);
        assert_eq!(d.calculated, Some(Rational::new(1, 4)));

        let (d, scope) = resolve("<note><duration>-4</duration><type>quarter</type></note>", Some(4));
        assert_eq!(d.specified, None);
        assert!(scope.diagnostics().has_kind("bad_number"));
    }

    #[test]
    fn test_specified_and_calculated_agree() {
        let (d, scope) = resolve(
            "<note><pitch><step>C</step><octave>4</octave></pitch><duration>2</duration><type>quarter</type></note>",
            Some(2),
        );
        assert_eq!(d.specified, Some(Rational::new(1, 4)));
        assert_eq!(d.calculated, Some(Rational::new(1, 4)));
        assert_eq!(d.description, "dur 1/4 calcdur '1/4 -> 1/4'");
        assert!(scope.diagnostics().is_empty());
    }

    #[test]
    fn test_chord_and_grace_are_zero() {
        let (chord, _) = resolve("<note><chord/><duration>4</duration><type>quarter</type></note>", Some(4));
        assert_eq!(chord, NoteDuration::zero());

        let (grace, _) = resolve("<note><grace/><type>eighth</type></note>", Some(4));
        assert_eq!(grace.effective(), Some(zero()));
    }

    #[test]
    fn test_typeless_rest_uses_specified_duration() {
        let (d, _) = resolve("<note><rest/><duration>12</duration></note>", Some(4));
        assert_eq!(d.specified, Some(Rational::new(3, 4)));
        assert_eq!(d.calculated, Some(Rational::new(3, 4)));
    }

    #[test]
    fn test_whole_rest_with_duration_uses_specified_duration() {
        // a whole-measure rest in 3/4 typed "whole"
        let (d, _) = resolve("<note><rest/><duration>3</duration><type>whole</type></note>", Some(1));
        assert_eq!(d.calculated, Some(Rational::new(3, 4)));
    }

    #[test]
    fn test_unknown_divisions_leaves_specified_invalid() {
        let (d, _) = resolve("<note><duration>2</duration><type>half</type></note>", None);
        assert_eq!(d.specified, None);
        assert_eq!(d.calculated, Some(Rational::new(1, 2)));
        assert_eq!(d.effective(), Some(Rational::new(1, 2)));
    }

    #[test]
    fn test_tuplet_description() {
        let (d, _) = resolve(
            "<note><duration>1</duration><type>eighth</type><time-modification><actual-notes>3</actual-notes><normal-notes>2</normal-notes></time-modification></note>",
            Some(3),
        );
        assert_eq!(d.calculated, Some(Rational::new(1, 12)));
        assert_eq!(d.specified, Some(Rational::new(1, 12)));
        assert_eq!(d.description, "dur 1/12 calcdur '1/8 norm/act 2/3 -> 1/12'");
    }

    #[test]
    fn test_bad_tuplet_number_is_reported_and_unset() {
        let (d, scope) = resolve(
            "<note><type>eighth</type><time-modification><actual-notes>three</actual-notes><normal-notes>2</normal-notes></time-modification></note>",
            Some(3),
        );
        assert_eq!(d.calculated, Some(Rational::new(1, 8)));
        assert!(scope.diagnostics().has_kind("bad_number"));
    }

    #[test]
    fn test_bad_duration_value_is_reported() {
        let (d, scope) = resolve("<note><duration>x</duration><type>quarter</type></note>", Some(4));
        assert_eq!(d.specified, None);
        assert_eq!(d.calculated, Some(Rational::new(1, 4)));
        assert_eq!(scope.diagnostics().of_kind("bad_number").count(), 1);
    }
}
