// Test: voice allocation under the per-staff capacity
//
// A staff holds at most four voices. The busiest voices win; the rest stay
// in the voice list marked as not allocated.

use musicxml_first_pass::musicxml_import::{run_first_pass, StaffAssignment, VOICES};

/// Single-staff part where each voice gets the given number of quarter notes
fn single_staff_score(voices: &[(&str, usize)]) -> String {
    let mut music = String::new();
    for (i, (voice, notes)) in voices.iter().enumerate() {
        if i > 0 {
            music.push_str(&format!("<backup><duration>{}</duration></backup>\n", voices[i - 1].1));
        }
        for _ in 0..*notes {
            music.push_str(&format!(
                "<note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration><voice>{}</voice><type>quarter</type></note>\n",
                voice
            ));
        }
    }

    format!(
        r#"<score-partwise version="3.1">
  <part-list><score-part id="P1"><part-name>Choir</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions><time><beats>4</beats><beat-type>4</beat-type></time></attributes>
      {}
    </measure>
  </part>
</score-partwise>"#,
        music
    )
}

#[test]
fn test_busiest_voices_get_the_slots() {
    let xml = single_staff_score(&[("1", 4), ("2", 3), ("3", 1), ("4", 2), ("5", 2)]);
    let fp = run_first_pass(&xml, None).unwrap();
    let voices = fp.voice_list(0).unwrap();

    assert_eq!(voices.len(), 5);
    assert_eq!(voices.get("3").unwrap().staff(), StaffAssignment::CapacityExhausted);
    assert_eq!(voices.get("3").unwrap().voice(), None);

    let slots: Vec<Option<usize>> = ["1", "2", "4", "5"]
        .iter()
        .map(|id| voices.get(id).unwrap().voice())
        .collect();
    assert_eq!(slots, vec![Some(0), Some(1), Some(2), Some(3)]);

    let allocated = voices
        .iter()
        .filter(|(_, v)| matches!(v.staff(), StaffAssignment::Staff(0)))
        .count();
    assert_eq!(allocated, VOICES);
}

#[test]
fn test_exhaustion_is_reported_once_per_voice() {
    let xml = single_staff_score(&[("1", 4), ("2", 3), ("3", 1), ("4", 2), ("5", 2)]);
    let fp = run_first_pass(&xml, None).unwrap();

    let marks: Vec<_> = fp.diagnostics().of_kind("voice_capacity_exhausted").collect();
    assert_eq!(marks.len(), 1);
    assert_eq!(marks[0].message, "voice '3' not allocated: staff 1 already holds 4 voices");
    assert_eq!(marks[0].part_id.as_deref(), Some("P1"));
    assert_eq!(marks[0].measure_number, None);
}

#[test]
fn test_equal_counts_follow_first_seen_order() {
    let xml = single_staff_score(&[("b", 1), ("a", 1), ("e", 1), ("c", 1), ("d", 1)]);
    let fp = run_first_pass(&xml, None).unwrap();
    let voices = fp.voice_list(0).unwrap();

    assert_eq!(voices.get("b").unwrap().voice(), Some(0));
    assert_eq!(voices.get("a").unwrap().voice(), Some(1));
    assert_eq!(voices.get("e").unwrap().voice(), Some(2));
    assert_eq!(voices.get("c").unwrap().voice(), Some(3));
    assert_eq!(voices.get("d").unwrap().staff(), StaffAssignment::CapacityExhausted);
}

#[test]
fn test_two_voices_share_a_staff() {
    let xml = single_staff_score(&[("1", 4), ("2", 3)]);
    let fp = run_first_pass(&xml, None).unwrap();
    let voices = fp.voice_list(0).unwrap();

    assert_eq!(voices.get("1").unwrap().voice(), Some(0));
    assert_eq!(voices.get("2").unwrap().voice(), Some(1));
    assert!(fp.diagnostics().is_empty());
}

#[test]
fn test_exhausted_voice_in_report() {
    let xml = single_staff_score(&[("1", 2), ("2", 2), ("3", 2), ("4", 2), ("5", 1)]);
    let fp = run_first_pass(&xml, None).unwrap();

    let json = serde_json::to_value(fp.report()).unwrap();
    let voice5 = &json["parts"][0]["voices"][4];
    assert_eq!(voice5["id"], "5");
    assert_eq!(voice5["staff"]["state"], "capacity_exhausted");
    assert!(voice5["voice"].is_null());
}
