//! WASM build test
//!
//! This module tests that the WASM entry point can be called and returns a report.

#![cfg(target_arch = "wasm32")]

use musicxml_first_pass::api::analyze_musicxml;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const SIMPLE_SCORE: &str = r#"<?xml version="1.0"?>
<score-partwise version="3.1">
  <part-list>
    <score-part id="P1"><part-name>Piano</part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions></attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration><type>whole</type></note>
    </measure>
  </part>
</score-partwise>"#;

#[wasm_bindgen_test]
fn test_analyze_returns_object() {
    let result = analyze_musicxml(SIMPLE_SCORE.to_string(), None);
    assert!(result.is_ok());
    assert!(result.unwrap().is_object());
}

#[wasm_bindgen_test]
fn test_analyze_accepts_settings() {
    let settings = r#"{"round_to_raster": false}"#.to_string();
    let result = analyze_musicxml(SIMPLE_SCORE.to_string(), Some(settings));
    assert!(result.is_ok());
}

#[wasm_bindgen_test]
fn test_analyze_rejects_bad_settings() {
    let result = analyze_musicxml(SIMPLE_SCORE.to_string(), Some("not json".to_string()));
    assert!(result.is_err());
}

#[wasm_bindgen_test]
fn test_analyze_rejects_timewise() {
    let result = analyze_musicxml("<score-timewise/>".to_string(), None);
    let err = result.unwrap_err();
    assert_eq!(
        err.as_string().map(|s| s.starts_with("First pass error")),
        Some(true)
    );
}
