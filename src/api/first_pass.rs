//! First pass entry point for JavaScript

use crate::api::helpers::{parse_settings, serialize};
use crate::musicxml_import::FirstPass;
use crate::{wasm_error, wasm_info, wasm_log};
use wasm_bindgen::prelude::*;

/// Run the MusicXML first pass
///
/// # Parameters
/// * `musicxml` - MusicXML score-partwise document as a string
/// * `settings_json` - Optional JSON string with settings (null for defaults)
///
/// # Returns
/// The first pass report as a JavaScript object:
/// - `parts`: per part id, name, voices, measures and instrument changes
/// - `measure_lengths`: the document-wide measure-length table
/// - `diagnostics`: everything the scan worked around
///
/// # Example Settings JSON
/// ```json
/// {
///   "fill_empty_measures": true,
///   "round_to_raster": true
/// }
/// ```
#[wasm_bindgen(js_name = analyzeMusicXML)]
pub fn analyze_musicxml(musicxml: String, settings_json: Option<String>) -> Result<JsValue, JsValue> {
    wasm_info!("analyzeMusicXML called");
    wasm_log!("  Input MusicXML: {} bytes", musicxml.len());

    let settings = parse_settings(settings_json.as_deref()).map_err(|e| {
        wasm_error!("{}", e);
        JsValue::from_str(&e)
    })?;

    let first_pass = FirstPass::parse(&musicxml, &settings).map_err(|e| {
        wasm_error!("First pass error: {}", e);
        JsValue::from_str(&format!("First pass error: {}", e))
    })?;

    let report = first_pass.report();
    wasm_log!(
        "  {} parts, {} measures, {} diagnostics",
        report.parts.len(),
        report.measure_lengths.len(),
        report.diagnostics.len()
    );
    wasm_info!("analyzeMusicXML completed successfully");

    serialize(&report, "Report serialization error")
}
