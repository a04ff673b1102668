//! Diagnostics collected during a MusicXML scan
//!
//! The first pass never aborts on questionable input. Every anomaly it
//! works around is recorded here, in document order, and handed back to
//! the caller together with the results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level of a diagnostic
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Info => write!(f, "info"),
        }
    }
}

/// Where in the input a diagnostic was raised
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    /// Ancestor tag names from the root, joined with ':'
    pub path: String,
    /// Tag name of the offending element
    pub tag: String,
    /// 1-based line number
    pub line: u32,
    /// 1-based column number
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line:{} col:{} {}: <{}>", self.line, self.column, self.path, self.tag)
    }
}

/// A single diagnostic record
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    /// Kind identifier (e.g., "backup_beyond_start", "duration_mismatch")
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// Part in which the diagnostic was raised
    pub part_id: Option<String>,
    /// Measure number attribute of the enclosing measure
    pub measure_number: Option<String>,
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn new(
        severity: DiagnosticSeverity,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind: kind.into(),
            message: message.into(),
            part_id: None,
            measure_number: None,
            location: None,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn in_part(mut self, part_id: impl Into<String>) -> Self {
        self.part_id = Some(part_id.into());
        self
    }

    pub fn in_measure(mut self, measure_number: impl Into<String>) -> Self {
        self.measure_number = Some(measure_number.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.severity, self.kind)?;
        if let Some(part_id) = &self.part_id {
            write!(f, " part {}", part_id)?;
        }
        if let Some(measure) = &self.measure_number {
            write!(f, " measure {}", measure)?;
        }
        if let Some(location) = &self.location {
            write!(f, " {}", location)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Ordered collection of diagnostics for one scan
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub marks: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { marks: Vec::new() }
    }

    pub fn add(&mut self, mark: Diagnostic) {
        self.marks.push(mark);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.marks.extend(other.marks);
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.marks.iter()
    }

    /// All diagnostics of the given kind
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.marks.iter().filter(move |m| m.kind == kind)
    }

    pub fn has_kind(&self, kind: &str) -> bool {
        self.marks.iter().any(|m| m.kind == kind)
    }

    pub fn count_by_severity(&self, severity: DiagnosticSeverity) -> usize {
        self.marks.iter().filter(|m| m.severity == severity).count()
    }
}

/// Diagnostics for one part scan, stamped with the part and current measure
#[derive(Debug, Clone, Default)]
pub struct DiagnosticScope {
    part_id: Option<String>,
    measure_number: Option<String>,
    diagnostics: Diagnostics,
}

impl DiagnosticScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_part(part_id: impl Into<String>) -> Self {
        Self {
            part_id: Some(part_id.into()),
            ..Self::default()
        }
    }

    pub fn set_measure(&mut self, measure_number: Option<String>) {
        self.measure_number = measure_number;
    }

    pub fn report(
        &mut self,
        severity: DiagnosticSeverity,
        kind: &str,
        message: impl Into<String>,
        location: Option<SourceLocation>,
    ) {
        let mut mark = Diagnostic::new(severity, kind, message);
        mark.part_id = self.part_id.clone();
        mark.measure_number = self.measure_number.clone();
        mark.location = location;
        self.diagnostics.add(mark);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }
}
