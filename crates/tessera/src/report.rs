//! Adapters rendering [`TesseraError`]s as miette diagnostics.
//!
//! Analyzer diagnostics carry line/column locations. When the text of the
//! source they point into is supplied, labels become source spans and miette
//! renders the offending snippet; labels in other sources are dropped.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use tessera_analyzer::Diagnostic;
use tessera_core::location::SourceLocation;

use crate::TesseraError;

/// A named source text that labels can point into.
#[derive(Debug, Clone, Copy)]
pub struct Source<'a> {
    name: &'a str,
    text: &'a str,
}

impl<'a> Source<'a> {
    /// `name` must match the source name used in item locations.
    pub fn new(name: &'a str, text: &'a str) -> Self {
        Self { name, text }
    }
}

/// Adapter for a single analyzer diagnostic.
pub struct DiagnosticAdapter<'a> {
    diag: &'a Diagnostic,
    source: Option<Source<'a>>,
}

impl<'a> DiagnosticAdapter<'a> {
    pub fn new(diag: &'a Diagnostic, source: Option<Source<'a>>) -> Self {
        Self { diag, source }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diag.message())
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.diag.code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source
            .as_ref()
            .map(|source| &source.text as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let source = self.source?;
        let labels: Vec<LabeledSpan> = self
            .diag
            .labels()
            .iter()
            .filter(|label| label.location().source() == source.name)
            .filter_map(|label| {
                let span = location_to_miette(source.text, label.location())?;
                let message = Some(label.message().to_string());
                Some(if label.is_primary() {
                    LabeledSpan::new_primary_with_span(message, span)
                } else {
                    LabeledSpan::new_with_span(message, span)
                })
            })
            .collect();
        if labels.is_empty() {
            return None;
        }
        Some(Box::new(labels.into_iter()))
    }
}

/// Adapter for [`TesseraError`] variants without a diagnostic.
pub struct ErrorAdapter<'a>(pub &'a TesseraError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            TesseraError::Io(_) => "tessera::io",
            TesseraError::Config(_) => "tessera::config",
            TesseraError::Analysis(_) => "tessera::analysis",
        };
        Some(Box::new(code))
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// An analyzer diagnostic with source locations.
    Diagnostic(DiagnosticAdapter<'a>),
    /// An error without source locations.
    Error(ErrorAdapter<'a>),
}

impl<'a> Reportable<'a> {
    /// Wrap an error, pointing labels into `source` when given.
    pub fn new(err: &'a TesseraError, source: Option<Source<'a>>) -> Self {
        match err {
            TesseraError::Analysis(diag) => {
                Reportable::Diagnostic(DiagnosticAdapter::new(diag, source))
            }
            other => Reportable::Error(ErrorAdapter(other)),
        }
    }
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

/// Convert a 1-based line/column location into a span over the identifier
/// starting there. `None` when the location lies outside `text`.
fn location_to_miette(text: &str, location: &SourceLocation) -> Option<SourceSpan> {
    let line_index = usize::try_from(location.line().checked_sub(1)?).ok()?;
    let column = usize::try_from(location.column().saturating_sub(1)).ok()?;

    let mut line_start = 0;
    for (index, line) in text.split_inclusive('\n').enumerate() {
        if index == line_index {
            let offset = line.char_indices().nth(column).map(|(i, _)| i)?;
            let rest = &line[offset..];
            let len = rest
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            return Some(SourceSpan::new((line_start + offset).into(), len));
        }
        line_start += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use tessera_analyzer::ErrorKind;

    use super::*;

    const SOURCE: &str = "object Person {\n    id: int;\n    id: string;\n}\n";

    fn duplicate() -> Diagnostic {
        Diagnostic::at(
            ErrorKind::DuplicateName { name: "id".into() },
            &SourceLocation::new("person.tsr", 3, 5),
            "duplicate declaration",
        )
        .with_secondary_label(SourceLocation::new("person.tsr", 2, 5), "first declared here")
    }

    #[test]
    fn test_location_to_miette() {
        let span = location_to_miette(SOURCE, &SourceLocation::new("person.tsr", 3, 5)).unwrap();
        assert_eq!(&SOURCE[span.offset()..span.offset() + span.len()], "id");

        assert!(location_to_miette(SOURCE, &SourceLocation::new("person.tsr", 9, 1)).is_none());
        assert!(location_to_miette(SOURCE, &SourceLocation::default()).is_none());
    }

    #[test]
    fn test_labels_map_into_source() {
        let diag = duplicate();
        let adapter = DiagnosticAdapter::new(&diag, Some(Source::new("person.tsr", SOURCE)));

        let labels: Vec<LabeledSpan> = adapter.labels().unwrap().collect();
        assert_eq!(labels.len(), 2);
        assert!(labels[0].primary());
        assert_eq!(labels[1].label(), Some("first declared here"));
        assert_eq!(adapter.code().unwrap().to_string(), "E201");
    }

    #[test]
    fn test_labels_in_other_sources_are_dropped() {
        let diag = duplicate();
        let adapter = DiagnosticAdapter::new(&diag, Some(Source::new("other.tsr", SOURCE)));
        assert!(adapter.labels().is_none());

        let adapter = DiagnosticAdapter::new(&diag, None);
        assert!(adapter.labels().is_none());
        assert!(adapter.source_code().is_none());
    }

    #[test]
    fn test_render_report() {
        let err = TesseraError::from(duplicate());
        let report = Reportable::new(&err, Some(Source::new("person.tsr", SOURCE)));

        let mut out = String::new();
        miette::GraphicalReportHandler::new_themed(miette::GraphicalTheme::unicode_nocolor())
            .render_report(&mut out, &report)
            .unwrap();
        assert!(out.contains("first declared here"));
        assert!(out.contains("duplicate declaration"));
    }

    #[test]
    fn test_plain_errors() {
        let err = TesseraError::Config("bad".into());
        let report = Reportable::new(&err, None);
        assert!(matches!(report, Reportable::Error(_)));
        assert_eq!(report.code().unwrap().to_string(), "tessera::config");
    }
}
