//! Rendering of recorded errors against the template source.

use std::fmt::Write as _;

use ariadne::{Config, Label, Report, ReportKind, Source};

use crate::errors::{Severity, TemplateError};

/// Format `errors` as annotated source snippets, one report per error.
///
/// Errors without a location (dummy span) are still reported, pointing at
/// the start of the source.
pub fn report(source: &str, name: &str, errors: &[TemplateError]) -> String {
    let mut out = String::new();
    let mut buf = Vec::new();
    for error in errors {
        let range = clamp(error.span.to_range(), source.len());
        let kind = match error.severity {
            Severity::Warning => ReportKind::Warning,
            Severity::Error | Severity::Fatal => ReportKind::Error,
        };
        buf.clear();
        let written = Report::build(kind, (name, range.clone()))
            .with_config(Config::default().with_color(false))
            .with_message(&error.message)
            .with_label(Label::new((name, range)).with_message(format!("{:?}", error.kind)))
            .finish()
            .write((name, Source::from(source)), &mut buf);
        match written {
            Ok(()) => out.push_str(&String::from_utf8_lossy(&buf)),
            Err(_) => {
                let _ = writeln!(out, "{error}");
            }
        }
    }
    out
}

fn clamp(range: std::ops::Range<usize>, len: usize) -> std::ops::Range<usize> {
    let start = range.start.min(len);
    let end = range.end.clamp(start, len);
    start..end
}
