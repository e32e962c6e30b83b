use magnet_manifest::ValidationError;
use miette::{Diagnostic, NamedSource, SourceOffset, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
#[error("Invalid manifest: {message}")]
#[diagnostic(
    code(magnet::manifest::invalid),
    help("Fix the manifest and generate the link again with `magnet link`.")
)]
pub struct ManifestDiagnostic {
    pub message: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("{label}")]
    pub span: SourceSpan,

    pub label: String,
}

impl ManifestDiagnostic {
    /// Point at the offending field (or syntax error) inside `source`
    pub fn new(origin: &str, source: &str, error: &ValidationError) -> Self {
        let (span, label) = match error {
            ValidationError::Syntax { line, column, .. } => (
                SourceSpan::new(SourceOffset::from_location(source, *line, *column), 1),
                "syntax error here".to_string(),
            ),
            ValidationError::Field { field, message } => {
                (field_span(source, field), message.clone())
            }
        };

        Self {
            message: error.to_string(),
            src: NamedSource::new(origin, source.to_string()),
            span,
            label,
        }
    }
}

// Last path segment, as a quoted key; the whole document when absent
fn field_span(source: &str, field: &str) -> SourceSpan {
    let segment = field.rsplit('.').next().unwrap_or(field);
    let key = segment.split('[').next().unwrap_or(segment);
    let needle = format!("\"{}\"", key);
    match source.find(&needle) {
        Some(offset) => SourceSpan::new(offset.into(), needle.len()),
        None => SourceSpan::new(SourceOffset::from(0), source.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_points_at_key() {
        let source = r#"{"name":"ab","command":"npx"}"#;
        let error = ValidationError::Field {
            field: "name".into(),
            message: "must be at least 3 characters".into(),
        };
        let diagnostic = ManifestDiagnostic::new("manifest.json", source, &error);

        assert_eq!(diagnostic.span.offset(), 1);
        assert_eq!(diagnostic.span.len(), "\"name\"".len());
        assert_eq!(diagnostic.label, "must be at least 3 characters");
    }

    #[test]
    fn test_nested_field_uses_last_segment() {
        let source = r#"{"env":{"TOKEN":{"type":"radio"}}}"#;
        let error = ValidationError::Field {
            field: "env.TOKEN".into(),
            message: "unknown type".into(),
        };
        let diagnostic = ManifestDiagnostic::new("link", source, &error);
        assert_eq!(diagnostic.span.offset(), source.find("\"TOKEN\"").unwrap());
    }

    #[test]
    fn test_indexed_field_points_at_array_key() {
        let source = r#"{"args":["-y",3]}"#;
        let error = ValidationError::Field {
            field: "args[1]".into(),
            message: "expected a string".into(),
        };
        let diagnostic = ManifestDiagnostic::new("link", source, &error);
        assert_eq!(diagnostic.span.offset(), 1);
    }

    #[test]
    fn test_missing_field_spans_document() {
        let source = r#"{"name":"slack"}"#;
        let error = ValidationError::Field {
            field: "command".into(),
            message: "is required".into(),
        };
        let diagnostic = ManifestDiagnostic::new("link", source, &error);
        assert_eq!(diagnostic.span.offset(), 0);
        assert_eq!(diagnostic.span.len(), source.len());
    }
}
