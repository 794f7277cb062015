//! Multipart forms posted to BOCA team pages.

use std::path::{Path, PathBuf};

use mime_guess::Mime;
use reqwest::multipart::{Form, Part};

use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldValue {
    Text(String),
    File(PathBuf),
}

/// Ordered multipart form fields. File parts are read when the form is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    fields: Vec<(String, FieldValue)>,
}

impl UploadForm {
    /// Creates an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), FieldValue::Text(value.into())));
        self
    }

    /// Appends a file field; the file name sent is the path's last component.
    #[must_use]
    pub fn file(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.fields.push((name.into(), FieldValue::File(path.into())));
        self
    }

    /// Field names in submission order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Value of the text field `name`, if present.
    #[must_use]
    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|(field, value)| match value {
            FieldValue::Text(text) if field == name => Some(text.as_str()),
            _ => None,
        })
    }

    pub(crate) async fn into_multipart(self) -> Result<Form, SessionError> {
        let mut form = Form::new();
        for (name, value) in self.fields {
            form = match value {
                FieldValue::Text(text) => form.text(name, text),
                FieldValue::File(path) => form.part(name, file_part(&path).await?),
            };
        }
        Ok(form)
    }
}

async fn file_part(path: &Path) -> Result<Part, SessionError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| SessionError::io(path, e))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime_for(path).essence_str())
        .map_err(SessionError::Client)
}

/// Content type for a source or document file, by extension.
/// Unknown extensions are sent as `application/octet-stream`.
#[must_use]
pub fn mime_for(path: &Path) -> Mime {
    mime_guess::from_path(path).first_or_octet_stream()
}

/// A run (solution) submission for `team/run.php`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSubmission {
    /// Problem identifier as listed by BOCA.
    pub problem: String,
    /// Language identifier as listed by BOCA.
    pub language: String,
    /// Source file to submit.
    pub source: PathBuf,
}

impl RunSubmission {
    /// Page that accepts runs.
    pub const ENDPOINT: &'static str = "team/run.php";

    /// Creates a run submission.
    #[must_use]
    pub fn new(
        problem: impl Into<String>,
        language: impl Into<String>,
        source: impl Into<PathBuf>,
    ) -> Self {
        Self {
            problem: problem.into(),
            language: language.into(),
            source: source.into(),
        }
    }

    /// The form BOCA's run page expects.
    #[must_use]
    pub fn into_form(self) -> UploadForm {
        UploadForm::new()
            .text("confirmation", "confirm")
            .text("problem", self.problem)
            .text("language", self.language)
            .file("sourcefile", self.source)
            .text("Submit", "Send")
    }
}

/// A clarification request for `team/clar.php`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clarification {
    /// Problem identifier the question is about.
    pub problem: String,
    /// Question text.
    pub message: String,
}

impl Clarification {
    /// Page that accepts clarification requests.
    pub const ENDPOINT: &'static str = "team/clar.php";

    /// Creates a clarification request.
    #[must_use]
    pub fn new(problem: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            problem: problem.into(),
            message: message.into(),
        }
    }

    /// The form BOCA's clarification page expects.
    #[must_use]
    pub fn into_form(self) -> UploadForm {
        UploadForm::new()
            .text("confirmation", "confirm")
            .text("problem", self.problem)
            .text("message", self.message)
            .text("Submit", "Send")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_form_fields_in_order() {
        let form = RunSubmission::new("A", "C++", "/tmp/sol.cpp").into_form();
        let names: Vec<_> = form.field_names().collect();
        assert_eq!(
            names,
            ["confirmation", "problem", "language", "sourcefile", "Submit"]
        );
        assert_eq!(form.text_value("confirmation"), Some("confirm"));
        assert_eq!(form.text_value("problem"), Some("A"));
        assert_eq!(form.text_value("language"), Some("C++"));
        assert_eq!(form.text_value("Submit"), Some("Send"));
        // file fields are not text
        assert_eq!(form.text_value("sourcefile"), None);
    }

    #[test]
    fn test_clarification_form_fields() {
        let form = Clarification::new("B", "Is n bounded?").into_form();
        let names: Vec<_> = form.field_names().collect();
        assert_eq!(names, ["confirmation", "problem", "message", "Submit"]);
        assert_eq!(form.text_value("message"), Some("Is n bounded?"));
    }

    #[test]
    fn test_mime_for_known_and_unknown_extensions() {
        assert_eq!(mime_for(Path::new("statement.pdf")), "application/pdf");
        assert_eq!(mime_for(Path::new("a.C")), "text/plain");
        assert_eq!(mime_for(Path::new("main.rs")), "text/x-rust");
        assert_eq!(mime_for(Path::new("sol.pas")), "text/x-pascal");
        assert_eq!(mime_for(Path::new("binary")), "application/octet-stream");
        assert_eq!(
            mime_for(Path::new("x.unknownext")),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_into_multipart_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.c");
        let form = RunSubmission::new("A", "C", &missing).into_form();
        match form.into_multipart().await {
            Err(SessionError::Io { path, .. }) => assert_eq!(path, missing),
            Err(other) => panic!("expected IO error, got {other:?}"),
            Ok(_) => panic!("expected IO error for missing source file"),
        }
    }

    #[tokio::test]
    async fn test_into_multipart_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("sol.c");
        std::fs::write(&source, "int main(){return 0;}").unwrap();
        let form = RunSubmission::new("A", "C", &source).into_form();
        assert!(form.into_multipart().await.is_ok());
    }
}
