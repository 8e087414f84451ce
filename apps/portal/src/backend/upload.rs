use std::path::Path;

use bytes::Bytes;

use crate::validation::ValidationError;

pub const MAX_RESUME_MB: u64 = 5;
pub const MAX_RESUME_BYTES: u64 = MAX_RESUME_MB * 1024 * 1024;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub const SUPPORTED_MIME_TYPES: &[&str] = &[MIME_PDF, MIME_DOC, MIME_DOCX];

/// A resume selected for upload, held in memory until it is sent as the
/// `resume` multipart field.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl ResumeFile {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk, inferring the MIME type from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resume".to_string());

        Ok(Self::new(file_name, mime_for_path(path), bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Rejects unsupported types, empty files and anything over the size cap.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !SUPPORTED_MIME_TYPES.contains(&self.mime_type.as_str()) {
            return Err(ValidationError::UnsupportedFileType {
                mime_type: self.mime_type.clone(),
            });
        }
        if self.bytes.is_empty() {
            return Err(ValidationError::EmptyFile);
        }
        if self.size() > MAX_RESUME_BYTES {
            return Err(ValidationError::FileTooLarge {
                size_bytes: self.size(),
                max_mb: MAX_RESUME_MB,
            });
        }
        Ok(())
    }
}

fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("pdf") => MIME_PDF,
        Some("doc") => MIME_DOC,
        Some("docx") => MIME_DOCX,
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_each_supported_type() {
        for mime in SUPPORTED_MIME_TYPES {
            let file = ResumeFile::new("cv", *mime, vec![1u8; 1024]);
            assert!(file.validate().is_ok(), "{mime} should be accepted");
        }
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let file = ResumeFile::new("cv.png", "image/png", vec![1u8; 10]);
        assert!(matches!(
            file.validate(),
            Err(ValidationError::UnsupportedFileType { .. })
        ));
    }

    #[test]
    fn test_rejects_file_over_five_megabytes() {
        let file = ResumeFile::new("cv.pdf", MIME_PDF, vec![0u8; 6 * 1024 * 1024]);
        let err = file.validate().unwrap_err();
        assert!(err.to_string().contains("5MB"));
    }

    #[test]
    fn test_exactly_five_megabytes_is_allowed() {
        let file = ResumeFile::new("cv.pdf", MIME_PDF, vec![0u8; MAX_RESUME_BYTES as usize]);
        assert!(file.validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_file() {
        let file = ResumeFile::new("cv.pdf", MIME_PDF, Vec::new());
        assert_eq!(file.validate(), Err(ValidationError::EmptyFile));
    }

    #[test]
    fn test_mime_inferred_from_extension() {
        assert_eq!(mime_for_path(Path::new("/tmp/CV.PDF")), MIME_PDF);
        assert_eq!(mime_for_path(Path::new("resume.doc")), MIME_DOC);
        assert_eq!(mime_for_path(Path::new("resume.docx")), MIME_DOCX);
        assert_eq!(
            mime_for_path(Path::new("resume.txt")),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_from_path_reads_file_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jane.docx");
        tokio::fs::write(&path, b"PK\x03\x04").await.unwrap();

        let file = ResumeFile::from_path(&path).await.unwrap();
        assert_eq!(file.file_name, "jane.docx");
        assert_eq!(file.mime_type, MIME_DOCX);
        assert_eq!(file.size(), 4);
    }
}
