use thiserror::Error;

/// Client-side validation failures. These block an action before any network
/// call is issued and are rendered inline next to the offending control.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please upload a PDF or Word document (.pdf, .doc, .docx)")]
    UnsupportedFileType { mime_type: String },

    #[error("File size must be less than {max_mb}MB")]
    FileTooLarge { size_bytes: u64, max_mb: u64 },

    #[error("The selected file is empty")]
    EmptyFile,

    #[error("Please answer all required questions ({})", .0.join(", "))]
    MissingAnswers(Vec<String>),

    /// Complete needs an answer on the last question even when it is optional.
    #[error("Answer this question to complete the assessment")]
    UnansweredQuestion { id: String },

    #[error("Questions have not loaded yet; reload them and try again")]
    QuestionsNotLoaded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_too_large_message_names_limit() {
        let err = ValidationError::FileTooLarge {
            size_bytes: 6 * 1024 * 1024,
            max_mb: 5,
        };
        assert_eq!(err.to_string(), "File size must be less than 5MB");
    }

    #[test]
    fn test_missing_answers_lists_ids() {
        let err = ValidationError::MissingAnswers(vec!["q1".to_string(), "q3".to_string()]);
        assert!(err.to_string().contains("q1, q3"));
    }

    #[test]
    fn test_unanswered_optional_question_does_not_claim_required() {
        let err = ValidationError::UnansweredQuestion {
            id: "d3".to_string(),
        };
        assert!(!err.to_string().contains("required"));
    }
}
