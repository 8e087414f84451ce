use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::backend::models::{AnswerMap, Question};
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentProgress {
    pub phase1_complete: bool,
    pub phase2_complete: bool,
    pub phase3_complete: bool,
}

/// Per-visitor record persisted in the encrypted session cookie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase1_answers: Option<AnswerMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_questions: Option<Vec<Question>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_progress: Option<AssessmentProgress>,
    #[serde(default)]
    pub is_guest: bool,
    #[serde(default)]
    pub is_logged_in: bool,
}

impl SessionData {
    /// A fresh guest session with default progress flags.
    pub fn new_guest() -> Self {
        Self {
            guest_id: Some(generate_guest_id()),
            assessment_progress: Some(AssessmentProgress::default()),
            is_guest: true,
            is_logged_in: false,
            ..Default::default()
        }
    }

    /// The authenticated user id if present, otherwise the guest id.
    pub fn id(&self) -> Option<&str> {
        self.user_id.as_deref().or(self.guest_id.as_deref())
    }

    pub fn has_identity(&self) -> bool {
        self.id().is_some()
    }

    /// Shallow merge: every field present in `update` replaces the stored one.
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(v) = update.resume_text {
            self.resume_text = v;
        }
        if let Some(v) = update.resume_path {
            self.resume_path = v;
        }
        if let Some(v) = update.uploaded_at {
            self.uploaded_at = v;
        }
        if let Some(v) = update.phase1_answers {
            self.phase1_answers = v;
        }
        if let Some(v) = update.dynamic_questions {
            self.dynamic_questions = v;
        }
        if let Some(v) = update.assessment_progress {
            self.assessment_progress = v;
        }
    }
}

/// Fields a client may write through `POST /api/session`.
pub const MUTABLE_FIELDS: &[&str] = &[
    "resumeText",
    "resumePath",
    "uploadedAt",
    "phase1Answers",
    "dynamicQuestions",
    "assessmentProgress",
];

/// A validated partial update. The outer `Option` says whether the field was
/// sent; the inner one is `None` when it was sent as `null` (clear it).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub resume_text: Option<Option<String>>,
    pub resume_path: Option<Option<String>>,
    pub uploaded_at: Option<Option<DateTime<Utc>>>,
    pub phase1_answers: Option<Option<AnswerMap>>,
    pub dynamic_questions: Option<Option<Vec<Question>>>,
    pub assessment_progress: Option<Option<AssessmentProgress>>,
}

impl SessionUpdate {
    /// Parses a request body. Anything other than a JSON object, any key
    /// outside `MUTABLE_FIELDS`, or a value of the wrong shape is rejected
    /// before the session is touched.
    pub fn from_json(body: Value) -> Result<Self, AppError> {
        let Value::Object(fields) = body else {
            return Err(AppError::Validation(
                "Session update must be a JSON object".to_string(),
            ));
        };

        let rejected: Vec<&str> = fields
            .keys()
            .map(String::as_str)
            .filter(|key| !MUTABLE_FIELDS.contains(key))
            .collect();
        if !rejected.is_empty() {
            return Err(AppError::Validation(format!(
                "Session fields cannot be updated: {}",
                rejected.join(", ")
            )));
        }

        let mut update = SessionUpdate::default();
        for (key, value) in fields {
            match key.as_str() {
                "resumeText" => update.resume_text = Some(field(&key, value)?),
                "resumePath" => update.resume_path = Some(field(&key, value)?),
                "uploadedAt" => update.uploaded_at = Some(field(&key, value)?),
                "phase1Answers" => update.phase1_answers = Some(field(&key, value)?),
                "dynamicQuestions" => update.dynamic_questions = Some(field(&key, value)?),
                "assessmentProgress" => update.assessment_progress = Some(field(&key, value)?),
                _ => unreachable!("keys checked against MUTABLE_FIELDS"),
            }
        }
        Ok(update)
    }
}

fn field<T: DeserializeOwned>(key: &str, value: Value) -> Result<Option<T>, AppError> {
    serde_json::from_value(value)
        .map_err(|e| AppError::Validation(format!("Invalid value for '{key}': {e}")))
}

/// Millisecond timestamp followed by nine random base36 characters.
pub fn generate_guest_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}{}", Utc::now().timestamp_millis(), suffix)
}
