//! Wire types for the assessment backend.
//!
//! Payloads are normalized here, at deserialization time, so the rest of the
//! crate never branches on the shape the backend happened to send
//! (plain-string vs `{value, label}` options, numeric vs string ids, etc).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

// ────────────────────────────────────────────────────────────────────────────
// Questions
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    #[serde(rename = "radio", alias = "single-choice")]
    SingleChoice,
    #[serde(rename = "checkbox", alias = "multi-choice")]
    MultiChoice,
    #[serde(rename = "textarea", alias = "free-text", alias = "text")]
    FreeText,
}

/// A selectable option. Always carries both a value and a label, whatever the
/// backend sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOption")]
pub struct QuestionOption {
    pub value: String,
    pub label: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOption {
    Plain(String),
    Labelled {
        value: String,
        #[serde(default)]
        label: Option<String>,
    },
}

impl From<RawOption> for QuestionOption {
    fn from(raw: RawOption) -> Self {
        match raw {
            RawOption::Plain(text) => QuestionOption {
                value: text.clone(),
                label: text,
            },
            RawOption::Labelled { value, label } => QuestionOption {
                label: label.unwrap_or_else(|| value.clone()),
                value,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    pub required: bool,
}

impl Question {
    /// True when `answers` holds a non-empty answer for this question.
    pub fn is_answered_by(&self, answers: &AnswerMap) -> bool {
        answers.get(&self.id).is_some_and(|a| !a.is_empty())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Answers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// Single-choice value or free text.
    Text(String),
    /// Multi-choice selection.
    Choices(BTreeSet<String>),
}

impl AnswerValue {
    pub fn text(value: impl Into<String>) -> Self {
        AnswerValue::Text(value.into())
    }

    pub fn choices<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AnswerValue::Choices(values.into_iter().map(Into::into).collect())
    }

    /// Whitespace-only text and empty selections count as unanswered.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(text) => text.trim().is_empty(),
            AnswerValue::Choices(values) => values.is_empty(),
        }
    }
}

/// Question id → answer. One map per phase; phases are never merged.
pub type AnswerMap = BTreeMap<String, AnswerValue>;

/// Ids of required questions that have no non-empty answer, in question order.
pub fn missing_required(questions: &[Question], answers: &AnswerMap) -> Vec<String> {
    questions
        .iter()
        .filter(|q| q.required && !q.is_answered_by(answers))
        .map(|q| q.id.clone())
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Requests
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuestionsRequest {
    pub session_id: String,
    pub question_answers: AnswerMap,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub session_id: String,
    pub dynamic_answers: AnswerMap,
}

// ────────────────────────────────────────────────────────────────────────────
// Responses
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuestionList {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswersResponse {
    pub session_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub next_step: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResumeResponse {
    pub session_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub resume_preview: String,
    #[serde(default)]
    pub next_step: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FinalizeEnvelope {
    pub data: AnalysisOutcome,
}

/// Profile summary and project recommendations produced by finalize-analysis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisOutcome {
    #[serde(rename = "finalAnalysis")]
    pub analysis: Analysis,
    /// Kept in backend order; never re-sorted client-side. Entries that do
    /// not decode as a project are dropped.
    #[serde(rename = "githubIssues", default, deserialize_with = "decodable_projects")]
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_level: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub primary_interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_path: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub next_steps: Vec<String>,
    /// Any further fields the backend adds are carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Difficulty label attached to a project. Labels outside the known three
/// are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Other(String),
    #[default]
    Unrated,
}

impl From<String> for Difficulty {
    fn from(label: String) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "beginner" => Difficulty::Beginner,
            "intermediate" => Difficulty::Intermediate,
            "advanced" => Difficulty::Advanced,
            "" => Difficulty::Unrated,
            _ => Difficulty::Other(label),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
            Difficulty::Other(label) => label,
            Difficulty::Unrated => "",
        };
        f.write_str(label)
    }
}

impl Serialize for Difficulty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?
            .map(Difficulty::from)
            .unwrap_or_default())
    }
}

/// A recommended open-source project. Field names on the wire follow the
/// GitHub repository shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "html_url", default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(rename = "stargazers_count", default, deserialize_with = "null_as_default")]
    pub star_count: u64,
    #[serde(rename = "forks_count", default, deserialize_with = "null_as_default")]
    pub fork_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub topics: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub difficulty_level: Difficulty,
    /// 0 - 100; missing scores count as 0.
    #[serde(default, deserialize_with = "clamped_score")]
    pub match_score: u8,
}

// ────────────────────────────────────────────────────────────────────────────
// Deserialization helpers
// ────────────────────────────────────────────────────────────────────────────

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn decodable_projects<'de, D>(deserializer: D) -> Result<Vec<Project>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Value> = null_as_empty(deserializer)?;
    Ok(raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(project) => Some(project),
            Err(e) => {
                warn!(index, "Skipping undecodable project recommendation: {e}");
                None
            }
        })
        .collect())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

fn clamped_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}
