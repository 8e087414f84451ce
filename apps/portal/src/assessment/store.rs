use std::fmt;

use crate::backend::models::{AnalysisOutcome, AnswerMap, Question};

/// Screens of the assessment, in the order a user moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Step {
    #[default]
    Initial,
    ResumeUpload,
    DynamicQuestions,
    Results,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Initial => "initial-questions",
            Step::ResumeUpload => "resume-upload",
            Step::DynamicQuestions => "dynamic-questions",
            Step::Results => "results",
        };
        f.write_str(name)
    }
}

/// Generation state for the personalized question set. Generation only runs
/// from `NotGenerated`; an empty `Generated` list is still "generated".
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DynamicQuestions {
    #[default]
    NotGenerated,
    Generated(Vec<Question>),
}

impl DynamicQuestions {
    pub fn is_generated(&self) -> bool {
        matches!(self, DynamicQuestions::Generated(_))
    }

    pub fn questions(&self) -> &[Question] {
        match self {
            DynamicQuestions::NotGenerated => &[],
            DynamicQuestions::Generated(questions) => questions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlowProgress {
    pub phase1_complete: bool,
    pub resume_uploaded: bool,
    pub phase2_complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    /// Blocked client-side; nothing was sent.
    Validation,
    /// A backend call failed; repeating the action retries it.
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBanner {
    pub kind: BannerKind,
    pub message: String,
}

impl ErrorBanner {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Validation,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Failure,
            message: message.into(),
        }
    }
}

/// Everything the assessment has collected so far. Owned by an
/// `AssessmentFlow`; `Default` is the fresh-start state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssessmentStore {
    pub step: Step,
    pub session_id: Option<String>,
    pub initial_questions: Vec<Question>,
    pub initial_answers: AnswerMap,
    pub resume_preview: Option<String>,
    pub dynamic_questions: DynamicQuestions,
    pub dynamic_answers: AnswerMap,
    /// Index into the dynamic question list.
    pub cursor: usize,
    pub outcome: Option<AnalysisOutcome>,
    pub progress: FlowProgress,
    pub error: Option<ErrorBanner>,
}

impl AssessmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
