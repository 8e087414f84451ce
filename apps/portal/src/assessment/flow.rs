//! Assessment flow controller.
//!
//! Steps: initial questions → resume upload → dynamic questions → results.
//! Each operation checks the current step before doing anything, validates
//! client-side before any backend call, and records failures as an error
//! banner on the store. Operations take `&mut self`, so a flow never has more
//! than one backend call in flight.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::assessment::export::ResultsExport;
use crate::assessment::store::{AssessmentStore, DynamicQuestions, ErrorBanner, Step};
use crate::assessment::FlowError;
use crate::backend::models::{
    missing_required, AnalysisOutcome, AnswerValue, FinalizeRequest, GenerateQuestionsRequest,
    Question,
};
use crate::backend::upload::ResumeFile;
use crate::backend::{AssessmentBackend, BackendError};
use crate::validation::ValidationError;

const LOAD_QUESTIONS_FAILED: &str = "Failed to load questions. Please try again.";
const SUBMIT_FAILED: &str = "Failed to submit answers. Please try again.";
const UPLOAD_FAILED: &str = "Failed to upload resume. Please try again.";
const GENERATE_FAILED: &str = "Failed to generate questions. Please try again.";
const FINALIZE_FAILED: &str = "Failed to generate analysis. Please try again.";

/// What the forward button does on the current dynamic question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    Next,
    Complete,
}

impl PrimaryAction {
    pub fn label(&self) -> &'static str {
        match self {
            PrimaryAction::Next => "Next",
            PrimaryAction::Complete => "Complete Assessment",
        }
    }
}

pub struct AssessmentFlow {
    backend: Arc<dyn AssessmentBackend>,
    store: AssessmentStore,
}

impl AssessmentFlow {
    pub fn new(backend: Arc<dyn AssessmentBackend>) -> Self {
        Self::with_store(backend, AssessmentStore::new())
    }

    /// Resumes a flow from previously collected state.
    pub fn with_store(backend: Arc<dyn AssessmentBackend>, store: AssessmentStore) -> Self {
        Self { backend, store }
    }

    pub fn store(&self) -> &AssessmentStore {
        &self.store
    }

    pub fn step(&self) -> Step {
        self.store.step
    }

    pub fn error(&self) -> Option<&ErrorBanner> {
        self.store.error.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.store.error = None;
    }

    // ── Initial questions ──────────────────────────────────────────────────

    /// Fetches the fixed initial question set. On failure the list is left
    /// empty and a banner is raised.
    pub async fn load_initial_questions(&mut self) -> Result<(), FlowError> {
        self.expect_step(Step::Initial, "load the initial questions")?;

        let result = self.backend.fetch_initial_questions().await;
        match result {
            Ok(questions) => {
                debug!(count = questions.len(), "Initial questions loaded");
                self.store.initial_questions = questions;
                self.store.error = None;
                Ok(())
            }
            Err(err) => {
                self.store.initial_questions.clear();
                Err(self.fail(err, LOAD_QUESTIONS_FAILED))
            }
        }
    }

    pub fn initial_questions(&self) -> &[Question] {
        &self.store.initial_questions
    }

    pub fn answer_initial(
        &mut self,
        question_id: impl Into<String>,
        answer: AnswerValue,
    ) -> Result<(), FlowError> {
        self.expect_step(Step::Initial, "answer an initial question")?;
        self.store.initial_answers.insert(question_id.into(), answer);
        Ok(())
    }

    pub fn missing_initial_answers(&self) -> Vec<String> {
        missing_required(&self.store.initial_questions, &self.store.initial_answers)
    }

    pub fn can_submit_initial(&self) -> bool {
        self.store.step == Step::Initial
            && !self.store.initial_questions.is_empty()
            && self.missing_initial_answers().is_empty()
    }

    /// Submits the initial answers and moves to resume upload.
    pub async fn submit_initial(&mut self) -> Result<(), FlowError> {
        self.expect_step(Step::Initial, "submit the initial answers")?;

        if self.store.initial_questions.is_empty() {
            return Err(self.reject(ValidationError::QuestionsNotLoaded));
        }
        let missing = self.missing_initial_answers();
        if !missing.is_empty() {
            return Err(self.reject(ValidationError::MissingAnswers(missing)));
        }

        let result = self
            .backend
            .submit_initial_answers(&self.store.initial_answers)
            .await;
        let response = result.map_err(|err| self.fail(err, SUBMIT_FAILED))?;

        info!(session_id = %response.session_id, "Initial answers submitted");
        self.store.session_id = Some(response.session_id);
        self.store.progress.phase1_complete = true;
        // New initial answers invalidate anything generated from older ones.
        self.store.dynamic_questions = DynamicQuestions::NotGenerated;
        self.store.dynamic_answers.clear();
        self.store.cursor = 0;
        self.store.error = None;
        self.store.step = Step::ResumeUpload;
        Ok(())
    }

    // ── Resume upload ──────────────────────────────────────────────────────

    /// Uploads a resume. Unsupported, empty or oversize files are rejected
    /// without contacting the backend.
    pub async fn upload_resume(&mut self, file: ResumeFile) -> Result<(), FlowError> {
        self.expect_step(Step::ResumeUpload, "upload a resume")?;

        if let Err(err) = file.validate() {
            return Err(self.reject(err));
        }

        let result = self.backend.upload_resume(&file).await;
        let response = result.map_err(|err| self.fail(err, UPLOAD_FAILED))?;

        info!(file = %file.file_name, size = file.size(), "Resume uploaded");
        self.store.resume_preview = Some(response.resume_preview);
        self.store.progress.resume_uploaded = true;
        self.store.error = None;
        self.store.step = Step::DynamicQuestions;
        Ok(())
    }

    pub fn skip_resume(&mut self) -> Result<(), FlowError> {
        self.expect_step(Step::ResumeUpload, "skip the resume upload")?;
        info!("Resume upload skipped");
        self.store.error = None;
        self.store.step = Step::DynamicQuestions;
        Ok(())
    }

    // ── Dynamic questions ──────────────────────────────────────────────────

    /// Generates the personalized questions unless they already exist.
    /// Returns whether a backend call was made. A failed call leaves the
    /// state ungenerated so the user can retry.
    pub async fn ensure_dynamic_questions(&mut self) -> Result<bool, FlowError> {
        self.expect_step(Step::DynamicQuestions, "generate questions")?;

        if self.store.dynamic_questions.is_generated() {
            debug!("Dynamic questions already generated; skipping");
            return Ok(false);
        }

        let session_id = self
            .store
            .session_id
            .clone()
            .ok_or(FlowError::MissingSession)?;
        let request = GenerateQuestionsRequest {
            session_id,
            question_answers: self.store.initial_answers.clone(),
        };

        let result = self.backend.generate_dynamic_questions(&request).await;
        let questions = result.map_err(|err| self.fail(err, GENERATE_FAILED))?;

        info!(count = questions.len(), "Dynamic questions generated");
        self.store.dynamic_questions = DynamicQuestions::Generated(questions);
        self.store.cursor = 0;
        self.store.error = None;
        Ok(true)
    }

    pub fn dynamic_questions(&self) -> &[Question] {
        self.store.dynamic_questions.questions()
    }

    pub fn cursor(&self) -> usize {
        self.store.cursor
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.dynamic_questions().get(self.store.cursor)
    }

    pub fn current_answer(&self) -> Option<&AnswerValue> {
        let question = self.current_question()?;
        self.store.dynamic_answers.get(&question.id)
    }

    pub fn answer_current(&mut self, answer: AnswerValue) -> Result<(), FlowError> {
        self.expect_step(Step::DynamicQuestions, "answer a question")?;
        let question_id = self
            .current_question()
            .map(|q| q.id.clone())
            .ok_or(FlowError::NoQuestion)?;
        self.store.dynamic_answers.insert(question_id, answer);
        Ok(())
    }

    pub fn is_last_question(&self) -> bool {
        let len = self.dynamic_questions().len();
        len > 0 && self.store.cursor == len - 1
    }

    pub fn primary_action(&self) -> Option<PrimaryAction> {
        if self.store.step != Step::DynamicQuestions {
            return None;
        }
        self.current_question()?;
        Some(if self.is_last_question() {
            PrimaryAction::Complete
        } else {
            PrimaryAction::Next
        })
    }

    /// Whether the forward button is enabled. Next needs an answer only for
    /// required questions; Complete always needs one.
    pub fn can_advance(&self) -> bool {
        let Some(action) = self.primary_action() else {
            return false;
        };
        let Some(question) = self.current_question() else {
            return false;
        };
        let answered = question.is_answered_by(&self.store.dynamic_answers);
        match action {
            PrimaryAction::Next => answered || !question.required,
            PrimaryAction::Complete => answered,
        }
    }

    pub fn can_go_back(&self) -> bool {
        self.store.step == Step::DynamicQuestions && self.store.cursor > 0
    }

    /// Moves the cursor forward by one. Returns false when blocked.
    pub fn next(&mut self) -> bool {
        if self.primary_action() == Some(PrimaryAction::Next) && self.can_advance() {
            self.store.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn previous(&mut self) -> bool {
        if self.can_go_back() {
            self.store.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Finalizes the analysis from the last dynamic question and moves to
    /// results. On failure the flow stays on the last question.
    pub async fn complete(&mut self) -> Result<(), FlowError> {
        self.expect_step(Step::DynamicQuestions, "complete the assessment")?;

        if !self.is_last_question() {
            return Err(FlowError::NotAtLastQuestion);
        }
        if !self.can_advance() {
            let err = match self.current_question() {
                Some(q) if q.required => ValidationError::MissingAnswers(vec![q.id.clone()]),
                Some(q) => ValidationError::UnansweredQuestion { id: q.id.clone() },
                None => return Err(FlowError::NoQuestion),
            };
            return Err(self.reject(err));
        }

        let session_id = self
            .store
            .session_id
            .clone()
            .ok_or(FlowError::MissingSession)?;
        let request = FinalizeRequest {
            session_id,
            dynamic_answers: self.store.dynamic_answers.clone(),
        };

        let result = self.backend.finalize_analysis(&request).await;
        let outcome = result.map_err(|err| self.fail(err, FINALIZE_FAILED))?;

        info!(projects = outcome.projects.len(), "Analysis finalized");
        self.store.outcome = Some(outcome);
        self.store.progress.phase2_complete = true;
        self.store.error = None;
        self.store.step = Step::Results;
        Ok(())
    }

    // ── Results ────────────────────────────────────────────────────────────

    pub fn outcome(&self) -> Option<&AnalysisOutcome> {
        self.store.outcome.as_ref()
    }

    pub fn export_results(&self) -> Result<ResultsExport, FlowError> {
        self.expect_step(Step::Results, "export results")?;
        let outcome = self.store.outcome.as_ref().ok_or(FlowError::WrongStep {
            action: "export results",
            step: self.store.step,
        })?;
        Ok(ResultsExport::from_outcome(outcome))
    }

    /// Drops everything collected and returns to the first step.
    pub fn start_new(&mut self) {
        info!(from = %self.store.step, "Starting a new assessment");
        self.store.reset();
    }

    // ── Helpers ────────────────────────────────────────────────────────────

    fn expect_step(&self, expected: Step, action: &'static str) -> Result<(), FlowError> {
        if self.store.step != expected {
            return Err(FlowError::WrongStep {
                action,
                step: self.store.step,
            });
        }
        Ok(())
    }

    fn reject(&mut self, err: ValidationError) -> FlowError {
        self.store.error = Some(ErrorBanner::validation(err.to_string()));
        FlowError::Validation(err)
    }

    fn fail(&mut self, err: BackendError, fallback: &str) -> FlowError {
        warn!("{fallback} ({err})");
        self.store.error = Some(ErrorBanner::failure(err.user_message(fallback)));
        FlowError::Backend(err)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::assessment::store::BannerKind;
    use crate::backend::models::{AnswerMap, SubmitAnswersResponse, UploadResumeResponse};
    use crate::backend::upload::MIME_PDF;

    /// In-memory backend with call counters and switchable failures.
    #[derive(Default)]
    struct FakeBackend {
        initial: Vec<Question>,
        dynamic: Vec<Question>,
        outcome: Option<AnalysisOutcome>,
        fail_generate: bool,
        fail_finalize: bool,
        fetch_calls: AtomicUsize,
        submit_calls: AtomicUsize,
        upload_calls: AtomicUsize,
        generate_calls: AtomicUsize,
        finalize_calls: AtomicUsize,
        last_finalize: Mutex<Option<FinalizeRequest>>,
    }

    fn server_error(message: &str) -> BackendError {
        BackendError::Server {
            status: 500,
            message: Some(message.to_string()),
        }
    }

    #[async_trait]
    impl AssessmentBackend for FakeBackend {
        async fn fetch_initial_questions(&self) -> Result<Vec<Question>, BackendError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.initial.clone())
        }

        async fn submit_initial_answers(
            &self,
            _answers: &AnswerMap,
        ) -> Result<SubmitAnswersResponse, BackendError> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            Ok(SubmitAnswersResponse {
                session_id: "sess-1".to_string(),
                message: "ok".to_string(),
                next_step: Some("resume-upload".to_string()),
            })
        }

        async fn upload_resume(
            &self,
            file: &ResumeFile,
        ) -> Result<UploadResumeResponse, BackendError> {
            self.upload_calls.fetch_add(1, Ordering::SeqCst);
            Ok(UploadResumeResponse {
                session_id: "sess-1".to_string(),
                message: "ok".to_string(),
                resume_preview: format!("Parsed {}", file.file_name),
                next_step: Some("dynamic-questions".to_string()),
            })
        }

        async fn generate_dynamic_questions(
            &self,
            _request: &GenerateQuestionsRequest,
        ) -> Result<Vec<Question>, BackendError> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_generate {
                return Err(server_error("generator down"));
            }
            Ok(self.dynamic.clone())
        }

        async fn finalize_analysis(
            &self,
            request: &FinalizeRequest,
        ) -> Result<AnalysisOutcome, BackendError> {
            self.finalize_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_finalize.lock().unwrap() = Some(request.clone());
            if self.fail_finalize {
                return Err(BackendError::Server {
                    status: 503,
                    message: None,
                });
            }
            Ok(self.outcome.clone().expect("outcome configured"))
        }
    }

    fn questions(value: serde_json::Value) -> Vec<Question> {
        serde_json::from_value(value).unwrap()
    }

    fn outcome() -> AnalysisOutcome {
        serde_json::from_value(json!({
            "finalAnalysis": {"skillLevel": "Intermediate", "primaryInterests": ["web"]},
            "githubIssues": [
                {"id": 3, "name": "zulu", "full_name": "o/zulu", "html_url": "https://x/zulu",
                 "difficulty_level": "Beginner", "match_score": 40},
                {"id": 1, "name": "alpha", "full_name": "o/alpha", "html_url": "https://x/alpha",
                 "difficulty_level": "Advanced", "match_score": 95}
            ]
        }))
        .unwrap()
    }

    fn fake() -> FakeBackend {
        FakeBackend {
            initial: questions(json!([
                {"id": "q1", "title": "Role?", "type": "radio", "options": ["A", "B"], "required": true}
            ])),
            dynamic: questions(json!([
                {"id": "d1", "title": "Favourite stack?", "type": "textarea", "required": true},
                {"id": "d2", "title": "Anything else?", "type": "textarea"},
                {"id": "d3", "title": "Areas", "type": "checkbox", "options": ["web", "ml"]}
            ])),
            outcome: Some(outcome()),
            ..Default::default()
        }
    }

    async fn flow_at_dynamic(backend: Arc<FakeBackend>) -> AssessmentFlow {
        let mut flow = AssessmentFlow::new(backend);
        flow.load_initial_questions().await.unwrap();
        flow.answer_initial("q1", AnswerValue::text("A")).unwrap();
        flow.submit_initial().await.unwrap();
        flow.skip_resume().unwrap();
        flow.ensure_dynamic_questions().await.unwrap();
        flow
    }

    async fn flow_at_last_question(backend: Arc<FakeBackend>) -> AssessmentFlow {
        let mut flow = flow_at_dynamic(backend).await;
        flow.answer_current(AnswerValue::text("Rust")).unwrap();
        assert!(flow.next());
        assert!(flow.next(), "optional question does not block Next");
        flow
    }

    #[tokio::test]
    async fn test_initial_submit_yields_session_and_resume_step() {
        let backend = Arc::new(fake());
        let mut flow = AssessmentFlow::new(backend.clone());

        flow.load_initial_questions().await.unwrap();
        assert!(!flow.can_submit_initial());

        flow.answer_initial("q1", AnswerValue::text("A")).unwrap();
        assert!(flow.can_submit_initial());

        flow.submit_initial().await.unwrap();
        assert_eq!(flow.step(), Step::ResumeUpload);
        assert_eq!(flow.store().session_id.as_deref(), Some("sess-1"));
        assert!(flow.store().progress.phase1_complete);
    }

    #[tokio::test]
    async fn test_submit_blocked_until_required_answers_present() {
        let backend = Arc::new(fake());
        let mut flow = AssessmentFlow::new(backend.clone());
        flow.load_initial_questions().await.unwrap();

        flow.answer_initial("q1", AnswerValue::text("  ")).unwrap();
        let err = flow.submit_initial().await.unwrap_err();

        assert!(matches!(
            err,
            FlowError::Validation(ValidationError::MissingAnswers(ref ids)) if ids == &["q1".to_string()]
        ));
        assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 0);
        assert_eq!(flow.step(), Step::Initial);
        assert_eq!(flow.error().unwrap().kind, BannerKind::Validation);
    }

    #[tokio::test]
    async fn test_submit_refused_before_questions_load() {
        let backend = Arc::new(fake());
        let mut flow = AssessmentFlow::new(backend.clone());

        assert!(!flow.can_submit_initial());
        assert!(matches!(
            flow.submit_initial().await,
            Err(FlowError::Validation(ValidationError::QuestionsNotLoaded))
        ));
        assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 0);
        assert_eq!(flow.step(), Step::Initial);
        assert_eq!(flow.error().unwrap().kind, BannerKind::Validation);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_empty_list_and_banner() {
        struct Down;

        #[async_trait]
        impl AssessmentBackend for Down {
            async fn fetch_initial_questions(&self) -> Result<Vec<Question>, BackendError> {
                Err(BackendError::Server {
                    status: 502,
                    message: None,
                })
            }
            async fn submit_initial_answers(
                &self,
                _: &AnswerMap,
            ) -> Result<SubmitAnswersResponse, BackendError> {
                unreachable!()
            }
            async fn upload_resume(
                &self,
                _: &ResumeFile,
            ) -> Result<UploadResumeResponse, BackendError> {
                unreachable!()
            }
            async fn generate_dynamic_questions(
                &self,
                _: &GenerateQuestionsRequest,
            ) -> Result<Vec<Question>, BackendError> {
                unreachable!()
            }
            async fn finalize_analysis(
                &self,
                _: &FinalizeRequest,
            ) -> Result<AnalysisOutcome, BackendError> {
                unreachable!()
            }
        }

        let mut flow = AssessmentFlow::new(Arc::new(Down));
        assert!(flow.load_initial_questions().await.is_err());
        assert!(flow.initial_questions().is_empty());

        let banner = flow.error().unwrap();
        assert_eq!(banner.kind, BannerKind::Failure);
        assert_eq!(banner.message, LOAD_QUESTIONS_FAILED);

        flow.dismiss_error();
        assert!(flow.error().is_none());
    }

    #[tokio::test]
    async fn test_oversize_resume_rejected_without_request() {
        let backend = Arc::new(fake());
        let mut flow = AssessmentFlow::new(backend.clone());
        flow.load_initial_questions().await.unwrap();
        flow.answer_initial("q1", AnswerValue::text("A")).unwrap();
        flow.submit_initial().await.unwrap();

        let file = ResumeFile::new("cv.pdf", MIME_PDF, vec![0u8; 6 * 1024 * 1024]);
        let err = flow.upload_resume(file).await.unwrap_err();

        assert!(err.to_string().contains("5MB"));
        assert!(flow.error().unwrap().message.contains("5MB"));
        assert_eq!(backend.upload_calls.load(Ordering::SeqCst), 0);
        assert_eq!(flow.step(), Step::ResumeUpload);
    }

    #[tokio::test]
    async fn test_unsupported_resume_type_rejected_without_request() {
        let backend = Arc::new(fake());
        let mut flow = AssessmentFlow::new(backend.clone());
        flow.load_initial_questions().await.unwrap();
        flow.answer_initial("q1", AnswerValue::text("B")).unwrap();
        flow.submit_initial().await.unwrap();

        let file = ResumeFile::new("cv.txt", "text/plain", b"hello".to_vec());
        assert!(matches!(
            flow.upload_resume(file).await,
            Err(FlowError::Validation(ValidationError::UnsupportedFileType { .. }))
        ));
        assert_eq!(backend.upload_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_upload_stores_preview() {
        let backend = Arc::new(fake());
        let mut flow = AssessmentFlow::new(backend.clone());
        flow.load_initial_questions().await.unwrap();
        flow.answer_initial("q1", AnswerValue::text("A")).unwrap();
        flow.submit_initial().await.unwrap();

        flow.upload_resume(ResumeFile::new("cv.pdf", MIME_PDF, vec![1u8; 128]))
            .await
            .unwrap();

        assert_eq!(flow.step(), Step::DynamicQuestions);
        assert_eq!(flow.store().resume_preview.as_deref(), Some("Parsed cv.pdf"));
        assert!(flow.store().progress.resume_uploaded);
    }

    #[tokio::test]
    async fn test_skip_resume_goes_to_dynamic_without_preview() {
        let backend = Arc::new(fake());
        let mut flow = AssessmentFlow::new(backend.clone());
        flow.load_initial_questions().await.unwrap();
        flow.answer_initial("q1", AnswerValue::text("A")).unwrap();
        flow.submit_initial().await.unwrap();

        flow.skip_resume().unwrap();
        assert_eq!(flow.step(), Step::DynamicQuestions);
        assert!(flow.store().resume_preview.is_none());
        assert_eq!(backend.upload_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cannot_skip_resume_before_initial_submit() {
        let mut flow = AssessmentFlow::new(Arc::new(fake()));
        assert!(matches!(
            flow.skip_resume(),
            Err(FlowError::WrongStep {
                step: Step::Initial,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_generation_runs_once_per_flow() {
        let backend = Arc::new(fake());
        let mut flow = flow_at_dynamic(backend.clone()).await;

        assert!(!flow.ensure_dynamic_questions().await.unwrap());
        assert!(!flow.ensure_dynamic_questions().await.unwrap());
        assert_eq!(backend.generate_calls.load(Ordering::SeqCst), 1);
        assert_eq!(flow.dynamic_questions().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_generated_list_is_not_regenerated() {
        let backend = Arc::new(FakeBackend {
            dynamic: vec![],
            ..fake()
        });
        let mut flow = flow_at_dynamic(backend.clone()).await;

        assert!(flow.dynamic_questions().is_empty());
        assert!(!flow.ensure_dynamic_questions().await.unwrap());
        assert_eq!(backend.generate_calls.load(Ordering::SeqCst), 1);
        assert_eq!(flow.primary_action(), None);
    }

    #[tokio::test]
    async fn test_failed_generation_can_be_retried() {
        let backend = Arc::new(FakeBackend {
            fail_generate: true,
            ..fake()
        });
        let mut flow = AssessmentFlow::new(backend.clone());
        flow.load_initial_questions().await.unwrap();
        flow.answer_initial("q1", AnswerValue::text("A")).unwrap();
        flow.submit_initial().await.unwrap();
        flow.skip_resume().unwrap();

        assert!(flow.ensure_dynamic_questions().await.is_err());
        assert_eq!(flow.error().unwrap().message, "generator down");
        assert!(!flow.store().dynamic_questions.is_generated());

        assert!(flow.ensure_dynamic_questions().await.is_err());
        assert_eq!(backend.generate_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cursor_navigation_and_gating() {
        let backend = Arc::new(fake());
        let mut flow = flow_at_dynamic(backend).await;

        assert_eq!(flow.cursor(), 0);
        assert_eq!(flow.primary_action(), Some(PrimaryAction::Next));
        assert!(!flow.can_go_back());
        assert!(!flow.previous());

        // d1 is required and unanswered
        assert!(!flow.can_advance());
        assert!(!flow.next());
        assert_eq!(flow.cursor(), 0);

        flow.answer_current(AnswerValue::text("Rust")).unwrap();
        assert!(flow.next());
        assert_eq!(flow.cursor(), 1);

        // d2 is optional
        assert!(flow.can_advance());
        assert!(flow.next());
        assert_eq!(flow.cursor(), 2);

        assert!(flow.is_last_question());
        assert_eq!(flow.primary_action(), Some(PrimaryAction::Complete));
        assert_eq!(PrimaryAction::Complete.label(), "Complete Assessment");
        assert!(!flow.can_advance(), "Complete needs an answer");
        assert!(!flow.next(), "Next never moves past the last index");

        assert!(flow.previous());
        assert_eq!(flow.cursor(), 1);
        assert_eq!(flow.current_question().unwrap().id, "d2");
    }

    #[tokio::test]
    async fn test_complete_finalizes_and_keeps_project_order() {
        let backend = Arc::new(fake());
        let mut flow = flow_at_last_question(backend.clone()).await;

        flow.answer_current(AnswerValue::choices(["web"])).unwrap();
        assert!(flow.can_advance());
        flow.complete().await.unwrap();

        assert_eq!(flow.step(), Step::Results);
        assert!(flow.store().progress.phase2_complete);
        let names: Vec<&str> = flow
            .outcome()
            .unwrap()
            .projects
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["zulu", "alpha"]);

        let sent = backend.last_finalize.lock().unwrap().clone().unwrap();
        assert_eq!(sent.session_id, "sess-1");
        assert_eq!(sent.dynamic_answers.len(), 2);
    }

    #[tokio::test]
    async fn test_complete_without_last_answer_is_blocked() {
        let backend = Arc::new(fake());
        let mut flow = flow_at_last_question(backend.clone()).await;

        assert!(matches!(
            flow.complete().await,
            Err(FlowError::Validation(ValidationError::UnansweredQuestion { ref id })) if id == "d3"
        ));
        assert_eq!(backend.finalize_calls.load(Ordering::SeqCst), 0);
        assert_eq!(flow.step(), Step::DynamicQuestions);

        let banner = flow.error().unwrap();
        assert_eq!(banner.kind, BannerKind::Validation);
        assert_eq!(
            banner.message,
            "Answer this question to complete the assessment"
        );
    }

    #[tokio::test]
    async fn test_complete_only_from_last_question() {
        let backend = Arc::new(fake());
        let mut flow = flow_at_dynamic(backend.clone()).await;
        flow.answer_current(AnswerValue::text("Rust")).unwrap();

        assert!(matches!(
            flow.complete().await,
            Err(FlowError::NotAtLastQuestion)
        ));
        assert_eq!(backend.finalize_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_finalize_failure_stays_on_last_question() {
        let backend = Arc::new(FakeBackend {
            fail_finalize: true,
            ..fake()
        });
        let mut flow = flow_at_last_question(backend.clone()).await;
        flow.answer_current(AnswerValue::choices(["ml"])).unwrap();

        assert!(matches!(
            flow.complete().await,
            Err(FlowError::Backend(_))
        ));
        assert_eq!(flow.step(), Step::DynamicQuestions);
        assert!(flow.is_last_question());
        assert!(flow.outcome().is_none());

        let banner = flow.error().unwrap();
        assert_eq!(banner.kind, BannerKind::Failure);
        assert_eq!(banner.message, FINALIZE_FAILED);
    }

    #[tokio::test]
    async fn test_start_new_resets_everything() {
        let backend = Arc::new(fake());
        let mut flow = flow_at_last_question(backend.clone()).await;
        flow.answer_current(AnswerValue::choices(["web"])).unwrap();
        flow.complete().await.unwrap();

        let export = flow.export_results().unwrap();
        assert_eq!(export.recommendations.len(), 2);

        flow.start_new();
        assert_eq!(flow.step(), Step::Initial);
        assert_eq!(flow.store(), &AssessmentStore::default());
        assert_eq!(flow.cursor(), 0);
        assert!(flow.store().session_id.is_none());
        assert!(flow.store().initial_answers.is_empty());
        assert!(flow.store().dynamic_answers.is_empty());
        assert!(!flow.store().dynamic_questions.is_generated());

        // a fresh flow generates again
        flow.load_initial_questions().await.unwrap();
        flow.answer_initial("q1", AnswerValue::text("B")).unwrap();
        flow.submit_initial().await.unwrap();
        flow.skip_resume().unwrap();
        assert!(flow.ensure_dynamic_questions().await.unwrap());
        assert_eq!(backend.generate_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_export_requires_results_step() {
        let flow = AssessmentFlow::new(Arc::new(fake()));
        assert!(matches!(
            flow.export_results(),
            Err(FlowError::WrongStep { .. })
        ));
    }

    #[tokio::test]
    async fn test_generation_requires_session_id() {
        let store = AssessmentStore {
            step: Step::DynamicQuestions,
            ..AssessmentStore::default()
        };
        let backend = Arc::new(fake());
        let mut flow = AssessmentFlow::with_store(backend.clone(), store);

        assert!(matches!(
            flow.ensure_dynamic_questions().await,
            Err(FlowError::MissingSession)
        ));
        assert_eq!(backend.generate_calls.load(Ordering::SeqCst), 0);
    }
}
