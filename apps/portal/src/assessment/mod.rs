// Client-side assessment: the step state machine, the state it carries, and
// the downloadable results document. Every backend call goes through
// `backend::AssessmentBackend`.

pub mod export;
pub mod flow;
pub mod store;

use thiserror::Error;

use crate::assessment::store::Step;
use crate::backend::BackendError;
use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Cannot {action} at the {step} step")]
    WrongStep { action: &'static str, step: Step },

    #[error("No session id yet; submit the initial answers first")]
    MissingSession,

    #[error("The assessment can only be completed from the last question")]
    NotAtLastQuestion,

    #[error("There is no question to answer")]
    NoQuestion,
}
