use thiserror::Error;

// Persistence failures are recoverable: the in-memory store keeps advancing
// and a re-save is attempted on the next mutation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("no active interview session")]
    NoActiveSession,

    #[error("invalid session state: operation requires {required}, session is {actual}")]
    StateViolation {
        required: &'static str,
        actual: &'static str,
    },

    #[error("no questions available for the requested role")]
    NoQuestionsAvailable,
}

impl AssessmentError {
    pub fn is_state_violation(&self) -> bool {
        matches!(
            self,
            AssessmentError::NoActiveSession | AssessmentError::StateViolation { .. }
        )
    }
}
