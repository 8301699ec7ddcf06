use chrono::{DateTime, Utc};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::VecDeque;

use crate::catalog::QuestionCatalog;
use crate::error::AssessmentError;
use crate::models::{
    Evaluation, InterviewSession, Question, ResponseRecord, Role, SessionStatus,
};
use crate::report::{self, HiringReport};
use crate::reviewer::AnswerReviewer;
use crate::selector;
use crate::store::QuestionStore;

pub const DEFAULT_HISTORY_RETENTION: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct StartSummary {
    pub session_id: String,
    pub total_questions: usize,
    pub first_question: Question,
    pub shortfall: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub enum SubmitOutcome {
    Continue {
        evaluation: Evaluation,
        next_question: Question,
        progress: Progress,
    },
    Completed {
        evaluation: Evaluation,
        session_id: String,
        duration_seconds: f64,
        report: Option<HiringReport>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub role: Role,
    pub status: SessionStatus,
    pub answered: usize,
    pub total: usize,
    pub percentage: f64,
    pub elapsed_seconds: f64,
}

// A finished interview, kept in the bounded history log
#[derive(Debug, Clone, Serialize)]
pub struct CompletedInterview {
    pub session: InterviewSession,
    pub report: Option<HiringReport>,
    pub duration_seconds: f64,
}

// Wires the catalog, store, reviewer and report generator into one
// interview at a time. Completed interviews move into a bounded history
// log and free the live slot.
pub struct Orchestrator {
    catalog: QuestionCatalog,
    store: QuestionStore,
    reviewer: Box<dyn AnswerReviewer>,
    rng: StdRng,
    current: Option<InterviewSession>,
    history: VecDeque<CompletedInterview>,
    retention: usize,
}

impl Orchestrator {
    pub fn new(store: QuestionStore, reviewer: Box<dyn AnswerReviewer>) -> Self {
        Self::with_seed(store, reviewer, rand::thread_rng().gen())
    }

    pub fn with_seed(store: QuestionStore, reviewer: Box<dyn AnswerReviewer>, seed: u64) -> Self {
        Self {
            catalog: QuestionCatalog::new(),
            store,
            reviewer,
            rng: StdRng::seed_from_u64(seed),
            current: None,
            history: VecDeque::new(),
            retention: DEFAULT_HISTORY_RETENTION,
        }
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }

    pub fn store(&self) -> &QuestionStore {
        &self.store
    }

    // Fix the question sequence and open the session. Selection under-fill
    // shortens the interview; zero questions refuses to start.
    pub fn start(&mut self, role: Role, count: usize) -> Result<StartSummary, AssessmentError> {
        if let Some(session) = &self.current {
            return Err(AssessmentError::StateViolation {
                required: "no active session",
                actual: session.status.as_str(),
            });
        }

        let selection = selector::select(&self.store, &self.catalog, role, count, &mut self.rng);
        if selection.questions.is_empty() {
            return Err(AssessmentError::NoQuestionsAvailable);
        }
        let shortfall = selection.shortfall();

        // Persist fresh questions so later sessions can learn from their
        // outcomes; already-known ids dedup inside the store. A storage
        // failure here must not block the interview.
        for question in &selection.questions {
            if let Err(e) = self.store.add(question.clone()) {
                warn!("failed to persist selected question {}: {}", question.id, e);
            }
        }

        let id = format!(
            "interview_{}_{:04}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.rng.gen_range(1000..10000)
        );
        let first_question = selection.questions[0].clone();
        let total_questions = selection.questions.len();

        info!(
            "starting interview {} for role {} with {} questions",
            id,
            role.as_str(),
            total_questions
        );

        self.current = Some(InterviewSession {
            id: id.clone(),
            role,
            questions: selection.questions,
            responses: vec![],
            evaluations: vec![],
            cursor: 0,
            status: SessionStatus::InProgress,
            started_at: Utc::now().to_rfc3339(),
            ended_at: None,
            paused_at: None,
            resumed_at: None,
        });

        Ok(StartSummary {
            session_id: id,
            total_questions,
            first_question,
            shortfall,
        })
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref().and_then(|s| s.current_question())
    }

    // Score the answer to the current question, feed the score back into
    // the store, and advance. The final answer completes the session and
    // archives it.
    pub fn submit_answer(&mut self, answer: &str) -> Result<SubmitOutcome, AssessmentError> {
        let session = self
            .current
            .as_mut()
            .ok_or(AssessmentError::NoActiveSession)?;
        if session.status != SessionStatus::InProgress {
            return Err(AssessmentError::StateViolation {
                required: "in_progress",
                actual: session.status.as_str(),
            });
        }
        let Some(question) = session.current_question().cloned() else {
            return Err(AssessmentError::StateViolation {
                required: "in_progress",
                actual: "completed",
            });
        };

        let evaluation = self.reviewer.review(&question, answer);

        session.responses.push(ResponseRecord {
            question_id: question.id,
            response: answer.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        });
        session.evaluations.push(evaluation.clone());
        session.cursor += 1;

        // Recoverable: memory already advanced, the store retries later
        if let Err(e) = self.store.record_outcome(question.id, evaluation.score, None) {
            warn!("failed to persist outcome for question {}: {}", question.id, e);
        }

        let session = self
            .current
            .as_mut()
            .ok_or(AssessmentError::NoActiveSession)?;
        if session.is_exhausted() {
            Ok(self.complete(evaluation))
        } else {
            let next_question = session
                .current_question()
                .cloned()
                .ok_or(AssessmentError::NoActiveSession)?;
            Ok(SubmitOutcome::Continue {
                evaluation,
                next_question,
                progress: Progress {
                    answered: session.cursor,
                    total: session.questions.len(),
                    percentage: session.progress_percentage(),
                },
            })
        }
    }

    pub fn pause(&mut self) -> Result<(), AssessmentError> {
        let session = self
            .current
            .as_mut()
            .ok_or(AssessmentError::NoActiveSession)?;
        if session.status != SessionStatus::InProgress {
            return Err(AssessmentError::StateViolation {
                required: "in_progress",
                actual: session.status.as_str(),
            });
        }
        session.status = SessionStatus::Paused;
        session.paused_at = Some(Utc::now().to_rfc3339());
        info!("interview {} paused", session.id);
        Ok(())
    }

    // Resuming does not move the cursor: the question that was current
    // before the pause is still current.
    pub fn resume(&mut self) -> Result<Question, AssessmentError> {
        let session = self
            .current
            .as_mut()
            .ok_or(AssessmentError::NoActiveSession)?;
        if session.status != SessionStatus::Paused {
            return Err(AssessmentError::StateViolation {
                required: "paused",
                actual: session.status.as_str(),
            });
        }
        session.status = SessionStatus::InProgress;
        session.resumed_at = Some(Utc::now().to_rfc3339());
        info!("interview {} resumed", session.id);
        session
            .current_question()
            .cloned()
            .ok_or(AssessmentError::NoActiveSession)
    }

    pub fn status(&self) -> Option<SessionSnapshot> {
        let session = self.current.as_ref()?;
        Some(SessionSnapshot {
            id: session.id.clone(),
            role: session.role,
            status: session.status,
            answered: session.cursor,
            total: session.questions.len(),
            percentage: session.progress_percentage(),
            elapsed_seconds: elapsed_since(&session.started_at),
        })
    }

    // Most recent first
    pub fn history(&self, limit: usize) -> Vec<&CompletedInterview> {
        self.history.iter().rev().take(limit).collect()
    }

    // Finalize exactly once: the session leaves the live slot in the same
    // step that archives it, so a second completion cannot happen.
    fn complete(&mut self, final_evaluation: Evaluation) -> SubmitOutcome {
        let Some(mut session) = self.current.take() else {
            // complete() is only called with a live session in hand
            return SubmitOutcome::Completed {
                evaluation: final_evaluation,
                session_id: String::new(),
                duration_seconds: 0.0,
                report: None,
            };
        };

        session.status = SessionStatus::Completed;
        session.ended_at = Some(Utc::now().to_rfc3339());

        let report = report::generate(session.role, &session.questions, &session.evaluations);
        let duration_seconds = duration_of(&session);
        let session_id = session.id.clone();

        info!(
            "interview {} completed with {} evaluations",
            session_id,
            session.evaluations.len()
        );

        self.history.push_back(CompletedInterview {
            session,
            report: report.clone(),
            duration_seconds,
        });
        while self.history.len() > self.retention {
            self.history.pop_front();
        }

        SubmitOutcome::Completed {
            evaluation: final_evaluation,
            session_id,
            duration_seconds,
            report,
        }
    }
}

fn elapsed_since(started_at: &str) -> f64 {
    match DateTime::parse_from_rfc3339(started_at) {
        Ok(start) => {
            let elapsed = Utc::now().signed_duration_since(start.with_timezone(&Utc));
            elapsed.num_milliseconds() as f64 / 1000.0
        }
        Err(_) => 0.0,
    }
}

fn duration_of(session: &InterviewSession) -> f64 {
    let (Some(end), Ok(start)) = (
        session.ended_at.as_deref(),
        DateTime::parse_from_rfc3339(&session.started_at),
    ) else {
        return 0.0;
    };
    match DateTime::parse_from_rfc3339(end) {
        Ok(end) => {
            let elapsed = end.signed_duration_since(start);
            elapsed.num_milliseconds() as f64 / 1000.0
        }
        Err(_) => 0.0,
    }
}
