//! Caller-owned review session: present, reveal, grade, then move on.
//!
//! The session holds the in-flight card so the service itself stays stateless
//! between calls. A transport keeps one session per user.

use serde::Serialize;

use crate::error::{ReviewError, ReviewResult};
use crate::models::{ProgressRecord, ReviewCard};
use crate::services::review::ReviewService;
use crate::services::sm2::Grade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Idle,
    AwaitingReveal,
    AwaitingGrade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeOutcome {
    pub rescheduled: ProgressRecord,
    /// Card now in flight, if any work remains.
    pub next: Option<ReviewCard>,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    external_id: String,
    phase: SessionPhase,
    current: Option<ReviewCard>,
}

impl ReviewSession {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            phase: SessionPhase::Idle,
            current: None,
        }
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn current(&self) -> Option<&ReviewCard> {
        self.current.as_ref()
    }

    /// Loads the next card. `None` ends the session with nothing to do.
    pub async fn start(&mut self, service: &ReviewService) -> ReviewResult<Option<ReviewCard>> {
        self.advance(service).await
    }

    /// Returns the in-flight card so the transport can show its translation.
    pub fn reveal(&mut self) -> ReviewResult<&ReviewCard> {
        if self.phase != SessionPhase::AwaitingReveal {
            return Err(self.out_of_order("reveal"));
        }
        self.phase = SessionPhase::AwaitingGrade;
        self.current
            .as_ref()
            .ok_or_else(|| ReviewError::NotFound("no card in flight".to_string()))
    }

    /// Reschedules the in-flight card and loads the next one.
    ///
    /// A `NotFound` from the scheduler means the in-flight record is stale; the
    /// session resets to `Idle` and the caller should `start` again.
    pub async fn grade(&mut self, service: &ReviewService, grade: Grade) -> ReviewResult<GradeOutcome> {
        if self.phase != SessionPhase::AwaitingGrade {
            return Err(self.out_of_order("grade"));
        }
        let record = match &self.current {
            Some(card) => card.record.clone(),
            None => {
                self.reset();
                return Err(ReviewError::NotFound("no card in flight".to_string()));
            }
        };

        let rescheduled = match service.schedule(&record, grade).await {
            Ok(record) => record,
            Err(err) => {
                if err.is_not_found() {
                    tracing::warn!(user_id = %self.external_id, error = %err, "stale session reset");
                    self.reset();
                }
                return Err(err);
            }
        };

        let next = self.advance(service).await?;
        Ok(GradeOutcome { rescheduled, next })
    }

    pub fn cancel(&mut self) {
        self.reset();
    }

    async fn advance(&mut self, service: &ReviewService) -> ReviewResult<Option<ReviewCard>> {
        let next = match service.select_next(&self.external_id).await {
            Ok(next) => next,
            Err(err) => {
                self.reset();
                return Err(err);
            }
        };
        self.phase = if next.is_some() {
            SessionPhase::AwaitingReveal
        } else {
            SessionPhase::Idle
        };
        self.current = next.clone();
        Ok(next)
    }

    fn reset(&mut self) {
        self.phase = SessionPhase::Idle;
        self.current = None;
    }

    fn out_of_order(&self, action: &str) -> ReviewError {
        ReviewError::Validation(format!(
            "cannot {action} while session is {:?}",
            self.phase
        ))
    }
}
