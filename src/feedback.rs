//! Post-session feedback prompt (EMA): a required 1–5 helpfulness score
//! and an optional free-text note.

use serde::{Deserialize, Serialize};

use crate::error::FeedbackError;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub score: u8,
    #[serde(default)]
    pub note: String,
}

type SubmitFn = Box<dyn FnOnce(FeedbackResponse) + Send>;
type SkipFn = Box<dyn FnOnce() + Send>;

/// Holds the in-progress answer. At most one of the two callbacks fires,
/// once; after that the prompt is closed.
pub struct FeedbackPrompt {
    score: Option<u8>,
    note: String,
    on_submit: Option<SubmitFn>,
    on_skip: Option<SkipFn>,
}

impl FeedbackPrompt {
    pub fn new<S, K>(on_submit: S, on_skip: K) -> Self
    where
        S: FnOnce(FeedbackResponse) + Send + 'static,
        K: FnOnce() + Send + 'static,
    {
        Self {
            score: None,
            note: String::new(),
            on_submit: Some(Box::new(on_submit)),
            on_skip: Some(Box::new(on_skip)),
        }
    }

    pub fn score(&self) -> Option<u8> {
        self.score
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn can_submit(&self) -> bool {
        self.score.is_some() && !self.is_closed()
    }

    pub fn is_closed(&self) -> bool {
        self.on_submit.is_none()
    }

    pub fn select_score(&mut self, score: u8) -> Result<(), FeedbackError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(FeedbackError::ScoreOutOfRange(score));
        }
        self.score = Some(score);
        Ok(())
    }

    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = note.into();
    }

    /// Rejected without firing anything until a score is selected.
    pub fn submit(&mut self) -> Result<FeedbackResponse, FeedbackError> {
        if self.is_closed() {
            return Err(FeedbackError::Closed);
        }
        let score = self.score.ok_or(FeedbackError::MissingScore)?;
        let response = FeedbackResponse {
            score,
            note: std::mem::take(&mut self.note),
        };
        self.on_skip = None;
        if let Some(on_submit) = self.on_submit.take() {
            on_submit(response.clone());
        }
        Ok(response)
    }

    pub fn skip(&mut self) {
        self.on_submit = None;
        if let Some(on_skip) = self.on_skip.take() {
            on_skip();
        }
    }
}
