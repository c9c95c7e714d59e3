use thiserror::Error;

use crate::quiz::session::RequestToken;

/// Everything that can go wrong while turning a topic into a question set.
///
/// The controller does not distinguish between these when talking to the
/// user; they exist so the logs say what actually happened.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("question service returned status {0}")]
    Status(u16),

    #[error("response has no generated text")]
    MissingText,

    #[error("generated text is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no questions were generated")]
    Empty,

    #[error("question {index} is invalid: {reason}")]
    InvalidQuestion { index: usize, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no topic has been chosen")]
    NoTopic,

    #[error("not choosing a difficulty right now")]
    NotSelectingDifficulty,

    #[error("questions are already being generated")]
    RequestPending,

    #[error("stale question response ({0})")]
    Stale(RequestToken),

    #[error("the question set is empty")]
    NoQuestions,

    #[error("no quiz is in progress")]
    NotInQuiz,

    #[error("the current question was already answered")]
    AlreadyAnswered,

    #[error("the current question has not been answered yet")]
    NotAnswered,

    #[error("{0:?} is not one of the options")]
    UnknownOption(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("session storage failed: {0}")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}
