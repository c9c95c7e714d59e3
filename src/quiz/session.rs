//! Per-chat quiz state: topic, then difficulty, then questions, then results.
//!
//! A [`Session`] is a plain value. Every transition borrows the current
//! session and hands back the next one, so a refused transition leaves the
//! caller holding the unchanged original.
//!
//! Question generation is asynchronous. Asking for questions issues a
//! [`RequestToken`]; the response is only applied while that token is still
//! the pending one. Navigating away drops the pending token, so a late
//! response for an abandoned request is reported as [`SessionError::Stale`].

use std::fmt;

use crate::error::SessionError;
use crate::quiz::report::QuizReport;
use crate::quiz::{AnswerOutcome, Difficulty, Question, Quiz, Topic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct RequestToken(u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request #{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PendingRequest {
    pub token: RequestToken,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Stage {
    #[default]
    SelectingTopic,
    SelectingDifficulty {
        topic: Topic,
        pending: Option<PendingRequest>,
    },
    InQuiz {
        topic: Topic,
        difficulty: Difficulty,
        quiz: Quiz,
    },
    ShowingResults {
        topic: Topic,
        difficulty: Difficulty,
        quiz: Quiz,
    },
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Session {
    stage: Stage,
    last_token: u64,
}

impl Session {
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn topic(&self) -> Option<Topic> {
        match &self.stage {
            Stage::SelectingTopic => None,
            Stage::SelectingDifficulty { topic, .. }
            | Stage::InQuiz { topic, .. }
            | Stage::ShowingResults { topic, .. } => Some(*topic),
        }
    }

    pub fn is_selecting_topic(&self) -> bool {
        matches!(self.stage, Stage::SelectingTopic)
    }

    pub fn is_selecting_difficulty(&self) -> bool {
        matches!(self.stage, Stage::SelectingDifficulty { .. })
    }

    pub fn is_in_quiz(&self) -> bool {
        matches!(self.stage, Stage::InQuiz { .. })
    }

    pub fn is_showing_results(&self) -> bool {
        matches!(self.stage, Stage::ShowingResults { .. })
    }

    pub fn pending(&self) -> Option<PendingRequest> {
        match &self.stage {
            Stage::SelectingDifficulty { pending, .. } => *pending,
            _ => None,
        }
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        match &self.stage {
            Stage::InQuiz { quiz, .. } | Stage::ShowingResults { quiz, .. } => Some(quiz),
            _ => None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        match &self.stage {
            Stage::InQuiz { quiz, .. } => quiz.current(),
            _ => None,
        }
    }

    pub fn report(&self) -> Option<QuizReport> {
        match &self.stage {
            Stage::ShowingResults { quiz, .. } => Some(QuizReport::from_quiz(quiz)),
            _ => None,
        }
    }

    fn with_stage(&self, stage: Stage) -> Session {
        Session {
            stage,
            last_token: self.last_token,
        }
    }

    /// Picks a topic and moves on to difficulty selection. Any progress is
    /// discarded.
    pub fn select_topic(&self, topic: Topic) -> Session {
        self.with_stage(Stage::SelectingDifficulty {
            topic,
            pending: None,
        })
    }

    /// Marks a question request as in flight. Only one may be pending.
    pub fn request_questions(
        &self,
        difficulty: Difficulty,
    ) -> Result<(Session, RequestToken), SessionError> {
        let Stage::SelectingDifficulty { topic, pending } = &self.stage else {
            return Err(SessionError::NotSelectingDifficulty);
        };
        if pending.is_some() {
            return Err(SessionError::RequestPending);
        }

        let token = RequestToken(self.last_token + 1);
        let next = Session {
            stage: Stage::SelectingDifficulty {
                topic: *topic,
                pending: Some(PendingRequest { token, difficulty }),
            },
            last_token: token.0,
        };
        Ok((next, token))
    }

    fn claim(&self, token: RequestToken) -> Result<(Topic, Difficulty), SessionError> {
        match &self.stage {
            Stage::SelectingDifficulty {
                topic,
                pending: Some(pending),
            } if pending.token == token => Ok((*topic, pending.difficulty)),
            _ => Err(SessionError::Stale(token)),
        }
    }

    /// Applies a successful response to the pending request.
    pub fn start_quiz(
        &self,
        token: RequestToken,
        questions: Vec<Question>,
    ) -> Result<Session, SessionError> {
        let (topic, difficulty) = self.claim(token)?;
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }
        Ok(self.with_stage(Stage::InQuiz {
            topic,
            difficulty,
            quiz: Quiz::new(questions),
        }))
    }

    /// Gives up on the pending request and re-enables difficulty selection.
    pub fn abort_request(&self, token: RequestToken) -> Result<Session, SessionError> {
        let (topic, _) = self.claim(token)?;
        Ok(self.select_topic(topic))
    }

    pub fn answer(&self, option: &str) -> Result<(Session, AnswerOutcome), SessionError> {
        let Stage::InQuiz {
            topic,
            difficulty,
            quiz,
        } = &self.stage
        else {
            return Err(SessionError::NotInQuiz);
        };
        let mut quiz = quiz.clone();
        let outcome = quiz.answer(option)?;
        let next = self.with_stage(Stage::InQuiz {
            topic: *topic,
            difficulty: *difficulty,
            quiz,
        });
        Ok((next, outcome))
    }

    /// Goes to the next question, or to the results after the last one.
    pub fn next_question(&self) -> Result<Session, SessionError> {
        let Stage::InQuiz {
            topic,
            difficulty,
            quiz,
        } = &self.stage
        else {
            return Err(SessionError::NotInQuiz);
        };
        let mut quiz = quiz.clone();
        quiz.advance()?;

        let (topic, difficulty) = (*topic, *difficulty);
        let stage = if quiz.is_finished() {
            Stage::ShowingResults {
                topic,
                difficulty,
                quiz,
            }
        } else {
            Stage::InQuiz {
                topic,
                difficulty,
                quiz,
            }
        };
        Ok(self.with_stage(stage))
    }

    /// Abandons the current run but keeps the topic.
    pub fn change_difficulty(&self) -> Result<Session, SessionError> {
        let topic = self.topic().ok_or(SessionError::NoTopic)?;
        Ok(self.select_topic(topic))
    }

    /// Abandons everything and returns to topic selection. Also used to
    /// restart from the results.
    pub fn back_to_topics(&self) -> Session {
        self.with_stage(Stage::SelectingTopic)
    }
}
