use std::time::Duration;

use crate::error::GenerateError;
use crate::gemini::{self, QUESTIONS_PER_QUIZ};
use crate::quiz::{Difficulty, Question, Topic};

/// Body accepted by the `generate-questions` proxy.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub difficulty: String,
}

/// Fetches question sets through the proxy. The API key never reaches here.
pub struct QuestionGenerator {
    client: reqwest::Client,
    endpoint: String,
}

impl QuestionGenerator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GenerateError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// One attempt, no retry. Any failure loses the whole set.
    pub async fn generate(
        &self,
        topic: Topic,
        difficulty: Difficulty,
    ) -> Result<Vec<Question>, GenerateError> {
        log::info!(
            "Generating {} questions for {}",
            difficulty.as_str(),
            topic.name()
        );
        let request = GenerateRequest {
            topic: topic.name().to_string(),
            difficulty: difficulty.as_str().to_string(),
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenerateError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;

        let questions = gemini::extract_questions(&body)?;
        check_questions(&questions)?;
        if questions.len() != QUESTIONS_PER_QUIZ {
            log::warn!(
                "Expected {} questions, the model returned {}",
                QUESTIONS_PER_QUIZ,
                questions.len()
            );
        }
        Ok(questions)
    }
}

fn check_questions(questions: &[Question]) -> Result<(), GenerateError> {
    if questions.is_empty() {
        return Err(GenerateError::Empty);
    }
    for (index, question) in questions.iter().enumerate() {
        question
            .validate()
            .map_err(|reason| GenerateError::InvalidQuestion { index, reason })?;
    }
    Ok(())
}
