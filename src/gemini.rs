//! Request and response shapes of the Gemini `generateContent` call.
//!
//! This is the only place the prompt and the structured-output schema are
//! built; the proxy forwards exactly this payload.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::GenerateError;
use crate::quiz::Question;

pub const QUESTIONS_PER_QUIZ: usize = 5;

/// The prompt for a topic display name and a difficulty token.
pub fn build_prompt(topic: &str, difficulty: &str) -> String {
    if difficulty == "interview" {
        format!(
            "Generate 5 unique, high-quality, multiple-choice questions that are **very commonly asked in technical job interviews** for the programming language {topic}. The questions should cover core concepts, data structures, and common pitfalls. One of the four options must be the correct answer. Provide the output in a valid JSON format."
        )
    } else {
        format!(
            "Generate 5 unique, high-quality, multiple-choice interview questions for the programming language {topic} at a {difficulty} difficulty level. One of the four options must be the correct answer. The questions should be suitable for preparing for a technical job interview. Provide the output in a valid JSON format."
        )
    }
}

/// `{"questions": [{question, options, answer, subtopic}]}`, all required.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "questions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "question": { "type": "STRING" },
                        "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "answer": { "type": "STRING" },
                        "subtopic": { "type": "STRING" }
                    },
                    "required": ["question", "options", "answer", "subtopic"]
                }
            }
        },
        "required": ["questions"]
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    pub fn new(topic: &str, difficulty: &str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: build_prompt(topic, difficulty),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// `candidates[0].content.parts[0].text`
    pub fn generated_text(&self) -> Option<&str> {
        let content = self.candidates.first()?.content.as_ref()?;
        content.parts.first().map(|p| p.text.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct QuestionSet {
    questions: Vec<Question>,
}

/// Digs the question list out of a raw `generateContent` response body.
///
/// The model's answer is itself a JSON document carried as a string, so it
/// is parsed twice. Nothing is recovered from a partially valid body.
pub fn extract_questions(body: &[u8]) -> Result<Vec<Question>, GenerateError> {
    let response: GenerateContentResponse = serde_json::from_slice(body)?;
    let text = response.generated_text().ok_or(GenerateError::MissingText)?;
    let set: QuestionSet = serde_json::from_str(text)?;
    Ok(set.questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(generated: &Value) -> Value {
        json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": generated.to_string() }]
                },
                "finishReason": "STOP"
            }]
        })
    }

    #[test]
    fn graded_prompt_mentions_topic_and_difficulty() {
        for difficulty in ["easy", "medium", "hard"] {
            let prompt = build_prompt("Python", difficulty);
            assert!(prompt.contains("Python"));
            assert!(prompt.contains(&format!("at a {difficulty} difficulty level")));
        }
    }

    #[test]
    fn interview_prompt_has_no_difficulty_level() {
        let prompt = build_prompt("C++", "interview");
        assert!(prompt.contains("C++"));
        assert!(prompt.contains("very commonly asked in technical job interviews"));
        assert!(!prompt.contains("difficulty"));
        for level in ["easy", "medium", "hard"] {
            assert!(!prompt.contains(level));
        }
    }

    #[test]
    fn prompts_are_word_for_word() {
        assert_eq!(
            build_prompt("Python", "interview"),
            "Generate 5 unique, high-quality, multiple-choice questions that are \
             **very commonly asked in technical job interviews** for the programming \
             language Python. The questions should cover core concepts, data structures, \
             and common pitfalls. One of the four options must be the correct answer. \
             Provide the output in a valid JSON format."
        );
        assert_eq!(
            build_prompt("Python", "easy"),
            "Generate 5 unique, high-quality, multiple-choice interview questions for \
             the programming language Python at a easy difficulty level. One of the four \
             options must be the correct answer. The questions should be suitable for \
             preparing for a technical job interview. Provide the output in a valid JSON \
             format."
        );
    }

    #[test]
    fn payload_is_camel_case() {
        let payload = serde_json::to_value(GenerateContentRequest::new("SQL", "hard")).unwrap();
        assert_eq!(payload["contents"][0]["role"], "user");
        assert_eq!(
            payload["contents"][0]["parts"][0]["text"],
            build_prompt("SQL", "hard")
        );
        assert_eq!(
            payload["generationConfig"]["responseMimeType"],
            "application/json"
        );
        let schema = &payload["generationConfig"]["responseSchema"];
        assert_eq!(schema["required"], json!(["questions"]));
        assert_eq!(
            schema["properties"]["questions"]["items"]["required"],
            json!(["question", "options", "answer", "subtopic"])
        );
    }

    #[test]
    fn extracts_nested_questions() {
        let generated = json!({
            "questions": [{
                "question": "What does `len([])` return?",
                "options": ["0", "None", "Error", "1"],
                "answer": "0",
                "subtopic": "lists"
            }]
        });
        let body = serde_json::to_vec(&wrap(&generated)).unwrap();
        let questions = extract_questions(&body).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "What does `len([])` return?");
        assert_eq!(questions[0].subtopic, "lists");
    }

    #[test]
    fn missing_path_is_an_error() {
        for body in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{}] }),
            json!({ "candidates": [{ "content": { "parts": [] } }] }),
        ] {
            let body = serde_json::to_vec(&body).unwrap();
            assert!(matches!(
                extract_questions(&body),
                Err(GenerateError::MissingText)
            ));
        }
    }

    #[test]
    fn malformed_generated_text_is_an_error() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"questions\": [" }] } }]
        });
        let body = serde_json::to_vec(&body).unwrap();
        assert!(matches!(extract_questions(&body), Err(GenerateError::Json(_))));

        assert!(matches!(
            extract_questions(b"<html>"),
            Err(GenerateError::Json(_))
        ));
    }
}
