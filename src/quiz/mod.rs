pub mod report;
pub mod session;
pub mod store;

use crate::error::SessionError;

/// The programming languages a quiz can be generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Topic {
    JavaScript,
    Python,
    Java,
    C,
    Cpp,
    Html,
    Sql,
}

impl Topic {
    pub const ALL: [Topic; 7] = [
        Topic::JavaScript,
        Topic::Python,
        Topic::Java,
        Topic::C,
        Topic::Cpp,
        Topic::Html,
        Topic::Sql,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Topic::JavaScript => "javascript",
            Topic::Python => "python",
            Topic::Java => "java",
            Topic::C => "c",
            Topic::Cpp => "cpp",
            Topic::Html => "html",
            Topic::Sql => "sql",
        }
    }

    /// Name shown to the user and sent to the question generator.
    pub fn name(&self) -> &'static str {
        match self {
            Topic::JavaScript => "JavaScript",
            Topic::Python => "Python",
            Topic::Java => "Java",
            Topic::C => "C",
            Topic::Cpp => "C++",
            Topic::Html => "HTML",
            Topic::Sql => "SQL",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Topic::JavaScript => "JS",
            Topic::Python => "Py",
            Topic::Java => "J",
            Topic::C => "C",
            Topic::Cpp => "C++",
            Topic::Html => "</>",
            Topic::Sql => "DB",
        }
    }

    // Telegram has no styling for keyboard buttons, so the color is a marker.
    pub fn color(&self) -> &'static str {
        match self {
            Topic::JavaScript => "🟨",
            Topic::Python => "🟦",
            Topic::Java => "🟥",
            Topic::C => "⬛",
            Topic::Cpp => "🔷",
            Topic::Html => "🟧",
            Topic::Sql => "🟩",
        }
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.color(), self.name())
    }

    pub fn from_id(id: &str) -> Option<Topic> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    /// Accepts either a keyboard label or a bare display name.
    pub fn from_label(text: &str) -> Option<Topic> {
        let text = text.trim();
        Self::ALL.into_iter().find(|t| {
            t.label() == text || t.name().eq_ignore_ascii_case(text) || t.id() == text
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Interview,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Interview,
    ];

    /// The token sent over the wire; it selects the prompt template.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Interview => "interview",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Interview => "Interview Questions",
        }
    }

    pub fn from_label(text: &str) -> Option<Difficulty> {
        let text = text.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.label() == text || d.as_str().eq_ignore_ascii_case(text))
    }
}

/// One generated multiple-choice question, in the shape the model returns it.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub text: String,
    pub options: Vec<String>,
    pub answer: String,
    pub subtopic: String,
}

impl Question {
    pub fn new(text: String, options: Vec<String>, answer: String, subtopic: String) -> Self {
        Self {
            text,
            options,
            answer,
            subtopic,
        }
    }

    pub fn is_correct(&self, option: &str) -> bool {
        option == self.answer
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// A question whose answer is not among its options can never be
    /// answered correctly, so it is rejected up front.
    pub fn validate(&self) -> Result<(), String> {
        if self.options.is_empty() {
            return Err("it has no options".to_string());
        }
        if !self.has_option(&self.answer) {
            return Err(format!("answer {:?} is not one of the options", self.answer));
        }
        Ok(())
    }
}

/// What happened when the user picked an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_answer: String,
}

/// Progress through one generated question set.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Quiz {
    pub questions: Vec<Question>,
    pub current_question: usize,
    pub score: usize,
    pub wrong_subtopics: Vec<String>,
    pub answered: bool,
}

impl Quiz {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            current_question: 0,
            score: 0,
            wrong_subtopics: Vec::new(),
            answered: false,
        }
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.current_question)
    }

    pub fn is_finished(&self) -> bool {
        self.current_question >= self.questions.len()
    }

    pub fn score_line(&self) -> String {
        format!("Score: {} / {}", self.score, self.questions.len())
    }

    /// Scores the current question. Only the first answer counts.
    pub fn answer(&mut self, option: &str) -> Result<AnswerOutcome, SessionError> {
        if self.answered {
            return Err(SessionError::AlreadyAnswered);
        }
        let question = self.current().ok_or(SessionError::NotInQuiz)?;
        if !question.has_option(option) {
            return Err(SessionError::UnknownOption(option.to_string()));
        }

        let outcome = AnswerOutcome {
            correct: question.is_correct(option),
            correct_answer: question.answer.clone(),
        };
        if outcome.correct {
            self.score += 1;
        } else {
            let subtopic = question.subtopic.clone();
            self.wrong_subtopics.push(subtopic);
        }
        self.answered = true;
        Ok(outcome)
    }

    /// Moves past an answered question.
    pub fn advance(&mut self) -> Result<(), SessionError> {
        if !self.answered {
            return Err(SessionError::NotAnswered);
        }
        self.current_question += 1;
        self.answered = false;
        Ok(())
    }
}
