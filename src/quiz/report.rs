use crate::quiz::Quiz;

/// A subtopic the user got wrong, with how many times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeakArea {
    pub subtopic: String,
    pub misses: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizReport {
    pub score: usize,
    pub total: usize,
    pub weak_areas: Vec<WeakArea>,
}

impl QuizReport {
    pub fn from_quiz(quiz: &Quiz) -> Self {
        Self {
            score: quiz.score,
            total: quiz.questions.len(),
            weak_areas: weak_areas(&quiz.wrong_subtopics),
        }
    }

    pub fn headline(&self) -> String {
        format!("You scored {} out of {}!", self.score, self.total)
    }

    pub fn is_perfect(&self) -> bool {
        self.weak_areas.is_empty()
    }
}

/// Counts each distinct subtopic, most missed first.
///
/// Ties keep the order in which the subtopics were first missed.
pub fn weak_areas(wrong_subtopics: &[String]) -> Vec<WeakArea> {
    let mut areas: Vec<WeakArea> = Vec::new();
    for subtopic in wrong_subtopics {
        match areas.iter_mut().find(|a| &a.subtopic == subtopic) {
            Some(area) => area.misses += 1,
            None => areas.push(WeakArea {
                subtopic: subtopic.clone(),
                misses: 1,
            }),
        }
    }
    // sort_by is stable
    areas.sort_by(|a, b| b.misses.cmp(&a.misses));
    areas
}
