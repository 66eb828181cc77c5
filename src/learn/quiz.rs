use crate::capsules::QuizQuestion;

/// Outcome of answering one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub correct_index: usize,
    /// Text of the correct option, or its index when the option is missing
    pub correct_label: String,
}

/// Final numbers for a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizResult {
    pub correct: usize,
    pub total: usize,
    pub score: u8,
    pub best_score: u8,
    pub new_best: bool,
}

/// One pass through a capsule's quiz, in order
#[derive(Debug, Clone)]
pub struct QuizRun {
    questions: Vec<QuizQuestion>,
    current: usize,
    correct: usize,
}

impl QuizRun {
    /// `None` when there is nothing to ask
    pub fn new(questions: Vec<QuizQuestion>) -> Option<Self> {
        if questions.is_empty() {
            return None;
        }
        Some(Self {
            questions,
            current: 0,
            correct: 0,
        })
    }

    pub fn current(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    /// Zero-based position of the question being asked
    pub fn position(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn correct(&self) -> usize {
        self.correct
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.questions.len()
    }

    /// Answer the current question and move on. `None` once finished.
    pub fn answer(&mut self, choice: usize) -> Option<AnswerFeedback> {
        let question = self.questions.get(self.current)?;
        let correct = question.is_correct(choice);
        let feedback = AnswerFeedback {
            correct,
            correct_index: question.answer_index,
            correct_label: question
                .correct_option()
                .map(str::to_string)
                .unwrap_or_else(|| question.answer_index.to_string()),
        };

        if correct {
            self.correct += 1;
        }
        self.current += 1;
        Some(feedback)
    }

    /// Percentage of correct answers, rounded half up
    pub fn score(&self) -> u8 {
        percentage(self.correct, self.questions.len())
    }
}

pub fn percentage(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (correct * 200 + total) / (total * 2);
    u8::try_from(pct.min(100)).unwrap_or(100)
}
