// src/models/question.rs

use serde::{Deserialize, Serialize};

/// Question categories supported by the quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "MCQ_SINGLE")]
    McqSingle,
    #[serde(rename = "MCQ_MULTI")]
    McqMulti,
    #[serde(rename = "TRUE_FALSE")]
    TrueFalse,
    #[serde(rename = "CODE")]
    Code,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A user-supplied (or correct) answer value.
///
/// Single-choice, true/false and code questions carry one string;
/// multiple-choice questions carry the list of selected options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
}

/// One entry in the immutable question bank.
///
/// `correct_answer` and `explanation` must never reach a client before
/// completion; handlers expose [`PublicQuestion`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,

    #[serde(rename = "type")]
    pub question_type: QuestionType,

    pub text: String,

    /// Choice strings in display order. The order is stable and shared
    /// by every participant.
    pub options: Vec<String>,

    pub correct_answer: AnswerValue,

    pub difficulty: Difficulty,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,

    /// Shown only after completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// DTO for sending a question to the client (answer key stripped).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    pub options: Vec<String>,
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id.clone(),
            question_type: q.question_type,
            text: q.text.clone(),
            options: q.options.clone(),
            difficulty: q.difficulty,
            code_snippet: q.code_snippet.clone(),
        }
    }
}
