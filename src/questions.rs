// src/questions.rs

use std::collections::HashMap;

use crate::models::question::{AnswerValue, Difficulty, PublicQuestion, Question, QuestionType};

/// The fixed, ordered quiz sequence. Loaded once at process start;
/// the order defines the paper every participant sees.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
    by_id: HashMap<String, usize>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Self {
        let by_id = questions
            .iter()
            .enumerate()
            .map(|(i, q)| (q.id.clone(), i))
            .collect();
        QuestionBank { questions, by_id }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.by_id.get(id).map(|&i| &self.questions[i])
    }

    /// The question list with answer keys and explanations stripped,
    /// safe to hand to a client mid-attempt.
    pub fn sanitized(&self) -> Vec<PublicQuestion> {
        self.questions.iter().map(PublicQuestion::from).collect()
    }

    /// The built-in ten-question JavaScript quiz.
    pub fn builtin() -> Self {
        QuestionBank::new(vec![
            single(
                "q1",
                "Which of the following is NOT a JavaScript data type?",
                &["Symbol", "Boolean", "Float", "BigInt"],
                "Float",
                Difficulty::Easy,
                None,
                Some(
                    "Float is not a primitive data type in JavaScript. Numbers are always \
                     floating-point, but the type is just 'Number'.",
                ),
            ),
            single(
                "q2",
                "What is the output of the following code?",
                &["'number'", "'NaN'", "'undefined'", "'object'"],
                "'number'",
                Difficulty::Easy,
                Some("console.log(typeof NaN);"),
                Some("NaN stands for 'Not-a-Number', but its type is technically 'number'."),
            ),
            multi(
                "q3",
                "Which of these are valid ways to declare a variable in modern JavaScript?",
                &["var", "let", "const", "def"],
                &["var", "let", "const"],
                Difficulty::Easy,
                Some("'def' is used in Python, not JavaScript."),
            ),
            single(
                "q4",
                "What does the 'useEffect' hook do in React?",
                &[
                    "Manages state",
                    "Performs side effects",
                    "Creates a reference",
                    "Optimizes rendering",
                ],
                "Performs side effects",
                Difficulty::Medium,
                None,
                None,
            ),
            true_false(
                "q5",
                "In JavaScript, 'null' is an object.",
                "True",
                Difficulty::Medium,
                Some("This is a long-standing bug in JS. typeof null returns 'object'."),
            ),
            single(
                "q6",
                "What is the time complexity of searching in a Hash Map (average case)?",
                &["O(n)", "O(log n)", "O(1)", "O(n log n)"],
                "O(1)",
                Difficulty::Medium,
                None,
                None,
            ),
            single(
                "q7",
                "Which method is used to remove the last element from an array?",
                &["shift()", "pop()", "push()", "unshift()"],
                "pop()",
                Difficulty::Easy,
                None,
                None,
            ),
            code(
                "q8",
                "What will this code log?",
                "const a = [1, 2, 3];\nconst b = a;\nb.push(4);\nconsole.log(a.length);",
                &["3", "4", "undefined", "Error"],
                "4",
                Difficulty::Medium,
                Some("Arrays are reference types. 'b' references the same array as 'a'."),
            ),
            single(
                "q9",
                "Which HTTP status code represents 'Teapot'?",
                &["404", "500", "418", "200"],
                "418",
                Difficulty::Hard,
                None,
                Some("418 I'm a teapot is an RFC 2324 joke code."),
            ),
            single(
                "q10",
                "What is 'Hoisting' in JavaScript?",
                &[
                    "Lifting heavy weights",
                    "Moving declarations to the top",
                    "Moving initializations to the top",
                    "None of the above",
                ],
                "Moving declarations to the top",
                Difficulty::Medium,
                None,
                None,
            ),
        ])
    }
}

fn owned(strs: &[&str]) -> Vec<String> {
    strs.iter().map(|s| s.to_string()).collect()
}

fn single(
    id: &str,
    text: &str,
    options: &[&str],
    answer: &str,
    difficulty: Difficulty,
    code_snippet: Option<&str>,
    explanation: Option<&str>,
) -> Question {
    Question {
        id: id.to_string(),
        question_type: QuestionType::McqSingle,
        text: text.to_string(),
        options: owned(options),
        correct_answer: AnswerValue::Single(answer.to_string()),
        difficulty,
        code_snippet: code_snippet.map(|s| s.to_string()),
        explanation: explanation.map(|s| s.to_string()),
    }
}

fn multi(
    id: &str,
    text: &str,
    options: &[&str],
    answers: &[&str],
    difficulty: Difficulty,
    explanation: Option<&str>,
) -> Question {
    Question {
        id: id.to_string(),
        question_type: QuestionType::McqMulti,
        text: text.to_string(),
        options: owned(options),
        correct_answer: AnswerValue::Multiple(owned(answers)),
        difficulty,
        code_snippet: None,
        explanation: explanation.map(|s| s.to_string()),
    }
}

fn true_false(
    id: &str,
    text: &str,
    answer: &str,
    difficulty: Difficulty,
    explanation: Option<&str>,
) -> Question {
    Question {
        id: id.to_string(),
        question_type: QuestionType::TrueFalse,
        text: text.to_string(),
        options: owned(&["True", "False"]),
        correct_answer: AnswerValue::Single(answer.to_string()),
        difficulty,
        code_snippet: None,
        explanation: explanation.map(|s| s.to_string()),
    }
}

fn code(
    id: &str,
    text: &str,
    snippet: &str,
    options: &[&str],
    answer: &str,
    difficulty: Difficulty,
    explanation: Option<&str>,
) -> Question {
    Question {
        id: id.to_string(),
        question_type: QuestionType::Code,
        text: text.to_string(),
        options: owned(options),
        correct_answer: AnswerValue::Single(answer.to_string()),
        difficulty,
        code_snippet: Some(snippet.to_string()),
        explanation: explanation.map(|s| s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_bank_has_stable_order_and_unique_ids() {
        let bank = QuestionBank::builtin();
        assert_eq!(bank.len(), 10);
        let ids: Vec<&str> = bank.questions().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids[0], "q1");
        assert_eq!(ids[9], "q10");
        let unique: std::collections::HashSet<&&str> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn sanitized_questions_carry_no_answer_key() {
        let bank = QuestionBank::builtin();
        let json = serde_json::to_value(bank.sanitized()).unwrap();
        let text = json.to_string();
        assert!(!text.contains("correctAnswer"));
        assert!(!text.contains("explanation"));
        assert_eq!(json.as_array().unwrap().len(), 10);
    }
}
