// src/models/question.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// A single answer option. Options live inside the question row as a JSONB
/// array; the id is what submissions and the correct-answer row reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: i32,
    pub text: String,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The question text. Unique across the bank.
    pub question: String,

    pub options: Json<Vec<QuestionOption>>,

    /// Subject label, e.g. 'Arithmetic' or 'Reasoning'.
    pub subject: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for sending a question to quiz takers (correct answer withheld).
#[derive(Debug, Serialize, FromRow)]
pub struct PublicQuestion {
    pub id: i64,
    pub question: String,
    pub options: Json<Vec<QuestionOption>>,
    pub subject: String,
}

/// Question joined with its correct option, for the admin bank view.
#[derive(Debug, Serialize, FromRow)]
pub struct QuestionWithAnswer {
    pub id: i64,
    pub question: String,
    pub options: Json<Vec<QuestionOption>>,
    pub subject: String,
    pub correct_option_id: i32,
}

/// DTO for creating a new question together with its correct option.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    pub options: Vec<QuestionOption>,
    pub correct_option_id: i32,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
}

/// DTO for updating a question. The whole payload is replaced, matching the
/// create shape, so the same invariants apply.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    pub options: Vec<QuestionOption>,
    pub correct_option_id: i32,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
}

/// Checks the question-bank invariants that span the whole payload:
/// at least two options, option ids and texts unique within the question
/// (texts case-insensitive, whitespace-trimmed), and the correct option id
/// referencing one of the question's own options.
pub fn validate_question_options(
    options: &[QuestionOption],
    correct_option_id: i32,
) -> Result<(), String> {
    if options.len() < 2 {
        return Err("A question needs at least two options.".to_string());
    }

    let mut seen_ids = HashSet::new();
    let mut seen = HashSet::new();
    for option in options {
        // A duplicated id would make the correct-option reference ambiguous.
        if !seen_ids.insert(option.id) {
            return Err("Option ids must be unique for each question.".to_string());
        }
        let normalized = option.text.trim().to_lowercase();
        if normalized.is_empty() {
            return Err("Option text cannot be empty.".to_string());
        }
        if !seen.insert(normalized) {
            return Err("All options must be unique for each question.".to_string());
        }
    }

    if !options.iter().any(|o| o.id == correct_option_id) {
        return Err("Correct option id is not one of the question's options.".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(texts: &[&str]) -> Vec<QuestionOption> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| QuestionOption {
                id: i as i32 + 1,
                text: t.to_string(),
            })
            .collect()
    }

    #[test]
    fn accepts_a_well_formed_question() {
        let options = opts(&["Delhi", "Mumbai", "Chennai", "Kolkata"]);
        assert!(validate_question_options(&options, 1).is_ok());
    }

    #[test]
    fn rejects_duplicate_option_texts_ignoring_case_and_whitespace() {
        let options = opts(&["Delhi", " delhi ", "Mumbai"]);
        assert!(validate_question_options(&options, 1).is_err());
    }

    #[test]
    fn rejects_correct_option_outside_the_question() {
        // The invariant is enforced at creation time, never at scoring time.
        let options = opts(&["Yes", "No"]);
        let err = validate_question_options(&options, 9).unwrap_err();
        assert!(err.contains("not one of the question's options"));
    }

    #[test]
    fn rejects_fewer_than_two_options() {
        let options = opts(&["Only one"]);
        assert!(validate_question_options(&options, 1).is_err());
    }

    #[test]
    fn rejects_duplicate_option_ids() {
        let options = vec![
            QuestionOption { id: 1, text: "A".into() },
            QuestionOption { id: 1, text: "B".into() },
        ];
        let err = validate_question_options(&options, 1).unwrap_err();
        assert!(err.contains("Option ids must be unique"));
    }

    #[test]
    fn rejects_empty_option_text() {
        let options = vec![
            QuestionOption { id: 1, text: "A".into() },
            QuestionOption { id: 2, text: "   ".into() },
        ];
        assert!(validate_question_options(&options, 1).is_err());
    }
}
