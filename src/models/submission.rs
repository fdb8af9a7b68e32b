// src/models/submission.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'user_submissions' table: the submission ledger.
/// At most one row exists per (user, question) pair; re-submission overwrites.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    pub selected_option_id: i32,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting a single answer.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    pub selected_option_id: i32,
}

/// DTO for submitting a whole quiz in one call.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: Vec<SubmitAnswerRequest>,
}

/// Per-question outcome inside a results response.
#[derive(Debug, PartialEq, Serialize)]
pub struct QuestionResult {
    pub question_id: i64,
    pub question: String,
    pub selected_option_id: Option<i32>,
    pub correct_option_id: i32,
    pub attempted: bool,
    pub correct: bool,
}

/// Aggregate numbers for one user's quiz run.
#[derive(Debug, PartialEq, Serialize)]
pub struct ResultSummary {
    pub total_questions: usize,
    pub attempted_questions: usize,
    pub correct_answers: usize,
    /// Score is the correct-answer count; no weighting or negative marking.
    pub score: usize,
    pub last_submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Full results payload. `attempted` is false when the user has no
/// submissions at all, which is distinct from scoring zero.
#[derive(Debug, Serialize)]
pub struct QuizResultsResponse {
    pub attempted: bool,
    pub summary: Option<ResultSummary>,
    pub questions: Vec<QuestionResult>,
}

/// One ranked row of the leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: i64,
    pub name: String,
    pub school: String,
    pub total_answered: i64,
    pub correct_answers: i64,
    /// correct / attempted, as a percentage rounded to two decimals.
    pub accuracy: f64,
    pub score: i64,
}
