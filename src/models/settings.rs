// src/models/settings.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the single-row 'quiz_settings' table: global quiz behavior
/// toggles managed by admins. The anti-cheat flags only drive client-side
/// affordances; they are not a security boundary.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizSettings {
    pub id: i64,
    pub per_quiz_time_limit: i32,
    pub randomize_questions: bool,
    pub allow_retake: bool,
    pub max_attempts: i32,
    pub show_correct_answers: bool,
    pub prevent_tab_switching: bool,
    pub is_live: bool,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for saving quiz settings. The whole row is replaced.
#[derive(Debug, Deserialize, Validate)]
pub struct SaveQuizSettingsRequest {
    #[validate(range(min = 0, max = 600))]
    pub per_quiz_time_limit: i32,
    pub randomize_questions: bool,
    pub allow_retake: bool,
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: i32,
    pub show_correct_answers: bool,
    pub prevent_tab_switching: bool,
    pub is_live: bool,
}

/// The slice of settings exposed to quiz takers.
#[derive(Debug, Serialize)]
pub struct QuizStatusResponse {
    pub is_live: bool,
}
