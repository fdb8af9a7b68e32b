// src/handlers/quiz.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;
use tokio::task::JoinSet;

use crate::{
    error::AppError,
    models::{
        question::{PublicQuestion, QuestionOption},
        settings::QuizStatusResponse,
        submission::{
            LeaderboardEntry, QuestionResult, QuizResultsResponse, ResultSummary, Submission,
            SubmitAnswerRequest, SubmitQuizRequest,
        },
    },
    utils::jwt::{Claims, ROLE_ADMIN, ROLE_SUPERADMIN, ROLE_USER},
};

/// Answer key row: every question joined with its correct option.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AnswerKey {
    pub question_id: i64,
    pub question: String,
    pub correct_option_id: i32,
}

/// Per-user aggregate over the submission ledger, straight from SQL.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ScoreRow {
    pub user_id: i64,
    pub name: String,
    pub school: String,
    pub total_answered: i64,
    pub correct_answers: i64,
}

/// Lists the question bank for quiz takers, shuffled, answers withheld.
pub async fn list_questions(
    State(pool): State<PgPool>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let questions = sqlx::query_as::<_, PublicQuestion>(
        "SELECT id, question, options, subject FROM questions ORDER BY RANDOM()",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(questions))
}

/// Public quiz availability flag (the only setting quiz takers may see).
pub async fn quiz_status(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let is_live = sqlx::query_scalar::<_, bool>("SELECT is_live FROM quiz_settings LIMIT 1")
        .fetch_optional(&pool)
        .await?
        .unwrap_or(false);

    Ok(Json(QuizStatusResponse { is_live }))
}

/// Upserts one answer onto the (user, question) key.
///
/// The question must exist and the selected option must be one of its own
/// options; the portal used to persist anything, which left unscorable rows
/// in the ledger.
async fn upsert_answer(
    pool: &PgPool,
    user_id: i64,
    answer: &SubmitAnswerRequest,
) -> Result<(), AppError> {
    let options = sqlx::query_scalar::<_, sqlx::types::Json<Vec<QuestionOption>>>(
        "SELECT options FROM questions WHERE id = $1",
    )
    .bind(answer.question_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    if !options.iter().any(|o| o.id == answer.selected_option_id) {
        return Err(AppError::BadRequest(
            "Selected option is not one of the question's options".to_string(),
        ));
    }

    sqlx::query(
        "INSERT INTO user_submissions (user_id, question_id, selected_option_id, submitted_at)
         VALUES ($1, $2, $3, NOW())
         ON CONFLICT (user_id, question_id)
         DO UPDATE SET selected_option_id = EXCLUDED.selected_option_id, submitted_at = NOW()",
    )
    .bind(user_id)
    .bind(answer.question_id)
    .bind(answer.selected_option_id)
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert submission: {:?}", e);
        AppError::from(e)
    })?;

    Ok(())
}

/// Records a single answer. Re-submitting the same question overwrites the
/// previous choice.
pub async fn submit_answer(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if claims.role != ROLE_USER {
        return Err(AppError::Forbidden(
            "Only students can submit answers".to_string(),
        ));
    }
    let user_id = claims.principal_id()?;

    upsert_answer(&pool, user_id, &req).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Answer submitted successfully"
    })))
}

/// Records a whole quiz: one upsert per answer, issued concurrently.
///
/// There is no batch atomicity; whichever answers succeed stay recorded and
/// the response reports both counts so the client can retry the rest.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if claims.role != ROLE_USER {
        return Err(AppError::Forbidden(
            "Only students can submit answers".to_string(),
        ));
    }
    let user_id = claims.principal_id()?;

    if req.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    let mut tasks = JoinSet::new();
    for answer in req.answers {
        let pool = pool.clone();
        tasks.spawn(async move { upsert_answer(&pool, user_id, &answer).await });
    }

    let mut recorded = 0usize;
    let mut failed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => recorded += 1,
            Ok(Err(e)) => {
                tracing::warn!("Answer rejected during bulk submit: {}", e);
                failed += 1;
            }
            Err(e) => {
                tracing::error!("Submit task panicked: {:?}", e);
                failed += 1;
            }
        }
    }

    Ok(Json(serde_json::json!({
        "success": failed == 0,
        "recorded": recorded,
        "failed": failed,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ResultsParams {
    /// Admins may inspect another user's results.
    pub user_id: Option<i64>,
}

/// Computes quiz results for a user: every question classified as
/// attempted/unattempted and correct/incorrect, plus a summary.
///
/// Only student ids live in the users table, so the "own results" default
/// applies to students alone; admin and maintainer ids come from their own
/// tables and must name a target user explicitly.
pub async fn get_results(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ResultsParams>,
) -> Result<impl IntoResponse, AppError> {
    let own_id = claims.principal_id()?;
    let target_id = match params.user_id {
        Some(id) => id,
        None if claims.role == ROLE_USER => own_id,
        None => {
            return Err(AppError::BadRequest(
                "The user_id query parameter is required".to_string(),
            ));
        }
    };

    if claims.role == ROLE_USER && target_id != own_id {
        return Err(AppError::Forbidden(
            "You can only view your own quiz results".to_string(),
        ));
    }
    if claims.role != ROLE_USER && claims.role != ROLE_ADMIN && claims.role != ROLE_SUPERADMIN {
        return Err(AppError::Forbidden(
            "You cannot view quiz results".to_string(),
        ));
    }

    let keys = sqlx::query_as::<_, AnswerKey>(
        "SELECT q.id AS question_id, q.question, ca.correct_option_id
         FROM questions q
         JOIN correct_answers ca ON ca.question_id = q.id
         ORDER BY q.id",
    )
    .fetch_all(&pool)
    .await?;

    let submissions = sqlx::query_as::<_, Submission>(
        "SELECT id, user_id, question_id, selected_option_id, submitted_at
         FROM user_submissions
         WHERE user_id = $1",
    )
    .bind(target_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(build_results(&keys, &submissions)))
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    /// Optional top-N slice; the full list is returned by default.
    pub limit: Option<usize>,
}

/// Ranks every registered user by score. Recomputed from the ledger on each
/// read; at hundreds of users and tens of questions that is cheap.
pub async fn get_leaderboard(
    State(pool): State<PgPool>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, ScoreRow>(
        "SELECT u.id AS user_id, u.name, u.school,
                COUNT(s.id) AS total_answered,
                COUNT(s.id) FILTER (WHERE s.selected_option_id = ca.correct_option_id)
                    AS correct_answers
         FROM users u
         LEFT JOIN user_submissions s ON s.user_id = u.id
         LEFT JOIN correct_answers ca ON ca.question_id = s.question_id
         GROUP BY u.id, u.name, u.school
         ORDER BY u.id",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to aggregate leaderboard: {:?}", e);
        AppError::from(e)
    })?;

    let mut entries = rank_leaderboard(rows);
    if let Some(limit) = params.limit {
        entries.truncate(limit);
    }

    Ok(Json(entries))
}

/// Joins the answer key with one user's submissions.
///
/// A user with no submissions at all gets `attempted: false` and no summary;
/// "never took the quiz" must stay distinguishable from "scored 0".
fn build_results(keys: &[AnswerKey], submissions: &[Submission]) -> QuizResultsResponse {
    let by_question: HashMap<i64, &Submission> =
        submissions.iter().map(|s| (s.question_id, s)).collect();

    let mut attempted_questions = 0;
    let mut correct_answers = 0;

    let questions: Vec<QuestionResult> = keys
        .iter()
        .map(|key| {
            let submission = by_question.get(&key.question_id);
            let selected_option_id = submission.map(|s| s.selected_option_id);
            let correct = selected_option_id == Some(key.correct_option_id);

            if submission.is_some() {
                attempted_questions += 1;
                if correct {
                    correct_answers += 1;
                }
            }

            QuestionResult {
                question_id: key.question_id,
                question: key.question.clone(),
                selected_option_id,
                correct_option_id: key.correct_option_id,
                attempted: submission.is_some(),
                correct,
            }
        })
        .collect();

    if submissions.is_empty() {
        return QuizResultsResponse {
            attempted: false,
            summary: None,
            questions,
        };
    }

    let last_submitted_at = submissions.iter().map(|s| s.submitted_at).max();

    QuizResultsResponse {
        attempted: true,
        summary: Some(ResultSummary {
            total_questions: keys.len(),
            attempted_questions,
            correct_answers,
            score: correct_answers,
            last_submitted_at,
        }),
        questions,
    }
}

/// Sorts aggregates by score descending and assigns 1-based ranks.
/// The sort is stable, so ties keep their aggregation order.
fn rank_leaderboard(mut rows: Vec<ScoreRow>) -> Vec<LeaderboardEntry> {
    rows.sort_by(|a, b| b.correct_answers.cmp(&a.correct_answers));

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let accuracy = if row.total_answered > 0 {
                let pct = row.correct_answers as f64 / row.total_answered as f64 * 100.0;
                (pct * 100.0).round() / 100.0
            } else {
                0.0
            };

            LeaderboardEntry {
                rank: index + 1,
                user_id: row.user_id,
                name: row.name,
                school: row.school,
                total_answered: row.total_answered,
                correct_answers: row.correct_answers,
                accuracy,
                score: row.correct_answers,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn key(question_id: i64, correct: i32) -> AnswerKey {
        AnswerKey {
            question_id,
            question: format!("Question {}", question_id),
            correct_option_id: correct,
        }
    }

    fn submission(user_id: i64, question_id: i64, selected: i32) -> Submission {
        Submission {
            id: question_id,
            user_id,
            question_id,
            selected_option_id: selected,
            submitted_at: Utc::now(),
        }
    }

    fn score_row(user_id: i64, answered: i64, correct: i64) -> ScoreRow {
        ScoreRow {
            user_id,
            name: format!("User {}", user_id),
            school: "Test High".to_string(),
            total_answered: answered,
            correct_answers: correct,
        }
    }

    #[test]
    fn zero_submissions_reports_not_attempted_not_zero_score() {
        let keys = vec![key(1, 2), key(2, 1)];
        let results = build_results(&keys, &[]);

        assert!(!results.attempted);
        assert!(results.summary.is_none());
        assert_eq!(results.questions.len(), 2);
        assert!(results.questions.iter().all(|q| !q.attempted && !q.correct));
    }

    #[test]
    fn summary_counts_attempted_and_correct_separately() {
        let keys = vec![key(1, 2), key(2, 1), key(3, 3)];
        // Question 1 right, question 2 wrong, question 3 untouched.
        let subs = vec![submission(7, 1, 2), submission(7, 2, 4)];

        let results = build_results(&keys, &subs);
        let summary = results.summary.unwrap();

        assert!(results.attempted);
        assert_eq!(summary.total_questions, 3);
        assert_eq!(summary.attempted_questions, 2);
        assert_eq!(summary.correct_answers, 1);
        assert_eq!(summary.score, 1);
    }

    #[test]
    fn last_submitted_at_is_the_latest_timestamp() {
        let keys = vec![key(1, 1), key(2, 1)];
        let mut older = submission(7, 1, 1);
        older.submitted_at = Utc::now() - Duration::hours(2);
        let newer = submission(7, 2, 1);
        let expected = newer.submitted_at;

        let results = build_results(&keys, &[older, newer]);
        assert_eq!(results.summary.unwrap().last_submitted_at, Some(expected));
    }

    #[test]
    fn higher_score_ranks_first() {
        // A answered 5/5, B answered 5 with 3 correct.
        let entries = rank_leaderboard(vec![score_row(1, 5, 3), score_row(2, 5, 5)]);

        assert_eq!(entries[0].user_id, 2);
        assert_eq!(entries[0].score, 5);
        assert_eq!(entries[1].user_id, 1);
        assert_eq!(entries[1].score, 3);
    }

    #[test]
    fn ranks_are_the_sequence_one_to_n() {
        let rows: Vec<ScoreRow> = (1..=6).map(|i| score_row(i, 10, i)).collect();
        let entries = rank_leaderboard(rows);

        let ranks: Vec<usize> = entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn attempted_counts_sum_to_ledger_size() {
        let rows = vec![score_row(1, 4, 2), score_row(2, 0, 0), score_row(3, 3, 3)];
        let ledger_rows = 4 + 0 + 3;

        let entries = rank_leaderboard(rows);
        let total: i64 = entries.iter().map(|e| e.total_answered).sum();
        assert_eq!(total, ledger_rows);
    }

    #[test]
    fn ranking_is_idempotent_without_writes() {
        let rows = vec![score_row(1, 5, 2), score_row(2, 5, 2), score_row(3, 5, 4)];

        let first = rank_leaderboard(rows.clone());
        let second = rank_leaderboard(rows);

        let as_pairs = |entries: &[LeaderboardEntry]| {
            entries
                .iter()
                .map(|e| (e.rank, e.user_id))
                .collect::<Vec<_>>()
        };
        assert_eq!(as_pairs(&first), as_pairs(&second));
        // Tied users keep their aggregation order.
        assert_eq!(first[1].user_id, 1);
        assert_eq!(first[2].user_id, 2);
    }

    #[test]
    fn accuracy_is_a_percentage_with_two_decimals() {
        let entries = rank_leaderboard(vec![score_row(1, 3, 1), score_row(2, 0, 0)]);

        let attempted = entries.iter().find(|e| e.user_id == 1).unwrap();
        let idle = entries.iter().find(|e| e.user_id == 2).unwrap();
        assert_eq!(attempted.accuracy, 33.33);
        assert_eq!(idle.accuracy, 0.0);
    }
}
