// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        document::{RejectDocumentRequest, UploadedDocument},
        question::{
            CreateQuestionRequest, QuestionWithAnswer, UpdateQuestionRequest,
            validate_question_options,
        },
        settings::{QuizSettings, SaveQuizSettingsRequest},
        user::UserListItem,
    },
};

/// Lists all registered students.
/// Admin only.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, UserListItem>(
        "SELECT id, name, email, school, rollno, branch, created_at
         FROM users
         ORDER BY id DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(users))
}

/// Lists the whole question bank including correct option ids.
/// Admin only; quiz takers go through the public question list instead.
pub async fn list_questions_with_answers(
    State(pool): State<PgPool>,
) -> Result<impl IntoResponse, AppError> {
    let questions = sqlx::query_as::<_, QuestionWithAnswer>(
        "SELECT q.id, q.question, q.options, q.subject, ca.correct_option_id
         FROM questions q
         JOIN correct_answers ca ON ca.question_id = q.id
         ORDER BY q.id",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(questions))
}

/// Creates a question and its correct answer in one transaction.
///
/// Rejected up front: duplicate question text, duplicate option texts, and a
/// correct option id that is not one of the question's options. The correct
/// answer is never validated at scoring time, so it must be right here.
pub async fn create_question(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    validate_question_options(&payload.options, payload.correct_option_id)
        .map_err(AppError::BadRequest)?;

    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM questions WHERE question = $1")
        .bind(&payload.question)
        .fetch_optional(&pool)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("This question already exists".to_string()));
    }

    let options_json = serde_json::to_value(&payload.options)?;

    let mut tx = pool.begin().await?;

    let question_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO questions (question, options, subject)
         VALUES ($1, $2, $3)
         RETURNING id",
    )
    .bind(&payload.question)
    .bind(&options_json)
    .bind(&payload.subject)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO correct_answers (question_id, correct_option_id) VALUES ($1, $2)")
        .bind(question_id)
        .bind(payload.correct_option_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to commit question insert: {:?}", e);
        AppError::from(e)
    })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"id": question_id})),
    ))
}

/// Replaces a question's text, options, subject and correct answer.
/// Same invariants as creation; both tables change in one transaction.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    validate_question_options(&payload.options, payload.correct_option_id)
        .map_err(AppError::BadRequest)?;

    let duplicate = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM questions WHERE question = $1 AND id != $2",
    )
    .bind(&payload.question)
    .bind(id)
    .fetch_optional(&pool)
    .await?;
    if duplicate.is_some() {
        return Err(AppError::Conflict(
            "A question with this text already exists".to_string(),
        ));
    }

    let options_json = serde_json::to_value(&payload.options)?;

    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE questions SET question = $1, options = $2, subject = $3, updated_at = NOW()
         WHERE id = $4",
    )
    .bind(&payload.question)
    .bind(&options_json)
    .bind(&payload.subject)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    // Upsert: restores the answer row even if it went missing out of band.
    sqlx::query(
        "INSERT INTO correct_answers (question_id, correct_option_id)
         VALUES ($1, $2)
         ON CONFLICT (question_id)
         DO UPDATE SET correct_option_id = EXCLUDED.correct_option_id, updated_at = NOW()",
    )
    .bind(id)
    .bind(payload.correct_option_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(StatusCode::OK)
}

/// Deletes a question; the correct-answer row and any submissions cascade.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Fetches the global quiz settings, or defaults when none are saved yet.
pub async fn get_quiz_settings(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let settings = sqlx::query_as::<_, QuizSettings>(
        "SELECT id, per_quiz_time_limit, randomize_questions, allow_retake, max_attempts,
                show_correct_answers, prevent_tab_switching, is_live, updated_at
         FROM quiz_settings
         LIMIT 1",
    )
    .fetch_optional(&pool)
    .await?;

    match settings {
        Some(settings) => Ok(Json(settings)),
        None => Ok(Json(QuizSettings {
            id: 0,
            per_quiz_time_limit: 30,
            randomize_questions: true,
            allow_retake: false,
            max_attempts: 1,
            show_correct_answers: false,
            prevent_tab_switching: true,
            is_live: false,
            updated_at: None,
        })),
    }
}

/// Saves the global quiz settings, creating the single row on first save.
pub async fn save_quiz_settings(
    State(pool): State<PgPool>,
    Json(payload): Json<SaveQuizSettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let existing_id = sqlx::query_scalar::<_, i64>("SELECT id FROM quiz_settings LIMIT 1")
        .fetch_optional(&pool)
        .await?;

    match existing_id {
        Some(id) => {
            sqlx::query(
                "UPDATE quiz_settings
                 SET per_quiz_time_limit = $1, randomize_questions = $2, allow_retake = $3,
                     max_attempts = $4, show_correct_answers = $5, prevent_tab_switching = $6,
                     is_live = $7, updated_at = NOW()
                 WHERE id = $8",
            )
            .bind(payload.per_quiz_time_limit)
            .bind(payload.randomize_questions)
            .bind(payload.allow_retake)
            .bind(payload.max_attempts)
            .bind(payload.show_correct_answers)
            .bind(payload.prevent_tab_switching)
            .bind(payload.is_live)
            .bind(id)
            .execute(&pool)
            .await?;
        }
        None => {
            sqlx::query(
                "INSERT INTO quiz_settings
                     (per_quiz_time_limit, randomize_questions, allow_retake, max_attempts,
                      show_correct_answers, prevent_tab_switching, is_live)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(payload.per_quiz_time_limit)
            .bind(payload.randomize_questions)
            .bind(payload.allow_retake)
            .bind(payload.max_attempts)
            .bind(payload.show_correct_answers)
            .bind(payload.prevent_tab_switching)
            .bind(payload.is_live)
            .execute(&pool)
            .await?;
        }
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Quiz settings saved successfully"
    })))
}

/// Lists every uploaded document for review.
/// Admins and maintainers.
pub async fn list_documents(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let documents = sqlx::query_as::<_, UploadedDocument>(
        "SELECT id, user_id, document_type, category, file_url, file_name, file_key,
                file_size, mime_type, verified, rejected, rejection_reason, created_at
         FROM upload_files
         ORDER BY created_at DESC",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(documents))
}

/// Marks a document verified, clearing any previous rejection.
pub async fn verify_document(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query(
        "UPDATE upload_files
         SET verified = TRUE, rejected = FALSE, rejection_reason = NULL
         WHERE id = $1",
    )
    .bind(id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Document not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Marks a document rejected with a reason, clearing any previous approval.
pub async fn reject_document(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<RejectDocumentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let result = sqlx::query(
        "UPDATE upload_files
         SET verified = FALSE, rejected = TRUE, rejection_reason = $1
         WHERE id = $2",
    )
    .bind(&payload.reason)
    .bind(id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Document not found".to_string()));
    }

    Ok(StatusCode::OK)
}
