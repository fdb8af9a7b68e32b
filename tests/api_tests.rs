// tests/api_tests.rs
//
// Integration tests against a live Postgres instance. Run them with a
// database available:
//
//     DATABASE_URL=postgres://... cargo test -- --ignored

use std::sync::{Arc, Mutex};

use quiz_portal::{
    config::Config,
    routes,
    state::AppState,
    utils::notify::{LogNotifier, ResetNotifier, SharedNotifier},
};
use sqlx::postgres::PgPoolOptions;

/// Notifier that records delivered reset tokens instead of sending them.
#[derive(Default)]
struct CapturingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl CapturingNotifier {
    fn last_token_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, token)| token.clone())
    }
}

impl ResetNotifier for CapturingNotifier {
    fn deliver_reset_token(&self, email: &str, token: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), token.to_string()));
    }
}

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    spawn_app_with_notifier(Arc::new(LogNotifier)).await
}

async fn spawn_app_with_notifier(notifier: SharedNotifier) -> String {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        secure_cookies: false,
        admin_username: None,
        admin_password: None,
        super_admin_username: Some("root".to_string()),
        super_admin_password: Some("root_password".to_string()),
    };

    let state = AppState {
        pool,
        config,
        notifier,
    };

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn unique_email() -> String {
    format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8])
}

fn register_body(email: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "email": email,
        "password": "password123",
        "mobile": format!("9{}", &uuid::Uuid::new_v4().as_u128().to_string()[..9]),
        "school": "Test High School",
        "rollno": "R-001",
        "branch": "Science",
    })
}

/// Registers a student and returns a bearer token.
async fn register_and_login(client: &reqwest::Client, address: &str, email: &str) -> String {
    let register_resp = client
        .post(format!("{}/api/auth/register", address))
        .json(&register_body(email, "Test Student"))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(register_resp.status().as_u16(), 201);

    let login_resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    login_resp["token"]
        .as_str()
        .expect("Token not found")
        .to_string()
}

/// Seeds one question directly and returns its id.
async fn seed_question(
    pool: &sqlx::PgPool,
    text: &str,
    correct_option_id: i32,
) -> i64 {
    let options = serde_json::json!([
        {"id": 1, "text": "Mercury"},
        {"id": 2, "text": "Venus"},
        {"id": 3, "text": "Mars"},
        {"id": 4, "text": "Jupiter"},
    ]);

    let question_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO questions (question, options, subject) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(text)
    .bind(&options)
    .bind("astronomy")
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO correct_answers (question_id, correct_option_id) VALUES ($1, $2)")
        .bind(question_id)
        .bind(correct_option_id)
        .execute(pool)
        .await
        .unwrap();

    question_id
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn health_check_404() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn register_works() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&register_body(&unique_email(), "New Student"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["id"].as_i64().is_some());
    assert!(body.get("password").is_none(), "hash must never leak");
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn register_fails_validation() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: not an email address
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&register_body("not-an-email", "Bad Student"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn duplicate_email_conflicts() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email();

    let first = client
        .post(format!("{}/api/auth/register", address))
        .json(&register_body(&email, "First"))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);

    // Act: same email again
    let second = client
        .post(format!("{}/api/auth/register", address))
        .json(&register_body(&email, "Second"))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn questions_require_auth() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: no token at all
    let response = client
        .get(format!("{}/api/quiz/questions", address))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn resubmitting_overwrites_previous_answer() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .unwrap();

    let question = format!("Overwrite check {}", uuid::Uuid::new_v4());
    let question_id = seed_question(&pool, &question, 3).await;

    let token = register_and_login(&client, &address, &unique_email()).await;

    // Act: wrong answer first, then the right one
    for selected in [2, 3] {
        let resp = client
            .post(format!("{}/api/quiz/submit", address))
            .header("Authorization", format!("Bearer {}", token))
            .json(&serde_json::json!({
                "question_id": question_id,
                "selected_option_id": selected,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    }

    // Assert: one ledger row per question, scored on the latest answer
    let results = client
        .get(format!("{}/api/quiz/results", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();

    assert_eq!(results["attempted"], true);
    assert_eq!(results["summary"]["attempted_questions"], 1);
    assert_eq!(results["summary"]["correct_answers"], 1);
    assert_eq!(results["summary"]["score"], 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn results_report_not_attempted_without_submissions() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address, &unique_email()).await;

    // Act
    let results = client
        .get(format!("{}/api/quiz/results", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();

    // Assert
    assert_eq!(results["attempted"], false);
    assert!(results["summary"].is_null());
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn submitting_unknown_option_is_rejected() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .unwrap();

    let question = format!("Option membership {}", uuid::Uuid::new_v4());
    let question_id = seed_question(&pool, &question, 1).await;
    let token = register_and_login(&client, &address, &unique_email()).await;

    // Act: option 99 is not one of the question's options
    let resp = client
        .post(format!("{}/api/quiz/submit", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "question_id": question_id,
            "selected_option_id": 99,
        }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn leaderboard_orders_by_correct_answers() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .unwrap();

    let mut question_ids = Vec::new();
    for i in 0..5 {
        let text = format!("Leaderboard question {} {}", i, uuid::Uuid::new_v4());
        question_ids.push(seed_question(&pool, &text, 1).await);
    }

    let email_a = unique_email();
    let email_b = unique_email();
    let token_a = register_and_login(&client, &address, &email_a).await;
    let token_b = register_and_login(&client, &address, &email_b).await;

    // Student A answers all five correctly, student B gets two wrong.
    for (idx, question_id) in question_ids.iter().enumerate() {
        for (token, selected) in [(&token_a, 1), (&token_b, if idx < 3 { 1 } else { 2 })] {
            let resp = client
                .post(format!("{}/api/quiz/submit", address))
                .header("Authorization", format!("Bearer {}", token))
                .json(&serde_json::json!({
                    "question_id": question_id,
                    "selected_option_id": selected,
                }))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status().as_u16(), 200);
        }
    }

    // Act
    let leaderboard = client
        .get(format!("{}/api/quiz/leaderboard", address))
        .header("Authorization", format!("Bearer {}", token_a))
        .send()
        .await
        .unwrap()
        .json::<Vec<serde_json::Value>>()
        .await
        .unwrap();

    // Assert: A ranks strictly above B, ranks are 1-based and dense
    let pos_a = leaderboard
        .iter()
        .position(|e| e["correct_answers"] == 5 && e["name"] == "Test Student")
        .or_else(|| leaderboard.iter().position(|e| e["correct_answers"] == 5));
    let pos_b = leaderboard.iter().position(|e| e["correct_answers"] == 3);
    let (pos_a, pos_b) = (pos_a.expect("A missing"), pos_b.expect("B missing"));
    assert!(pos_a < pos_b, "perfect score must rank above partial score");

    for (idx, entry) in leaderboard.iter().enumerate() {
        assert_eq!(entry["rank"].as_u64().unwrap(), idx as u64 + 1);
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn forgot_password_token_completes_a_reset() {
    // Arrange: capture the delivered token instead of emailing it
    let notifier = Arc::new(CapturingNotifier::default());
    let address = spawn_app_with_notifier(notifier.clone()).await;
    let client = reqwest::Client::new();
    let email = unique_email();
    register_and_login(&client, &address, &email).await;

    // Act: request a reset, then redeem the delivered token
    let forgot = client
        .post(format!("{}/api/auth/forgot-password", address))
        .json(&serde_json::json!({ "email": email }))
        .send()
        .await
        .unwrap();
    assert_eq!(forgot.status().as_u16(), 200);

    let token = notifier
        .last_token_for(&email)
        .expect("reset token was not delivered");

    let reset = client
        .post(format!("{}/api/auth/reset-password", address))
        .json(&serde_json::json!({ "token": token, "new_password": "brand-new-pass1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(reset.status().as_u16(), 200);

    // Assert: old password dead, new password works, and the reset token
    // itself is not a session
    let old_login = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(old_login.status().as_u16(), 401);

    let new_login = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "brand-new-pass1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(new_login.status().as_u16(), 200);

    let as_session = client
        .get(format!("{}/api/quiz/questions", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(as_session.status().as_u16(), 401);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn admin_ids_do_not_resolve_against_student_rows() {
    // Arrange: a superadmin session whose principal id is no student's id
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let login = client
        .post(format!("{}/api/auth/super-admin/login", address))
        .json(&serde_json::json!({ "username": "root", "password": "root_password" }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let token = login["token"].as_str().unwrap();

    // Act + Assert: no profile for non-student principals
    let me = client
        .get(format!("{}/api/profile/me", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(me.status().as_u16(), 403);

    // Results default to "own" only for students; admins must name a target
    let results = client
        .get(format!("{}/api/quiz/results", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(results.status().as_u16(), 400);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn updating_a_question_restores_a_missing_answer_row() {
    // Arrange: an admin account and a question whose answer row vanished
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .unwrap();

    let username = format!("adm_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let hashed = quiz_portal::utils::hash::hash_password("admin-pass-123").unwrap();
    sqlx::query("INSERT INTO admins (username, password) VALUES ($1, $2)")
        .bind(&username)
        .bind(&hashed)
        .execute(&pool)
        .await
        .unwrap();

    let login = client
        .post(format!("{}/api/auth/admin/login", address))
        .json(&serde_json::json!({ "username": username, "password": "admin-pass-123" }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let token = login["token"].as_str().unwrap();

    let question = format!("Answer row restore {}", uuid::Uuid::new_v4());
    let question_id = seed_question(&pool, &question, 1).await;
    sqlx::query("DELETE FROM correct_answers WHERE question_id = $1")
        .bind(question_id)
        .execute(&pool)
        .await
        .unwrap();

    // Act: a normal admin update of the question
    let update = client
        .put(format!("{}/api/admin/questions/{}", address, question_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "question": question,
            "options": [
                {"id": 1, "text": "Mercury"},
                {"id": 2, "text": "Venus"},
            ],
            "correct_option_id": 2,
            "subject": "astronomy",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(update.status().as_u16(), 200);

    // Assert: the answer row is back and carries the new correct option
    let correct = sqlx::query_scalar::<_, i32>(
        "SELECT correct_option_id FROM correct_answers WHERE question_id = $1",
    )
    .bind(question_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(correct, 2);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn super_admin_login_checks_both_credentials() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: right username, wrong password
    let bad = client
        .post(format!("{}/api/auth/super-admin/login", address))
        .json(&serde_json::json!({ "username": "root", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status().as_u16(), 401);

    let good = client
        .post(format!("{}/api/auth/super-admin/login", address))
        .json(&serde_json::json!({ "username": "root", "password": "root_password" }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(good.status().as_u16(), 200);
    let body: serde_json::Value = good.json().await.unwrap();
    assert_eq!(body["role"], "superadmin");
}
