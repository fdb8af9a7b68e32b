// src/routes.rs

use axum::{
    Router, http::Method,
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, profile, quiz, super_admin},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, maintainer_middleware, superadmin_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quiz, profile, admin, super-admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool + config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // let governor_conf = tower_governor::governor::GovernorConfigBuilder::default()
    //     .per_second(2)
    //     .burst_size(5)
    //     .finish()
    //     .unwrap();

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/admin/login", post(auth::admin_login))
        .route("/maintainer/login", post(auth::maintainer_login))
        .route("/super-admin/login", post(auth::super_admin_login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password));

    let quiz_routes = Router::new()
        .route("/status", get(quiz::quiz_status))
        // Protected quiz routes
        .merge(
            Router::new()
                .route("/questions", get(quiz::list_questions))
                .route("/submit", post(quiz::submit_answer))
                .route("/submit-all", post(quiz::submit_quiz))
                .route("/results", get(quiz::get_results))
                .route("/leaderboard", get(quiz::get_leaderboard))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me).put(profile::update_me))
        .route(
            "/documents",
            get(profile::list_my_documents).post(profile::register_document),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Double middleware protection: Auth first, then role check
    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route(
            "/questions",
            get(admin::list_questions_with_answers).post(admin::create_question),
        )
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route(
            "/quiz-settings",
            get(admin::get_quiz_settings).put(admin::save_quiz_settings),
        )
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Document review is open to maintainers as well as admins.
    let review_routes = Router::new()
        .route("/documents", get(admin::list_documents))
        .route("/documents/{id}/verify", put(admin::verify_document))
        .route("/documents/{id}/reject", put(admin::reject_document))
        .layer(middleware::from_fn(maintainer_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let super_admin_routes = Router::new()
        .route("/admins", post(super_admin::create_admin))
        .route(
            "/maintainers",
            get(super_admin::list_maintainers).post(super_admin::create_maintainer),
        )
        .route(
            "/reset-submissions",
            post(super_admin::reset_user_submissions),
        )
        .layer(middleware::from_fn(superadmin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/admin", admin_routes.merge(review_routes))
        .nest("/api/super-admin", super_admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // .layer(tower_governor::GovernorLayer::new(governor_conf))
        .with_state(state)
}
