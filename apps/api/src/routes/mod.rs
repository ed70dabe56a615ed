pub mod health;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::ai_config::handlers as ai_config;
use crate::auth::handlers as auth;
use crate::directory::{feed, templates, websites};
use crate::generation::handlers as generation;
use crate::sandbox::handlers as sandbox;
use crate::state::AppState;
use crate::users::handlers as users;
use crate::vibecode::handlers as vibecode;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/feed.json", get(feed::handle_json_feed))
        // Auth and accounts
        .route("/api/auth/login", post(auth::handle_login))
        .route("/api/auth/logout", post(auth::handle_logout))
        .route("/api/users", post(users::handle_register))
        .route("/api/users/me", get(users::handle_me))
        .route(
            "/api/admin/users",
            get(users::handle_list_users).post(users::handle_create_user),
        )
        .route(
            "/api/admin/users/:id",
            patch(users::handle_update_user).delete(users::handle_delete_user),
        )
        // Directory
        .route(
            "/api/websites",
            get(websites::handle_list_websites).post(websites::handle_create_website),
        )
        .route("/api/websites/reorder", put(websites::handle_reorder_websites))
        .route(
            "/api/websites/:id",
            get(websites::handle_get_website)
                .put(websites::handle_update_website)
                .delete(websites::handle_delete_website),
        )
        .route(
            "/api/templates",
            get(templates::handle_list_templates).post(templates::handle_create_template),
        )
        .route("/api/templates/reorder", put(templates::handle_reorder_templates))
        .route(
            "/api/templates/:id",
            get(templates::handle_get_template)
                .put(templates::handle_update_template)
                .delete(templates::handle_delete_template),
        )
        // Community components
        .route(
            "/api/vibecode",
            get(vibecode::handle_list_vibecode).post(vibecode::handle_create_vibecode),
        )
        .route("/api/vibecode/:slug", get(vibecode::handle_get_vibecode))
        .route("/api/admin/submissions", get(vibecode::handle_list_submissions))
        .route(
            "/api/admin/submissions/:id",
            patch(vibecode::handle_review_submission).delete(vibecode::handle_delete_submission),
        )
        // AI settings
        .route(
            "/api/admin/ai-model",
            get(ai_config::handle_get_model).patch(ai_config::handle_update_model),
        )
        .route(
            "/api/admin/system-prompt",
            get(ai_config::handle_get_system_prompt).patch(ai_config::handle_update_system_prompt),
        )
        // Generation
        .route(
            "/api/generate-component",
            post(generation::handle_generate_component),
        )
        .route("/api/chatbot", post(generation::handle_chatbot))
        .route(
            "/api/generate-suggestions",
            post(generation::handle_generate_suggestions),
        )
        .route("/api/sandbox/parse", post(sandbox::handle_parse_source))
        .with_state(state)
}
