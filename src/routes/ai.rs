use crate::helper::ai_helpers::{self, AiClient};
use crate::middleware::AuthenticatedUser;
use crate::routes::{ai_error_response, ApiResponse};
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.route("/ai/ask", web::post().to(ask_action))
        .route("/ai/history", web::get().to(history_action))
        .route("/ai/clear", web::post().to(clear_action));
}

/// The exchange is only persisted after the collaborator answered, so a
/// failed call leaves no half-written record.
async fn ask_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    client: web::Data<AiClient>,
    payload: web::Json<AskRequest>,
) -> impl Responder {
    match ai_helpers::ask_and_store(
        pool.get_ref(),
        &client,
        auth_user.user_id,
        &payload.question,
    )
    .await
    {
        Ok(answer) => HttpResponse::Ok().json(json!({ "success": true, "answer": answer })),
        Err(e) => ai_error_response(&e),
    }
}

async fn history_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
) -> impl Responder {
    match ai_helpers::history(pool.get_ref(), auth_user.user_id) {
        Ok(messages) => ApiResponse::ok(messages),
        Err(e) => ai_error_response(&e),
    }
}

async fn clear_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
) -> impl Responder {
    match ai_helpers::clear_history(pool.get_ref(), auth_user.user_id) {
        Ok(removed) => HttpResponse::Ok().json(json!({ "success": true, "removed": removed })),
        Err(e) => ai_error_response(&e),
    }
}
