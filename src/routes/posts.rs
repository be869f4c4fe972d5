use crate::config::Config;
use crate::helper::{engagement_helpers, media_helpers, public_helpers, workflow_helpers};
use crate::middleware::AuthenticatedUser;
use crate::models::{PostDraft, PostStatus};
use crate::routes::{
    engagement_error_response, media_error_response, public_error_response,
    workflow_error_response, ApiResponse,
};
use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct CommentRequest {
    text: String,
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.route("/submit-post", web::post().to(submit_post_action))
        .route("/submit-post/cover", web::post().to(upload_cover_action))
        .route("/post/{pk}", web::get().to(post_detail))
        .route("/post/{pk}/like", web::post().to(toggle_like_action))
        .route("/post/{pk}/comment", web::post().to(add_comment_action))
        .route("/club/post/{pk}/edit", web::post().to(club_edit_own_post_action));
}

/// Submission endpoint for every role; the workflow policy decides between
/// immediate publication, the pending queue, and outright refusal.
async fn submit_post_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    payload: web::Json<PostDraft>,
) -> impl Responder {
    match workflow_helpers::submit_post(pool.get_ref(), auth_user.user_id, &payload) {
        Ok((post_id, status)) => {
            let message = if status == PostStatus::Approved {
                "Content published (auto-approved)."
            } else {
                "Content submitted. Awaiting approval."
            };
            HttpResponse::Ok().json(json!({
                "success": true,
                "message": message,
                "post_id": post_id,
                "status": status
            }))
        }
        Err(e) => workflow_error_response(&e),
    }
}

async fn upload_cover_action(
    _auth_user: AuthenticatedUser,
    config: web::Data<Config>,
    payload: Multipart,
) -> impl Responder {
    match media_helpers::save_image_upload(&config, payload, "post_covers").await {
        Ok(path) => HttpResponse::Ok().json(json!({ "success": true, "url": path })),
        Err(e) => media_error_response(&e),
    }
}

/// Anonymous readers get APPROVED posts only; an authenticated read also
/// upserts the caller's view row.
async fn post_detail(
    session: Session,
    pool: web::Data<crate::DbPool>,
    path: web::Path<i64>,
) -> impl Responder {
    let post_id = path.into_inner();
    let viewer_id = session.get::<i64>("user_id").unwrap_or(None);

    match public_helpers::fetch_post_detail(pool.get_ref(), post_id, viewer_id) {
        Ok(detail) => ApiResponse::ok(detail),
        Err(e) => public_error_response(&e),
    }
}

async fn toggle_like_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    path: web::Path<i64>,
) -> impl Responder {
    match engagement_helpers::toggle_like(pool.get_ref(), auth_user.user_id, path.into_inner()) {
        Ok(outcome) => ApiResponse::ok(outcome),
        Err(e) => engagement_error_response(&e),
    }
}

async fn add_comment_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    path: web::Path<i64>,
    payload: web::Json<CommentRequest>,
) -> impl Responder {
    match engagement_helpers::add_comment(
        pool.get_ref(),
        auth_user.user_id,
        path.into_inner(),
        &payload.text,
    ) {
        Ok(comment_id) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Comment added.",
            "comment_id": comment_id
        })),
        Err(e) => engagement_error_response(&e),
    }
}

/// Self-service edit path for club admins; staff may use it too. The
/// workflow engine owns the authorization rule.
async fn club_edit_own_post_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    path: web::Path<i64>,
    payload: web::Json<PostDraft>,
) -> impl Responder {
    match workflow_helpers::edit_post(
        pool.get_ref(),
        auth_user.user_id,
        path.into_inner(),
        &payload,
    ) {
        Ok(post) => ApiResponse::ok(post),
        Err(e) => workflow_error_response(&e),
    }
}
