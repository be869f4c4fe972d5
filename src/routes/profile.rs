use crate::config::Config;
use crate::helper::{media_helpers, public_helpers};
use crate::middleware::AuthenticatedUser;
use crate::routes::{media_error_response, public_error_response, ApiResponse};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct ProfileUpdateRequest {
    university_id: Option<i64>,
    department_id: Option<i64>,
    notifications_enabled: bool,
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.route("/profile_view", web::get().to(show_profile))
        .route("/profile/edit", web::post().to(edit_profile_action))
        .route("/profile/avatar", web::post().to(upload_avatar_action));
}

async fn show_profile(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
) -> impl Responder {
    match public_helpers::fetch_profile_overview(pool.get_ref(), auth_user.user_id) {
        Ok(overview) => ApiResponse::ok(overview),
        Err(e) => public_error_response(&e),
    }
}

async fn edit_profile_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    payload: web::Json<ProfileUpdateRequest>,
) -> impl Responder {
    match public_helpers::update_profile_settings(
        pool.get_ref(),
        auth_user.user_id,
        payload.university_id,
        payload.department_id,
        payload.notifications_enabled,
    ) {
        Ok(()) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Profile updated."
        })),
        Err(e) => public_error_response(&e),
    }
}

async fn upload_avatar_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    config: web::Data<Config>,
    payload: Multipart,
) -> impl Responder {
    let path = match media_helpers::save_image_upload(&config, payload, "avatars").await {
        Ok(path) => path,
        Err(e) => return media_error_response(&e),
    };
    match public_helpers::set_avatar(pool.get_ref(), auth_user.user_id, &path) {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "url": path })),
        Err(e) => public_error_response(&e),
    }
}
