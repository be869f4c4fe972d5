use crate::helper::admin_helpers::{self, DashboardFilters};
use crate::helper::workflow_helpers::{self, BulkOutcome};
use crate::helper::{form_helpers, role_helpers};
use crate::middleware::AuthenticatedUser;
use crate::models::{Category, PostDraft, PostStatus, RoleFlags};
use crate::routes::{
    admin_error_response, role_error_response, workflow_error_response, ApiResponse,
};
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct DashboardQuery {
    q: Option<String>,
    category: Option<String>,
    status: Option<String>,
    sort: Option<String>,
    page: Option<u32>,
}

#[derive(Deserialize)]
struct UserSearchQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
struct SingleRoleRequest {
    role: String,
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(show_dashboard))
        .route("/post/{pk}/approve", web::post().to(approve_post_action))
        .route("/post/{pk}/reject", web::post().to(reject_post_action))
        .route("/post/{pk}/restore", web::post().to(restore_post_action))
        .route("/post/{pk}/delete", web::post().to(delete_post_action))
        .route("/post/{pk}/edit", web::post().to(edit_post_action))
        .route("/bulk-action", web::post().to(bulk_action_handler))
        // One canonical role-listing route; the source had a second URL shape
        // whose extra id segment the handler ignored.
        .route("/users", web::get().to(user_roles_listing))
        .route("/users/{user_id}/roles", web::post().to(toggle_user_roles_action))
        .route("/users/{user_id}/role", web::post().to(set_user_role_action));
}

async fn show_dashboard(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    query: web::Query<DashboardQuery>,
) -> impl Responder {
    let filters = DashboardFilters {
        text_query: query
            .q
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        category: query
            .category
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .and_then(|c| Category::from_str(&c)),
        status: query
            .status
            .as_deref()
            .map(|s| s.trim().to_uppercase())
            .and_then(|s| PostStatus::from_str(&s)),
        oldest_first: query.sort.as_deref().map(str::trim) == Some("old"),
        page: query.page.unwrap_or(1).max(1),
    };

    match admin_helpers::fetch_dashboard(pool.get_ref(), auth_user.user_id, &filters) {
        Ok(data) => ApiResponse::ok(data),
        Err(e) => admin_error_response(&e),
    }
}

async fn approve_post_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    path: web::Path<i64>,
) -> impl Responder {
    match workflow_helpers::approve_post(pool.get_ref(), auth_user.user_id, path.into_inner()) {
        Ok(post) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Content approved.",
            "post": post
        })),
        Err(e) => workflow_error_response(&e),
    }
}

async fn reject_post_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    path: web::Path<i64>,
) -> impl Responder {
    match workflow_helpers::reject_post(pool.get_ref(), auth_user.user_id, path.into_inner()) {
        Ok(post) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Content rejected (archived).",
            "post": post
        })),
        Err(e) => workflow_error_response(&e),
    }
}

async fn restore_post_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    path: web::Path<i64>,
) -> impl Responder {
    match workflow_helpers::restore_post(pool.get_ref(), auth_user.user_id, path.into_inner()) {
        Ok(post) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Content restored (pending approval).",
            "post": post
        })),
        Err(e) => workflow_error_response(&e),
    }
}

async fn delete_post_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    path: web::Path<i64>,
) -> impl Responder {
    match workflow_helpers::delete_post(pool.get_ref(), auth_user.user_id, path.into_inner()) {
        Ok(()) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Content deleted."
        })),
        Err(e) => workflow_error_response(&e),
    }
}

async fn edit_post_action(
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
        Ok(post) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Content updated.",
            "post": post
        })),
        Err(e) => workflow_error_response(&e),
    }
}

/// The dashboard's bulk form posts urlencoded `action` plus a repeated
/// `post_ids` key, so this handler parses the raw body instead of JSON.
async fn bulk_action_handler(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    form: web::Bytes,
) -> impl Responder {
    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let action = parsed.get("action").map(String::as_str).unwrap_or_default();
    let post_ids: Vec<i64> = match form_helpers::parse_form_values(&form, "post_ids") {
        Ok(values) => values.iter().filter_map(|v| v.parse().ok()).collect(),
        Err(response) => return response,
    };

    match workflow_helpers::bulk_action(pool.get_ref(), auth_user.user_id, action, &post_ids) {
        Ok(BulkOutcome::Applied {
            action, affected, ..
        }) => {
            let message = match action {
                "approve" => format!("{} item(s) approved.", affected),
                _ => format!("{} item(s) deleted.", affected),
            };
            HttpResponse::Ok().json(json!({
                "success": true,
                "message": message,
                "affected": affected
            }))
        }
        Ok(BulkOutcome::NothingSelected) => HttpResponse::Ok().json(json!({
            "success": false,
            "warning": "No content selected."
        })),
        Err(e) => workflow_error_response(&e),
    }
}

async fn user_roles_listing(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    query: web::Query<UserSearchQuery>,
) -> impl Responder {
    let q = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty());
    match role_helpers::list_users_with_stats(pool.get_ref(), auth_user.user_id, q) {
        Ok(users) => ApiResponse::ok(users),
        Err(e) => role_error_response(&e),
    }
}

/// Multi-select shape: replaces both managed memberships with the flag set.
async fn toggle_user_roles_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    path: web::Path<i64>,
    payload: web::Json<RoleFlags>,
) -> impl Responder {
    match role_helpers::update_managed_roles(
        pool.get_ref(),
        auth_user.user_id,
        path.into_inner(),
        &payload,
    ) {
        Ok(()) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Roles updated."
        })),
        Err(e) => role_error_response(&e),
    }
}

/// Single-role shape: at most one managed role, empty string clears both.
async fn set_user_role_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    path: web::Path<i64>,
    payload: web::Json<SingleRoleRequest>,
) -> impl Responder {
    match role_helpers::assign_single_role(
        pool.get_ref(),
        auth_user.user_id,
        path.into_inner(),
        payload.role.trim(),
    ) {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true })),
        Err(e) => role_error_response(&e),
    }
}
