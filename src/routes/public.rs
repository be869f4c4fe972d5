use crate::helper::public_helpers::{self, RegisterRequest};
use crate::models::Category;
use crate::routes::{public_error_response, ApiResponse};
use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
pub struct DepartmentsQuery {
    university_id: Option<String>,
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.route("/register", web::post().to(register_action))
        .route("/login", web::post().to(login_action))
        .route("/logout", web::post().to(logout_action))
        .route("/gundem", web::get().to(list_gundem))
        .route("/etkinlikler", web::get().to(list_etkinlikler))
        .route("/duyurular", web::get().to(list_duyurular))
        .route("/kulup", web::get().to(list_kulup))
        .route("/api/departments", web::get().to(departments_api));
}

async fn register_action(
    pool: web::Data<crate::DbPool>,
    payload: web::Json<RegisterRequest>,
) -> impl Responder {
    match public_helpers::register_user(pool.get_ref(), &payload) {
        Ok(user_id) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Registration complete. You can log in now.",
            "user_id": user_id
        })),
        Err(e) => public_error_response(&e),
    }
}

async fn login_action(
    session: Session,
    pool: web::Data<crate::DbPool>,
    payload: web::Json<LoginRequest>,
) -> impl Responder {
    match public_helpers::login(pool.get_ref(), &payload.username, &payload.password) {
        Some(user) => {
            session.renew();
            if session.insert("user_id", user.id).is_err()
                || session.insert("username", user.username.clone()).is_err()
            {
                return HttpResponse::InternalServerError()
                    .json(json!({ "success": false, "error": "Could not start a session." }));
            }
            HttpResponse::Ok().json(json!({
                "success": true,
                "username": user.username,
                "is_staff": user.is_staff
            }))
        }
        None => HttpResponse::Unauthorized().json(json!({
            "success": false,
            "error": "Invalid credentials or account suspended."
        })),
    }
}

async fn logout_action(session: Session) -> impl Responder {
    session.clear();
    HttpResponse::Ok().json(json!({ "success": true }))
}

async fn category_listing(pool: &crate::DbPool, category: Category) -> HttpResponse {
    match public_helpers::approved_posts_by_category(pool, category) {
        Ok(posts) => ApiResponse::ok(posts),
        Err(e) => {
            log::error!("Failed to list {} posts: {}", category.as_str(), e);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": "Failed to retrieve posts."
            }))
        }
    }
}

async fn list_gundem(pool: web::Data<crate::DbPool>) -> impl Responder {
    category_listing(pool.get_ref(), Category::Gundem).await
}

async fn list_etkinlikler(pool: web::Data<crate::DbPool>) -> impl Responder {
    category_listing(pool.get_ref(), Category::Etkinlik).await
}

async fn list_duyurular(pool: web::Data<crate::DbPool>) -> impl Responder {
    category_listing(pool.get_ref(), Category::Duyuru).await
}

async fn list_kulup(pool: web::Data<crate::DbPool>) -> impl Responder {
    category_listing(pool.get_ref(), Category::Kulup).await
}

async fn departments_api(
    pool: web::Data<crate::DbPool>,
    query: web::Query<DepartmentsQuery>,
) -> impl Responder {
    match public_helpers::departments_for_university(
        pool.get_ref(),
        query.university_id.as_deref(),
    ) {
        Ok(departments) => HttpResponse::Ok().json(json!({ "items": departments })),
        Err(e) => {
            log::error!("Failed to list departments: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": "Failed to retrieve departments."
            }))
        }
    }
}
