use crate::helper::admin_helpers::AdminHelperError;
use crate::helper::ai_helpers::AiError;
use crate::helper::engagement_helpers::EngagementError;
use crate::helper::media_helpers::MediaError;
use crate::helper::public_helpers::PublicError;
use crate::helper::role_helpers::RoleError;
use crate::helper::workflow_helpers::WorkflowError;
use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::json;

pub mod admin;
pub mod ai;
pub mod posts;
pub mod profile;
pub mod public;

#[derive(Serialize)]
pub(crate) struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> HttpResponse {
        HttpResponse::Ok().json(ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn failure(message: &str) -> serde_json::Value {
    json!({ "success": false, "error": message })
}

// Every helper error becomes a caller-visible JSON outcome here; nothing
// bubbles to the transport layer as an unhandled fault.

pub(crate) fn workflow_error_response(err: &WorkflowError) -> HttpResponse {
    match err {
        WorkflowError::Forbidden(msg) => HttpResponse::Forbidden().json(failure(msg)),
        WorkflowError::Validation(msg) => HttpResponse::BadRequest().json(failure(msg)),
        WorkflowError::NotFound => HttpResponse::NotFound().json(failure("Post not found.")),
        WorkflowError::Database(_) | WorkflowError::Pool(_) => {
            log::error!("Workflow operation failed: {}", err);
            HttpResponse::InternalServerError().json(failure("A database error occurred."))
        }
    }
}

pub(crate) fn engagement_error_response(err: &EngagementError) -> HttpResponse {
    match err {
        EngagementError::Validation(msg) => HttpResponse::BadRequest().json(failure(msg)),
        EngagementError::NotFound => HttpResponse::NotFound().json(failure("Post not found.")),
        EngagementError::Database(_) | EngagementError::Pool(_) => {
            log::error!("Engagement operation failed: {}", err);
            HttpResponse::InternalServerError().json(failure("A database error occurred."))
        }
    }
}

pub(crate) fn public_error_response(err: &PublicError) -> HttpResponse {
    match err {
        PublicError::Validation(msg) => HttpResponse::BadRequest().json(failure(msg)),
        PublicError::NotFound => HttpResponse::NotFound().json(failure("Not found.")),
        PublicError::Database(_) | PublicError::Pool(_) => {
            log::error!("Request failed: {}", err);
            HttpResponse::InternalServerError().json(failure("A database error occurred."))
        }
    }
}

pub(crate) fn role_error_response(err: &RoleError) -> HttpResponse {
    match err {
        RoleError::Forbidden(msg) => HttpResponse::Forbidden().json(failure(msg)),
        RoleError::Validation(msg) => HttpResponse::BadRequest().json(failure(msg)),
        RoleError::NotFound => HttpResponse::NotFound().json(failure("User not found.")),
        RoleError::Database(_) | RoleError::Pool(_) => {
            log::error!("Role operation failed: {}", err);
            HttpResponse::InternalServerError().json(failure("A database error occurred."))
        }
    }
}

pub(crate) fn admin_error_response(err: &AdminHelperError) -> HttpResponse {
    match err {
        AdminHelperError::Forbidden(msg) => HttpResponse::Forbidden().json(failure(msg)),
        AdminHelperError::Database(_) | AdminHelperError::Pool(_) => {
            log::error!("Admin operation failed: {}", err);
            HttpResponse::InternalServerError().json(failure("A database error occurred."))
        }
    }
}

pub(crate) fn ai_error_response(err: &AiError) -> HttpResponse {
    match err {
        AiError::Validation(msg) => HttpResponse::BadRequest().json(failure(msg)),
        AiError::Http(_) | AiError::Api(_) => {
            // Collaborator failure: generic message, details stay in the log.
            log::error!("AI collaborator call failed: {}", err);
            HttpResponse::BadGateway().json(failure("The assistant is unavailable right now."))
        }
        AiError::Database(_) | AiError::Pool(_) => {
            log::error!("AI history operation failed: {}", err);
            HttpResponse::InternalServerError().json(failure("A database error occurred."))
        }
    }
}

pub(crate) fn media_error_response(err: &MediaError) -> HttpResponse {
    match err {
        MediaError::Validation(msg) => HttpResponse::BadRequest().json(failure(msg)),
        _ => {
            log::error!("Media upload failed: {}", err);
            HttpResponse::InternalServerError().json(failure("Upload failed."))
        }
    }
}
