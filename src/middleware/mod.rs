use actix_session::SessionExt;
use actix_web::{dev, FromRequest, HttpRequest};
use std::future::{ready, Ready};

/// Session-backed identity. Only identity lives in the session; roles and
/// staff flags are re-read from the store on every authorization check, so
/// a revoked capability takes effect on the next request.
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let session = req.get_session();
        if let (Ok(Some(user_id)), Ok(Some(username))) = (
            session.get::<i64>("user_id"),
            session.get::<String>("username"),
        ) {
            ready(Ok(AuthenticatedUser { user_id, username }))
        } else {
            ready(Err(actix_web::error::ErrorUnauthorized("Not logged in.")))
        }
    }
}
