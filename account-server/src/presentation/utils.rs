use actix_web::dev::Payload;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest, error::ErrorUnauthorized};
use futures_util::future::{Ready, ready};

use crate::domain::error::DomainError;
use crate::domain::user::UserId;
use crate::infrastructure::security::JwtKeys;
use crate::presentation::middleware::RequestId;

pub fn ensure_owner(item_id: &UserId, user_id: &UserId) -> Result<(), DomainError> {
    if item_id != user_id {
        Err(DomainError::Forbidden)
    } else {
        Ok(())
    }
}

/// Parses a caller-supplied user id and checks it belongs to the caller.
pub fn owned_user_id(raw: &str, user: &AuthenticatedUser) -> Result<UserId, DomainError> {
    let id = UserId::parse(raw)?;
    ensure_owner(&id, &user.id)?;
    Ok(id)
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: UserId,
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(ErrorUnauthorized("missing authenticated user"))),
        }
    }
}

pub fn extract_user_from_token(token: &str, keys: &JwtKeys) -> Result<AuthenticatedUser, Error> {
    let claims = keys
        .verify_token(token)
        .map_err(|_| ErrorUnauthorized("invalid token"))?;
    let id = UserId::parse(&claims.sub).map_err(|_| ErrorUnauthorized("invalid token"))?;

    Ok(AuthenticatedUser { id })
}

pub fn request_id(req: &HttpRequest) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|rid| rid.0.clone())
        .unwrap_or_else(|| "unknown".into())
}
