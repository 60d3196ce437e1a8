use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AppError;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};
use serde::Serialize;
use utoipa::ToSchema;

/// Identity resolved at login and carried in every access token.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthUser {
    pub email: String,
    pub store_id: u64,
    /// Staff user id, `0` for a store owner without a staff profile
    pub user_id: u64,
    pub role: Role,
}

/// Pulls the bearer token out of an `Authorization` header.
pub fn bearer_token(req: &HttpRequest) -> Result<&str, AppError> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthenticated("Missing token".into()))
}

/// Decodes an access token into the identity it carries.
pub fn authenticate(token: &str, config: &Config) -> Result<AuthUser, AppError> {
    let claims = verify_token(token, &config.jwt_secret)?;
    if claims.token_type != TokenType::Access {
        return Err(AppError::Unauthenticated("Access token required".into()));
    }

    let role = Role::from_id(claims.role)
        .ok_or_else(|| AppError::Unauthenticated("Invalid role".into()))?;

    Ok(AuthUser {
        email: claims.sub,
        store_id: claims.store_id,
        user_id: claims.user_id,
        role,
    })
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Set by the auth middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(actix_web::error::ErrorInternalServerError(
                "Config missing",
            )));
        };

        ready(
            bearer_token(req)
                .and_then(|token| authenticate(token, config))
                .map_err(actix_web::Error::from),
        )
    }
}

impl AuthUser {
    pub fn require_owner(&self) -> Result<(), AppError> {
        if self.role == Role::StoreOwner {
            Ok(())
        } else {
            Err(AppError::Forbidden("Store owner only".into()))
        }
    }
}
