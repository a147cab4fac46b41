use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::api::state::AppState;
use crate::crypto::verify_token;
use crate::db::UserRepository;
use crate::error::AppError;

/// The authenticated caller, attached to request extensions by [`auth_middleware`]
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
    pub is_admin: bool,
}

impl AuthUser {
    pub fn ensure_self_or_admin(&self, owner_id: i32) -> Result<(), AppError> {
        if self.id == owner_id || self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Not authorized".to_string()))
        }
    }

    pub fn ensure_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AppError> {
    let header = header.ok_or_else(|| AppError::Auth("No token provided".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Auth("Invalid token format".to_string()))
}

/// Authentication middleware - validates the JWT and loads the caller
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = bearer_token(header)?;
    let claims = verify_token(token, &state.config.jwt_secret)?;

    // Tokens outlive deleted accounts, so the user must still exist
    let user = UserRepository::get_by_id(&state.db, claims.id)
        .await?
        .ok_or_else(|| AppError::Auth("User not found".to_string()))?;

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        email: user.email,
        is_admin: user.is_admin,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert!(matches!(
            bearer_token(None),
            Err(AppError::Auth(msg)) if msg == "No token provided"
        ));
        assert!(matches!(
            bearer_token(Some("Basic dXNlcg==")),
            Err(AppError::Auth(msg)) if msg == "Invalid token format"
        ));
        assert!(bearer_token(Some("Bearer ")).is_err());
    }

    #[test]
    fn test_ownership_checks() {
        let user = AuthUser {
            id: 1,
            email: "a@gmail.com".to_string(),
            is_admin: false,
        };
        assert!(user.ensure_self_or_admin(1).is_ok());
        assert!(matches!(
            user.ensure_self_or_admin(2),
            Err(AppError::Forbidden(_))
        ));
        assert!(user.ensure_admin().is_err());

        let admin = AuthUser { is_admin: true, ..user };
        assert!(admin.ensure_self_or_admin(2).is_ok());
        assert!(admin.ensure_admin().is_ok());
    }
}
