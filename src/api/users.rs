use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Serialize;

use crate::api::extract::AppJson;
use crate::api::middleware::AuthUser;
use crate::api::state::AppState;
use crate::db::models::{UserFilter, UserUpdate};
use crate::db::{PublicUser, User, UserRepository};
use crate::error::AppError;

/// A user as seen by the caller: contact details and wallet only for the
/// user themself or an admin
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Profile {
    Full(User),
    Public(PublicUser),
}

impl Profile {
    pub fn for_viewer(user: User, viewer: &AuthUser) -> Self {
        if viewer.ensure_self_or_admin(user.id).is_ok() {
            Profile::Full(user)
        } else {
            Profile::Public(user.into())
        }
    }
}

/// GET /api/users (requires auth)
pub async fn search_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Vec<Profile>>, AppError> {
    let users = UserRepository::search(&state.db, &filter).await?;

    Ok(Json(
        users
            .into_iter()
            .map(|user| Profile::for_viewer(user, &auth))
            .collect(),
    ))
}

/// GET /api/users/{id} (requires auth)
pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<Profile>, AppError> {
    let user = UserRepository::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(Profile::for_viewer(user, &auth)))
}

/// PUT /api/users/{id} (requires auth, self or admin)
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i32>,
    AppJson(update): AppJson<UserUpdate>,
) -> Result<Json<User>, AppError> {
    auth.ensure_self_or_admin(id)?;

    if update
        .username
        .as_deref()
        .is_some_and(|username| username.trim().is_empty())
    {
        return Err(AppError::Validation("Username cannot be empty".to_string()));
    }

    let user = UserRepository::update(&state.db, id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn user(id: i32) -> User {
        User {
            id,
            email: "ram@gmail.com".to_string(),
            username: "ram".to_string(),
            full_name: "Ram Thapa".to_string(),
            phone_number: "9811111111".to_string(),
            district: "Kathmandu".to_string(),
            blood_group: Some("O+".to_string()),
            is_volunteer: true,
            is_admin: false,
            wallet_balance: Decimal::new(500, 0),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn viewer(id: i32, is_admin: bool) -> AuthUser {
        AuthUser {
            id,
            email: "viewer@gmail.com".to_string(),
            is_admin,
        }
    }

    #[test]
    fn test_other_users_see_public_fields() {
        let json = serde_json::to_value(Profile::for_viewer(user(1), &viewer(2, false))).unwrap();

        assert_eq!(json["username"], "ram");
        assert_eq!(json["blood_group"], "O+");
        for hidden in ["email", "phone_number", "wallet_balance", "is_admin", "password_hash"] {
            assert!(json.get(hidden).is_none(), "{} exposed", hidden);
        }
    }

    #[test]
    fn test_self_and_admin_see_everything() {
        for viewer in [viewer(1, false), viewer(2, true)] {
            let json = serde_json::to_value(Profile::for_viewer(user(1), &viewer)).unwrap();
            assert_eq!(json["email"], "ram@gmail.com");
            assert_eq!(json["phone_number"], "9811111111");
            assert!(json.get("password_hash").is_none());
        }
    }
}
