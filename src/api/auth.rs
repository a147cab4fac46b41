use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::extract::AppJson;
use crate::api::middleware::AuthUser;
use crate::api::state::AppState;
use crate::crypto::{hash_password, issue_token, verify_password};
use crate::db::models::NewUser;
use crate::db::{User, UserRepository};
use crate::error::AppError;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub district: Option<String>,
    pub password: Option<String>,
    pub blood_group: Option<String>,
    #[serde(default)]
    pub is_volunteer: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: User,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Names of the required fields that are absent or blank, in request order
pub fn missing_signup_fields(req: &SignupRequest) -> Vec<&'static str> {
    [
        ("email", &req.email),
        ("username", &req.username),
        ("full_name", &req.full_name),
        ("phone_number", &req.phone_number),
        ("district", &req.district),
        ("password", &req.password),
    ]
    .into_iter()
    .filter(|(_, value)| present(value).is_none())
    .map(|(name, _)| name)
    .collect()
}

/// Validate a signup payload into the row to insert (minus the password hash)
fn validate_signup(req: &SignupRequest) -> Result<(NewUser, String), AppError> {
    let missing = missing_signup_fields(req);
    if !missing.is_empty() {
        return Err(AppError::MissingFields(missing));
    }

    let field = |value: &Option<String>| present(value).unwrap_or_default().to_string();

    let email = field(&req.email).to_lowercase();
    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }

    let password = req.password.clone().unwrap_or_default();
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let new_user = NewUser {
        email,
        username: field(&req.username),
        full_name: field(&req.full_name),
        phone_number: field(&req.phone_number),
        district: field(&req.district),
        blood_group: present(&req.blood_group).map(str::to_string),
        is_volunteer: req.is_volunteer,
        password_hash: String::new(),
    };

    Ok((new_user, password))
}

fn token_for(state: &AppState, user: &User) -> Result<String, AppError> {
    issue_token(
        user.id,
        &user.email,
        user.is_admin,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    AppJson(req): AppJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let (mut new_user, password) = validate_signup(&req)?;

    if UserRepository::exists(&state.db, &new_user.email, &new_user.username).await? {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    new_user.password_hash = hash_password(&password)?;

    // A concurrent signup can still win the insert after the check above
    let user = UserRepository::create(&state.db, new_user)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                AppError::Conflict("User already exists".to_string())
            } else {
                e
            }
        })?;
    let token = token_for(&state, &user)?;

    tracing::info!("New user {} signed up", user.id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".to_string(),
            token,
            user,
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (Some(email), Some(password)) = (present(&req.email), req.password.as_deref()) else {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    };

    // Same message for unknown email and wrong password
    let invalid = || AppError::Auth("Invalid credentials".to_string());

    let user = UserRepository::get_by_email(&state.db, email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(password, &user.password_hash)? {
        return Err(invalid());
    }

    let token = token_for(&state, &user)?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user,
    }))
}

/// GET /api/auth/me (requires auth via middleware)
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<User>, AppError> {
    let user = UserRepository::get_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}
