// ABOUTME: Registration, login, logout, and password-change handlers
// ABOUTME: Credentials are argon2-hashed; a successful login sets the session cookie

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{extract::State, http::StatusCode, response::Json};
use axum_extra::extract::cookie::CookieJar;

use crate::error::{AppError, Result};
use crate::storage::NewUser;
use crate::types::{
    ChangePasswordRequest, LoginRequest, RegisterRequest, StatusResponse, UserResponse,
};
use crate::{AppState, auth_helpers, session};

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Internal(format!("Password hashing failed: {}", err)))
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|err| AppError::Internal(format!("Stored password hash unreadable: {}", err)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    if req.email.is_empty() || req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email, username and password are required".into(),
        ));
    }

    if state.storage.user_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".into()));
    }
    if state.storage.user_by_username(&req.username).await?.is_some() {
        return Err(AppError::Conflict("Username is already taken".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user = state
        .storage
        .create_user(NewUser {
            email: req.email,
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
        })
        .await?;

    tracing::info!("Registered user {}", user.username);
    Ok((
        StatusCode::CREATED,
        Json(UserResponse::from_model(user, false)),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<UserResponse>)> {
    let user = state
        .storage
        .user_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    let session_id = state.sessions.create_session(user.id);
    let cookie = session::create_session_cookie(session_id, false);

    Ok((jar.add(cookie), Json(UserResponse::from_model(user, false))))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<StatusResponse>) {
    if let Some(cookie) = jar.get(session::SESSION_COOKIE_NAME) {
        state.sessions.remove_session(cookie.value());
    }

    (
        jar.add(session::create_logout_cookie()),
        Json(StatusResponse::new("logged out")),
    )
}

pub async fn set_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<StatusResponse>> {
    let user_id = auth_helpers::current_user_id(&jar, &state)?;
    let user = state
        .storage
        .user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if !verify_password(&req.old_password, &user.password_hash)? {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }
    if req.new_password.is_empty() {
        return Err(AppError::BadRequest("New password is required".into()));
    }

    let new_hash = hash_password(&req.new_password)?;
    state.storage.update_password(user, new_hash).await?;

    Ok(Json(StatusResponse::new("password changed")))
}
