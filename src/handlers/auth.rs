// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{
        AuthResponse, CheckUserRequest, LoginRequest, RegisterRequest, UpdateProfileRequest, User,
    },
    utils::{
        hash::{hash_password, verify_password},
        jwt::{AuthUser, sign_jwt},
    },
};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, profile_image, created_at, updated_at";

async fn find_user(pool: &PgPool, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created with a token and the user object (excluding password).
pub async fn register(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    let email_taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&payload.email)
        .fetch_one(&pool)
        .await?;
    if email_taken {
        return Err(AppError::Conflict("User with this email already exists".to_string()));
    }

    let username_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(&payload.username)
            .fetch_one(&pool)
            .await?;
    if username_taken {
        return Err(AppError::Conflict("Username is already taken".to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
    ))
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(payload.effective_role())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to register user: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(user_id = user.id, "User registered");

    let token = sign_jwt(user.id, &user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            token_type: "Bearer",
            user,
        }),
    ))
}

/// Authenticates a user by email and password and returns a JWT token.
///
/// Unknown email and wrong password produce the same error.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    let invalid = || AppError::BadRequest("Invalid email or password".to_string());

    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::from(e)
        })?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(invalid());
    }

    let token = sign_jwt(user.id, &user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(AuthResponse {
        token,
        token_type: "Bearer",
        user,
    }))
}

/// Current user's profile.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(find_user(&pool, user.id).await?))
}

/// Updates the current user's profile.
pub async fn update_me(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Json(mut payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.username = payload.username.map(|u| u.trim().to_string());
    payload.validate()?;

    if let Some(username) = &payload.username {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND id <> $2)",
        )
        .bind(username)
        .bind(user.id)
        .fetch_one(&pool)
        .await?;
        if taken {
            return Err(AppError::Conflict("Username is already taken".to_string()));
        }
    }

    let updated = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET username = COALESCE($1, username), updated_at = NOW() WHERE id = $2 RETURNING {USER_COLUMNS}"
    ))
    .bind(payload.username.as_deref())
    .bind(user.id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(updated))
}

/// Reports whether an account exists for the given email.
pub async fn check_user(
    State(pool): State<PgPool>,
    Json(mut payload): Json<CheckUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&payload.email)
        .fetch_one(&pool)
        .await?;

    Ok(Json(json!({ "exists": exists })))
}
