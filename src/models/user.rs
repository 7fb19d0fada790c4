// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Roles a user may pick at registration.
pub const SELF_ASSIGNABLE_ROLES: [&str; 2] = ["user", "moderator"];

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Unique, stored lower-cased.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password_hash: String,

    /// User role: 'user' or 'moderator'.
    pub role: String,

    pub profile_image: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password length must be between 6 and 128 characters."
    ))]
    pub password: String,
    /// Requested role; anything outside `SELF_ASSIGNABLE_ROLES` falls back to 'user'.
    pub role: Option<String>,
}

impl RegisterRequest {
    pub fn effective_role(&self) -> &str {
        match self.role.as_deref() {
            Some(role) if SELF_ASSIGNABLE_ROLES.contains(&role) => role,
            _ => "user",
        }
    }
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,
}

/// DTO for editing one's own profile.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckUserRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
}

/// Returned by register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(role: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "secret1".into(),
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn only_known_roles_are_self_assignable() {
        assert_eq!(register(None).effective_role(), "user");
        assert_eq!(register(Some("moderator")).effective_role(), "moderator");
        assert_eq!(register(Some("admin")).effective_role(), "user");
    }

    #[test]
    fn registration_validates_email_and_password() {
        assert!(register(None).validate().is_ok());

        let mut bad_email = register(None);
        bad_email.email = "not-an-email".into();
        assert!(bad_email.validate().is_err());

        let mut short_password = register(None);
        short_password.password = "12345".into();
        assert!(short_password.validate().is_err());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$...".into(),
            role: "user".into(),
            profile_image: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "alice@example.com");
    }
}
