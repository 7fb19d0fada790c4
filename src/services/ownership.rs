// src/services/ownership.rs

use crate::{error::AppError, utils::jwt::AuthUser};

/// A resource that only its creator may modify or delete.
pub trait Owned {
    /// Human-readable resource name used in error messages.
    const KIND: &'static str;

    fn owner_id(&self) -> i64;
}

/// Fails with 403 unless `user` created `resource`.
pub fn authorize_owner<T: Owned>(resource: &T, user: &AuthUser, action: &str) -> Result<(), AppError> {
    if resource.owner_id() == user.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Not authorized to {} this {}",
            action,
            T::KIND
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing(i64);

    impl Owned for Thing {
        const KIND: &'static str = "thing";

        fn owner_id(&self) -> i64 {
            self.0
        }
    }

    fn user(id: i64, role: &str) -> AuthUser {
        AuthUser { id, role: role.to_string() }
    }

    #[test]
    fn owner_is_allowed() {
        assert!(authorize_owner(&Thing(7), &user(7, "user"), "delete").is_ok());
    }

    #[test]
    fn other_users_are_forbidden_regardless_of_role() {
        let err = authorize_owner(&Thing(7), &user(8, "moderator"), "update").unwrap_err();
        match err {
            AppError::Forbidden(msg) => assert_eq!(msg, "Not authorized to update this thing"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
