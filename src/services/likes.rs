// src/services/likes.rs

//! Like/unlike toggling shared by posts and comments.

use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppError;

/// What kind of resource is being liked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Post,
    Comment,
}

/// Presence of a (target, user) like and the target's total after the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i64,
}

impl LikeTarget {
    fn not_found(self) -> AppError {
        match self {
            LikeTarget::Post => AppError::NotFound("Post not found".to_string()),
            LikeTarget::Comment => AppError::NotFound("Comment not found".to_string()),
        }
    }

    /// Row lock on the target; serializes concurrent toggles without blocking
    /// foreign-key checks from inserts that reference it.
    fn lock_sql(self) -> &'static str {
        match self {
            LikeTarget::Post => "SELECT id FROM posts WHERE id = $1 FOR NO KEY UPDATE",
            LikeTarget::Comment => "SELECT id FROM comments WHERE id = $1 FOR NO KEY UPDATE",
        }
    }

    fn exists_sql(self) -> &'static str {
        match self {
            LikeTarget::Post => "SELECT id FROM posts WHERE id = $1",
            LikeTarget::Comment => "SELECT id FROM comments WHERE id = $1",
        }
    }

    fn delete_sql(self) -> &'static str {
        match self {
            LikeTarget::Post => "DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2",
            LikeTarget::Comment => {
                "DELETE FROM comments_likes WHERE comment_id = $1 AND user_id = $2"
            }
        }
    }

    fn insert_sql(self) -> &'static str {
        match self {
            LikeTarget::Post => {
                "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
            }
            LikeTarget::Comment => {
                "INSERT INTO comments_likes (comment_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
            }
        }
    }

    fn presence_sql(self) -> &'static str {
        match self {
            LikeTarget::Post => {
                "SELECT EXISTS(SELECT 1 FROM post_likes WHERE post_id = $1 AND user_id = $2)"
            }
            LikeTarget::Comment => {
                "SELECT EXISTS(SELECT 1 FROM comments_likes WHERE comment_id = $1 AND user_id = $2)"
            }
        }
    }

    fn count_sql(self) -> &'static str {
        match self {
            LikeTarget::Post => "SELECT COUNT(*) FROM post_likes WHERE post_id = $1",
            LikeTarget::Comment => "SELECT COUNT(*) FROM comments_likes WHERE comment_id = $1",
        }
    }
}

/// Flips the like of `user_id` on the target and returns the new state.
///
/// Runs in one transaction holding a row lock on the target, so two concurrent
/// toggles by the same user cannot both insert or both delete. A missing target
/// is reported as not-found before anything is written.
pub async fn toggle_like(
    pool: &PgPool,
    target: LikeTarget,
    target_id: i64,
    user_id: i64,
) -> Result<LikeState, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query_scalar::<_, i64>(target.lock_sql())
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| target.not_found())?;

    let removed = sqlx::query(target.delete_sql())
        .bind(target_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let liked = if removed > 0 {
        false
    } else {
        sqlx::query(target.insert_sql())
            .bind(target_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        true
    };

    let like_count: i64 = sqlx::query_scalar(target.count_sql())
        .bind(target_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::debug!(?target, target_id, user_id, liked, like_count, "Like toggled");

    Ok(LikeState { liked, like_count })
}

/// Reads the like state without changing it.
pub async fn like_status(
    pool: &PgPool,
    target: LikeTarget,
    target_id: i64,
    user_id: i64,
) -> Result<LikeState, AppError> {
    sqlx::query_scalar::<_, i64>(target.exists_sql())
        .bind(target_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| target.not_found())?;

    let liked: bool = sqlx::query_scalar(target.presence_sql())
        .bind(target_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let like_count: i64 = sqlx::query_scalar(target.count_sql())
        .bind(target_id)
        .fetch_one(pool)
        .await?;

    Ok(LikeState { liked, like_count })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_address_the_matching_tables() {
        for target in [LikeTarget::Post, LikeTarget::Comment] {
            let (table, column) = match target {
                LikeTarget::Post => ("post_likes", "post_id"),
                LikeTarget::Comment => ("comments_likes", "comment_id"),
            };
            assert!(target.delete_sql().contains(table));
            assert!(target.delete_sql().contains(column));
            assert!(target.insert_sql().contains(table));
            assert!(target.count_sql().contains(table));
            assert!(target.presence_sql().contains(table));
        }
    }

    #[test]
    fn missing_target_maps_to_not_found() {
        assert!(matches!(LikeTarget::Post.not_found(), AppError::NotFound(m) if m == "Post not found"));
        assert!(matches!(
            LikeTarget::Comment.not_found(),
            AppError::NotFound(m) if m == "Comment not found"
        ));
    }

    #[test]
    fn state_serializes_with_public_field_names() {
        let json = serde_json::to_value(LikeState { liked: true, like_count: 1 }).unwrap();
        assert_eq!(json, serde_json::json!({ "liked": true, "like_count": 1 }));
    }
}
