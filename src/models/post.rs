use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{models::pagination::PageParams, services::ownership::Owned};

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub image: Option<String>,
    pub community_id: i64,
    pub user_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Owned for Post {
    const KIND: &'static str = "post";

    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

/// A post joined with author, community and aggregate counts.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub image: Option<String>,
    pub community_id: i64,
    pub community_name: String,
    pub user_id: i64,
    pub username: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub like_count: i64,
    pub comment_count: i64,

    /// Whether the current viewer has liked this post. Always false for anonymous viewers.
    pub liked_by_viewer: bool,
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(
        min = 1,
        max = 300,
        message = "Title length must be between 1 and 300 chars"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 10000,
        message = "Body length must be between 1 and 10000 chars"
    ))]
    pub body: String,

    #[validate(range(min = 1, message = "Valid community ID is required"))]
    pub community_id: i64,
}

/// DTO for a partial post update. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(
        min = 1,
        max = 300,
        message = "Title length must be between 1 and 300 chars"
    ))]
    pub title: Option<String>,

    #[validate(length(
        min = 1,
        max = 10000,
        message = "Body length must be between 1 and 10000 chars"
    ))]
    pub body: Option<String>,
}

/// Query parameters for listing posts.
#[derive(Debug, Default, Deserialize)]
pub struct PostListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,

    /// Restrict to one community.
    pub community_id: Option<i64>,

    /// Case-insensitive match on title or body.
    pub search: Option<String>,
}

impl PostListParams {
    pub fn paging(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }
}
