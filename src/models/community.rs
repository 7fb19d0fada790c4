// src/models/community.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::services::ownership::Owned;

/// Letters, digits, spaces, hyphens and underscores.
static COMMUNITY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\s\-_]+$").expect("community name regex"));

/// Represents the 'communities' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Community {
    pub id: i64,
    pub name: String,
    /// The creator; immutable, implicitly a member.
    pub created_by: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Owned for Community {
    const KIND: &'static str = "community";

    fn owner_id(&self) -> i64 {
        self.created_by
    }
}

/// A community with creator name, counts and the viewer's membership.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CommunityView {
    pub id: i64,
    pub name: String,
    pub created_by: i64,
    pub created_by_username: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub post_count: i64,
    pub member_count: i64,
    pub is_member: bool,
}

/// A row of the member listing.
#[derive(Debug, Serialize, FromRow)]
pub struct MemberResponse {
    pub id: i64,
    pub username: String,
    pub profile_image: Option<String>,
    pub joined_at: chrono::DateTime<chrono::Utc>,
    pub is_creator: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommunityRequest {
    #[validate(
        length(
            min = 3,
            max = 100,
            message = "Community name must be between 3 and 100 characters"
        ),
        regex(
            path = *COMMUNITY_NAME,
            message = "Community name can only contain letters, numbers, spaces, hyphens, and underscores"
        )
    )]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommunityRequest {
    #[validate(
        length(
            min = 3,
            max = 100,
            message = "Community name must be between 3 and 100 characters"
        ),
        regex(
            path = *COMMUNITY_NAME,
            message = "Community name can only contain letters, numbers, spaces, hyphens, and underscores"
        )
    )]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommunityListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Case-insensitive substring match on the name.
    pub search: Option<String>,
}
