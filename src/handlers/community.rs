// src/handlers/community.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        community::{
            Community, CommunityListParams, CommunityView, CreateCommunityRequest,
            MemberResponse, UpdateCommunityRequest,
        },
        pagination::{PageParams, Pagination},
    },
    services::ownership::authorize_owner,
    utils::jwt::{AuthUser, Viewer},
};

/// `$1` is the viewer id (nullable) used for `is_member`.
const VIEW_SELECT: &str = r#"
    SELECT
        c.id, c.name, c.created_by, u.username AS created_by_username, c.created_at,
        (SELECT COUNT(*) FROM posts p WHERE p.community_id = c.id) AS post_count,
        (SELECT COUNT(*) FROM user_communities uc WHERE uc.community_id = c.id) AS member_count,
        EXISTS(
            SELECT 1 FROM user_communities m WHERE m.community_id = c.id AND m.user_id = $1
        ) AS is_member
    FROM communities c
    JOIN users u ON u.id = c.created_by
"#;

pub(crate) async fn find_community(pool: &PgPool, id: i64) -> Result<Community, AppError> {
    sqlx::query_as::<_, Community>(
        "SELECT id, name, created_by, created_at FROM communities WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Community not found".to_string()))
}

async fn find_view(pool: &PgPool, id: i64, viewer_id: Option<i64>) -> Result<CommunityView, AppError> {
    sqlx::query_as::<_, CommunityView>(&format!("{VIEW_SELECT} WHERE c.id = $2"))
        .bind(viewer_id)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Community not found".to_string()))
}

async fn ensure_name_free(pool: &PgPool, name: &str, except: Option<i64>) -> Result<(), AppError> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM communities WHERE name = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
    )
    .bind(name)
    .bind(except)
    .fetch_one(pool)
    .await?;

    if taken {
        return Err(AppError::Conflict(
            "Community with this name already exists".to_string(),
        ));
    }
    Ok(())
}

/// List communities by name, optionally filtered by a search term.
pub async fn list_communities(
    State(pool): State<PgPool>,
    Extension(viewer): Extension<Viewer>,
    Query(params): Query<CommunityListParams>,
) -> Result<impl IntoResponse, AppError> {
    let paging = PageParams {
        page: params.page,
        limit: params.limit,
    };
    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let communities = sqlx::query_as::<_, CommunityView>(&format!(
        r#"{VIEW_SELECT}
        WHERE ($2::TEXT IS NULL OR c.name ILIKE '%' || $2 || '%')
        ORDER BY c.name ASC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(viewer.user_id())
    .bind(search)
    .bind(paging.limit(20))
    .bind(paging.offset(20))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list communities: {:?}", e);
        AppError::from(e)
    })?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM communities WHERE ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%')",
    )
    .bind(search)
    .fetch_one(&pool)
    .await?;

    Ok(Json(json!({
        "communities": communities,
        "pagination": Pagination::new(&paging, 20, total),
    })))
}

/// Communities the caller belongs to.
pub async fn my_communities(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let communities = sqlx::query_as::<_, CommunityView>(&format!(
        r#"{VIEW_SELECT}
        WHERE EXISTS(
            SELECT 1 FROM user_communities mine WHERE mine.community_id = c.id AND mine.user_id = $1
        )
        ORDER BY c.name ASC
        "#
    ))
    .bind(user.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(communities))
}

/// Community detail; `is_member` reflects the viewer when a token is present.
pub async fn get_community(
    State(pool): State<PgPool>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(find_view(&pool, id, viewer.user_id()).await?))
}

/// Create a community. The creator joins it in the same transaction.
pub async fn create_community(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Json(mut payload): Json<CreateCommunityRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.name = payload.name.trim().to_string();
    payload.validate()?;

    ensure_name_free(&pool, &payload.name, None).await?;

    let mut tx = pool.begin().await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO communities (name, created_by) VALUES ($1, $2) RETURNING id",
    )
    .bind(&payload.name)
    .bind(user.id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create community: {:?}", e);
        AppError::from(e)
    })?;

    sqlx::query("INSERT INTO user_communities (user_id, community_id) VALUES ($1, $2)")
        .bind(user.id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(community_id = id, user_id = user.id, "Community created");

    Ok((StatusCode::CREATED, Json(find_view(&pool, id, Some(user.id)).await?)))
}

/// Rename a community. Creator only.
pub async fn update_community(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateCommunityRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.name = payload.name.map(|n| n.trim().to_string());
    payload.validate()?;

    let community = find_community(&pool, id).await?;
    authorize_owner(&community, &user, "update")?;

    if let Some(name) = &payload.name {
        ensure_name_free(&pool, name, Some(id)).await?;
    }

    sqlx::query("UPDATE communities SET name = COALESCE($1, name) WHERE id = $2")
        .bind(payload.name.as_deref())
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(Json(find_view(&pool, id, Some(user.id)).await?))
}

/// Delete a community. Creator only; posts, comments, likes and memberships cascade.
pub async fn delete_community(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let community = find_community(&pool, id).await?;
    authorize_owner(&community, &user, "delete")?;

    sqlx::query("DELETE FROM communities WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete community: {:?}", e);
            AppError::from(e)
        })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn join_community(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    find_community(&pool, id).await?;

    let inserted = sqlx::query(
        "INSERT INTO user_communities (user_id, community_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user.id)
    .bind(id)
    .execute(&pool)
    .await?
    .rows_affected();

    if inserted == 0 {
        return Err(AppError::BadRequest(
            "Already a member of this community".to_string(),
        ));
    }

    Ok(Json(json!({ "message": "Successfully joined the community" })))
}

/// Leave a community. The creator cannot leave.
pub async fn leave_community(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let community = find_community(&pool, id).await?;

    if community.created_by == user.id {
        return Err(AppError::BadRequest(
            "Community creators cannot leave their own communities".to_string(),
        ));
    }

    let removed = sqlx::query("DELETE FROM user_communities WHERE user_id = $1 AND community_id = $2")
        .bind(user.id)
        .bind(id)
        .execute(&pool)
        .await?
        .rows_affected();

    if removed == 0 {
        return Err(AppError::BadRequest(
            "Not a member of this community".to_string(),
        ));
    }

    Ok(Json(json!({ "message": "Successfully left the community" })))
}

pub async fn list_members(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Query(paging): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    find_community(&pool, id).await?;

    let members = sqlx::query_as::<_, MemberResponse>(
        r#"
        SELECT u.id, u.username, u.profile_image, uc.joined_at,
               (c.created_by = u.id) AS is_creator
        FROM user_communities uc
        JOIN users u ON u.id = uc.user_id
        JOIN communities c ON c.id = uc.community_id
        WHERE uc.community_id = $1
        ORDER BY uc.joined_at ASC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(id)
    .bind(paging.limit(20))
    .bind(paging.offset(20))
    .fetch_all(&pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_communities WHERE community_id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await?;

    Ok(Json(json!({
        "members": members,
        "pagination": Pagination::new(&paging, 20, total),
    })))
}
