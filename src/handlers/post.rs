// src/handlers/post.rs

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
    handlers::community::find_community,
    models::{
        pagination::{PageParams, Pagination},
        post::{CreatePostRequest, Post, PostListParams, PostView, UpdatePostRequest},
    },
    services::{
        likes::{self, LikeTarget},
        ownership::authorize_owner,
    },
    utils::{
        html::clean_html,
        jwt::{AuthUser, Viewer},
    },
};

/// `$1` is the viewer id (nullable) used for `liked_by_viewer`.
const VIEW_SELECT: &str = r#"
    SELECT
        p.id, p.title, p.body, p.image, p.community_id, c.name AS community_name,
        p.user_id, u.username, p.created_at, p.updated_at,
        (SELECT COUNT(*) FROM post_likes pl WHERE pl.post_id = p.id) AS like_count,
        (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count,
        EXISTS(
            SELECT 1 FROM post_likes vl WHERE vl.post_id = p.id AND vl.user_id = $1
        ) AS liked_by_viewer
    FROM posts p
    JOIN users u ON u.id = p.user_id
    JOIN communities c ON c.id = p.community_id
"#;

pub(crate) async fn find_post(pool: &PgPool, id: i64) -> Result<Post, AppError> {
    sqlx::query_as::<_, Post>(
        r#"
        SELECT id, title, body, image, community_id, user_id, created_at, updated_at
        FROM posts
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))
}

async fn find_view(pool: &PgPool, id: i64, viewer_id: Option<i64>) -> Result<PostView, AppError> {
    sqlx::query_as::<_, PostView>(&format!("{VIEW_SELECT} WHERE p.id = $2"))
        .bind(viewer_id)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))
}

/// Create a new post in an existing community.
pub async fn create_post(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Json(mut payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.title = payload.title.trim().to_string();
    payload.body = payload.body.trim().to_string();
    payload.validate()?;

    find_community(&pool, payload.community_id).await?;

    let post_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO posts (title, body, community_id, user_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&payload.title)
    .bind(clean_html(&payload.body))
    .bind(payload.community_id)
    .bind(user.id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(find_view(&pool, post_id, Some(user.id)).await?)))
}

/// List posts (Recent first), optionally by community or search term.
pub async fn list_posts(
    State(pool): State<PgPool>,
    Extension(viewer): Extension<Viewer>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let paging = params.paging();
    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let posts = sqlx::query_as::<_, PostView>(&format!(
        r#"{VIEW_SELECT}
        WHERE ($2::BIGINT IS NULL OR p.community_id = $2)
          AND ($3::TEXT IS NULL OR p.title ILIKE '%' || $3 || '%' OR p.body ILIKE '%' || $3 || '%')
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT $4 OFFSET $5
        "#
    ))
    .bind(viewer.user_id())
    .bind(params.community_id)
    .bind(search)
    .bind(paging.limit(10))
    .bind(paging.offset(10))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list posts: {:?}", e);
        AppError::from(e)
    })?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM posts p
        WHERE ($1::BIGINT IS NULL OR p.community_id = $1)
          AND ($2::TEXT IS NULL OR p.title ILIKE '%' || $2 || '%' OR p.body ILIKE '%' || $2 || '%')
        "#,
    )
    .bind(params.community_id)
    .bind(search)
    .fetch_one(&pool)
    .await?;

    Ok(Json(json!({
        "posts": posts,
        "pagination": Pagination::new(&paging, 10, total),
    })))
}

/// Get a single post by ID.
pub async fn get_post(
    State(pool): State<PgPool>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(find_view(&pool, id, viewer.user_id()).await?))
}

/// Posts authored by one user, newest first.
pub async fn list_user_posts(
    State(pool): State<PgPool>,
    Extension(viewer): Extension<Viewer>,
    Path(user_id): Path<i64>,
    Query(paging): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let posts = sqlx::query_as::<_, PostView>(&format!(
        r#"{VIEW_SELECT}
        WHERE p.user_id = $2
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(viewer.user_id())
    .bind(user_id)
    .bind(paging.limit(10))
    .bind(paging.offset(10))
    .fetch_all(&pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await?;

    Ok(Json(json!({
        "posts": posts,
        "pagination": Pagination::new(&paging, 10, total),
    })))
}

/// Edit title and/or body. Author only.
pub async fn update_post(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.title = payload.title.map(|t| t.trim().to_string());
    payload.body = payload.body.map(|b| b.trim().to_string());
    payload.validate()?;

    let post = find_post(&pool, id).await?;
    authorize_owner(&post, &user, "update")?;

    sqlx::query(
        r#"
        UPDATE posts
        SET title = COALESCE($1, title), body = COALESCE($2, body), updated_at = NOW()
        WHERE id = $3
        "#,
    )
    .bind(payload.title.as_deref())
    .bind(payload.body.as_deref().map(clean_html))
    .bind(id)
    .execute(&pool)
    .await?;

    Ok(Json(find_view(&pool, id, Some(user.id)).await?))
}

/// Delete a post. Author only; comments and likes cascade.
pub async fn delete_post(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = find_post(&pool, id).await?;
    authorize_owner(&post, &user, "delete")?;

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete post: {:?}", e);
            AppError::from(e)
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Toggle the caller's like on a post.
pub async fn toggle_post_like(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let state = likes::toggle_like(&pool, LikeTarget::Post, id, user.id).await?;
    Ok(Json(state))
}

/// Current like state of the caller on a post.
pub async fn post_like_status(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let state = likes::like_status(&pool, LikeTarget::Post, id, user.id).await?;
    Ok(Json(state))
}
