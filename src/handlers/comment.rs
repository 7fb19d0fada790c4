// src/handlers/comment.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::post::find_post,
    models::{
        comment::{
            Comment, CommentNode, CreateCommentRequest, UpdateCommentRequest, UserCommentResponse,
        },
        pagination::{PageParams, Pagination},
    },
    services::{
        comment_tree::{fetch_comment_row, fetch_comment_tree},
        likes::{self, LikeTarget},
        moderation::ModerationGate,
        ownership::authorize_owner,
    },
    utils::jwt::{AuthUser, Viewer},
};

const REJECTED: &str = "Comment contains inappropriate content";

async fn find_comment(pool: &PgPool, id: i64) -> Result<Comment, AppError> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, body, post_id, user_id, parent_comment_id, created_at, updated_at
        FROM comments
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Comment not found".to_string()))
}

/// Wraps tree JSON produced by `CommentNode` into a response.
fn tree_response(status: StatusCode, body: Result<Vec<u8>, serde_json::Error>) -> Result<Response, AppError> {
    let body = body.map_err(|e| AppError::InternalServerError(e.to_string()))?;
    Ok((status, [(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// Runs the moderation gate and turns a denial into a content violation.
async fn moderate(gate: &ModerationGate, text: &str) -> Result<(), AppError> {
    let verdict = gate.check_toxicity(text).await;
    if verdict.allowed {
        return Ok(());
    }
    tracing::info!(scores = ?verdict.scores, "Comment rejected by moderation");
    Err(AppError::ContentViolation {
        message: REJECTED.to_string(),
        scores: verdict.scores,
    })
}

/// Nested comment forest of a post.
pub async fn list_comments(
    State(pool): State<PgPool>,
    Extension(viewer): Extension<Viewer>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    find_post(&pool, post_id).await?;

    let tree = fetch_comment_tree(&pool, post_id, viewer.user_id()).await?;

    tree_response(StatusCode::OK, CommentNode::forest_to_json(&tree))
}

/// Create a comment or a reply.
///
/// Order matters: input shape, then moderation, then the post and parent checks,
/// then the insert. Each step short-circuits the rest.
pub async fn create_comment(
    State(pool): State<PgPool>,
    State(gate): State<ModerationGate>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<i64>,
    Json(mut payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Validate payload
    payload.body = payload.body.trim().to_string();
    payload.validate()?;

    // 2. Moderation gate
    moderate(&gate, &payload.body).await?;

    let mut tx = pool.begin().await?;

    // 3. Post must exist
    sqlx::query_scalar::<_, i64>("SELECT id FROM posts WHERE id = $1 FOR KEY SHARE")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    // 4. Parent must exist and belong to the same post
    if let Some(parent_id) = payload.parent_comment_id {
        let parent_post_id: i64 =
            sqlx::query_scalar("SELECT post_id FROM comments WHERE id = $1 FOR KEY SHARE")
                .bind(parent_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::NotFound("Parent comment not found".to_string()))?;

        if parent_post_id != post_id {
            return Err(AppError::BadRequest(
                "Parent comment does not belong to this post".to_string(),
            ));
        }
    }

    // 5. Insert
    let comment_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO comments (body, post_id, user_id, parent_comment_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&payload.body)
    .bind(post_id)
    .bind(user.id)
    .bind(payload.parent_comment_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create comment: {:?}", e);
        AppError::from(e)
    })?;

    tx.commit().await?;

    tracing::info!(comment_id, post_id, user_id = user.id, "Comment created");

    // 6. Re-fetch with author and like aggregates
    let row = fetch_comment_row(&pool, comment_id, Some(user.id)).await?;

    tree_response(StatusCode::CREATED, CommentNode::new(row).to_json())
}

/// Edit a comment body. Author only; the new text is moderated too.
pub async fn update_comment(
    State(pool): State<PgPool>,
    State(gate): State<ModerationGate>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.body = payload.body.trim().to_string();
    payload.validate()?;

    let comment = find_comment(&pool, id).await?;
    authorize_owner(&comment, &user, "update")?;

    moderate(&gate, &payload.body).await?;

    sqlx::query("UPDATE comments SET body = $1, updated_at = NOW() WHERE id = $2")
        .bind(&payload.body)
        .bind(id)
        .execute(&pool)
        .await?;

    let row = fetch_comment_row(&pool, id, Some(user.id)).await?;

    tree_response(StatusCode::OK, CommentNode::new(row).to_json())
}

/// Delete a comment. Author only; replies and likes cascade.
pub async fn delete_comment(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let comment = find_comment(&pool, id).await?;
    authorize_owner(&comment, &user, "delete")?;

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete comment: {:?}", e);
            AppError::from(e)
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Toggle the caller's like on a comment.
pub async fn toggle_comment_like(
    State(pool): State<PgPool>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let state = likes::toggle_like(&pool, LikeTarget::Comment, id, user.id).await?;
    Ok(Json(state))
}

/// Comments written by one user, newest first.
pub async fn list_user_comments(
    State(pool): State<PgPool>,
    Extension(viewer): Extension<Viewer>,
    Path(user_id): Path<i64>,
    Query(paging): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let comments = sqlx::query_as::<_, UserCommentResponse>(
        r#"
        SELECT
            c.id, c.body, c.post_id, p.title AS post_title, c.parent_comment_id,
            c.created_at, c.updated_at, u.username,
            (SELECT COUNT(*) FROM comments_likes cl WHERE cl.comment_id = c.id) AS like_count,
            EXISTS(
                SELECT 1 FROM comments_likes vl WHERE vl.comment_id = c.id AND vl.user_id = $1
            ) AS liked_by_viewer
        FROM comments c
        JOIN users u ON u.id = c.user_id
        JOIN posts p ON p.id = c.post_id
        WHERE c.user_id = $2
        ORDER BY c.created_at DESC, c.id DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(viewer.user_id())
    .bind(user_id)
    .bind(paging.limit(10))
    .bind(paging.offset(10))
    .fetch_all(&pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await?;

    Ok(Json(json!({
        "comments": comments,
        "pagination": Pagination::new(&paging, 10, total),
    })))
}
