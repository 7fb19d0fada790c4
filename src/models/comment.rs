use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::services::ownership::Owned;

/// Represents the 'comments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub body: String,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_comment_id: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Owned for Comment {
    const KIND: &'static str = "comment";

    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

/// A comment joined with its author and like aggregates.
///
/// `like_count` and `liked_by_viewer` are computed by the fetch query.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CommentRow {
    pub id: i64,
    pub body: String,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_comment_id: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub username: String,
    pub profile_image: Option<String>,
    pub like_count: i64,
    pub liked_by_viewer: bool,
}

/// A node of the reply tree: the comment itself plus its direct replies.
///
/// Reply chains can be arbitrarily deep, so nodes are neither dropped nor
/// serialized recursively. Use [`CommentNode::to_json`] or
/// [`CommentNode::forest_to_json`] instead of serde; the output is the row's
/// fields followed by a `replies` array.
#[derive(Debug)]
pub struct CommentNode {
    pub comment: CommentRow,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn new(comment: CommentRow) -> Self {
        Self {
            comment,
            replies: Vec::new(),
        }
    }

    /// Encodes this node and its descendants as a JSON object.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut out = Vec::new();
        write_chunks(vec![Chunk::Node(self)], &mut out)?;
        Ok(out)
    }

    /// Encodes a list of root nodes as a JSON array.
    pub fn forest_to_json(roots: &[CommentNode]) -> Result<Vec<u8>, serde_json::Error> {
        let mut out = vec![b'['];
        let mut stack = vec![Chunk::Raw("]")];
        push_siblings(&mut stack, roots);
        write_chunks(stack, &mut out)?;
        Ok(out)
    }
}

impl Drop for CommentNode {
    fn drop(&mut self) {
        // Detach descendants onto a heap list so each node drops with no replies.
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

enum Chunk<'a> {
    Node(&'a CommentNode),
    Raw(&'static str),
}

/// Pushes `nodes` so they pop in order, comma separated.
fn push_siblings<'a>(stack: &mut Vec<Chunk<'a>>, nodes: &'a [CommentNode]) {
    for (i, node) in nodes.iter().enumerate().rev() {
        stack.push(Chunk::Node(node));
        if i > 0 {
            stack.push(Chunk::Raw(","));
        }
    }
}

fn write_chunks(mut stack: Vec<Chunk<'_>>, out: &mut Vec<u8>) -> Result<(), serde_json::Error> {
    while let Some(chunk) = stack.pop() {
        match chunk {
            Chunk::Raw(s) => out.extend_from_slice(s.as_bytes()),
            Chunk::Node(node) => {
                // A row always encodes as a non-empty object; reopen it to append replies.
                let row = serde_json::to_vec(&node.comment)?;
                out.extend_from_slice(&row[..row.len() - 1]);
                out.extend_from_slice(br#","replies":["#);
                stack.push(Chunk::Raw("]}"));
                push_siblings(&mut stack, &node.replies);
            }
        }
    }
    Ok(())
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Comment must be between 1 and 1000 characters"
    ))]
    pub body: String,

    /// Optional: the ID of the comment being replied to.
    #[validate(range(min = 1, message = "Parent comment ID must be a positive integer"))]
    pub parent_comment_id: Option<i64>,
}

/// DTO for editing a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Comment must be between 1 and 1000 characters"
    ))]
    pub body: String,
}

/// A comment as listed on a user's activity page.
#[derive(Debug, Serialize, FromRow)]
pub struct UserCommentResponse {
    pub id: i64,
    pub body: String,
    pub post_id: i64,
    pub post_title: String,
    pub parent_comment_id: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub username: String,
    pub like_count: i64,
    pub liked_by_viewer: bool,
}
