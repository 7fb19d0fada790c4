// src/services/comment_tree.rs

//! Rebuilds the reply forest of a post from its flat comment rows.
//!
//! Rows live in an arena indexed by position; parent/child links are stored as
//! indices, so no node ever points back at its parent. Nested `CommentNode`s are
//! assembled bottom-up without recursion; encoding and dropping a node are
//! iterative too, so depth is bounded only by memory.

use std::collections::HashMap;

use sqlx::PgPool;

use crate::{
    error::AppError,
    models::comment::{CommentNode, CommentRow},
};

/// Assembles `rows` into a forest and returns the root nodes.
///
/// Siblings are ordered by ascending `created_at` (ties broken by id). A row whose
/// parent is absent from `rows` is dropped together with its descendants, as are
/// rows caught in a parent cycle.
pub fn build_tree(mut rows: Vec<CommentRow>) -> Vec<CommentNode> {
    rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let index: HashMap<i64, usize> = rows.iter().enumerate().map(|(i, r)| (r.id, i)).collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
    let mut roots: Vec<usize> = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        match row.parent_comment_id {
            None => roots.push(i),
            Some(parent_id) => match index.get(&parent_id) {
                Some(&p) => children[p].push(i),
                None => tracing::warn!(
                    comment_id = row.id,
                    parent_id,
                    "Dropping comment whose parent is missing"
                ),
            },
        }
    }

    // Pre-order walk from the roots: every node is listed before its descendants.
    let mut order = Vec::with_capacity(rows.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(i) = stack.pop() {
        order.push(i);
        stack.extend(children[i].iter().rev());
    }

    if order.len() < rows.len() {
        tracing::debug!(
            dropped = rows.len() - order.len(),
            "Comments unreachable from any root were omitted"
        );
    }

    let mut arena: Vec<Option<CommentNode>> = rows.into_iter().map(|r| Some(CommentNode::new(r))).collect();

    // Reverse pre-order finalises children before their parent.
    for &i in order.iter().rev() {
        let replies: Vec<CommentNode> = children[i]
            .iter()
            .filter_map(|&c| arena[c].take())
            .collect();
        if let Some(node) = arena[i].as_mut() {
            node.replies = replies;
        }
    }

    roots.into_iter().filter_map(|i| arena[i].take()).collect()
}

/// Comment columns joined with author and like aggregates. `$1` is the viewer id
/// (nullable) used for `liked_by_viewer`.
const ROW_SELECT: &str = r#"
    SELECT
        c.id, c.body, c.post_id, c.user_id, c.parent_comment_id,
        c.created_at, c.updated_at,
        u.username, u.profile_image,
        (SELECT COUNT(*) FROM comments_likes cl WHERE cl.comment_id = c.id) AS like_count,
        EXISTS(
            SELECT 1 FROM comments_likes vl WHERE vl.comment_id = c.id AND vl.user_id = $1
        ) AS liked_by_viewer
    FROM comments c
    JOIN users u ON u.id = c.user_id
"#;

/// Loads every comment of `post_id` with author info, like totals and the
/// viewer's like flag, then nests them.
pub async fn fetch_comment_tree(
    pool: &PgPool,
    post_id: i64,
    viewer_id: Option<i64>,
) -> Result<Vec<CommentNode>, AppError> {
    let rows = sqlx::query_as::<_, CommentRow>(&format!(
        "{ROW_SELECT} WHERE c.post_id = $2 ORDER BY c.created_at ASC, c.id ASC"
    ))
    .bind(viewer_id)
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    Ok(build_tree(rows))
}

/// Loads a single comment with the same annotations as the tree.
pub async fn fetch_comment_row(
    pool: &PgPool,
    comment_id: i64,
    viewer_id: Option<i64>,
) -> Result<CommentRow, AppError> {
    sqlx::query_as::<_, CommentRow>(&format!("{ROW_SELECT} WHERE c.id = $2"))
        .bind(viewer_id)
        .bind(comment_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn row(id: i64, parent: Option<i64>, secs: i64) -> CommentRow {
        CommentRow {
            id,
            body: format!("comment {}", id),
            post_id: 5,
            user_id: 1,
            parent_comment_id: parent,
            created_at: at(secs),
            updated_at: at(secs),
            username: "alice".into(),
            profile_image: None,
            like_count: id,
            liked_by_viewer: id % 2 == 0,
        }
    }

    fn ids(nodes: &[CommentNode]) -> Vec<i64> {
        nodes.iter().map(|n| n.comment.id).collect()
    }

    fn count(nodes: &[CommentNode]) -> usize {
        // Iterative so deep fixtures cannot overflow the test stack.
        let mut stack: Vec<&CommentNode> = nodes.iter().collect();
        let mut total = 0;
        while let Some(n) = stack.pop() {
            total += 1;
            stack.extend(n.replies.iter());
        }
        total
    }

    #[test]
    fn empty_input_gives_empty_forest() {
        assert!(build_tree(Vec::new()).is_empty());
    }

    #[test]
    fn flat_comments_stay_flat() {
        let tree = build_tree(vec![row(1, None, 0), row(2, None, 1), row(3, None, 2)]);
        assert_eq!(ids(&tree), vec![1, 2, 3]);
        assert!(tree.iter().all(|n| n.replies.is_empty()));
    }

    #[test]
    fn nests_replies_under_their_parents() {
        // A(root), B(root), C(parent=A), D(parent=C)
        let tree = build_tree(vec![
            row(1, None, 0),
            row(2, None, 1),
            row(3, Some(1), 2),
            row(4, Some(3), 3),
        ]);

        assert_eq!(ids(&tree), vec![1, 2]);
        assert_eq!(ids(&tree[0].replies), vec![3]);
        assert_eq!(ids(&tree[0].replies[0].replies), vec![4]);
        assert!(tree[0].replies[0].replies[0].replies.is_empty());
        assert!(tree[1].replies.is_empty());
    }

    #[test]
    fn siblings_follow_creation_time_not_input_order() {
        let tree = build_tree(vec![
            row(4, Some(1), 30),
            row(3, Some(1), 10),
            row(1, None, 0),
            row(2, Some(1), 20),
        ]);
        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(ids(&tree[0].replies), vec![3, 2, 4]);
    }

    #[test]
    fn parent_after_child_in_input_still_nests() {
        let tree = build_tree(vec![row(2, Some(1), 5), row(1, None, 5)]);
        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(ids(&tree[0].replies), vec![2]);
    }

    #[test]
    fn node_count_is_preserved() {
        let rows = vec![
            row(1, None, 0),
            row(2, Some(1), 1),
            row(3, Some(1), 2),
            row(4, None, 3),
            row(5, Some(4), 4),
            row(6, Some(2), 5),
            row(7, Some(6), 6),
        ];
        let n = rows.len();
        let tree = build_tree(rows);
        assert_eq!(count(&tree), n);
        assert_eq!(ids(&tree), vec![1, 4]);
    }

    #[test]
    fn like_annotations_are_carried_over() {
        let tree = build_tree(vec![row(1, None, 0), row(2, Some(1), 1)]);
        assert_eq!(tree[0].comment.like_count, 1);
        assert!(!tree[0].comment.liked_by_viewer);
        assert_eq!(tree[0].replies[0].comment.like_count, 2);
        assert!(tree[0].replies[0].comment.liked_by_viewer);
    }

    #[test]
    fn orphans_and_their_descendants_are_dropped() {
        let tree = build_tree(vec![
            row(1, None, 0),
            row(2, Some(99), 1),
            row(3, Some(2), 2),
        ]);
        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(count(&tree), 1);
    }

    #[test]
    fn cycles_and_self_parents_are_dropped() {
        let tree = build_tree(vec![
            row(1, None, 0),
            row(2, Some(3), 1),
            row(3, Some(2), 2),
            row(4, Some(4), 3),
        ]);
        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(count(&tree), 1);
    }

    #[test]
    fn very_deep_chain_is_built_encoded_and_dropped_on_a_small_stack() {
        // 2 MiB matches the default stack of a tokio worker thread.
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let depth: i64 = 100_000;
                let rows: Vec<CommentRow> = (1..=depth)
                    .map(|id| row(id, if id == 1 { None } else { Some(id - 1) }, id))
                    .collect();
                let tree = build_tree(rows);
                assert_eq!(tree.len(), 1);
                assert_eq!(count(&tree), depth as usize);

                let bytes = CommentNode::forest_to_json(&tree).unwrap();
                let text = String::from_utf8(bytes).unwrap();
                assert!(text.starts_with(r#"[{"id":1,"#));
                assert_eq!(text.matches(r#""replies":["#).count(), depth as usize);
                assert!(text.ends_with(&format!("{}]", "]}".repeat(depth as usize))));
            })
            .unwrap();
        handle.join().expect("deep tree must not overflow the stack");
    }
}
