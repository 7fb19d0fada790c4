// src/services/mod.rs

pub mod comment_tree;
pub mod likes;
pub mod moderation;
pub mod ownership;
