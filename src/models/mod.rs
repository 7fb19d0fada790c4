// src/models/mod.rs

pub mod comment;
pub mod community;
pub mod pagination;
pub mod post;
pub mod user;
