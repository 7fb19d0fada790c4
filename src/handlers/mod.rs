// src/handlers/mod.rs

pub mod auth;
pub mod comment;
pub mod community;
pub mod post;
