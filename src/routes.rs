// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{auth, comment, community, post as posts},
    state::AppState,
    utils::jwt::{auth_middleware, optional_auth_middleware},
};

/// Assembles the main application router.
///
/// * Each resource has a public half (optional viewer identity) and a protected
///   half (bearer token required); both are merged under one prefix.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, moderation gate).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let required = middleware::from_fn_with_state(state.clone(), auth_middleware);
    let optional = middleware::from_fn_with_state(state.clone(), optional_auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/check-user", post(auth::check_user))
        .merge(
            Router::new()
                .route("/me", get(auth::get_me).put(auth::update_me))
                .route_layer(required.clone()),
        );

    let community_routes = Router::new()
        .route("/", get(community::list_communities))
        .route("/{id}", get(community::get_community))
        .route("/{id}/members", get(community::list_members))
        .route_layer(optional.clone())
        .merge(
            Router::new()
                .route("/", post(community::create_community))
                .route("/mine", get(community::my_communities))
                .route(
                    "/{id}",
                    put(community::update_community).delete(community::delete_community),
                )
                .route("/{id}/join", post(community::join_community))
                .route("/{id}/leave", post(community::leave_community))
                .route_layer(required.clone()),
        );

    let post_routes = Router::new()
        .route("/", get(posts::list_posts))
        .route("/{id}", get(posts::get_post))
        .route("/user/{user_id}", get(posts::list_user_posts))
        .route_layer(optional.clone())
        .merge(
            Router::new()
                .route("/", post(posts::create_post))
                .route("/{id}", put(posts::update_post).delete(posts::delete_post))
                .route(
                    "/{id}/like",
                    post(posts::toggle_post_like).get(posts::post_like_status),
                )
                .route_layer(required.clone()),
        );

    let comment_routes = Router::new()
        .route("/post/{post_id}", get(comment::list_comments))
        .route("/user/{user_id}", get(comment::list_user_comments))
        .route_layer(optional)
        .merge(
            Router::new()
                .route("/post/{post_id}", post(comment::create_comment))
                .route(
                    "/{id}",
                    put(comment::update_comment).delete(comment::delete_comment),
                )
                .route("/{id}/like", post(comment::toggle_comment_like))
                .route_layer(required),
        );

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/communities", community_routes)
        .nest("/api/posts", post_routes)
        .nest("/api/comments", comment_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
