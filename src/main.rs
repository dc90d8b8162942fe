// ABOUTME: Main entry point for the ladle recipe-sharing backend
// ABOUTME: Wires up state, routes, and the server loop

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{EnvFilter, fmt};

mod auth;
mod auth_helpers;
mod entities;
mod error;
mod migration;
mod recipes;
mod session;
mod shopping_list;
mod storage;
mod types;
mod users;

#[cfg(test)]
mod integration_tests;

use session::SessionStore;
use storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub sessions: SessionStore,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/set_password", post(auth::set_password))
        .route("/users", get(users::list_users))
        .route("/users/:user_id", get(users::get_user))
        .route(
            "/users/:user_id/follow",
            post(users::follow_author).delete(users::unfollow_author),
        )
        .route("/subscriptions", get(users::list_subscriptions))
        .route(
            "/ingredients",
            get(recipes::list_ingredients).post(recipes::create_ingredient),
        )
        .route("/ingredients/:ingredient_id", get(recipes::get_ingredient))
        .route(
            "/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/recipes/:recipe_id",
            get(recipes::get_recipe)
                .put(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route(
            "/recipes/:recipe_id/favorite",
            post(recipes::add_favorite).delete(recipes::remove_favorite),
        )
        .route(
            "/recipes/:recipe_id/cart",
            post(recipes::add_cart_entry).delete(recipes::remove_cart_entry),
        )
        .route("/favorites", get(recipes::list_favorites))
        .route("/cart", get(recipes::list_cart))
        .route("/cart/download", get(recipes::download_cart))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let storage = Arc::new(Storage::new().await?);
    let sessions = SessionStore::new();

    // Hourly sweep of expired sessions
    {
        let sessions = sessions.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(3600));
            loop {
                tick.tick().await;
                sessions.cleanup_expired_sessions(session::SESSION_MAX_AGE);
            }
        });
    }

    let state = AppState { storage, sessions };
    let app = build_router(state);

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()?;
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("ladle listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}
