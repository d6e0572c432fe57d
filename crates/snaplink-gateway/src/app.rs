use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    access_handler, analytics_handler, create_url_handler, delete_url_handler, get_url_handler,
    health_handler, list_owned_urls_handler, list_public_urls_handler, overview_handler,
    redirect_handler, update_url_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .nest(
                "/api",
                Router::new()
                    .route(
                        "/urls",
                        post(create_url_handler).get(list_owned_urls_handler),
                    )
                    .route(
                        "/urls/{code}",
                        get(get_url_handler)
                            .put(update_url_handler)
                            .delete(delete_url_handler),
                    )
                    .route("/urls/{code}/analytics", get(analytics_handler))
                    .route("/overview", get(overview_handler))
                    .route("/public", get(list_public_urls_handler)),
            )
            .route("/{code}", get(redirect_handler))
            .route("/{code}/access", post(access_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
