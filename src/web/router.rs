//! The bundled axum router.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{self, AppState};

/// Builds the application router.
///
/// | Route | Handler |
/// |---|---|
/// | `GET /login`, `POST /login` | login page and action |
/// | `POST /logout` | logout |
/// | `GET /` | protected home page |
/// | `GET /records/{collection}`, `POST /records/{collection}` | protected listing and create |
/// | `POST /records/{collection}/{id}` | protected update |
/// | `POST /records/{collection}/{id}/delete` | protected delete |
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route(
            "/records/{collection}",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route("/records/{collection}/{id}", post(handlers::update_record))
        .route(
            "/records/{collection}/{id}/delete",
            post(handlers::delete_record),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
