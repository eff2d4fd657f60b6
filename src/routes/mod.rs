pub mod bags;
pub mod documents;
pub mod health;
pub mod lifecycle;
pub mod searches;
pub mod validation;

pub use health::health_check;
pub use validation::{BagId, Username};

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::constants::ROOT_GREETING;
use crate::AppState;

/// Build the full application router
pub fn create_router(state: AppState) -> Router {
    let stores = state.stores.clone();

    Router::new()
        .route("/", get(|| async { ROOT_GREETING }))
        .route("/health", get(health_check))
        .merge(documents::router::<AppState>(
            documents::PREFERENCES,
            stores.preferences,
        ))
        .merge(documents::router::<AppState>(
            documents::SESSIONS,
            stores.sessions,
        ))
        .merge(searches::router::<AppState>(stores.searches))
        .merge(bags::router::<AppState>(
            stores.bags,
            state.config.username_suffix.clone(),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(
            &state.config.allowed_origins,
            state.config.allows_any_origin(),
        ))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String], any_origin: bool) -> CorsLayer {
    let origin = if any_origin {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(Any)
}
