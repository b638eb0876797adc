use std::path::Path;
use std::sync::Arc;
use axum::http::{header, HeaderValue};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tower::Layer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::games::backend_upgrade_game::create_router as create_upgrade_game_router;
use crate::services::catalog;
use crate::services::inventory_authority::InventoryHandle;
use crate::services::inventory_service::InventoryStore;

mod config;
mod error;
mod games;
mod logging;
mod services;

#[derive(Clone)]
pub struct AppState {
    pub inventory: InventoryHandle,
    /// One permit per live WebSocket connection.
    pub connections: Arc<Semaphore>,
}

pub async fn health_check() -> impl IntoResponse {
    "OK"
}

fn build_app(state: AppState, static_dir: &Path) -> Router {
    let mut app = Router::new()
        .route("/api/health_check", get(health_check))
        .merge(create_upgrade_game_router());

    if static_dir.exists() {
        info!("Serving static files from {:?}", static_dir);
        let cache_control_layer = SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        );
        app = app.fallback_service(cache_control_layer.layer(ServeDir::new(static_dir)));
    } else {
        warn!("Static directory {:?} not found, serving the API only", static_dir);
    }

    app.layer(CorsLayer::permissive()).with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::from_path(".env").ok();
    logging::setup()?;

    let config = Config::from_env()?;
    let items = catalog::load(config.catalog_path.as_deref())?;
    info!("Loaded {} catalog item(s)", items.len());
    let (user, site) = catalog::initial_inventories(items);

    let state = AppState {
        inventory: InventoryHandle::spawn(InventoryStore::new(user, site)),
        connections: Arc::new(Semaphore::new(config.max_connections)),
    };
    let app = build_app(state, &config.static_dir);

    let addr = config.addr();
    let listener = TcpListener::bind(addr).await?;
    info!("🎡 Upgrade server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tower::ServiceExt;
    use crate::services::inventory_service::tests::sample_store;

    fn state() -> AppState {
        AppState {
            inventory: InventoryHandle::spawn_with_rng(sample_store(), StdRng::seed_from_u64(5)),
            connections: Arc::new(Semaphore::new(10)),
        }
    }

    async fn get_path(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = build_app(state(), Path::new("definitely-missing-static-dir"));
        let response = get_path(app, "/api/health_check").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_static_files_are_served_without_caching() {
        let dir = std::env::temp_dir().join(format!("upgrade-static-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<h1>upgrade</h1>").unwrap();

        let app = build_app(state(), &dir);
        let response = get_path(app.clone(), "/index.html").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

        // API routes win over the static fallback.
        assert_eq!(get_path(app.clone(), "/api/state").await.status(), StatusCode::OK);
        assert_eq!(get_path(app, "/missing.js").await.status(), StatusCode::NOT_FOUND);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
