use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, Response},
    middleware,
    routing::get,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use catalog_api::{
    config::AppConfig,
    db,
    handlers::AppServices,
    tracing::{configure_http_tracing, trace_id_middleware},
    AppState,
};

/// Helper harness for spinning up an application backed by an in-memory
/// SQLite database.
pub struct TestApp {
    router: Router,
    #[allow(dead_code)]
    pub state: AppState,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let cfg = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            host: "127.0.0.1".to_string(),
            port: 18_080,
            environment: "test".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            auto_migrate: true,
            cors_allowed_origins: None,
            db_max_connections: 1,
            db_min_connections: 1,
            db_connect_timeout_secs: 5,
            db_idle_timeout_secs: 60,
            db_acquire_timeout_secs: 5,
        };

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let db_arc = Arc::new(pool);
        let services = AppServices::new(db_arc.clone());
        let state = AppState {
            db: db_arc,
            config: cfg,
            services,
        };

        let router = Router::new()
            .route("/", get(|| async { "catalog-api up" }))
            .nest("/api/v1", catalog_api::api_v1_routes())
            .layer(configure_http_tracing())
            .layer(middleware::from_fn(trace_id_middleware))
            .with_state(state.clone());

        Self { router, state }
    }

    /// Issues a request against the in-memory router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        json_body: Option<Value>,
    ) -> Response<Body> {
        let builder = Request::builder().method(method).uri(uri);
        let request = match json_body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(value.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }
}

/// Decodes a response body as JSON.
pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
