//! HTTP shell
//!
//! Answers a greeting on `/`. The prompt and download endpoints are routed but have no
//! agreed contract yet, so they report `501 Not Implemented`.

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use t2c_core::config::ServerConfig;
use tower_http::trace::TraceLayer;

/// Body of the greeting endpoint
pub const GREETING: &str = "time2code!";

async fn greeting() -> &'static str {
    GREETING
}

async fn prompt() -> impl IntoResponse {
    (
        StatusCode::NOT_IMPLEMENTED,
        "POST /api/prompt is not implemented yet",
    )
}

async fn download() -> impl IntoResponse {
    (
        StatusCode::NOT_IMPLEMENTED,
        "GET /api/download is not implemented yet",
    )
}

/// Build the router
pub fn router() -> Router {
    Router::new()
        .route("/", get(greeting))
        .route("/api/prompt", post(prompt))
        .route("/api/download", get(download))
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process is stopped
pub async fn serve(config: &ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("HTTP shell listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    async fn call(method: Method, uri: &str) -> (StatusCode, String) {
        let response = router()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_greeting() {
        let (status, body) = call(Method::GET, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "time2code!");
    }

    #[tokio::test]
    async fn test_undetermined_endpoints() {
        let (status, body) = call(Method::POST, "/api/prompt").await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert!(body.contains("/api/prompt"));

        let (status, _) = call(Method::GET, "/api/download").await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_wrong_method_and_unknown_path() {
        let (status, _) = call(Method::GET, "/api/prompt").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = call(Method::GET, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_reports_bind_failure() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: taken.local_addr().unwrap().port(),
        };

        let err = serve(&config).await.unwrap_err();
        assert!(err.to_string().contains("Failed to bind"));
    }
}
