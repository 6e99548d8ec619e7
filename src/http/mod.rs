//! HTTP server - trigger runs and upload configuration over HTTP

use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{Config, Format};
use crate::runner::{ExecuteOptions, RunReport};

/// Shared state for the HTTP server
#[derive(Debug, Clone)]
pub struct AppState {
    /// Config file run by `GET /execute` and replaced by `/config`
    pub config_path: PathBuf,
    pub options: ExecuteOptions,
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route(
            "/execute",
            get(execute_saved).post(execute_posted).fallback(bad_request),
        )
        .route("/config", post(write_config).put(write_config))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind and serve until the process is stopped
pub async fn serve(host: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;

    info!("Starting HTTP server on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Error returned to HTTP clients as `{ "error": ... }`
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl ToString) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }

    fn internal(message: impl ToString) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

async fn root() -> StatusCode {
    StatusCode::OK
}

async fn bad_request() -> StatusCode {
    StatusCode::BAD_REQUEST
}

/// Run the config file on disk
async fn execute_saved(State(state): State<Arc<AppState>>) -> Result<Json<RunReport>, ApiError> {
    let config = Config::load(Some(&state.config_path))
        .map_err(|e| ApiError::internal(format!("{:#}", e)))?;
    run(config, state.options).await
}

/// Run a YAML config sent as the request body
async fn execute_posted(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<RunReport>, ApiError> {
    let config = Config::from_slice(&body, Format::Yaml)
        .map_err(|e| ApiError::bad_request(format!("{:#}", e)))?;
    run(config, state.options).await
}

async fn run(config: Config, options: ExecuteOptions) -> Result<Json<RunReport>, ApiError> {
    crate::execute(config, options)
        .await
        .map(Json)
        .map_err(ApiError::internal)
}

/// Replace the config file with the request body
async fn write_config(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    Config::from_slice(&body, Format::from_path(&state.config_path))
        .map_err(|e| ApiError::bad_request(format!("{:#}", e)))?;

    let path = state.config_path.clone();
    tokio::task::spawn_blocking(move || Config::write_raw(&path, &body))
        .await
        .map_err(ApiError::internal)?
        .map_err(|e| {
            error!("{:#}", e);
            ApiError::internal(format!("{:#}", e))
        })?;

    info!("Config written to {}", state.config_path.display());
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    fn app(config_path: PathBuf) -> Router {
        router(AppState {
            config_path,
            options: ExecuteOptions::default(),
        })
    }

    async fn send(app: Router, method: Method, uri: &str, body: impl Into<Body>) -> StatusCode {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(body.into())
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_root_and_unknown_paths() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("conf.yaml");

        assert_eq!(
            send(app(conf.clone()), Method::GET, "/", Body::empty()).await,
            StatusCode::OK
        );
        assert_eq!(
            send(app(conf), Method::GET, "/nope", Body::empty()).await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_execute_rejects_other_methods() {
        let dir = tempfile::tempdir().unwrap();
        let status = send(
            app(dir.path().join("conf.yaml")),
            Method::DELETE,
            "/execute",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_execute_posted_config() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("inbox");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("a.tmp"), "x").unwrap();
        std::fs::write(target.join("b.txt"), "x").unwrap();

        let yaml = format!(
            "rules:\n  - path: {}\n    filters:\n      - filter: ext\n        payload: .tmp\n    actions:\n      - action: delete\n",
            target.display()
        );
        let status = send(
            app(dir.path().join("conf.yaml")),
            Method::POST,
            "/execute",
            yaml,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(!target.join("a.tmp").exists());
        assert!(target.join("b.txt").exists());
    }

    #[tokio::test]
    async fn test_execute_posted_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "rules:\n  - path: /tmp\n    filters:\n      - filter: colour\n";
        let status = send(
            app(dir.path().join("conf.yaml")),
            Method::POST,
            "/execute",
            yaml,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_execute_saved_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let status = send(
            app(dir.path().join("absent.yaml")),
            Method::GET,
            "/execute",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_write_config() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("conf.yaml");

        let status = send(app(conf.clone()), Method::POST, "/config", "rules: []\n").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(std::fs::read_to_string(&conf).unwrap(), "rules: []\n");

        let status = send(app(conf.clone()), Method::PUT, "/config", "rules: 5\n").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(std::fs::read_to_string(&conf).unwrap(), "rules: []\n");
    }
}
