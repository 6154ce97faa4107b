//! HTTP function host: exposes a job host's functions over HTTP.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use durable_helpers_core::{
    AggregateFailure, EngineError, FunctionArgs, HelperError, InstanceFailure, JobHost, Jobs,
};

use crate::error::TestHostError;
use crate::http_host::HttpJobHost;

pub const ERR_FUNCTION_NOT_FOUND: &str = "ERR_FUNCTION_NOT_FOUND";
pub const ERR_INVALID_ARGUMENT: &str = "ERR_INVALID_ARGUMENT";
pub const ERR_TIMEOUT: &str = "ERR_TIMEOUT";
pub const ERR_ORCHESTRATION_FAILED: &str = "ERR_ORCHESTRATION_FAILED";
pub const ERR_ENGINE_UNREACHABLE: &str = "ERR_ENGINE_UNREACHABLE";
pub const ERR_ENGINE_UNAUTHORIZED: &str = "ERR_ENGINE_UNAUTHORIZED";
pub const ERR_INSTANCE_NOT_FOUND: &str = "ERR_INSTANCE_NOT_FOUND";
pub const ERR_MANIFEST_NOT_FOUND: &str = "ERR_MANIFEST_NOT_FOUND";
pub const ERR_ENGINE_ERROR: &str = "ERR_ENGINE_ERROR";
pub const ERR_INTERNAL: &str = "ERR_INTERNAL";

/// JSON body of every error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub error_details: ErrorDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    pub error_code: String,
    pub error_message: String,
    #[serde(default)]
    pub failures: Vec<InstanceFailure>,
    /// Raw payload of the error (function name, argument problem, engine message)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waited_ms: Option<u64>,
}

impl ErrorBody {
    pub fn from_error(err: &HelperError) -> (StatusCode, Self) {
        let mut details = ErrorDetails {
            error_code: ERR_INTERNAL.to_string(),
            error_message: err.to_string(),
            failures: Vec::new(),
            detail: None,
            condition: None,
            waited_ms: None,
        };

        let status = match err {
            HelperError::FunctionNotFound(name) => {
                details.error_code = ERR_FUNCTION_NOT_FOUND.to_string();
                details.detail = Some(name.clone());
                StatusCode::NOT_FOUND
            }
            HelperError::InvalidArgument(msg) => {
                details.error_code = ERR_INVALID_ARGUMENT.to_string();
                details.detail = Some(msg.clone());
                StatusCode::BAD_REQUEST
            }
            HelperError::Timeout { condition, waited } => {
                details.error_code = ERR_TIMEOUT.to_string();
                details.condition = Some(condition.clone());
                details.waited_ms = Some(u64::try_from(waited.as_millis()).unwrap_or(u64::MAX));
                StatusCode::REQUEST_TIMEOUT
            }
            HelperError::Failed(failure) => {
                details.error_code = ERR_ORCHESTRATION_FAILED.to_string();
                details.failures = failure.failures().to_vec();
                StatusCode::INTERNAL_SERVER_ERROR
            }
            HelperError::Transport(engine) => {
                let (code, msg) = match engine {
                    EngineError::Unreachable(msg) => (ERR_ENGINE_UNREACHABLE, msg),
                    EngineError::Unauthorized(msg) => (ERR_ENGINE_UNAUTHORIZED, msg),
                    EngineError::InstanceNotFound(msg) => (ERR_INSTANCE_NOT_FOUND, msg),
                    EngineError::Other(msg) => (ERR_ENGINE_ERROR, msg),
                };
                details.error_code = code.to_string();
                details.detail = Some(msg.clone());
                StatusCode::BAD_GATEWAY
            }
            HelperError::ManifestNotFound(root) => {
                details.error_code = ERR_MANIFEST_NOT_FOUND.to_string();
                details.detail = Some(root.clone());
                StatusCode::INTERNAL_SERVER_ERROR
            }
            HelperError::Remote(msg) => {
                details.detail = Some(msg.clone());
                StatusCode::INTERNAL_SERVER_ERROR
            }
            HelperError::Io(_) | HelperError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Self {
            error: details.error_message.clone(),
            error_details: details,
        };
        (status, body)
    }

    /// Rebuild the error a response body describes.
    pub fn into_helper_error(self) -> HelperError {
        let details = self.error_details;
        let detail = details.detail.unwrap_or(details.error_message);

        match details.error_code.as_str() {
            ERR_FUNCTION_NOT_FOUND => HelperError::FunctionNotFound(detail),
            ERR_INVALID_ARGUMENT => HelperError::InvalidArgument(detail),
            ERR_TIMEOUT => HelperError::Timeout {
                condition: details.condition.unwrap_or(detail),
                waited: Duration::from_millis(details.waited_ms.unwrap_or_default()),
            },
            ERR_ORCHESTRATION_FAILED => AggregateFailure::new(details.failures).into(),
            ERR_ENGINE_UNREACHABLE => EngineError::Unreachable(detail).into(),
            ERR_ENGINE_UNAUTHORIZED => EngineError::Unauthorized(detail).into(),
            ERR_INSTANCE_NOT_FOUND => EngineError::InstanceNotFound(detail).into(),
            ERR_ENGINE_ERROR => EngineError::Other(detail).into(),
            ERR_MANIFEST_NOT_FOUND => HelperError::ManifestNotFound(detail),
            _ => HelperError::Remote(detail),
        }
    }
}

/// A helper error on its way out as an HTTP response
#[derive(Debug)]
pub struct FunctionHostError(pub HelperError);

impl From<HelperError> for FunctionHostError {
    fn from(err: HelperError) -> Self {
        Self(err)
    }
}

impl IntoResponse for FunctionHostError {
    fn into_response(self) -> Response {
        let (status, body) = ErrorBody::from_error(&self.0);
        if status.is_server_error() {
            warn!(status = %status, error = %self.0, "Function call failed");
        }
        (status, Json(body)).into_response()
    }
}

/// Create the function host router.
pub fn function_host_router(host: Arc<dyn JobHost>) -> Router {
    Router::new()
        .route("/admin/functions/:name", post(call_function_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(host)
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn call_function_handler(
    State(host): State<Arc<dyn JobHost>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<StatusCode, FunctionHostError> {
    let args = if body.is_empty() {
        FunctionArgs::new()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| HelperError::InvalidArgument(format!("Request body is not a JSON object: {}", e)))?
    };

    host.call(&name, args).await?;
    Ok(StatusCode::ACCEPTED)
}

/// Serve `host` on `127.0.0.1:port`; port 0 picks a free one.
pub async fn serve(host: Arc<dyn JobHost>, port: u16) -> Result<RunningFunctionHost, TestHostError> {
    let app = function_host_router(host);

    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
    let listener = TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        let shutdown_future = async {
            shutdown_rx.await.ok();
        };

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_future)
            .await
        {
            error!("Function host error: {}", e);
        }
    });

    info!(%addr, "Function host listening");

    Ok(RunningFunctionHost {
        base_url: format!("http://{}", addr),
        addr,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

/// Handle to a serving function host. Dropping it shuts the server down.
pub struct RunningFunctionHost {
    pub base_url: String,
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl fmt::Debug for RunningFunctionHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningFunctionHost")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RunningFunctionHost {
    /// A job host that calls this server
    pub fn client(&self) -> HttpJobHost {
        HttpJobHost::new(&self.base_url)
    }

    /// Jobs whose stages run on this server
    pub fn jobs(&self) -> Jobs {
        Jobs::new(Arc::new(self.client()))
    }

    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Shut down and wait for in-flight requests to finish.
    pub async fn stop(mut self) -> Result<(), TestHostError> {
        self.shutdown();
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| TestHostError::Server(format!("Function host task failed: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for RunningFunctionHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}
