//! HTTP front end over the dispatcher.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, Level};

use crate::config::Settings;
use crate::error::ToolError;
use crate::events::ToolEvent;
use crate::host::HostInfo;
use crate::llm::LlmClient;
use crate::tools::{Dispatcher, ToolRegistry};
use crate::types::ToolRequest;

pub const SERVER_NAME: &str = "talk-to-your-pc";

#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
    llm: Arc<LlmClient>,
    registry: Arc<ToolRegistry>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, llm: Arc<LlmClient>, registry: ToolRegistry) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            llm,
            registry: Arc::new(registry),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ToolError> {
        let llm = Arc::new(LlmClient::from_settings(settings)?);
        let dispatcher = Dispatcher::from_settings(settings, llm.clone());
        Ok(Self::new(dispatcher, llm, ToolRegistry::builtin()))
    }
}

#[derive(Debug, Deserialize)]
pub struct ToolCallBody {
    pub tool: String,
    pub input_text: String,
}

#[derive(Debug, Serialize)]
pub struct ToolResponse {
    pub result: String,
    pub timestamp: String,
    pub tool: String,
    pub input_text: String,
}

/// JSON error body `{ "detail": ... }` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/mcp/tools", get(list_tools))
        .route("/mcp/tools/call", post(call_tool))
        .route("/mcp/tools/stream", post(stream_tool))
        .route("/mcp/tools/batch", post(batch_tools))
        .route("/llm/query", post(query_llm))
        .route("/system/info", get(system_info))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    if !state.llm.is_configured() {
        tracing::warn!("no LLM API key found; server will start but tools will fail");
    } else {
        info!(provider = %state.llm.describe(), "LLM provider ready");
    }

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}

// --- HANDLERS ---

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "server": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "available_tools": state.registry.tool_names(),
        "llm_provider": state.llm.describe(),
    }))
}

async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "tools": state.registry.schemas() }))
}

async fn call_tool(
    State(state): State<AppState>,
    Json(body): Json<ToolCallBody>,
) -> Result<Json<ToolResponse>, ApiError> {
    let capability = state
        .registry
        .lookup(&body.tool)
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, format!("Unknown tool: {}", body.tool)))?;

    let request = ToolRequest::new(capability, body.input_text);
    let result = state.dispatcher.dispatch(&request).await.map_err(|e| {
        error!(tool = %body.tool, error = %e, "tool execution failed");
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Tool execution failed: {e}"),
        )
    })?;

    Ok(Json(ToolResponse {
        result,
        timestamp: Utc::now().to_rfc3339(),
        tool: body.tool,
        input_text: request.input_text,
    }))
}

async fn stream_tool(
    State(state): State<AppState>,
    Json(body): Json<ToolCallBody>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = tokio::sync::mpsc::channel::<ToolEvent>(4);

    tokio::spawn(async move {
        let _ = tx
            .send(ToolEvent::Started {
                tool: body.tool.clone(),
            })
            .await;

        let last = match state.registry.lookup(&body.tool) {
            Err(_) => ToolEvent::Error {
                message: format!("Unknown tool: {}", body.tool),
            },
            Ok(capability) => {
                let request = ToolRequest::new(capability, body.input_text);
                match state.dispatcher.dispatch(&request).await {
                    Ok(result) => ToolEvent::Completed { result },
                    Err(e) => ToolEvent::Error {
                        message: e.to_string(),
                    },
                }
            }
        };
        let _ = tx.send(last).await;
    });

    let stream = ReceiverStream::new(rx)
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.to_json().to_string())));
    Sse::new(stream)
}

async fn batch_tools(
    State(state): State<AppState>,
    Json(requests): Json<Vec<ToolCallBody>>,
) -> Json<Value> {
    let mut results = Vec::with_capacity(requests.len());

    // Entries run one after another, in request order.
    for req in requests {
        let outcome = match state.registry.lookup(&req.tool) {
            Err(_) => Ok(format!("Error: Unknown tool {}", req.tool)),
            Ok(capability) => {
                state
                    .dispatcher
                    .dispatch(&ToolRequest::new(capability, req.input_text.clone()))
                    .await
            }
        };

        let timestamp = Utc::now().to_rfc3339();
        results.push(match outcome {
            Ok(result) => json!({
                "tool": req.tool,
                "input_text": req.input_text,
                "result": result,
                "timestamp": timestamp,
            }),
            Err(e) => json!({
                "tool": req.tool,
                "input_text": req.input_text,
                "error": e.to_string(),
                "timestamp": timestamp,
            }),
        });
    }

    Json(json!({ "results": results }))
}

async fn query_llm(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let system_prompt = body["system_prompt"]
        .as_str()
        .unwrap_or("You are a helpful assistant.");
    let user_prompt = body["user_prompt"].as_str().unwrap_or("");

    let response = state
        .llm
        .get_llm_response(system_prompt, user_prompt)
        .await
        .map_err(|e| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("LLM query failed: {e}"),
            )
        })?;

    Ok(Json(json!({
        "response": response,
        "timestamp": Utc::now().to_rfc3339(),
    })))
}

async fn system_info() -> Result<Json<HostInfo>, ApiError> {
    tokio::task::spawn_blocking(HostInfo::collect)
        .await
        .map(Json)
        .map_err(|e| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to get system info: {e}"),
            )
        })
}
