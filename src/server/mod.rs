//! HTTP front end: a static page plus JSON endpoints for chat, tool
//! administration and transcription.

mod chat;
pub mod error;
mod tools;
mod transcribe;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::{ChatClient, RoundTripper};
use crate::config::Config;
use crate::dispatch::ExchangeSettings;
use crate::error::Result;
use crate::tools::catalog::load_declarations;
use crate::tools::{build_registry, declare_tool, SharedRegistry, ToolSettings};
use crate::transcription::Transcriber;

pub use chat::{ChatBody, ChatResponse, InputRequired};
pub use tools::{AddToolBody, AddToolResponse, FunctionDefinition, ToolDefinition};
pub use transcribe::TranscribeResponse;

const UPLOAD_LIMIT: usize = 100 * 1024 * 1024;

pub struct AppState {
    pub registry: SharedRegistry,
    pub client: Arc<dyn RoundTripper>,
    pub settings: ExchangeSettings,
    /// Where tools declared at runtime are persisted.
    pub tools_file: PathBuf,
    /// Root token; every request works on a child of it.
    pub cancel: CancellationToken,
}

impl AppState {
    /// Build the registry (catalog, configured declarations, then the
    /// declarations persisted by earlier runs) and the HTTP client.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = ToolSettings {
            transcriber: Some(Arc::new(Transcriber::from_config(&config.transcription))),
        };
        let mut registry = build_registry(&config.tools, settings);

        let tools_file = PathBuf::from(&config.server.tools_file);
        for declaration in load_declarations(&tools_file)? {
            if let Err(e) = declare_tool(&mut registry, &declaration) {
                tracing::warn!(tool = %declaration.name, error = %e, "skipping persisted tool");
            }
        }

        tracing::info!(
            tools = registry.list_tools().len(),
            file = %tools_file.display(),
            "tool registry ready"
        );

        let client = ChatClient::new(config)?.without_streaming();

        Ok(Self {
            registry: registry.into_shared(),
            client: Arc::new(client),
            settings: ExchangeSettings::from_config(config),
            tools_file,
            cancel: CancellationToken::new(),
        })
    }
}

pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/favicon.ico", get(favicon))
        .route("/api/chat", post(chat::chat))
        .route("/api/tools", get(tools::list_tools).post(tools::add_tool))
        .route(
            "/api/transcribe",
            post(transcribe::transcribe).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub struct Server {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Server {
    pub async fn start(bind: &str, state: AppState, static_dir: &Path) -> Result<Self> {
        let cancel = state.cancel.clone();
        let app = router(Arc::new(state), static_dir);
        let listener = TcpListener::bind(bind).await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "server stopped with an error");
            }
        });

        tracing::info!(%addr, static_dir = %static_dir.display(), "listening");

        Ok(Server {
            addr,
            shutdown: Some(shutdown_tx),
            cancel,
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting requests and cancel in-flight exchanges.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(sender) = self.shutdown.take() {
            let _ = sender.send(());
        }
    }

    /// Wait for the serving task to finish.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "server task failed");
            }
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}
