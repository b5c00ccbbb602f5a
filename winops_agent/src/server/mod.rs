//! The HTTP face of the agent.
//!
//! One route per capability operation, all behind the shared-secret check.
//! Handlers delegate to the [`HostCollaborators`] the server was built with,
//! so tests can serve fakes over the real router.

mod auth;
pub mod error;
mod handlers;

use std::any::Any;
use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use winops_core::HostCollaborators;

pub use error::ApiError;

/// Per-process server state. The secret is read-only once the server runs.
#[derive(Clone)]
pub struct AgentState {
    pub(crate) secret: Arc<str>,
    pub(crate) host: HostCollaborators,
}

pub struct AgentServer {
    state: AgentState,
}

impl AgentServer {
    pub fn new(secret: impl Into<String>, host: HostCollaborators) -> Self {
        let secret: String = secret.into();
        Self {
            state: AgentState {
                secret: Arc::from(secret),
                host,
            },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(handlers::root))
            .route("/system", get(handlers::system_info))
            .route("/services", get(handlers::list_services))
            .route("/services/:name", get(handlers::get_service))
            .route("/services/:name/action", post(handlers::service_action))
            .route("/processes", get(handlers::list_processes))
            .route(
                "/processes/:pid",
                get(handlers::get_process).delete(handlers::terminate_process),
            )
            .route(
                "/environment",
                get(handlers::list_environment).post(handlers::set_environment),
            )
            .route(
                "/environment/:name",
                axum::routing::delete(handlers::delete_environment),
            )
            .fallback(handlers::not_found)
            .layer(axum::middleware::from_fn_with_state(
                self.state.clone(),
                auth::require_secret,
            ))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on `listener` until `shutdown` resolves, then let in-flight
    /// requests finish.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        info!("winops agent listening on http://{}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("winops agent stopped");
        Ok(())
    }
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(format!("Internal error: {detail}")).into_response()
}
