//! Running the agent until told to stop.
//!
//! Shared by the foreground `--run` mode (stopped by Ctrl-C / SIGTERM) and
//! the Windows service entry point (stopped by the service control handler).

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use winops_core::HostCollaborators;

use crate::secret;
use crate::server::AgentServer;

/// Where to listen and where the key lives.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub key_file: PathBuf,
}

/// Resolve the secret, serve on the native host until `shutdown` resolves,
/// then return once in-flight requests are done.
///
/// Builds its own runtime, so it must be called from a plain thread.
pub fn run_until<F>(config: &LaunchConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    run_with_host(config, HostCollaborators::native(), shutdown)
}

/// [`run_until`] with explicit host collaborators.
pub fn run_with_host<F>(
    config: &LaunchConfig,
    host: HostCollaborators,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (secret, origin) =
        secret::resolve_secret(&config.key_file).context("resolving the API key")?;
    info!(?origin, "API key resolved");

    let addr = SocketAddr::new(config.bind, config.port);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {addr}"))?;
        AgentServer::new(secret, host)
            .serve(listener, shutdown)
            .await?;
        Ok::<(), anyhow::Error>(())
    })
}
