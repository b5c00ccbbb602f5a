use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winops_agent::cli::{Action, Args};
use winops_agent::launch::{self, LaunchConfig};
use winops_agent::secret::{self, SECRET_ENV};
use winops_agent::service::{native_backend, ServiceDefinition, ServiceWrapper};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let Some(action) = args.action() else {
        Args::command().print_help()?;
        println!();
        return Ok(());
    };

    let key_file = match &args.key_file {
        Some(path) => path.clone(),
        None => secret::default_key_file().context("locating the key file")?,
    };

    match action {
        Action::Run => run_agent(LaunchConfig {
            bind: args.bind,
            port: args.port,
            key_file,
        }),
        Action::GenerateKey => {
            let wrapper = wrapper(&args, key_file)?;
            let key = wrapper.regenerate_secret()?;
            println!("New API key: {}", key.secret);
            println!("Saved to {}", wrapper.key_file().display());
            if key.shadowed_by_env {
                println!(
                    "Warning: {SECRET_ENV} is set and takes precedence over the saved key"
                );
            }
            Ok(())
        }
        Action::Install => {
            let wrapper = wrapper(&args, key_file)?;
            wrapper.install()?;
            println!("Service installed; API key stored in {}", wrapper.key_file().display());
            Ok(())
        }
        Action::Uninstall => Ok(wrapper(&args, key_file)?.uninstall()?),
        Action::Start => Ok(wrapper(&args, key_file)?.start()?),
        Action::Stop => Ok(wrapper(&args, key_file)?.stop()?),
        Action::Status => {
            let state = wrapper(&args, key_file)?.status()?;
            println!("Service status: {state}");
            Ok(())
        }
    }
}

fn wrapper(args: &Args, key_file: PathBuf) -> anyhow::Result<ServiceWrapper> {
    let definition =
        ServiceDefinition::for_current_exe(&args.bind.to_string(), args.port, &key_file)
            .context("locating the agent binary")?;
    Ok(ServiceWrapper::new(native_backend()?, definition, key_file))
}

/// Under the Windows service manager, hand over to it; otherwise serve in
/// the foreground until Ctrl-C / SIGTERM.
fn run_agent(config: LaunchConfig) -> anyhow::Result<()> {
    #[cfg(windows)]
    {
        if winops_agent::service::scm::run_as_service(config.clone())? {
            return Ok(());
        }
    }
    launch::run_until(&config, shutdown_signal())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Ctrl-C handler failed: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("SIGTERM handler failed: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown requested");
}
