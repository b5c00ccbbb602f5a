use std::future::Future;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use winops_core::client::DEFAULT_PORT;
use winops_core::model::ServiceAction;
use winops_core::{
    ConnectionRegistry, HostCollaborators, OperationDispatcher, OperationMode, ProfileStore,
    Worker,
};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "winops", version, subcommand_required = true)]
pub struct Args {
    /// Run the command against a saved remote profile instead of this machine
    #[arg(long, global = true, value_name = "PROFILE")]
    pub remote: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage saved agent connections
    #[command(subcommand)]
    Connection(ConnectionCommand),
    /// Show host facts
    System {
        /// Bypass the cached facts
        #[arg(long)]
        refresh: bool,
    },
    /// Inspect and control services
    #[command(subcommand)]
    Services(ServicesCommand),
    /// Inspect and terminate processes
    #[command(subcommand)]
    Processes(ProcessesCommand),
    /// Inspect and edit environment variables
    #[command(subcommand)]
    Env(EnvCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConnectionCommand {
    /// Test an agent and save it under NAME if it answers
    Add {
        name: String,
        host: String,
        /// The agent's API key
        #[arg(long)]
        secret: String,
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Forget a saved connection
    Remove { name: String },
    /// List saved connections
    List,
    /// Re-test every saved connection
    Refresh,
    /// Test one saved connection
    Test { name: String },
}

#[derive(Subcommand, Debug)]
pub enum ServicesCommand {
    List,
    Show { name: String },
    /// start, stop, restart, pause or resume
    Action { name: String, action: ServiceAction },
}

#[derive(Subcommand, Debug)]
pub enum ProcessesCommand {
    List,
    Show { pid: u32 },
    Kill { pid: u32 },
}

#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    List,
    Set {
        name: String,
        value: String,
        /// Machine-wide instead of the current user
        #[arg(long)]
        system: bool,
    },
    Delete {
        name: String,
        #[arg(long)]
        system: bool,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn found<T: Serialize>(value: Option<T>, what: &str) -> anyhow::Result<()> {
    match value {
        Some(value) => print_json(&value),
        None => bail!("{what} not found"),
    }
}

fn succeeded(ok: bool, what: &str) -> anyhow::Result<()> {
    if ok {
        println!("{what}: ok");
        Ok(())
    } else {
        bail!("{what} failed")
    }
}

/// The console session: the worker that runs network and host calls, plus
/// the registry and dispatcher those calls go through.
struct Console {
    worker: Worker,
    dispatcher: OperationDispatcher,
}

impl Console {
    fn open() -> anyhow::Result<Self> {
        let worker = Worker::new().context("starting the worker runtime")?;
        let store = ProfileStore::new().context("opening the profile store")?;
        let registry = ConnectionRegistry::with_store(store).context("loading profiles")?;
        let dispatcher = OperationDispatcher::new(registry, HostCollaborators::native());
        Ok(Self { worker, dispatcher })
    }

    /// Run `job` on the worker and wait for it.
    fn run<F>(&self, job: F) -> anyhow::Result<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.worker
            .run(job)
            .ok_or_else(|| anyhow!("background job panicked"))
    }

    fn registry(&self) -> ConnectionRegistry {
        self.dispatcher.registry().clone()
    }

    fn go_remote(&mut self, profile: &str) -> anyhow::Result<()> {
        let registry = self.registry();
        let name = profile.to_string();
        if !self.run(async move { registry.connect(&name).await })? {
            bail!("could not connect to '{profile}'");
        }
        self.dispatcher.set_mode(OperationMode::Remote);
        Ok(())
    }
}

pub fn run_cli(args: Args) -> anyhow::Result<()> {
    let mut console = Console::open()?;

    if let Command::Connection(command) = args.command {
        return run_connection(&console, command);
    }
    if let Some(profile) = &args.remote {
        console.go_remote(profile)?;
    }
    info!("Running in {} mode", console.dispatcher.get_mode());

    match args.command {
        Command::Connection(_) => Ok(()),
        Command::System { refresh } => {
            let system = console.dispatcher.get_system_manager();
            found(
                console.run(async move { system.get_system_info(refresh).await })?,
                "system information",
            )
        }
        Command::Services(command) => {
            let services = console.dispatcher.get_service_manager();
            match command {
                ServicesCommand::List => {
                    print_json(&console.run(async move { services.get_services().await })?)
                }
                ServicesCommand::Show { name } => {
                    let what = format!("service '{name}'");
                    found(
                        console.run(async move { services.get_service(&name).await })?,
                        &what,
                    )
                }
                ServicesCommand::Action { name, action } => {
                    let what = format!("{action} service '{name}'");
                    succeeded(
                        console.run(async move { services.service_action(&name, action).await })?,
                        &what,
                    )
                }
            }
        }
        Command::Processes(command) => {
            let processes = console.dispatcher.get_process_manager();
            match command {
                ProcessesCommand::List => {
                    print_json(&console.run(async move { processes.get_processes().await })?)
                }
                ProcessesCommand::Show { pid } => found(
                    console.run(async move { processes.get_process(pid).await })?,
                    &format!("process {pid}"),
                ),
                ProcessesCommand::Kill { pid } => succeeded(
                    console.run(async move { processes.terminate_process(pid).await })?,
                    &format!("terminate process {pid}"),
                ),
            }
        }
        Command::Env(command) => {
            let env = console.dispatcher.get_environment_manager();
            match command {
                EnvCommand::List => print_json(
                    &console.run(async move { env.get_environment_variables().await })?,
                ),
                EnvCommand::Set {
                    name,
                    value,
                    system,
                } => {
                    let what = format!("set {name}");
                    succeeded(
                        console.run(async move {
                            env.set_environment_variable(&name, &value, system).await
                        })?,
                        &what,
                    )
                }
                EnvCommand::Delete { name, system } => {
                    let what = format!("delete {name}");
                    succeeded(
                        console.run(async move {
                            env.delete_environment_variable(&name, system).await
                        })?,
                        &what,
                    )
                }
            }
        }
    }
}

fn run_connection(console: &Console, command: ConnectionCommand) -> anyhow::Result<()> {
    let registry = console.registry();
    match command {
        ConnectionCommand::Add {
            name,
            host,
            secret,
            port,
        } => {
            let what = format!("add connection '{name}'");
            succeeded(
                console.run(async move {
                    registry.add_connection(&name, &host, &secret, port).await
                })?,
                &what,
            )
        }
        ConnectionCommand::Remove { name } => {
            let what = format!("remove connection '{name}'");
            succeeded(
                console.run(async move { registry.remove_connection(&name).await })?,
                &what,
            )
        }
        ConnectionCommand::List => {
            print_json(&console.run(async move { registry.get_connections().await })?)
        }
        ConnectionCommand::Refresh => {
            let connections = console.run(async move {
                registry.refresh_connections().await;
                registry.get_connections().await
            })?;
            print_json(&connections)
        }
        ConnectionCommand::Test { name } => {
            let what = format!("test connection '{name}'");
            succeeded(
                console.run(async move { registry.test_connection(&name).await })?,
                &what,
            )
        }
    }
}
