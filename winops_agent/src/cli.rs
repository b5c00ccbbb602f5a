use std::net::IpAddr;
use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use winops_core::client::DEFAULT_PORT;

/// What the invocation asked for. At most one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install,
    Uninstall,
    Start,
    Stop,
    Status,
    GenerateKey,
    Run,
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "winops-agent", version, about = "winops remote administration agent")]
#[command(group(ArgGroup::new("action").multiple(false)))]
pub struct Args {
    /// Install the agent as an OS service
    #[arg(long, group = "action")]
    pub install: bool,
    /// Remove the installed service (stopping it first)
    #[arg(long, group = "action")]
    pub uninstall: bool,
    /// Start the installed service
    #[arg(long, group = "action")]
    pub start: bool,
    /// Stop the installed service
    #[arg(long, group = "action")]
    pub stop: bool,
    /// Print the service state
    #[arg(long, group = "action")]
    pub status: bool,
    /// Write a new API key (restarts a running service)
    #[arg(long = "generate-key", group = "action")]
    pub generate_key: bool,
    /// Serve in the foreground until Ctrl-C
    #[arg(long, group = "action")]
    pub run: bool,

    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,
    /// Where the API key is persisted
    #[arg(long)]
    pub key_file: Option<PathBuf>,
}

impl Args {
    pub fn action(&self) -> Option<Action> {
        [
            (self.install, Action::Install),
            (self.uninstall, Action::Uninstall),
            (self.start, Action::Start),
            (self.stop, Action::Stop),
            (self.status, Action::Status),
            (self.generate_key, Action::GenerateKey),
            (self.run, Action::Run),
        ]
        .into_iter()
        .find_map(|(set, action)| set.then_some(action))
    }
}
