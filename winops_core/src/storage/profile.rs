use serde::{Deserialize, Serialize};

use crate::client::DEFAULT_PORT;

/// A named agent endpoint the console can connect to.
///
/// JSON looks like:
/// `{ "name":"lab1", "host":"10.0.0.5", "port":8000, "secret":"...", "connected":true }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub secret: String,
    /// Outcome of the most recent connection test.
    #[serde(default)]
    pub connected: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl ConnectionProfile {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            secret: secret.into(),
            connected: false,
        }
    }

    /// `host:port`, for log lines.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
