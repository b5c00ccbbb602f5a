//! Payload records carried in the `data` field of an [`Envelope`](crate::Envelope).
//!
//! Field names are the wire names; both the agent and the client
//! (de)serialize these directly.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub display_name: String,
    pub status: String,
    pub start_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Control verbs accepted by `POST /services/{name}/action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Pause,
    Resume,
}

impl ServiceAction {
    pub const ALL: [ServiceAction; 5] = [
        ServiceAction::Start,
        ServiceAction::Stop,
        ServiceAction::Restart,
        ServiceAction::Pause,
        ServiceAction::Resume,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
            ServiceAction::Pause => "pause",
            ServiceAction::Resume => "resume",
        }
    }
}

impl Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an action string is not one of [`ServiceAction::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidAction(pub String);

impl Display for InvalidAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid action: {}", self.0)
    }
}

impl std::error::Error for InvalidAction {}

impl FromStr for ServiceAction {
    type Err = InvalidAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| InvalidAction(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub status: String,
    /// Seconds since the Unix epoch.
    pub create_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
    #[serde(default = "default_is_system")]
    pub is_system: bool,
}

pub(crate) fn default_is_system() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub hostname: String,
    pub os_name: String,
    pub os_version: String,
    pub system_type: String,
    pub processor: String,
    pub memory_total: u64,
    pub memory_available: u64,
    /// Seconds since the Unix epoch.
    pub boot_time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_parse_accepts_wire_names_only() {
        assert_eq!("restart".parse::<ServiceAction>(), Ok(ServiceAction::Restart));
        let err = "bogus-action".parse::<ServiceAction>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid action: bogus-action");
        assert!("Start".parse::<ServiceAction>().is_err());
    }

    #[test]
    fn environment_variable_scope_defaults_to_system() {
        let var: EnvironmentVariable =
            serde_json::from_str(r#"{"name":"A","value":"b"}"#).unwrap();
        assert!(var.is_system);
    }
}
