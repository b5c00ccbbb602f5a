pub mod client;
pub mod core;
pub mod host;
pub mod managers;
pub mod model;
pub mod storage;
pub mod utils;

// re‑export ergonomic entry points
pub use client::{AgentClient, Envelope};
pub use core::dispatcher::{OperationDispatcher, OperationMode};
pub use core::registry::{ActiveConnection, ConnectionRegistry};
pub use core::worker::{Completion, Worker};
pub use host::HostCollaborators;
pub use storage::{ConnectionProfile, ProfileStore};
