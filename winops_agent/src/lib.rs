pub mod cli;
pub mod launch;
pub mod secret;
pub mod server;
pub mod service;

pub use server::{AgentServer, ApiError};
pub use service::{RegeneratedKey, ServiceBackend, ServiceError, ServiceState, ServiceWrapper};
