pub mod agent_client;
pub mod envelope;

pub use agent_client::{AgentClient, API_KEY_HEADER, DEFAULT_PORT};
pub use envelope::Envelope;
