pub mod profile;
pub mod store;

pub use profile::ConnectionProfile;
pub use store::ProfileStore;
