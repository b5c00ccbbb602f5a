use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::client::AgentClient;
use crate::storage::{ConnectionProfile, ProfileStore};

/// The profile currently bound to outgoing remote calls, with its client.
#[derive(Debug, Clone)]
pub struct ActiveConnection {
    pub profile: ConnectionProfile,
    pub client: AgentClient,
    session: u64,
}

impl ActiveConnection {
    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// Distinct for every successful `connect`, even when the same name is
    /// reconnected or re-added with a different address.
    pub fn session(&self) -> u64 {
        self.session
    }
}

#[derive(Default)]
struct RegistryState {
    profiles: BTreeMap<String, ConnectionProfile>,
    active: Option<ActiveConnection>,
    sessions: u64,
}

impl RegistryState {
    fn clear_active(&mut self) {
        if let Some(previous) = self.active.take() {
            info!("Disconnected from remote PC '{}'", previous.name());
        }
    }
}

/// Named agent profiles plus at most one active connection.
///
/// Like the other shared handles in this crate, the state lives behind an
/// `Arc<Mutex<..>>`, so cloning the registry is cheap and every clone sees the
/// same profiles and the same active connection. Remote managers keep a clone
/// and read the *current* client on every call.
///
/// The lock is never held while a connection test is in flight.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<RegistryState>>,
    store: Option<ProfileStore>,
}

impl ConnectionRegistry {
    /// In-memory registry; profiles are lost when the process exits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry backed by `store`: stored profiles are loaded now, and every
    /// later add/remove/test result is written back.
    pub fn with_store(store: ProfileStore) -> io::Result<Self> {
        let profiles = store
            .list()?
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        Ok(Self {
            inner: Arc::new(Mutex::new(RegistryState {
                profiles,
                ..RegistryState::default()
            })),
            store: Some(store),
        })
    }

    fn persist(&self, profile: &ConnectionProfile) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(profile) {
                warn!("Could not save connection '{}': {}", profile.name, e);
            }
        }
    }

    fn forget(&self, name: &str) {
        if let Some(store) = &self.store {
            if let Err(e) = store.delete(name) {
                warn!("Could not delete stored connection '{}': {}", name, e);
            }
        }
    }

    /// Test `host:port` and keep the profile only if the agent answers.
    ///
    /// An existing `name` is never overwritten; the call returns `false`.
    pub async fn add_connection(&self, name: &str, host: &str, secret: &str, port: u16) -> bool {
        if self.inner.lock().await.profiles.contains_key(name) {
            error!("Connection '{}' already exists", name);
            return false;
        }

        let client = AgentClient::new(host, port, secret);
        if !client.test_connection().await {
            error!(
                "Failed to connect to remote PC '{}' at {}:{}: connection test failed",
                name, host, port
            );
            return false;
        }

        let mut profile = ConnectionProfile::new(name, host, port, secret);
        profile.connected = true;
        {
            let mut state = self.inner.lock().await;
            // another caller may have added the name while we were testing
            if state.profiles.contains_key(name) {
                error!("Connection '{}' already exists", name);
                return false;
            }
            state.profiles.insert(name.to_string(), profile.clone());
        }
        self.persist(&profile);
        info!("Successfully connected to remote PC '{}'", name);
        true
    }

    /// Delete a profile, disconnecting first if it is the active one.
    pub async fn remove_connection(&self, name: &str) -> bool {
        {
            let mut state = self.inner.lock().await;
            if !state.profiles.contains_key(name) {
                debug!("No connection named '{}' to remove", name);
                return false;
            }
            if state.active.as_ref().is_some_and(|a| a.name() == name) {
                state.clear_active();
            }
            state.profiles.remove(name);
        }
        self.forget(name);
        info!("Removed connection to remote PC '{}'", name);
        true
    }

    /// Make `name` the active connection.
    ///
    /// Any current connection is dropped before the test. On failure
    /// nothing is active afterwards.
    pub async fn connect(&self, name: &str) -> bool {
        let profile = {
            let mut state = self.inner.lock().await;
            let Some(profile) = state.profiles.get(name).cloned() else {
                error!("Connection '{}' not found", name);
                return false;
            };
            state.clear_active();
            profile
        };

        let client = AgentClient::new(&profile.host, profile.port, profile.secret.as_str());
        let reachable = client.test_connection().await;

        let updated = {
            let mut state = self.inner.lock().await;
            let Some(stored) = state.profiles.get_mut(name) else {
                error!("Connection '{}' was removed while connecting", name);
                return false;
            };
            let changed = stored.connected != reachable;
            stored.connected = reachable;
            let stored = stored.clone();
            if reachable {
                state.sessions += 1;
                state.active = Some(ActiveConnection {
                    profile: stored.clone(),
                    client,
                    session: state.sessions,
                });
            }
            changed.then_some(stored)
        };
        if let Some(profile) = updated {
            self.persist(&profile);
        }

        if reachable {
            info!("Connected to remote PC '{}' ({})", name, profile.address());
        } else {
            error!(
                "Failed to connect to remote PC '{}' ({}): connection test failed",
                name,
                profile.address()
            );
        }
        reachable
    }

    /// Drop the active connection. Always `true`, even if nothing was active.
    pub async fn disconnect(&self) -> bool {
        self.inner.lock().await.clear_active();
        true
    }

    /// Test one stored profile with a throwaway client.
    pub async fn test_connection(&self, name: &str) -> bool {
        let Some(profile) = self.get_connection(name).await else {
            return false;
        };
        AgentClient::new(&profile.host, profile.port, profile.secret)
            .test_connection()
            .await
    }

    /// Re-test every stored profile and record the outcome in its
    /// `connected` flag. The active connection is left alone.
    pub async fn refresh_connections(&self) {
        let profiles = self.get_connections().await;

        let mut checks = JoinSet::new();
        for profile in profiles {
            checks.spawn(async move {
                let client =
                    AgentClient::new(&profile.host, profile.port, profile.secret.as_str());
                (profile.name, client.test_connection().await)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!("Connection test task failed: {}", e),
            }
        }

        let mut changed = Vec::new();
        {
            let mut state = self.inner.lock().await;
            for (name, reachable) in results {
                let Some(profile) = state.profiles.get_mut(&name) else {
                    continue;
                };
                if !reachable {
                    warn!("Lost connection to remote PC '{}'", name);
                }
                if profile.connected != reachable {
                    profile.connected = reachable;
                    changed.push(profile.clone());
                }
            }
        }
        for profile in &changed {
            self.persist(profile);
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.active.is_some()
    }

    pub async fn get_active_connection(&self) -> Option<ActiveConnection> {
        self.inner.lock().await.active.clone()
    }

    /// Client of the active connection, if any.
    pub async fn get_client(&self) -> Option<AgentClient> {
        self.inner
            .lock()
            .await
            .active
            .as_ref()
            .map(|a| a.client.clone())
    }

    /// All profiles, ordered by name.
    pub async fn get_connections(&self) -> Vec<ConnectionProfile> {
        self.inner.lock().await.profiles.values().cloned().collect()
    }

    pub async fn get_connection(&self, name: &str) -> Option<ConnectionProfile> {
        self.inner.lock().await.profiles.get(name).cloned()
    }
}
