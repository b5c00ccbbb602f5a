use std::sync::Arc;

use log::LevelFilter;
use winops_core::host::OverlayEnvironment;
use winops_core::model::ServiceAction;
use winops_core::{ConnectionRegistry, HostCollaborators, OperationDispatcher, OperationMode};

mod common;
use common::fake_agent::{FakeAgent, SECRET};

fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// Native collaborators, but with an in-memory environment on every
/// platform so tests never touch persistent settings.
fn test_host() -> HostCollaborators {
    HostCollaborators {
        environment: Arc::new(OverlayEnvironment::in_memory()),
        ..HostCollaborators::native()
    }
}

#[tokio::test]
async fn starts_in_local_mode() {
    init_logging();
    let dispatcher = OperationDispatcher::new(ConnectionRegistry::new(), test_host());
    assert_eq!(dispatcher.get_mode(), OperationMode::Local);
}

#[tokio::test]
async fn managers_are_kept_across_mode_switches() {
    init_logging();
    let mut dispatcher = OperationDispatcher::new(ConnectionRegistry::new(), test_host());

    let local_services = dispatcher.get_service_manager();
    let local_env = dispatcher.get_environment_manager();
    assert!(Arc::ptr_eq(&local_services, &dispatcher.get_service_manager()));

    dispatcher.set_mode(OperationMode::Remote);
    let remote_services = dispatcher.get_service_manager();
    assert!(!Arc::ptr_eq(&local_services, &remote_services));

    dispatcher.set_mode(OperationMode::Local);
    assert!(Arc::ptr_eq(&local_services, &dispatcher.get_service_manager()));
    assert!(Arc::ptr_eq(&local_env, &dispatcher.get_environment_manager()));

    dispatcher.set_mode(OperationMode::Remote);
    assert!(Arc::ptr_eq(&remote_services, &dispatcher.get_service_manager()));
}

#[tokio::test]
async fn remote_managers_return_defaults_when_disconnected() {
    init_logging();
    let mut dispatcher = OperationDispatcher::new(ConnectionRegistry::new(), test_host());
    dispatcher.set_mode(OperationMode::Remote);

    assert!(dispatcher.get_service_manager().get_services().await.is_empty());
    assert!(!dispatcher.get_service_manager().start_service("svc").await);
    assert!(dispatcher.get_process_manager().get_processes().await.is_empty());
    assert!(dispatcher.get_process_manager().get_process(1).await.is_none());
    assert!(!dispatcher.get_process_manager().terminate_process(1).await);
    let env = dispatcher.get_environment_manager();
    assert!(env.get_environment_variables().await.is_empty());
    assert!(!env.set_environment_variable("A", "b", false).await);
    assert!(dispatcher.get_system_manager().get_system_info(true).await.is_none());
    assert_eq!(dispatcher.get_system_manager().hostname().await, "");
}

#[tokio::test]
async fn local_environment_round_trip() {
    init_logging();
    let mut dispatcher = OperationDispatcher::new(ConnectionRegistry::new(), test_host());
    let env = dispatcher.get_environment_manager();

    assert!(env.set_environment_variable("WOT_TEST", "v1", false).await);
    let vars = env.get_environment_variables().await;
    let found = vars.iter().find(|v| v.name == "WOT_TEST").expect("variable listed");
    assert_eq!(found.value, "v1");
    assert!(!found.is_system);

    assert!(env.delete_environment_variable("WOT_TEST", false).await);
    assert!(!env
        .get_environment_variables()
        .await
        .iter()
        .any(|v| v.name == "WOT_TEST"));
    // second delete has nothing to remove
    assert!(!env.delete_environment_variable("WOT_TEST", false).await);
}

#[tokio::test]
async fn local_process_manager_sees_this_process() {
    init_logging();
    let mut dispatcher = OperationDispatcher::new(ConnectionRegistry::new(), test_host());
    let processes = dispatcher.get_process_manager();

    let me = processes
        .get_process(std::process::id())
        .await
        .expect("own process visible");
    assert_eq!(me.pid, std::process::id());
    assert!(processes.get_process(u32::MAX).await.is_none());
}

#[tokio::test]
async fn remote_bogus_service_action_fails() {
    init_logging();
    let agent = FakeAgent::start("lab").await;
    let registry = ConnectionRegistry::new();
    assert!(registry.add_connection("lab", "127.0.0.1", SECRET, agent.port).await);
    assert!(registry.connect("lab").await);

    // the typed API cannot express a bogus action, so go through the client
    let client = registry.get_client().await.expect("connected");
    let envelope = client.service_action("svc", "bogus-action").await;
    assert!(!envelope.success);
    assert!(envelope.message.contains("bogus-action"));

    let mut dispatcher = OperationDispatcher::new(registry, test_host());
    dispatcher.set_mode(OperationMode::Remote);
    let services = dispatcher.get_service_manager();
    assert_eq!(services.get_services().await.len(), 1);
    assert!(services.service_action("svc", ServiceAction::Restart).await);

    agent.stop().await;
}
