use log::LevelFilter;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use winops_agent::AgentServer;
use winops_core::{ConnectionRegistry, HostCollaborators, OperationDispatcher, OperationMode};

mod common;
use common::fake_hosts::{fake_host, HOSTNAME};

const SECRET: &str = "e2e-secret";

fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

struct RunningAgent {
    port: u16,
    stop: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

async fn start_agent(host: HostCollaborators) -> RunningAgent {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = AgentServer::new(SECRET, host);
    let task = tokio::spawn(server.serve(listener, async {
        let _ = stopped.await;
    }));
    RunningAgent { port, stop, task }
}

async fn remote_dispatcher(port: u16) -> OperationDispatcher {
    let registry = ConnectionRegistry::new();
    assert!(registry.add_connection("lab", "127.0.0.1", SECRET, port).await);
    assert!(registry.connect("lab").await);
    let mut dispatcher = OperationDispatcher::new(registry, HostCollaborators::native());
    dispatcher.set_mode(OperationMode::Remote);
    dispatcher
}

#[tokio::test]
async fn remote_environment_round_trip() {
    init_logging();
    let host = fake_host();
    let agent = start_agent(host.collaborators.clone()).await;
    let mut dispatcher = remote_dispatcher(agent.port).await;
    let env = dispatcher.get_environment_manager();

    assert!(env.set_environment_variable("WOT_TEST", "v1", false).await);
    let vars = env.get_environment_variables().await;
    let var = vars.iter().find(|v| v.name == "WOT_TEST").expect("listed");
    assert_eq!(var.value, "v1");
    assert!(!var.is_system);

    assert!(env.delete_environment_variable("WOT_TEST", false).await);
    assert!(env.get_environment_variables().await.is_empty());
    assert!(!env.delete_environment_variable("WOT_TEST", false).await);

    let _ = agent.stop.send(());
    agent.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn remote_capabilities_unwrap_envelopes() {
    init_logging();
    let host = fake_host();
    let agent = start_agent(host.collaborators.clone()).await;
    let mut dispatcher = remote_dispatcher(agent.port).await;

    let services = dispatcher.get_service_manager();
    assert_eq!(services.get_services().await.len(), 1);
    assert_eq!(
        services.get_service("svc").await.map(|s| s.display_name),
        Some("Fake Service".to_string())
    );
    assert!(services.get_service("missing").await.is_none());
    assert!(services.pause_service("svc").await);
    assert!(!services.start_service("missing").await);

    let processes = dispatcher.get_process_manager();
    assert_eq!(processes.get_processes().await.len(), 1);
    assert!(processes.get_process(42).await.is_some());
    assert!(processes.get_process(7).await.is_none());
    assert!(processes.terminate_process(42).await);
    assert!(!processes.terminate_process(1).await);

    let system = dispatcher.get_system_manager();
    assert_eq!(system.hostname().await, HOSTNAME);
    assert_eq!(system.os_version().await, "1.0");

    let _ = agent.stop.send(());
    agent.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn graceful_shutdown_stops_serving() {
    init_logging();
    let agent = start_agent(fake_host().collaborators).await;
    let client = winops_core::AgentClient::new("127.0.0.1", agent.port, SECRET);
    assert!(client.test_connection().await);

    let _ = agent.stop.send(());
    let served = timeout(Duration::from_secs(5), agent.task)
        .await
        .expect("server did not shut down in time");
    served.unwrap().unwrap();

    let fresh = winops_core::AgentClient::new("127.0.0.1", agent.port, SECRET);
    assert!(!fresh.test_connection().await);
}

#[tokio::test]
async fn wrong_secret_over_the_wire() {
    init_logging();
    let agent = start_agent(fake_host().collaborators).await;
    let client = winops_core::AgentClient::new("127.0.0.1", agent.port, "wrong");
    let envelope = client.get_services().await;
    assert!(!envelope.success);
    assert_eq!(envelope.message, "Invalid API key");

    let registry = ConnectionRegistry::new();
    assert!(!registry.add_connection("lab", "127.0.0.1", "wrong", agent.port).await);

    let _ = agent.stop.send(());
    agent.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn bogus_action_over_the_wire() {
    init_logging();
    let host = fake_host();
    let agent = start_agent(host.collaborators.clone()).await;
    let client = winops_core::AgentClient::new("127.0.0.1", agent.port, SECRET);

    let envelope = client.service_action("svc", "bogus-action").await;
    assert!(!envelope.success);
    assert!(envelope.message.contains("bogus-action"));
    assert!(host.services.calls.lock().unwrap().is_empty());

    let _ = agent.stop.send(());
    agent.task.await.unwrap().unwrap();
}
