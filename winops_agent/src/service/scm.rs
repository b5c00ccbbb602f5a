//! Windows service entry point.
//!
//! When the Service Control Manager starts `winops-agent --run`, the process
//! must hand its main thread to the SCM dispatcher, report `Running`, and
//! stop serving when a stop or shutdown control arrives.

use std::ffi::OsString;
use std::sync::OnceLock;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{error, info};
use windows_service::service::{
    ServiceControl, ServiceControlAccept, ServiceExitCode, ServiceState as ScmState,
    ServiceStatus, ServiceType,
};
use windows_service::service_control_handler::{self, ServiceControlHandlerResult};
use windows_service::{define_windows_service, service_dispatcher};

use super::{ServiceError, SERVICE_NAME};
use crate::launch::{self, LaunchConfig};

/// `StartServiceCtrlDispatcher` fails with this when the process was not
/// started by the SCM (e.g. from a console).
const ERROR_FAILED_SERVICE_CONTROLLER_CONNECT: i32 = 1063;

static CONFIG: OnceLock<LaunchConfig> = OnceLock::new();

define_windows_service!(ffi_service_main, service_main);

/// Run under the SCM. `Ok(false)` when the process is not a service and the
/// caller should serve in the foreground instead.
pub fn run_as_service(config: LaunchConfig) -> Result<bool, ServiceError> {
    let _ = CONFIG.set(config);
    match service_dispatcher::start(SERVICE_NAME, ffi_service_main) {
        Ok(()) => Ok(true),
        Err(windows_service::Error::Winapi(e))
            if e.raw_os_error() == Some(ERROR_FAILED_SERVICE_CONTROLLER_CONNECT) =>
        {
            Ok(false)
        }
        Err(e) => Err(scm_error(e)),
    }
}

fn scm_error(err: windows_service::Error) -> ServiceError {
    ServiceError::Backend(err.to_string())
}

fn status(state: ScmState, exit_code: u32) -> ServiceStatus {
    let controls_accepted = if matches!(state, ScmState::Running) {
        ServiceControlAccept::STOP | ServiceControlAccept::SHUTDOWN
    } else {
        ServiceControlAccept::empty()
    };
    ServiceStatus {
        service_type: ServiceType::OWN_PROCESS,
        current_state: state,
        controls_accepted,
        exit_code: ServiceExitCode::Win32(exit_code),
        checkpoint: 0,
        wait_hint: Duration::from_secs(10),
        process_id: None,
    }
}

fn service_main(_arguments: Vec<OsString>) {
    if let Err(e) = run_service() {
        error!("Service failed: {e}");
    }
}

fn run_service() -> Result<(), ServiceError> {
    let config = CONFIG
        .get()
        .cloned()
        .ok_or_else(|| ServiceError::Backend("service started without configuration".into()))?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut stop_tx = Some(stop_tx);
    let handler = move |control: ServiceControl| match control {
        ServiceControl::Stop | ServiceControl::Shutdown => {
            if let Some(tx) = stop_tx.take() {
                let _ = tx.send(());
            }
            ServiceControlHandlerResult::NoError
        }
        ServiceControl::Interrogate => ServiceControlHandlerResult::NoError,
        _ => ServiceControlHandlerResult::NotImplemented,
    };
    let handle = service_control_handler::register(SERVICE_NAME, handler).map_err(scm_error)?;

    handle
        .set_service_status(status(ScmState::Running, 0))
        .map_err(scm_error)?;
    info!("Service '{}' running", SERVICE_NAME);

    let served = launch::run_until(&config, async move {
        let _ = stop_rx.await;
        info!("Stop requested by the service manager");
    });
    if let Err(e) = &served {
        error!("Agent stopped with error: {e:#}");
    }

    handle
        .set_service_status(status(ScmState::StopPending, 0))
        .map_err(scm_error)?;
    handle
        .set_service_status(status(ScmState::Stopped, u32::from(served.is_err())))
        .map_err(scm_error)?;
    Ok(())
}
