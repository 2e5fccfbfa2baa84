use crate::error::{self, Result};
use log::trace;
use snafu::{ensure, OptionExt, ResultExt};
use std::fmt;
use std::process::Command;

/// The run-state of a service as reported by the service manager.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum ServiceState {
    Running,
    Stopped,
    Starting,
    Stopping,
    Reloading,
    Failed,
    Other(String),
}

impl ServiceState {
    fn from_active_state(s: &str) -> Self {
        match s {
            "active" => ServiceState::Running,
            "inactive" => ServiceState::Stopped,
            "activating" => ServiceState::Starting,
            "deactivating" => ServiceState::Stopping,
            "reloading" => ServiceState::Reloading,
            "failed" => ServiceState::Failed,
            other => ServiceState::Other(other.to_string()),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        *self == ServiceState::Running
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Running => f.write_str("running"),
            ServiceState::Stopped => f.write_str("stopped"),
            ServiceState::Starting => f.write_str("starting"),
            ServiceState::Stopping => f.write_str("stopping"),
            ServiceState::Reloading => f.write_str("reloading"),
            ServiceState::Failed => f.write_str("failed"),
            ServiceState::Other(s) => f.write_str(s),
        }
    }
}

pub(crate) trait ServiceStatusProvider {
    /// Queries the current state of the given service. An error means the service manager could
    /// not answer, which is different from the service not running.
    fn status(&self, service_name: &str) -> Result<ServiceState>;
}

pub(crate) struct SystemdCheck {}

impl ServiceStatusProvider for SystemdCheck {
    fn status(&self, service_name: &str) -> Result<ServiceState> {
        let args = [
            "show",
            "--no-pager",
            "--property=LoadState,ActiveState",
            service_name,
        ];
        let outcome = systemctl(&args)?;
        ensure!(
            outcome.exit == 0,
            error::ServiceQuery {
                service: service_name,
                exit: outcome.exit,
                stderr: outcome.stderr.trim(),
            }
        );
        parse_show(service_name, &outcome.stdout)
    }
}

struct Outcome {
    exit: i32,
    stdout: String,
    stderr: String,
}

fn systemctl(args: &[&str]) -> Result<Outcome> {
    trace!("calling systemctl with '{:?}'", args);
    let output = Command::new("systemctl")
        .args(args)
        .output()
        .context(error::Command {
            command: "systemctl",
            args: args.iter().map(|&s| s.to_owned()).collect::<Vec<String>>(),
        })?;
    Ok(Outcome {
        exit: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(output.stdout.as_slice()).into(),
        stderr: String::from_utf8_lossy(output.stderr.as_slice()).into(),
    })
}

/// Parses the `Key=Value` lines printed by `systemctl show`.
fn parse_show(service: &str, stdout: &str) -> Result<ServiceState> {
    trace!("parsing systemctl stdout:\n{}", stdout);
    let mut load_state = None;
    let mut active_state = None;
    for line in stdout.lines() {
        let mut parts = line.trim().splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some("LoadState"), Some(value)) => load_state = Some(value),
            (Some("ActiveState"), Some(value)) => active_state = Some(value),
            _ => {}
        }
    }
    // systemctl happily reports "inactive" for units that do not exist
    ensure!(
        load_state != Some("not-found"),
        error::ServiceNotFound { service }
    );
    let active_state = active_state.context(error::ServiceStatusParse { service })?;
    Ok(ServiceState::from_active_state(active_state))
}
