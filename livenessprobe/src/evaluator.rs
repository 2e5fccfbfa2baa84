use crate::config::{Mode, ProbeConfig, ProbeTarget};
use crate::error::{Error, Result};
use crate::file_check::{FileExistenceChecker, FsCheck};
use crate::flags::FeatureFlags;
use crate::outcome::ProbeOutcome;
use crate::process_check::{ProcessLister, ProcfsLister};
use crate::service_check::{ServiceStatusProvider, SystemdCheck};
use log::{debug, error};

pub(crate) struct ProbeEvaluator {
    processes: Box<dyn ProcessLister>,
    services: Box<dyn ServiceStatusProvider>,
    files: Box<dyn FileExistenceChecker>,
}

impl ProbeEvaluator {
    /// Create a new instance backed by procfs, systemd and the local filesystem.
    pub(crate) fn new() -> Self {
        Self::from_parts(None, None, None)
    }

    /// Create a new instance by optionally passing in each capability. For each of these, if
    /// `None` is passed, then the system-backed default is used.
    pub(crate) fn from_parts(
        processes: Option<Box<dyn ProcessLister>>,
        services: Option<Box<dyn ServiceStatusProvider>>,
        files: Option<Box<dyn FileExistenceChecker>>,
    ) -> Self {
        Self {
            processes: processes.unwrap_or_else(|| Box::new(ProcfsLister::new())),
            services: services.unwrap_or_else(|| Box::new(SystemdCheck {})),
            files: files.unwrap_or_else(|| Box::new(FsCheck {})),
        }
    }

    /// Validates the arguments for `mode` and, if they fit, evaluates the resulting targets. A
    /// bad argument count yields `InvalidInvocation` without touching the system.
    pub(crate) fn probe<S: AsRef<str>>(
        &self,
        mode: Mode,
        positionals: &[S],
        flags: FeatureFlags,
    ) -> ProbeOutcome {
        match ProbeConfig::for_mode(mode, positionals, flags) {
            Ok(config) => self.evaluate(&config),
            Err(err) => ProbeOutcome::InvalidInvocation {
                message: err.to_string(),
            },
        }
    }

    /// Checks each target in order and returns the first failure. Targets whose gate is closed
    /// are skipped, and nothing after the first failure is checked.
    pub(crate) fn evaluate(&self, config: &ProbeConfig) -> ProbeOutcome {
        for gated in &config.targets {
            if !gated.gate.is_open(&config.flags) {
                debug!("skipping {}, gate is closed", gated.target);
                continue;
            }
            debug!("checking {}", gated.target);
            match self.check(&gated.target) {
                Ok(None) => continue,
                Ok(Some(failure)) => return failure,
                Err(err) => return unexpected(err),
            }
        }
        ProbeOutcome::Success
    }

    /// Returns the failure outcome for `target`, or `None` if it passes.
    fn check(&self, target: &ProbeTarget) -> Result<Option<ProbeOutcome>> {
        Ok(match target {
            ProbeTarget::Process { spec, role } => {
                if self.processes.is_running(spec)? {
                    None
                } else {
                    Some(ProbeOutcome::ProcessNotRunning {
                        name: spec.to_string(),
                        role: *role,
                    })
                }
            }
            ProbeTarget::Service { name } => {
                let state = self.services.status(name)?;
                if state.is_running() {
                    None
                } else {
                    Some(ProbeOutcome::ServiceNotRunning {
                        name: name.clone(),
                        state: state.to_string(),
                    })
                }
            }
            ProbeTarget::MarkerFile { path, meaning } => {
                if self.files.exists(path)? {
                    Some(ProbeOutcome::MarkerFilePresent {
                        path: path.clone(),
                        meaning: *meaning,
                    })
                } else {
                    None
                }
            }
        })
    }
}

fn unexpected(err: Error) -> ProbeOutcome {
    error!("{}", err);
    ProbeOutcome::UnexpectedError {
        message: err.to_string(),
    }
}
