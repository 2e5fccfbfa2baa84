use std::fmt;
use std::path::PathBuf;

/// The integer handed back to the orchestrator. These values are a stable contract: the
/// orchestrator's probe configuration interprets them, so they must never be renumbered.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(crate) struct VerdictCode(pub(crate) i32);

impl VerdictCode {
    pub(crate) const SUCCESS: VerdictCode = VerdictCode(0);
    pub(crate) const PROCESS_NOT_RUNNING: VerdictCode = VerdictCode(1);
    pub(crate) const CONFIG_CHANGED: VerdictCode = VerdictCode(2);
    pub(crate) const CERTIFICATE_RENEWAL: VerdictCode = VerdictCode(3);
    pub(crate) const SERVICE_NOT_RUNNING: VerdictCode = VerdictCode(4);
    pub(crate) const SECONDARY_PROCESS_NOT_RUNNING: VerdictCode = VerdictCode(5);
    pub(crate) const TERTIARY_PROCESS_NOT_RUNNING: VerdictCode = VerdictCode(6);
    /// Reported as 0xFFFFFFFF on Windows and 255 on Unix.
    pub(crate) const UNEXPECTED: VerdictCode = VerdictCode(-1);
}

/// What the presence of a marker file announces.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum MarkerMeaning {
    ConfigChanged,
    CertificateRenewalNeeded,
}

/// Decides which exit code a missing process maps to.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum ProcessRole {
    Required,
    Secondary,
    Tertiary,
}

/// The single result of one probe run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum ProbeOutcome {
    Success,
    ProcessNotRunning { name: String, role: ProcessRole },
    ServiceNotRunning { name: String, state: String },
    MarkerFilePresent { path: PathBuf, meaning: MarkerMeaning },
    InvalidInvocation { message: String },
    UnexpectedError { message: String },
}

impl ProbeOutcome {
    pub(crate) fn code(&self) -> VerdictCode {
        match self {
            ProbeOutcome::Success => VerdictCode::SUCCESS,
            ProbeOutcome::ProcessNotRunning { role, .. } => match role {
                ProcessRole::Required => VerdictCode::PROCESS_NOT_RUNNING,
                ProcessRole::Secondary => VerdictCode::SECONDARY_PROCESS_NOT_RUNNING,
                ProcessRole::Tertiary => VerdictCode::TERTIARY_PROCESS_NOT_RUNNING,
            },
            ProbeOutcome::ServiceNotRunning { .. } => VerdictCode::SERVICE_NOT_RUNNING,
            ProbeOutcome::MarkerFilePresent { meaning, .. } => match meaning {
                MarkerMeaning::ConfigChanged => VerdictCode::CONFIG_CHANGED,
                MarkerMeaning::CertificateRenewalNeeded => VerdictCode::CERTIFICATE_RENEWAL,
            },
            ProbeOutcome::InvalidInvocation { .. } | ProbeOutcome::UnexpectedError { .. } => {
                VerdictCode::UNEXPECTED
            }
        }
    }

    pub(crate) fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success)
    }

    /// The line written to the diagnostic sink, if the outcome calls for one.
    pub(crate) fn diagnostic(&self) -> Option<String> {
        if self.is_success() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Success => write!(f, "INFO: all checks passed"),
            ProbeOutcome::ProcessNotRunning { name, .. } => {
                write!(f, "ERROR: process {} is not running", name)
            }
            ProbeOutcome::ServiceNotRunning { name, state } => {
                write!(f, "ERROR: service {} is not running (state: {})", name, state)
            }
            ProbeOutcome::MarkerFilePresent { path, meaning } => match meaning {
                MarkerMeaning::ConfigChanged => write!(
                    f,
                    "INFO: file {} exists, the config map was updated since the agent started",
                    path.display()
                ),
                MarkerMeaning::CertificateRenewalNeeded => write!(
                    f,
                    "INFO: file {} exists, the certificate needs to be renewed",
                    path.display()
                ),
            },
            ProbeOutcome::InvalidInvocation { message } => {
                write!(f, "ERROR: invalid invocation: {}", message)
            }
            ProbeOutcome::UnexpectedError { message } => {
                write!(f, "ERROR: unexpected error: {}", message)
            }
        }
    }
}
