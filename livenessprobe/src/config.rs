//! Turns a mode and its positional arguments into the ordered list of targets to check.

use crate::error::{self, Error, Result};
use crate::flags::{FeatureFlags, Flag, Gate};
use crate::outcome::{MarkerMeaning, ProcessRole};
use crate::process_check::ProcessSpec;
use snafu::ensure;
use std::fmt;
use std::path::PathBuf;

const MARKER_FILE: &str = "marker-file";
const AGENT_LAUNCHER: &str = "agent-launcher";
const AGENT: &str = "agent";

/// Which shape of probe to run, e.g. `livenessprobe marker-file <path>`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Mode {
    /// Only a config-change marker file.
    MarkerFile,
    /// An agent launcher process identified by full path, plus an optional marker file.
    AgentLauncher,
    /// Named agent processes, a service and two marker files.
    Agent,
}

impl Mode {
    pub(crate) fn parse<S: AsRef<str>>(s: S) -> Result<Self> {
        match s.as_ref() {
            MARKER_FILE => Ok(Mode::MarkerFile),
            AGENT_LAUNCHER => Ok(Mode::AgentLauncher),
            AGENT => Ok(Mode::Agent),
            unk => Err(Error::Usage {
                message: Some(format!("Unknown mode: '{}'", unk)),
            }),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Mode::MarkerFile => MARKER_FILE,
            Mode::AgentLauncher => AGENT_LAUNCHER,
            Mode::Agent => AGENT,
        }
    }

    /// Fails with `Error::Arity` unless `got` positional arguments suit this mode.
    pub(crate) fn check_arity(self, got: usize) -> Result<()> {
        let (ok, expected) = match self {
            Mode::MarkerFile => (got == 1, "exactly 1"),
            Mode::AgentLauncher => (got == 1 || got == 2, "1 or 2"),
            Mode::Agent => (got >= 5, "at least 5"),
        };
        ensure!(
            ok,
            error::Arity {
                mode: self,
                expected,
                got
            }
        );
        Ok(())
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum ProbeTarget {
    Process { spec: ProcessSpec, role: ProcessRole },
    Service { name: String },
    MarkerFile { path: PathBuf, meaning: MarkerMeaning },
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeTarget::Process { spec, .. } => write!(f, "process {}", spec),
            ProbeTarget::Service { name } => write!(f, "service {}", name),
            ProbeTarget::MarkerFile { path, .. } => write!(f, "marker file {}", path.display()),
        }
    }
}

/// A target together with the flag expression that decides whether it is checked at all.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct GatedTarget {
    pub(crate) target: ProbeTarget,
    pub(crate) gate: Gate,
}

impl GatedTarget {
    fn always(target: ProbeTarget) -> Self {
        Self {
            target,
            gate: Gate::Always,
        }
    }
}

/// Everything a probe evaluates, in evaluation order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct ProbeConfig {
    pub(crate) targets: Vec<GatedTarget>,
    pub(crate) flags: FeatureFlags,
}

impl ProbeConfig {
    /// Builds the target list for `mode` out of its positional arguments. The argument count is
    /// validated before anything else.
    pub(crate) fn for_mode<S: AsRef<str>>(
        mode: Mode,
        positionals: &[S],
        flags: FeatureFlags,
    ) -> Result<Self> {
        mode.check_arity(positionals.len())?;
        let args: Vec<&str> = positionals.iter().map(|s| s.as_ref()).collect();
        let targets = match mode {
            Mode::MarkerFile => vec![config_marker(args[0])],
            Mode::AgentLauncher => {
                let mut targets = vec![GatedTarget::always(ProbeTarget::Process {
                    spec: ProcessSpec::Path(PathBuf::from(args[0])),
                    role: ProcessRole::Required,
                })];
                if let Some(marker) = args.get(1) {
                    targets.push(config_marker(marker));
                }
                targets
            }
            Mode::Agent => agent_targets(&args),
        };
        Ok(Self { targets, flags })
    }
}

fn config_marker(path: &str) -> GatedTarget {
    GatedTarget::always(ProbeTarget::MarkerFile {
        path: PathBuf::from(path),
        meaning: MarkerMeaning::ConfigChanged,
    })
}

/// `<process>... <service> <config marker> <certificate marker>`
fn agent_targets(args: &[&str]) -> Vec<GatedTarget> {
    let (processes, rest) = args.split_at(args.len() - 3);
    let mut targets: Vec<GatedTarget> = processes
        .iter()
        .map(|name| agent_process(name))
        .collect();

    // The service only matters when it carries custom metrics or when not using managed identity.
    targets.push(GatedTarget {
        target: ProbeTarget::Service {
            name: rest[0].to_string(),
        },
        gate: Gate::Any(vec![
            Gate::Flag(Flag::CustomMetricsEnabled),
            Gate::Not(Box::new(Gate::Flag(Flag::MsiAuthMode))),
        ]),
    });
    targets.push(config_marker(rest[1]));
    targets.push(GatedTarget::always(ProbeTarget::MarkerFile {
        path: PathBuf::from(rest[2]),
        meaning: MarkerMeaning::CertificateRenewalNeeded,
    }));
    targets
}

/// Assigns a role and a gate to a well-known agent process; unknown names are required.
fn agent_process(name: &str) -> GatedTarget {
    let spec = ProcessSpec::Name(name.to_string());
    let (role, gate) = match executable_stem(name).as_str() {
        "telegraf" => (ProcessRole::Tertiary, Gate::Always),
        "monagentcore" => (ProcessRole::Secondary, Gate::Always),
        "fluent-bit" => (
            ProcessRole::Required,
            Gate::All(vec![
                Gate::Flag(Flag::SidecarScrapingEnabled),
                Gate::Flag(Flag::CustomPromMonitorPods),
                Gate::Flag(Flag::SecondaryLivenessProbeEnabled),
            ]),
        ),
        _ => (ProcessRole::Required, Gate::Always),
    };
    GatedTarget {
        target: ProbeTarget::Process { spec, role },
        gate,
    }
}

/// Lowercased name with any `.exe` suffix removed.
fn executable_stem(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    match lower.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn roles(config: &ProbeConfig) -> Vec<(String, ProcessRole)> {
        config
            .targets
            .iter()
            .filter_map(|t| match &t.target {
                ProbeTarget::Process { spec, role } => Some((spec.to_string(), *role)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn marker_file_arity() {
        assert!(ProbeConfig::for_mode::<&str>(Mode::MarkerFile, &[], FeatureFlags::default())
            .is_err());
        assert!(
            ProbeConfig::for_mode(Mode::MarkerFile, &["a", "b"], FeatureFlags::default()).is_err()
        );
        let config =
            ProbeConfig::for_mode(Mode::MarkerFile, &["/etc/marker"], FeatureFlags::default())
                .unwrap();
        assert_eq!(
            config.targets,
            vec![GatedTarget::always(ProbeTarget::MarkerFile {
                path: PathBuf::from("/etc/marker"),
                meaning: MarkerMeaning::ConfigChanged,
            })]
        );
    }

    #[test]
    fn agent_launcher_optional_marker() {
        let config = ProbeConfig::for_mode(
            Mode::AgentLauncher,
            &["/opt/agent/launcher"],
            FeatureFlags::default(),
        )
        .unwrap();
        assert_eq!(config.targets.len(), 1);
        assert_eq!(
            config.targets[0].target,
            ProbeTarget::Process {
                spec: ProcessSpec::Path(PathBuf::from("/opt/agent/launcher")),
                role: ProcessRole::Required,
            }
        );

        let config = ProbeConfig::for_mode(
            Mode::AgentLauncher,
            &["/opt/agent/launcher", "/etc/marker"],
            FeatureFlags::default(),
        )
        .unwrap();
        assert_eq!(config.targets.len(), 2);

        let err = ProbeConfig::for_mode(
            Mode::AgentLauncher,
            &["a", "b", "c"],
            FeatureFlags::default(),
        )
        .unwrap_err();
        match err {
            Error::Arity { mode, got, .. } => {
                assert_eq!(mode, Mode::AgentLauncher);
                assert_eq!(got, 3);
            }
            bad => panic!("expected Error::Arity, got {}", bad),
        }
    }

    #[test]
    fn agent_plan_order_and_roles() {
        let config = ProbeConfig::for_mode(
            Mode::Agent,
            &[
                "fluent-bit.exe",
                "Telegraf.exe",
                "MonAgentCore",
                "otelcol",
                "fluentdwinaks",
                "/etc/config/watcher",
                "/etc/certs/renew",
            ],
            FeatureFlags::default(),
        )
        .unwrap();
        assert_eq!(
            roles(&config),
            vec![
                ("fluent-bit.exe".to_string(), ProcessRole::Required),
                ("Telegraf.exe".to_string(), ProcessRole::Tertiary),
                ("MonAgentCore".to_string(), ProcessRole::Secondary),
                ("otelcol".to_string(), ProcessRole::Required),
            ]
        );
        assert_eq!(config.targets.len(), 7);
        assert_eq!(
            config.targets[4].target,
            ProbeTarget::Service {
                name: "fluentdwinaks".to_string()
            }
        );
        assert_eq!(
            config.targets[6].target,
            ProbeTarget::MarkerFile {
                path: PathBuf::from("/etc/certs/renew"),
                meaning: MarkerMeaning::CertificateRenewalNeeded,
            }
        );
        assert_eq!(config.targets[1].gate, Gate::Always);
        assert_ne!(config.targets[0].gate, Gate::Always);
    }

    #[test]
    fn agent_needs_two_processes() {
        assert!(ProbeConfig::for_mode(
            Mode::Agent,
            &["svc", "/marker", "/cert"],
            FeatureFlags::default()
        )
        .is_err());
        match ProbeConfig::for_mode(
            Mode::Agent,
            &["telegraf", "svc", "/marker", "/cert"],
            FeatureFlags::default(),
        ) {
            Err(Error::Arity { mode, expected, got }) => {
                assert_eq!(mode, Mode::Agent);
                assert_eq!(expected, "at least 5");
                assert_eq!(got, 4);
            }
            other => panic!("expected Error::Arity, got {:?}", other),
        }
    }

    #[test]
    fn service_gate() {
        let config = ProbeConfig::for_mode(
            Mode::Agent,
            &["telegraf", "MonAgentCore", "svc", "/marker", "/cert"],
            FeatureFlags::default(),
        )
        .unwrap();
        let gate = &config.targets[2].gate;
        assert!(gate.is_open(&FeatureFlags::default()));
        let msi = FeatureFlags {
            msi_auth_mode: true,
            ..FeatureFlags::default()
        };
        assert!(!gate.is_open(&msi));
        let msi_with_metrics = FeatureFlags {
            msi_auth_mode: true,
            custom_metrics_enabled: true,
            ..FeatureFlags::default()
        };
        assert!(gate.is_open(&msi_with_metrics));
    }

    #[test]
    fn unknown_mode() {
        assert!(Mode::parse("agent").is_ok());
        match Mode::parse("nope") {
            Err(Error::Usage { message }) => assert!(message.unwrap().contains("nope")),
            other => panic!("expected usage error, got {:?}", other),
        }
    }
}
