use crate::error::{self, Result};
use log::trace;
use serde::Deserialize;
use snafu::ResultExt;
use std::fs;
use std::path::Path;

const ENABLE_CUSTOM_METRICS: &str = "ENABLE_CUSTOM_METRICS";
const USING_AAD_MSI_AUTH: &str = "USING_AAD_MSI_AUTH";
const SIDECAR_SCRAPING_ENABLED: &str = "SIDECAR_SCRAPING_ENABLED";
const TELEGRAF_LIVENESSPROBE_ENABLED: &str = "AZMON_TELEGRAF_LIVENESSPROBE_ENABLED";
const CUSTOM_PROM_MONITOR_PODS: &str = "TELEMETRY_CUSTOM_PROM_MONITOR_PODS";

/// The boolean switches that decide which conditional targets take part in a probe. They are
/// read once at startup and never change for the rest of the run.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub(crate) struct FeatureFlags {
    pub(crate) custom_metrics_enabled: bool,
    pub(crate) msi_auth_mode: bool,
    pub(crate) sidecar_scraping_enabled: bool,
    pub(crate) secondary_liveness_probe_enabled: bool,
    pub(crate) custom_prom_monitor_pods: bool,
}

impl FeatureFlags {
    /// Reads the flags from the process environment.
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the flags through `lookup`, which maps an environment variable name to its value.
    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            let value = lookup(key);
            trace!("{}={:?}", key, value);
            value.as_deref().map(parse_flag).unwrap_or(false)
        };
        Self {
            custom_metrics_enabled: flag(ENABLE_CUSTOM_METRICS),
            msi_auth_mode: flag(USING_AAD_MSI_AUTH),
            sidecar_scraping_enabled: flag(SIDECAR_SCRAPING_ENABLED),
            secondary_liveness_probe_enabled: flag(TELEGRAF_LIVENESSPROBE_ENABLED),
            custom_prom_monitor_pods: flag(CUSTOM_PROM_MONITOR_PODS),
        }
    }

    /// Reads the flags from a TOML file. Keys that are missing from the file are false.
    pub(crate) fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).context(error::ConfigRead { path })?;
        toml::from_str(&contents).context(error::ConfigParse { path })
    }

    fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::CustomMetricsEnabled => self.custom_metrics_enabled,
            Flag::MsiAuthMode => self.msi_auth_mode,
            Flag::SidecarScrapingEnabled => self.sidecar_scraping_enabled,
            Flag::SecondaryLivenessProbeEnabled => self.secondary_liveness_probe_enabled,
            Flag::CustomPromMonitorPods => self.custom_prom_monitor_pods,
        }
    }
}

/// Only a case-insensitive `true` turns a flag on; malformed values are treated as off.
fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Names a single field of `FeatureFlags`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Flag {
    CustomMetricsEnabled,
    MsiAuthMode,
    SidecarScrapingEnabled,
    SecondaryLivenessProbeEnabled,
    CustomPromMonitorPods,
}

/// A boolean expression over `FeatureFlags` deciding whether a target is evaluated at all. A
/// closed gate skips its target; it never turns into a pass or a failure.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum Gate {
    Always,
    Flag(Flag),
    Not(Box<Gate>),
    All(Vec<Gate>),
    Any(Vec<Gate>),
}

impl Gate {
    pub(crate) fn is_open(&self, flags: &FeatureFlags) -> bool {
        match self {
            Gate::Always => true,
            Gate::Flag(flag) => flags.get(*flag),
            Gate::Not(gate) => !gate.is_open(flags),
            Gate::All(gates) => gates.iter().all(|gate| gate.is_open(flags)),
            Gate::Any(gates) => gates.iter().any(|gate| gate.is_open(flags)),
        }
    }
}
