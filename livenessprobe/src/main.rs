/*!
# Introduction

`livenessprobe` decides whether a monitoring-agent container is still healthy. It is meant to be
run as an exec liveness probe: it checks processes, a service and marker files once, prints at
most one diagnostic line, and exits with a code the orchestrator understands.

# Modes

* `livenessprobe marker-file <config-marker>`
* `livenessprobe agent-launcher <launcher-path> [config-marker]`
* `livenessprobe agent <process> <process>... <service> <config-marker> <cert-renewal-marker>`

Targets are checked in order and the first failure decides the exit code:

| Code | Meaning |
|------|---------|
| 0 | all checks passed |
| 1 | a required process is not running |
| 2 | the config-change marker file exists |
| 3 | the certificate-renewal marker file exists |
| 4 | the service is not running |
| 5 | a secondary process is not running |
| 6 | a tertiary process is not running |
| -1 | invalid invocation, or the system could not be queried |

# Feature flags

In `agent` mode some targets are only checked when feature flags allow it. The flags are read
once from `ENABLE_CUSTOM_METRICS`, `USING_AAD_MSI_AUTH`, `SIDECAR_SCRAPING_ENABLED`,
`AZMON_TELEGRAF_LIVENESSPROBE_ENABLED` and `TELEMETRY_CUSTOM_PROM_MONITOR_PODS`, or from the TOML
file given with `--config`.
*/

#![deny(rust_2018_idioms, unreachable_pub, missing_copy_implementations)]

mod args;
mod config;
mod diagnostics;
mod error;
mod evaluator;
mod file_check;
mod flags;
mod outcome;
mod process_check;
mod service_check;

use crate::args::{parse_args, Arguments, USAGE};
use crate::diagnostics::{DiagnosticSink, StdoutSink};
use crate::error::Error;
use crate::evaluator::ProbeEvaluator;
use crate::flags::FeatureFlags;
use crate::outcome::ProbeOutcome;
use env_logger::Builder;
use log::{info, trace, LevelFilter};
use std::sync::Once;
use std::{env, process};

fn main() -> ! {
    let outcome = main_inner(
        env::args(),
        &ProbeEvaluator::new(),
        FeatureFlags::from_env,
        &mut StdoutSink {},
    );
    process::exit(outcome.code().0)
}

/// To facilitate testing of `main_inner` function, ensure that the logger is only initialized once.
static INIT_LOGGER_ONCE: Once = Once::new();

/// Runs one probe and writes its diagnostic line, if any, to `sink`. `env_flags` is only called
/// when no `--config` file is given.
///
/// pub(crate) for testing.
pub(crate) fn main_inner<A, F>(
    args: A,
    evaluator: &ProbeEvaluator,
    env_flags: F,
    sink: &mut dyn DiagnosticSink,
) -> ProbeOutcome
where
    A: Iterator<Item = String>,
    F: FnOnce() -> FeatureFlags,
{
    let outcome = match parse_args(args) {
        Ok(arguments) => {
            init_logger(arguments.log_level);
            run(&arguments, evaluator, env_flags)
        }
        Err(err) => usage_outcome(err),
    };
    info!("probe result {}: {}", outcome.code().0, outcome);
    // bad arguments, whether caught by the parser or by the evaluator's count check
    if let ProbeOutcome::InvalidInvocation { .. } = outcome {
        eprintln!("{}", USAGE);
    }
    if let Some(line) = outcome.diagnostic() {
        sink.emit(&line);
    }
    outcome
}

fn init_logger(level: Option<LevelFilter>) {
    INIT_LOGGER_ONCE.call_once(|| {
        Builder::new()
            .filter_module("livenessprobe", level.unwrap_or(LevelFilter::Warn))
            .init();
        trace!("logger initialized");
    });
}

fn run<F>(arguments: &Arguments, evaluator: &ProbeEvaluator, env_flags: F) -> ProbeOutcome
where
    F: FnOnce() -> FeatureFlags,
{
    let flags = match &arguments.config_path {
        None => env_flags(),
        Some(path) => match FeatureFlags::from_file(path) {
            Ok(flags) => flags,
            Err(err) => {
                return ProbeOutcome::UnexpectedError {
                    message: err.to_string(),
                }
            }
        },
    };
    trace!("feature flags: {:?}", flags);
    evaluator.probe(arguments.mode, arguments.targets.as_slice(), flags)
}

/// Turns a parse failure into an outcome, printing its message to stderr.
fn usage_outcome(err: Error) -> ProbeOutcome {
    let message = match err {
        Error::Usage { message } => {
            if let Some(message) = &message {
                eprintln!("{}\n", message)
            }
            message.unwrap_or_else(|| String::from("usage requested"))
        }
        other => other.to_string(),
    };
    ProbeOutcome::InvalidInvocation { message }
}
