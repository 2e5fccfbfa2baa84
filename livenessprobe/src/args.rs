use crate::config::Mode;
use crate::error::{self, Error, Result};
use log::LevelFilter;
use snafu::{OptionExt, ResultExt};
use std::path::PathBuf;
use std::str::FromStr;

pub(crate) struct Arguments {
    pub(crate) mode: Mode,
    /// Targets for `mode`, in the order given. Their count is validated by the evaluator.
    pub(crate) targets: Vec<String>,
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) log_level: Option<LevelFilter>,
}

/// The usage message for --help.
pub(crate) const USAGE: &str = r"USAGE:
livenessprobe <MODE> <TARGETS> <OPTIONS>

MODES:
    marker-file <config-marker>
            Fail if the config-change marker file exists.

    agent-launcher <launcher-path> [config-marker]
            Fail if no process was loaded from the launcher path, or if the optional
            config-change marker file exists.

    agent <process> <process>... <service> <config-marker> <cert-renewal-marker>
            Fail if a named process or the service is not running, or if either marker file
            exists. At least two processes must be given.

EXIT CODES:
    0   healthy
    1   required process not running
    2   config-change marker present
    3   certificate-renewal marker present
    4   service not running
    5   secondary process not running
    6   tertiary process not running
    -1  invalid invocation or unexpected error

GLOBAL OPTIONS:
    [ --config ]            Path to a TOML file with feature flags, read instead of the environment.
    [ --log-level ]         trace|debug|info|warn|error|off
";

/// Parses the command line arguments.
pub(crate) fn parse_args<A>(args: A) -> Result<Arguments>
where
    A: Iterator<Item = String>,
{
    let mut config_path = None;
    let mut log_level = None;
    let mut mode = None;
    let mut targets = Vec::new();
    let mut iter = args.skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let val = iter.next().context(error::Usage {
                    message: String::from("Did not give argument to --config"),
                })?;
                config_path = Some(PathBuf::from(val));
            }
            "--log-level" => {
                let val = iter.next().context(error::Usage {
                    message: String::from("Did not give argument to --log-level"),
                })?;
                log_level =
                    Some(LevelFilter::from_str(&val).context(error::LogLevel { level: val })?);
            }
            "--help" | "-h" => return Err(Error::Usage { message: None }),
            // The first argument not prefixed with '-' is the mode, the rest are its targets, even
            // when they spell another mode
            s if !s.starts_with('-') => match mode {
                None => mode = Some(Mode::parse(s)?),
                Some(_) => targets.push(s.to_string()),
            },
            unknown => {
                return Err(Error::Usage {
                    message: Some(format!("Unexpected argument: '{}'", unknown)),
                });
            }
        }
    }

    Ok(Arguments {
        mode: mode.context(error::Usage {
            message: Some(String::from("Mode not found.")),
        })?,
        targets,
        config_path,
        log_level,
    })
}
