use std::io::{self, Write};

/// Receives the human-readable status line the orchestrator records with a probe result.
pub(crate) trait DiagnosticSink {
    fn emit(&mut self, line: &str);
}

pub(crate) struct StdoutSink {}

impl DiagnosticSink for StdoutSink {
    fn emit(&mut self, line: &str) {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        // nothing useful can be done if stdout is gone, the exit code still reports the result
        let _ = writeln!(handle, "{}", line);
        let _ = handle.flush();
    }
}

#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) lines: Vec<String>,
}

#[cfg(test)]
impl DiagnosticSink for RecordingSink {
    fn emit(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}
