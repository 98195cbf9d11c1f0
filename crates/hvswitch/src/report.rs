//! Operator-facing output.
//!
//! Diagnostics go through `tracing`; this is the human-readable narrative of a
//! run. Informational lines go to stdout, warnings and errors to stderr, so
//! `--quiet` can silence the former without hiding anything actionable.

use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "[INFO]",
            Level::Success => "[ OK ]",
            Level::Warn => "[WARN]",
            Level::Error => "[ERROR]",
        }
    }

    fn is_diagnostic(self) -> bool {
        matches!(self, Level::Warn | Level::Error)
    }
}

pub trait Reporter {
    fn emit(&mut self, level: Level, message: &str);

    fn info(&mut self, message: &str) {
        self.emit(Level::Info, message);
    }

    fn success(&mut self, message: &str) {
        self.emit(Level::Success, message);
    }

    fn warn(&mut self, message: &str) {
        self.emit(Level::Warn, message);
    }

    fn error(&mut self, message: &str) {
        self.emit(Level::Error, message);
    }
}

/// Writes tagged lines to an output and a diagnostic stream.
pub struct ConsoleReporter<O, E> {
    out: O,
    err: E,
    quiet: bool,
}

impl ConsoleReporter<io::Stdout, io::Stderr> {
    pub fn stdio(quiet: bool) -> Self {
        Self::new(io::stdout(), io::stderr(), quiet)
    }
}

impl<O: Write, E: Write> ConsoleReporter<O, E> {
    pub fn new(out: O, err: E, quiet: bool) -> Self {
        Self { out, err, quiet }
    }

    pub fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }
}

impl<O: Write, E: Write> Reporter for ConsoleReporter<O, E> {
    fn emit(&mut self, level: Level, message: &str) {
        // Write errors on stdout/stderr are dropped.
        if level.is_diagnostic() {
            let _ = writeln!(self.err, "{} {message}", level.tag());
        } else if !self.quiet {
            let _ = writeln!(self.out, "{} {message}", level.tag());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(quiet: bool) -> (String, String) {
        let mut reporter = ConsoleReporter::new(Vec::new(), Vec::new(), quiet);
        reporter.info("stopping services");
        reporter.success("kvm unloaded");
        reporter.warn("log out and back in");
        reporter.error("failed to load vboxdrv");
        let (out, err) = reporter.into_parts();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn info_and_success_go_to_stdout() {
        let (out, _) = render(false);
        assert_eq!(out, "[INFO] stopping services\n[ OK ] kvm unloaded\n");
    }

    #[test]
    fn warnings_and_errors_go_to_stderr() {
        let (_, err) = render(false);
        assert_eq!(
            err,
            "[WARN] log out and back in\n[ERROR] failed to load vboxdrv\n"
        );
    }

    #[test]
    fn quiet_silences_stdout_only() {
        let (out, err) = render(true);
        assert!(out.is_empty());
        assert_eq!(err.lines().count(), 2);
    }
}
