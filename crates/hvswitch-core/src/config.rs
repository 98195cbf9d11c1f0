use crate::catalog::{DEFAULT_BLACKLIST_PATH, DEFAULT_LOCK_PATH};
use std::path::PathBuf;
use std::time::Duration;

/// What a single invocation was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Write the boot-time KVM blacklist at the end of the run.
    pub persist: bool,
    /// Remove the boot-time KVM blacklist before anything else runs.
    pub revert: bool,
    /// Load the VirtualBox modules after KVM is gone.
    pub load_vbox: bool,
    /// Stop services and processes holding KVM open.
    pub stop_services: bool,
    /// Suppress informational output.
    pub quiet: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            persist: false,
            revert: false,
            load_vbox: true,
            stop_services: true,
            quiet: false,
        }
    }
}

/// Host paths and timings, fixed for a given machine.
#[derive(Debug, Clone)]
pub struct Settings {
    pub blacklist_path: PathBuf,
    pub lock_path: PathBuf,
    /// How long a process gets between SIGTERM and SIGKILL.
    pub termination_grace: Duration,
}

impl Settings {
    pub const BLACKLIST_ENV: &'static str = "HVSWITCH_BLACKLIST";
    pub const LOCK_ENV: &'static str = "HVSWITCH_LOCK";

    /// Defaults, with `HVSWITCH_BLACKLIST` and `HVSWITCH_LOCK` taking
    /// precedence when set to a non-empty value.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(path) = env_path(Self::BLACKLIST_ENV) {
            settings.blacklist_path = path;
        }
        if let Some(path) = env_path(Self::LOCK_ENV) {
            settings.lock_path = path;
        }
        settings
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            blacklist_path: PathBuf::from(DEFAULT_BLACKLIST_PATH),
            lock_path: PathBuf::from(DEFAULT_LOCK_PATH),
            termination_grace: Duration::from_secs(1),
        }
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
