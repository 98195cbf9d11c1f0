use hvswitch_core::{CpuVendor, Error, HostInfo, Result};
use nix::unistd::{Uid, User, geteuid, getuid};
use std::path::PathBuf;

/// Facts about the machine and the invoking user.
pub struct LocalHost {
    cpuinfo: PathBuf,
}

impl LocalHost {
    pub fn new(cpuinfo: impl Into<PathBuf>) -> Self {
        Self {
            cpuinfo: cpuinfo.into(),
        }
    }
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new("/proc/cpuinfo")
    }
}

impl HostInfo for LocalHost {
    fn is_superuser(&self) -> bool {
        geteuid().is_root()
    }

    fn cpu_vendor(&self) -> Result<CpuVendor> {
        let text = std::fs::read_to_string(&self.cpuinfo).map_err(|source| Error::ReadFailed {
            path: self.cpuinfo.clone(),
            source,
        })?;
        Ok(CpuVendor::from_cpuinfo(&text))
    }

    fn invoking_user(&self) -> String {
        invoking_user_from(std::env::var("SUDO_USER").ok(), getuid())
    }
}

fn invoking_user_from(sudo_user: Option<String>, uid: Uid) -> String {
    if let Some(user) = sudo_user.filter(|u| !u.is_empty()) {
        return user;
    }
    match User::from_uid(uid) {
        Ok(Some(user)) => user.name,
        _ => "root".to_string(),
    }
}
