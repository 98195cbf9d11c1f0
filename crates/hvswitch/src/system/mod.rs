//! Facility implementations backed by the running Linux host.

mod command;
mod groups;
mod host;
mod kmod;
mod procs;
mod systemd;

pub use groups::SystemGroups;
pub use host::LocalHost;
pub use kmod::Kmod;
pub use procs::ProcTable;
pub use systemd::Systemctl;

use hvswitch_core::{GroupManager, HostInfo, ModuleManager, ProcessManager, ServiceManager};

/// Every external facility the switch talks to.
pub struct System {
    pub services: Box<dyn ServiceManager>,
    pub processes: Box<dyn ProcessManager>,
    pub modules: Box<dyn ModuleManager>,
    pub groups: Box<dyn GroupManager>,
    pub host: Box<dyn HostInfo>,
}

impl System {
    pub fn linux() -> Self {
        Self {
            services: Box::new(Systemctl),
            processes: Box::new(ProcTable::default()),
            modules: Box::new(Kmod::default()),
            groups: Box::new(SystemGroups),
            host: Box::new(LocalHost::default()),
        }
    }
}
