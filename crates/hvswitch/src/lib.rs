//! Hand CPU virtualization over from KVM to VirtualBox.
//!
//! KVM and VirtualBox both want exclusive use of VT-x/AMD-V. This crate stops
//! whatever holds KVM open, unloads the KVM modules, loads the VirtualBox
//! modules, fixes up `vboxusers` membership, and optionally keeps KVM from
//! loading again at boot.
//!
//! ```rust,no_run
//! use hvswitch::{ConsoleReporter, Options, Settings, Switch, System};
//!
//! # async fn example() -> hvswitch::Result<()> {
//! let system = System::linux();
//! let settings = Settings::from_env();
//! let options = Options { persist: true, ..Options::default() };
//! let mut reporter = ConsoleReporter::stdio(options.quiet);
//!
//! let report = Switch::new(&system, &settings, &mut reporter)
//!     .run(&options)
//!     .await?;
//! assert!(report.degraded().next().is_none());
//! # Ok(())
//! # }
//! ```

mod blacklist;
mod lock;
mod report;
mod switch;
pub mod system;

#[cfg(any(test, feature = "test-utils"))]
pub mod fake;

pub use blacklist::Blacklist;
pub use hvswitch_core::{
    CpuVendor, Error, GroupManager, HostInfo, LoadedModule, ModuleManager, Options,
    ProcessManager, Result, ServiceManager, Settings, Termination, catalog,
};
pub use lock::InstanceLock;
pub use report::{ConsoleReporter, Level, Reporter};
pub use switch::{Outcome, Report, Step, Switch};
pub use system::System;
