pub mod catalog;
pub mod config;
pub mod cpu;
pub mod error;
pub mod facility;

pub use config::{Options, Settings};
pub use cpu::CpuVendor;
pub use error::{Error, Result};
pub use facility::{
    GroupManager, HostInfo, LoadedModule, ModuleManager, ProcessManager, ServiceManager,
    Termination,
};
