//! Seams between the switch pipeline and the machine it mutates.
//!
//! Each trait wraps one external system facility so the pipeline can run
//! against in-memory fakes in tests.

use crate::cpu::CpuVendor;
use crate::error::Result;
use async_trait::async_trait;

/// A kernel module currently present in the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    pub name: String,
    /// Reference count as reported by the kernel.
    pub refcount: u32,
    /// Modules that depend on this one.
    pub used_by: Vec<String>,
}

impl LoadedModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            refcount: 0,
            used_by: Vec::new(),
        }
    }
}

/// How hard to ask a process to go away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// SIGTERM.
    Graceful,
    /// SIGKILL.
    Forceful,
}

#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Stops a service by name. Unknown or inactive services may return an
    /// error, which callers are expected to tolerate.
    async fn stop(&self, service: &str) -> Result<()>;
}

#[async_trait]
pub trait ProcessManager: Send + Sync {
    async fn is_running(&self, name: &str) -> bool;
    async fn terminate(&self, name: &str, how: Termination) -> Result<()>;
}

#[async_trait]
pub trait ModuleManager: Send + Sync {
    async fn load(&self, module: &str) -> Result<()>;
    async fn unload(&self, module: &str) -> Result<()>;
    async fn loaded(&self) -> Result<Vec<LoadedModule>>;
}

#[async_trait]
pub trait GroupManager: Send + Sync {
    async fn group_exists(&self, group: &str) -> bool;
    async fn is_member(&self, user: &str, group: &str) -> Result<bool>;
    async fn add_member(&self, user: &str, group: &str) -> Result<()>;
}

pub trait HostInfo: Send + Sync {
    fn is_superuser(&self) -> bool;
    fn cpu_vendor(&self) -> Result<CpuVendor>;
    /// The human behind the elevation, falling back to the current user.
    fn invoking_user(&self) -> String;
}
