//! In-memory facilities for exercising the switch without touching a host.
//!
//! A [`FakeSystem`] is a cheap handle onto shared state: hand
//! [`FakeSystem::system`] to the switch, then inspect the same handle to see
//! what was called and what the "machine" looks like afterwards.

use crate::system::System;
use async_trait::async_trait;
use hvswitch_core::catalog::{KVM, KVM_INTEL, VBOX_GROUP};
use hvswitch_core::{
    CpuVendor, Error, GroupManager, HostInfo, LoadedModule, ModuleManager, ProcessManager,
    Result, ServiceManager, Termination,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StopService(String),
    IsRunning(String),
    Terminate(String, Termination),
    Load(String),
    Unload(String),
    ListLoaded,
    GroupExists(String),
    IsMember(String, String),
    AddMember(String, String),
}

impl Call {
    /// Whether the call would change the state of a real machine.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Call::StopService(_)
                | Call::Terminate(..)
                | Call::Load(_)
                | Call::Unload(_)
                | Call::AddMember(..)
        )
    }
}

#[derive(Debug)]
struct State {
    superuser: bool,
    vendor: CpuVendor,
    user: String,
    calls: Vec<Call>,
    running: BTreeSet<String>,
    ignores_sigterm: BTreeSet<String>,
    loaded: Vec<LoadedModule>,
    stuck: BTreeSet<String>,
    failing_loads: BTreeSet<String>,
    membership_check_fails: bool,
    add_member_fails: bool,
    groups: BTreeMap<String, Vec<String>>,
}

/// A root shell on an Intel KVM host with VirtualBox installed: `kvm_intel`
/// and `kvm` loaded, an empty `vboxusers` group, invoked by `alice`.
#[derive(Clone)]
pub struct FakeSystem {
    state: Arc<Mutex<State>>,
}

impl Default for FakeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSystem {
    pub fn new() -> Self {
        let mut kvm = LoadedModule::new(KVM);
        kvm.refcount = 1;
        kvm.used_by = vec![KVM_INTEL.to_string()];

        let state = State {
            superuser: true,
            vendor: CpuVendor::Intel,
            user: "alice".to_string(),
            calls: Vec::new(),
            running: BTreeSet::new(),
            ignores_sigterm: BTreeSet::new(),
            loaded: vec![LoadedModule::new(KVM_INTEL), kvm],
            stuck: BTreeSet::new(),
            failing_loads: BTreeSet::new(),
            membership_check_fails: false,
            add_member_fails: false,
            groups: BTreeMap::from([(VBOX_GROUP.to_string(), Vec::new())]),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn system(&self) -> System {
        System {
            services: Box::new(self.clone()),
            processes: Box::new(self.clone()),
            modules: Box::new(self.clone()),
            groups: Box::new(self.clone()),
            host: Box::new(self.clone()),
        }
    }

    pub fn not_root(self) -> Self {
        self.lock().superuser = false;
        self
    }

    pub fn vendor(self, vendor: CpuVendor) -> Self {
        self.lock().vendor = vendor;
        self
    }

    pub fn running(self, process: &str) -> Self {
        self.lock().running.insert(process.to_string());
        self
    }

    /// The process survives SIGTERM and only dies on SIGKILL.
    pub fn ignores_sigterm(self, process: &str) -> Self {
        self.lock().ignores_sigterm.insert(process.to_string());
        self
    }

    pub fn loaded_module(self, module: LoadedModule) -> Self {
        self.lock().loaded.push(module);
        self
    }

    /// The module refuses to unload, as if a VM still had it open.
    pub fn stuck(self, module: &str) -> Self {
        self.lock().stuck.insert(module.to_string());
        self
    }

    pub fn failing_load(self, module: &str) -> Self {
        self.lock().failing_loads.insert(module.to_string());
        self
    }

    /// The account lookup behind `is_member` errors out.
    pub fn failing_membership_check(self) -> Self {
        self.lock().membership_check_fails = true;
        self
    }

    /// `usermod` refuses to add anyone.
    pub fn failing_add_member(self) -> Self {
        self.lock().add_member_fails = true;
        self
    }

    pub fn without_group(self, group: &str) -> Self {
        self.lock().groups.remove(group);
        self
    }

    pub fn member(self, group: &str, user: &str) -> Self {
        self.lock()
            .groups
            .entry(group.to_string())
            .or_default()
            .push(user.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    pub fn loaded_names(&self) -> Vec<String> {
        self.lock().loaded.iter().map(|m| m.name.clone()).collect()
    }

    pub fn is_loaded(&self, module: &str) -> bool {
        self.lock().loaded.iter().any(|m| m.name == module)
    }

    pub fn is_running(&self, process: &str) -> bool {
        self.lock().running.contains(process)
    }

    pub fn members(&self, group: &str) -> Vec<String> {
        self.lock().groups.get(group).cloned().unwrap_or_default()
    }

    fn record(&self, call: Call) -> MutexGuard<'_, State> {
        let mut state = self.lock();
        state.calls.push(call);
        state
    }
}

fn failed(command: String, detail: &str) -> Error {
    Error::CommandFailed {
        command,
        detail: detail.to_string(),
    }
}

#[async_trait]
impl ServiceManager for FakeSystem {
    async fn stop(&self, service: &str) -> Result<()> {
        drop(self.record(Call::StopService(service.to_string())));
        Err(failed(
            format!("systemctl stop {service}"),
            "Unit not loaded.",
        ))
    }
}

#[async_trait]
impl ProcessManager for FakeSystem {
    async fn is_running(&self, name: &str) -> bool {
        self.record(Call::IsRunning(name.to_string()))
            .running
            .contains(name)
    }

    async fn terminate(&self, name: &str, how: Termination) -> Result<()> {
        let mut state = self.record(Call::Terminate(name.to_string(), how));
        if how == Termination::Forceful || !state.ignores_sigterm.contains(name) {
            state.running.remove(name);
        }
        Ok(())
    }
}

#[async_trait]
impl ModuleManager for FakeSystem {
    async fn load(&self, module: &str) -> Result<()> {
        let mut state = self.record(Call::Load(module.to_string()));
        if state.failing_loads.contains(module) {
            return Err(failed(
                format!("modprobe {module}"),
                "Key was rejected by service",
            ));
        }
        if !state.loaded.iter().any(|m| m.name == module) {
            state.loaded.push(LoadedModule::new(module));
        }
        Ok(())
    }

    async fn unload(&self, module: &str) -> Result<()> {
        let mut state = self.record(Call::Unload(module.to_string()));
        if state.stuck.contains(module) {
            return Err(failed(
                format!("modprobe -r {module}"),
                "Module is in use",
            ));
        }
        let before = state.loaded.len();
        state.loaded.retain(|m| m.name != module);
        if state.loaded.len() == before {
            return Err(failed(
                format!("modprobe -r {module}"),
                "Module is not currently loaded",
            ));
        }
        Ok(())
    }

    async fn loaded(&self) -> Result<Vec<LoadedModule>> {
        Ok(self.record(Call::ListLoaded).loaded.clone())
    }
}

#[async_trait]
impl GroupManager for FakeSystem {
    async fn group_exists(&self, group: &str) -> bool {
        self.record(Call::GroupExists(group.to_string()))
            .groups
            .contains_key(group)
    }

    async fn is_member(&self, user: &str, group: &str) -> Result<bool> {
        let state = self.record(Call::IsMember(user.to_string(), group.to_string()));
        if state.membership_check_fails {
            return Err(Error::Io(std::io::Error::other(
                "nss lookup for group failed",
            )));
        }
        Ok(state
            .groups
            .get(group)
            .is_some_and(|members| members.iter().any(|m| m == user)))
    }

    async fn add_member(&self, user: &str, group: &str) -> Result<()> {
        let mut state = self.record(Call::AddMember(user.to_string(), group.to_string()));
        if state.add_member_fails {
            return Err(failed(
                format!("usermod -aG {group} {user}"),
                "cannot lock /etc/group; try again later.",
            ));
        }
        let Some(members) = state.groups.get_mut(group) else {
            return Err(failed(
                format!("usermod -aG {group} {user}"),
                "group does not exist",
            ));
        };
        if !members.iter().any(|m| m == user) {
            members.push(user.to_string());
        }
        Ok(())
    }
}

impl HostInfo for FakeSystem {
    fn is_superuser(&self) -> bool {
        self.lock().superuser
    }

    fn cpu_vendor(&self) -> Result<CpuVendor> {
        Ok(self.lock().vendor)
    }

    fn invoking_user(&self) -> String {
        self.lock().user.clone()
    }
}
