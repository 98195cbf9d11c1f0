//! The switch pipeline.
//!
//! A run is a fixed sequence of steps. Each step is best-effort and ends in an
//! [`Outcome`]; only a returned `Err` stops the sequence. The privilege guard
//! and instance lock run before any step, so a refused run never touches the
//! machine.

use crate::blacklist::Blacklist;
use crate::lock::InstanceLock;
use crate::report::Reporter;
use crate::system::System;
use hvswitch_core::catalog::{
    KVM_MODULES, PROCESSES, SERVICES, VBOX_DEPENDENTS, VBOX_GROUP, VBOX_PRIMARY,
};
use hvswitch_core::{CpuVendor, Error, LoadedModule, Options, Result, Settings, Termination};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Revert,
    ProbeCpu,
    StopServices,
    UnloadKvm,
    LoadVbox,
    EnsureGroup,
    Persist,
    Summary,
}

impl Step {
    /// Execution order. Revert runs first so that a combined
    /// `--revert --persist` ends with a freshly written blacklist.
    pub const PIPELINE: [Step; 8] = [
        Step::Revert,
        Step::ProbeCpu,
        Step::StopServices,
        Step::UnloadKvm,
        Step::LoadVbox,
        Step::EnsureGroup,
        Step::Persist,
        Step::Summary,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Skipped,
    /// The run continued, but the operator has something to fix.
    Degraded(String),
}

#[derive(Debug, Default)]
pub struct Report {
    pub cpu_vendor: CpuVendor,
    pub steps: Vec<(Step, Outcome)>,
}

impl Report {
    pub fn outcome(&self, step: Step) -> Option<&Outcome> {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, outcome)| outcome)
    }

    pub fn degraded(&self) -> impl Iterator<Item = (Step, &str)> {
        self.steps.iter().filter_map(|(step, outcome)| match outcome {
            Outcome::Degraded(reason) => Some((*step, reason.as_str())),
            _ => None,
        })
    }
}

pub struct Switch<'a> {
    system: &'a System,
    settings: &'a Settings,
    blacklist: Blacklist,
    reporter: &'a mut dyn Reporter,
}

impl<'a> Switch<'a> {
    pub fn new(system: &'a System, settings: &'a Settings, reporter: &'a mut dyn Reporter) -> Self {
        Self {
            system,
            settings,
            blacklist: Blacklist::new(&settings.blacklist_path),
            reporter,
        }
    }

    pub async fn run(mut self, options: &Options) -> Result<Report> {
        if !self.system.host.is_superuser() {
            return Err(Error::NotRoot);
        }
        let _lock = InstanceLock::acquire(&self.settings.lock_path)?;

        let mut report = Report::default();
        for step in Step::PIPELINE {
            tracing::info!(?step, "Running step");
            let outcome = self.run_step(step, options, &mut report).await?;
            tracing::debug!(?step, ?outcome, "Step finished");
            report.steps.push((step, outcome));
        }
        Ok(report)
    }

    async fn run_step(
        &mut self,
        step: Step,
        options: &Options,
        report: &mut Report,
    ) -> Result<Outcome> {
        match step {
            Step::Revert if options.revert => self.revert().await,
            Step::ProbeCpu => {
                report.cpu_vendor = self.probe_cpu();
                Ok(Outcome::Done)
            }
            Step::StopServices if options.stop_services => Ok(self.stop_services().await),
            Step::StopServices => {
                self.reporter.info("Skipping service shutdown (--no-stop)");
                Ok(Outcome::Skipped)
            }
            Step::UnloadKvm => Ok(self.unload_kvm().await),
            Step::LoadVbox if options.load_vbox => Ok(self.load_vbox().await),
            Step::LoadVbox => {
                self.reporter
                    .info("Skipping VirtualBox module loading (--no-vbox)");
                Ok(Outcome::Skipped)
            }
            Step::EnsureGroup => Ok(self.ensure_group().await),
            Step::Persist if options.persist => self.persist().await,
            Step::Summary => {
                self.summarize(options, report);
                Ok(Outcome::Done)
            }
            Step::Revert | Step::Persist => Ok(Outcome::Skipped),
        }
    }

    async fn revert(&mut self) -> Result<Outcome> {
        if self.blacklist.remove().await? {
            self.reporter.success(&format!(
                "Removed {}; KVM will load again at boot",
                self.blacklist.path().display()
            ));
            Ok(Outcome::Done)
        } else {
            self.reporter.warn(&format!(
                "Nothing to revert: {} does not exist",
                self.blacklist.path().display()
            ));
            Ok(Outcome::Skipped)
        }
    }

    /// Both vendor modules are unloaded regardless of the result; the vendor
    /// is only recorded in the report.
    fn probe_cpu(&self) -> CpuVendor {
        match self.system.host.cpu_vendor() {
            Ok(vendor) => {
                tracing::debug!(vendor = vendor.name(), "Probed CPU vendor");
                vendor
            }
            Err(e) => {
                tracing::debug!(error = %e, "CPU vendor probe failed");
                CpuVendor::Unknown
            }
        }
    }

    async fn stop_services(&mut self) -> Outcome {
        self.reporter.info("Stopping services that hold KVM open...");
        for service in SERVICES {
            if let Err(e) = self.system.services.stop(service).await {
                tracing::debug!(service, error = %e, "Stop failed, ignoring");
            }
        }

        let processes = &self.system.processes;
        for name in PROCESSES {
            if !processes.is_running(name).await {
                continue;
            }
            self.reporter.warn(&format!("{name} is running; terminating it"));
            if let Err(e) = processes.terminate(name, Termination::Graceful).await {
                tracing::debug!(process = name, error = %e, "SIGTERM failed, ignoring");
            }
            tokio::time::sleep(self.settings.termination_grace).await;
            if processes.is_running(name).await {
                if let Err(e) = processes.terminate(name, Termination::Forceful).await {
                    tracing::debug!(process = name, error = %e, "SIGKILL failed, ignoring");
                }
            }
        }
        Outcome::Done
    }

    async fn unload_kvm(&mut self) -> Outcome {
        self.reporter.info("Unloading KVM modules...");
        for module in KVM_MODULES {
            if let Err(e) = self.system.modules.unload(module).await {
                tracing::debug!(module, error = %e, "Unload failed, ignoring");
            }
        }

        let remaining: Vec<LoadedModule> = match self.system.modules.loaded().await {
            Ok(loaded) => loaded
                .into_iter()
                .filter(|m| KVM_MODULES.contains(&m.name.as_str()))
                .collect(),
            Err(e) => {
                let reason = format!("could not verify KVM modules were unloaded: {e}");
                self.reporter.warn(&reason);
                return Outcome::Degraded(reason);
            }
        };

        if remaining.is_empty() {
            self.reporter.success("KVM modules unloaded");
            return Outcome::Done;
        }

        self.reporter
            .warn("Some KVM modules are still loaded; VirtualBox may fail to start VMs:");
        for module in &remaining {
            self.reporter.warn(&describe_loaded(module));
        }
        let names: Vec<&str> = remaining.iter().map(|m| m.name.as_str()).collect();
        Outcome::Degraded(format!("still loaded: {}", names.join(", ")))
    }

    async fn load_vbox(&mut self) -> Outcome {
        self.reporter.info("Loading VirtualBox modules...");
        let modules = &self.system.modules;

        if let Err(e) = modules.load(VBOX_PRIMARY).await {
            tracing::debug!(module = VBOX_PRIMARY, error = %e, "Load failed");
            self.reporter.error(&format!("Failed to load {VBOX_PRIMARY}: {e}"));
            self.reporter.error(
                "Reinstall the VirtualBox host driver packages (virtualbox-dkms or \
                 virtualbox-host-modules) so the module matches the running kernel",
            );
            self.reporter.error(&format!(
                "If Secure Boot is enabled, sign {VBOX_PRIMARY} with an enrolled MOK key \
                 or disable Secure Boot"
            ));
            return Outcome::Degraded(format!("{VBOX_PRIMARY} failed to load"));
        }

        for module in VBOX_DEPENDENTS {
            if let Err(e) = modules.load(module).await {
                tracing::debug!(module, error = %e, "Load failed, ignoring");
            }
        }
        self.reporter.success("VirtualBox modules loaded");
        Outcome::Done
    }

    async fn ensure_group(&mut self) -> Outcome {
        let groups = &self.system.groups;
        if !groups.group_exists(VBOX_GROUP).await {
            self.reporter.warn(&format!(
                "Group '{VBOX_GROUP}' does not exist; is VirtualBox installed?"
            ));
            return Outcome::Skipped;
        }

        let user = self.system.host.invoking_user();
        match groups.is_member(&user, VBOX_GROUP).await {
            Ok(true) => {
                self.reporter
                    .info(&format!("User '{user}' is already in '{VBOX_GROUP}'"));
                return Outcome::Done;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::debug!(
                    user = %user,
                    error = %e,
                    "Membership check failed, adding anyway"
                );
            }
        }

        match groups.add_member(&user, VBOX_GROUP).await {
            Ok(()) => {
                self.reporter
                    .success(&format!("Added '{user}' to '{VBOX_GROUP}'"));
                self.reporter
                    .warn("Log out and back in for the group change to take effect");
                Outcome::Done
            }
            Err(e) => {
                let reason = format!("could not add '{user}' to '{VBOX_GROUP}': {e}");
                self.reporter.warn(&reason);
                Outcome::Degraded(reason)
            }
        }
    }

    async fn persist(&mut self) -> Result<Outcome> {
        self.blacklist.write().await?;
        self.reporter.success(&format!(
            "Wrote {}; KVM will stay unloaded across reboots",
            self.blacklist.path().display()
        ));
        Ok(Outcome::Done)
    }

    fn summarize(&mut self, options: &Options, report: &Report) {
        match report.outcome(Step::LoadVbox) {
            Some(Outcome::Done) => self.reporter.success("Switch to VirtualBox complete"),
            Some(Outcome::Degraded(_)) => self
                .reporter
                .warn("KVM released, but VirtualBox modules are not loaded"),
            _ => self.reporter.success("KVM released"),
        }
        if options.persist {
            self.reporter
                .warn("KVM is blacklisted at boot; run `hvswitch --revert` to undo");
        }
        self.reporter
            .info("Start VirtualBox now; reboot or `modprobe kvm` to hand the CPU back to KVM");
    }
}

fn describe_loaded(module: &LoadedModule) -> String {
    if module.used_by.is_empty() {
        format!("  {} (refcount {})", module.name, module.refcount)
    } else {
        format!(
            "  {} (refcount {}, used by {})",
            module.name,
            module.refcount,
            module.used_by.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_runs_first_and_persist_before_summary() {
        assert_eq!(Step::PIPELINE.first(), Some(&Step::Revert));
        let tail = &Step::PIPELINE[Step::PIPELINE.len() - 2..];
        assert_eq!(tail, &[Step::Persist, Step::Summary]);
    }

    #[test]
    fn describe_module_with_users() {
        let module = LoadedModule {
            name: "kvm".to_string(),
            refcount: 2,
            used_by: vec!["kvm_intel".to_string(), "vhost".to_string()],
        };
        assert_eq!(
            describe_loaded(&module),
            "  kvm (refcount 2, used by kvm_intel, vhost)"
        );
        assert_eq!(
            describe_loaded(&LoadedModule::new("kvm_amd")),
            "  kvm_amd (refcount 0)"
        );
    }

    #[test]
    fn report_lists_degraded_steps() {
        let report = Report {
            cpu_vendor: CpuVendor::Amd,
            steps: vec![
                (Step::UnloadKvm, Outcome::Degraded("still loaded: kvm".to_string())),
                (Step::LoadVbox, Outcome::Done),
            ],
        };
        let degraded: Vec<_> = report.degraded().collect();
        assert_eq!(degraded, vec![(Step::UnloadKvm, "still loaded: kvm")]);
        assert_eq!(report.outcome(Step::LoadVbox), Some(&Outcome::Done));
        assert_eq!(report.outcome(Step::Persist), None);
    }
}
