//! Fixed names the switch operates on.
//!
//! Nothing here is configurable at runtime: the lists describe what a stock
//! KVM/libvirt host and a stock VirtualBox install look like.

/// Services known to hold the KVM device open.
pub const SERVICES: &[&str] = &["libvirtd", "virtqemud", "virtlogd"];

/// Executables that may hold the KVM device open without a managed service.
pub const PROCESSES: &[&str] = &["qemu-system-x86_64", "qemu-kvm"];

pub const KVM_AMD: &str = "kvm_amd";
pub const KVM_INTEL: &str = "kvm_intel";
pub const KVM: &str = "kvm";

/// KVM modules in unload order: vendor modules first, then the generic core
/// they depend on.
pub const KVM_MODULES: &[&str] = &[KVM_AMD, KVM_INTEL, KVM];

/// The VirtualBox host driver. Every other VirtualBox module depends on it.
pub const VBOX_PRIMARY: &str = "vboxdrv";

pub const VBOX_DEPENDENTS: &[&str] = &["vboxnetflt", "vboxnetadp", "vboxpci"];

/// Group granting access to `/dev/vboxdrv` and USB passthrough.
pub const VBOX_GROUP: &str = "vboxusers";

pub const DEFAULT_BLACKLIST_PATH: &str = "/etc/modprobe.d/blacklist-kvm.conf";

pub const DEFAULT_LOCK_PATH: &str = "/run/hvswitch.lock";

const BLACKLIST_HEADER: &str = "# Written by hvswitch; remove with `hvswitch --revert`";

/// Renders the modprobe blacklist that keeps KVM from loading at boot.
pub fn blacklist_contents() -> String {
    let mut contents = String::from(BLACKLIST_HEADER);
    contents.push('\n');
    for module in KVM_MODULES {
        contents.push_str("blacklist ");
        contents.push_str(module);
        contents.push('\n');
    }
    contents
}
