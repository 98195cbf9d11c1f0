use async_trait::async_trait;
use hvswitch_core::{ProcessManager, Result, Termination};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::path::PathBuf;

/// The kernel truncates `comm` to 15 bytes plus the terminating NUL.
const COMM_LEN: usize = 15;

/// Process lookup by executable name over a procfs tree.
pub struct ProcTable {
    root: PathBuf,
}

impl ProcTable {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn pids_named(&self, name: &str) -> Result<Vec<Pid>> {
        let wanted = comm_name(name);
        let mut pids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|s| s.parse::<i32>().ok())
            else {
                continue;
            };
            // The process may exit between listing and reading.
            let Ok(comm) = tokio::fs::read_to_string(entry.path().join("comm")).await else {
                continue;
            };
            if comm.trim_end_matches('\n') == wanted {
                pids.push(Pid::from_raw(pid));
            }
        }

        pids.sort();
        Ok(pids)
    }
}

impl Default for ProcTable {
    fn default() -> Self {
        Self::new("/proc")
    }
}

fn comm_name(name: &str) -> &str {
    if name.len() <= COMM_LEN {
        return name;
    }
    let mut end = COMM_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

#[async_trait]
impl ProcessManager for ProcTable {
    async fn is_running(&self, name: &str) -> bool {
        self.pids_named(name)
            .await
            .map(|pids| !pids.is_empty())
            .unwrap_or(false)
    }

    async fn terminate(&self, name: &str, how: Termination) -> Result<()> {
        let sig = match how {
            Termination::Graceful => Signal::SIGTERM,
            Termination::Forceful => Signal::SIGKILL,
        };
        for pid in self.pids_named(name).await? {
            tracing::debug!(%pid, process = name, signal = ?sig, "Signalling");
            match signal::kill(pid, sig) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(errno) => return Err(std::io::Error::from(errno).into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn fake_proc(root: &Path, pid: &str, comm: &str) {
        let dir = root.join(pid);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("comm"), format!("{comm}\n")).unwrap();
    }

    #[test]
    fn long_names_are_truncated_like_the_kernel() {
        assert_eq!(comm_name("qemu-system-x86_64"), "qemu-system-x86");
        assert_eq!(comm_name("qemu-kvm"), "qemu-kvm");
    }

    #[tokio::test]
    async fn finds_matching_pids_only() {
        let dir = tempfile::tempdir().unwrap();
        fake_proc(dir.path(), "101", "qemu-system-x86");
        fake_proc(dir.path(), "7", "qemu-system-x86");
        fake_proc(dir.path(), "200", "qemu-kvm");
        fake_proc(dir.path(), "self", "qemu-system-x86");
        std::fs::create_dir_all(dir.path().join("300")).unwrap();

        let table = ProcTable::new(dir.path());
        let pids = table.pids_named("qemu-system-x86_64").await.unwrap();

        assert_eq!(pids, vec![Pid::from_raw(7), Pid::from_raw(101)]);
        assert!(table.is_running("qemu-kvm").await);
        assert!(!table.is_running("virtualbox").await);
    }

    #[tokio::test]
    async fn terminate_with_no_matches_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let table = ProcTable::new(dir.path());
        table
            .terminate("qemu-kvm", Termination::Forceful)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_root_is_not_running() {
        let table = ProcTable::new("/nonexistent/hvswitch-proc");
        assert!(!table.is_running("qemu-kvm").await);
    }
}
