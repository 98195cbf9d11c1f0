use hvswitch_core::{Error, Result};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Exclusive advisory lock keeping two switches from racing on module state.
///
/// Released when dropped.
pub struct InstanceLock {
    _flock: Flock<File>,
}

impl InstanceLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(flock) => {
                tracing::debug!(path = %path.display(), "Acquired instance lock");
                Ok(Self { _flock: flock })
            }
            Err((_, Errno::EWOULDBLOCK)) => Err(Error::AlreadyRunning(path.to_path_buf())),
            Err((_, errno)) => Err(Error::Io(errno.into())),
        }
    }
}
