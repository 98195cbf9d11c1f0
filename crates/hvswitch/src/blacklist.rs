use hvswitch_core::catalog::blacklist_contents;
use hvswitch_core::{Error, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// The modprobe blacklist that keeps KVM from loading at boot.
#[derive(Debug, Clone)]
pub struct Blacklist {
    path: PathBuf,
}

impl Blacklist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the file. Returns `false` when there was nothing to remove.
    pub async fn remove(&self) -> Result<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(Error::BlacklistRemove {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Overwrites the file with the fixed KVM blacklist.
    pub async fn write(&self) -> Result<()> {
        let to_error = |source| Error::BlacklistWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(to_error)?;
        }
        tokio::fs::write(&self.path, blacklist_contents())
            .await
            .map_err(to_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_creates_file_with_fixed_contents() {
        let dir = tempfile::tempdir().unwrap();
        let blacklist = Blacklist::new(dir.path().join("modprobe.d/blacklist-kvm.conf"));

        blacklist.write().await.unwrap();

        assert!(blacklist.path().exists());
        let written = std::fs::read_to_string(blacklist.path()).unwrap();
        assert_eq!(written, blacklist_contents());
    }

    #[tokio::test]
    async fn write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blacklist-kvm.conf");
        std::fs::write(&path, "blacklist something-else\n").unwrap();

        Blacklist::new(&path).write().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), blacklist_contents());
    }

    #[tokio::test]
    async fn remove_reports_whether_file_existed() {
        let dir = tempfile::tempdir().unwrap();
        let blacklist = Blacklist::new(dir.path().join("blacklist-kvm.conf"));

        assert!(!blacklist.remove().await.unwrap());

        blacklist.write().await.unwrap();
        assert!(blacklist.remove().await.unwrap());
        assert!(!blacklist.path().exists());
    }

    #[tokio::test]
    async fn write_into_file_parent_fails() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("plain-file");
        std::fs::write(&not_a_dir, "").unwrap();

        let result = Blacklist::new(not_a_dir.join("blacklist-kvm.conf")).write().await;

        assert!(matches!(result, Err(Error::BlacklistWrite { .. })));
    }
}
