use std::path::PathBuf;

/// Errors that can occur while switching hypervisors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("hvswitch must be run as root (try: sudo hvswitch)")]
    NotRoot,

    #[error("another hvswitch instance is already running (lock held on {})", .0.display())]
    AlreadyRunning(PathBuf),

    #[error("command '{program}' not found in PATH")]
    ToolNotFound { program: String },

    #[error("'{command}' failed: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("failed to write blacklist {}: {source}", path.display())]
    BlacklistWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove blacklist {}: {source}", path.display())]
    BlacklistRemove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_not_root() {
        assert_eq!(
            Error::NotRoot.to_string(),
            "hvswitch must be run as root (try: sudo hvswitch)"
        );
    }

    #[test]
    fn error_display_already_running() {
        let err = Error::AlreadyRunning(PathBuf::from("/run/hvswitch.lock"));
        assert_eq!(
            err.to_string(),
            "another hvswitch instance is already running (lock held on /run/hvswitch.lock)"
        );
    }

    #[test]
    fn error_display_command_failed() {
        let err = Error::CommandFailed {
            command: "modprobe vboxdrv".to_string(),
            detail: "Key was rejected by service".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "'modprobe vboxdrv' failed: Key was rejected by service"
        );
    }

    #[test]
    fn error_display_blacklist_write() {
        let err = Error::BlacklistWrite {
            path: PathBuf::from("/etc/modprobe.d/blacklist-kvm.conf"),
            source: std::io::Error::new(std::io::ErrorKind::ReadOnlyFilesystem, "read-only"),
        };
        assert_eq!(
            err.to_string(),
            "failed to write blacklist /etc/modprobe.d/blacklist-kvm.conf: read-only"
        );
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
