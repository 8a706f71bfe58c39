//! Error types for proxy-ns

use std::fmt;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// OS-level step of the join sequence that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Opening the namespace handle
    OpenHandle,
    /// `setns(2)` into the network namespace
    JoinNetwork,
    /// `unshare(2)` of the mount namespace
    UnshareMounts,
    /// Recursive private remount of `/`
    MakeRootPrivate,
    /// Bind mount of the resolver file
    BindResolver,
}

impl Operation {
    /// Human-readable failure prefix for this step
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::OpenHandle => "Failed to open network namespace fd",
            Self::JoinNetwork => "Failed to attach to network namespace",
            Self::UnshareMounts => "Failed to unshare namespace",
            Self::MakeRootPrivate => "Failed to make root private",
            Self::BindResolver => "Failed to mount bind resolv.conf",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.failure_message())
    }
}

/// proxy-ns error types
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Arguments parsed but cannot be honoured
    #[error("{message}")]
    Usage {
        /// Error message
        message: String,
    },

    /// Namespace identifier rejected before any path was built
    #[error("Invalid namespace name '{name}': {reason}")]
    InvalidName {
        /// Offending identifier
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Namespace handle does not exist
    #[error("Network namespace fd not found, is {provider} running?")]
    NamespaceNotFound {
        /// Handle path that was looked up
        path: PathBuf,
        /// Daemon expected to create the handle
        provider: String,
    },

    /// A system call in the join sequence failed
    #[error("{operation}: {}", .errno.desc())]
    Os {
        /// Step that failed
        operation: Operation,
        /// Underlying errno
        errno: Errno,
    },

    /// Replacing the process image failed
    #[error("Failed to exec '{command}': {}", .errno.desc())]
    Exec {
        /// Command that could not be launched
        command: String,
        /// Underlying errno
        errno: Errno,
    },

    /// Configuration file could not be parsed
    #[error("Failed to parse {}", .path.display())]
    ConfigParse {
        /// File that was read
        path: PathBuf,
        /// Parser error
        source: serde_json::Error,
    },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an errno from one of the join sequence steps
    #[must_use]
    pub const fn os(operation: Operation, errno: Errno) -> Self {
        Self::Os { operation, errno }
    }

    /// The errno behind OS-level and exec failures
    #[must_use]
    pub const fn errno(&self) -> Option<Errno> {
        match self {
            Self::Os { errno, .. } | Self::Exec { errno, .. } => Some(*errno),
            _ => None,
        }
    }

    /// Build a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Build a configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether the error means the namespace provider has not created the handle
    #[must_use]
    pub const fn is_namespace_missing(&self) -> bool {
        matches!(self, Self::NamespaceNotFound { .. })
    }

    /// The failed step, for OS-level failures
    #[must_use]
    pub const fn operation(&self) -> Option<Operation> {
        match self {
            Self::Os { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

/// Result type alias for proxy-ns operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_error_format() {
        let err = Error::os(Operation::JoinNetwork, Errno::EPERM);
        assert_eq!(
            err.to_string(),
            "Failed to attach to network namespace: Operation not permitted"
        );
        assert_eq!(err.operation(), Some(Operation::JoinNetwork));
    }

    #[test]
    fn test_missing_namespace_format() {
        let err = Error::NamespaceNotFound {
            path: PathBuf::from("/var/run/netns/ghost"),
            provider: "proxy-nsd".to_string(),
        };
        assert!(err.is_namespace_missing());
        assert_eq!(
            err.to_string(),
            "Network namespace fd not found, is proxy-nsd running?"
        );
    }

    #[test]
    fn test_exec_error_names_command() {
        let err = Error::Exec {
            command: "nonexistent-cmd".to_string(),
            errno: Errno::ENOENT,
        };
        assert_eq!(
            err.to_string(),
            "Failed to exec 'nonexistent-cmd': No such file or directory"
        );
        assert!(err.operation().is_none());
        assert_eq!(err.errno(), Some(Errno::ENOENT));
    }

    #[test]
    fn test_usage_is_bare_message() {
        assert_eq!(Error::usage("no command given").to_string(), "no command given");
    }
}
