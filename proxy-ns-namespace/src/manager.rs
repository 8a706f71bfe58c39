//! The join sequence as one non-returning call

use std::convert::Infallible;
use std::ffi::OsString;

use proxy_ns_core::{Error, Result};

use crate::config::NetnsConfig;
use crate::executor::{ExecCommand, replace_image};
use crate::join::join_network;
use crate::mount::{bind_resolver, privatize_mounts};
use crate::ops::{LinuxOps, SystemOps};
use crate::target::Target;

/// Runs join → privatize → bind → exec against a syscall backend
///
/// Every step is a hard gate: the first failure is returned and nothing is
/// rolled back, since the caller is expected to exit.
///
/// Namespace and mount changes apply to the calling thread; call
/// [`launch`](Self::launch) from the main thread of a single-threaded process.
#[derive(Debug)]
pub struct NamespaceManager<O: SystemOps = LinuxOps> {
    config: NetnsConfig,
    ops: O,
}

impl NamespaceManager<LinuxOps> {
    /// Create a manager issuing real system calls
    #[must_use]
    pub fn new(config: NetnsConfig) -> Self {
        Self::with_ops(config, LinuxOps)
    }
}

impl<O: SystemOps> NamespaceManager<O> {
    /// Create a manager on top of a custom backend
    #[must_use]
    pub fn with_ops(config: NetnsConfig, ops: O) -> Self {
        Self { config, ops }
    }

    /// Get the configuration
    #[must_use]
    pub const fn config(&self) -> &NetnsConfig {
        &self.config
    }

    /// Get the backend
    #[must_use]
    pub const fn ops(&self) -> &O {
        &self.ops
    }

    /// Resolve the namespace selected on the command line
    ///
    /// # Errors
    /// See [`Target::resolve`]
    pub fn resolve(&self, selection: Option<&str>) -> Result<Target> {
        Target::resolve(selection, &self.config)
    }

    /// Join `target` and become `command`
    ///
    /// Only returns on failure; a successful exec never comes back.
    ///
    /// # Errors
    /// Returns the error of the first step that failed
    pub fn launch(&self, target: &Target, command: &[OsString]) -> Result<Infallible> {
        // Validate the command before any process state changes.
        let command = ExecCommand::new(command)?;

        tracing::debug!(
            namespace = %target.name(),
            program = %command.display_name(),
            "Starting join sequence"
        );

        let before = tracing::enabled!(tracing::Level::DEBUG)
            .then(NamespaceInfo::current)
            .and_then(Result::ok);
        if let Some(ref before) = before {
            tracing::debug!(namespaces = %before, "Namespaces before join");
        }

        join_network(&self.ops, target, &self.config)?;
        privatize_mounts(&self.ops)?;
        bind_resolver(&self.ops, target)?;

        if let Some(ref before) = before
            && let Ok(after) = NamespaceInfo::current()
        {
            tracing::debug!(
                namespaces = %after,
                switched = after.network_differs(before),
                "Namespaces before exec"
            );
        }

        Err(replace_image(&self.ops, &command))
    }
}

/// Identity of the network and mount namespaces of a process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceInfo {
    /// Network namespace ID, e.g. `net:[4026531840]`
    pub net: Option<String>,
    /// Mount namespace ID
    pub mnt: Option<String>,
}

impl NamespaceInfo {
    /// Namespaces of the current process
    ///
    /// # Errors
    /// Returns error if `/proc/self/ns` cannot be read
    pub fn current() -> Result<Self> {
        Self::for_pid(std::process::id())
    }

    /// Namespaces of a specific PID
    ///
    /// # Errors
    /// Returns [`Error::Io`] if neither namespace link can be read
    pub fn for_pid(pid: u32) -> Result<Self> {
        let base_path = format!("/proc/{pid}/ns");

        let read_ns = |name: &str| {
            std::fs::read_link(format!("{base_path}/{name}"))
                .map(|p| p.to_string_lossy().into_owned())
        };

        match (read_ns("net"), read_ns("mnt")) {
            (Err(e), Err(_)) => Err(Error::Io(e)),
            (net, mnt) => Ok(Self {
                net: net.ok(),
                mnt: mnt.ok(),
            }),
        }
    }

    /// Whether `other` sits in a different network namespace
    #[must_use]
    pub fn network_differs(&self, other: &Self) -> bool {
        self.net.is_some() && other.net.is_some() && self.net != other.net
    }
}

impl std::fmt::Display for NamespaceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unknown = "?";
        write!(
            f,
            "NET={} MNT={}",
            self.net.as_deref().unwrap_or(unknown),
            self.mnt.as_deref().unwrap_or(unknown)
        )
    }
}
