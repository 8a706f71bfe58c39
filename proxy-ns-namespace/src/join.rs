//! Joining the provider's network namespace

use nix::errno::Errno;
use proxy_ns_core::{Error, Operation, Result};
use tracing::{debug, error, info};

use crate::config::NetnsConfig;
use crate::ops::SystemOps;
use crate::target::Target;

/// Attach the calling process's network context to the target namespace
///
/// Only the network namespace changes. The handle is closed as soon as the
/// join returns.
///
/// # Errors
/// Returns [`Error::NamespaceNotFound`] if the handle does not exist (and the
/// configuration distinguishes that case), or [`Error::Os`] for any other
/// open or `setns(2)` failure
pub fn join_network<O: SystemOps>(ops: &O, target: &Target, config: &NetnsConfig) -> Result<()> {
    let path = target.handle_path();
    debug!(handle = %path.display(), "Opening namespace handle");

    let handle = ops.open_namespace(path).map_err(|errno| {
        if errno == Errno::ENOENT && config.distinguish_missing {
            error!(handle = %path.display(), "Namespace handle does not exist");
            Error::NamespaceNotFound {
                path: path.to_path_buf(),
                provider: config.provider.clone(),
            }
        } else {
            error!(handle = %path.display(), error = %errno, "Failed to open namespace handle");
            Error::os(Operation::OpenHandle, errno)
        }
    })?;

    ops.join_network(handle).map_err(|errno| {
        error!(namespace = %target.name(), error = %errno, "setns failed");
        Error::os(Operation::JoinNetwork, errno)
    })?;

    info!(namespace = %target.name(), "Joined network namespace");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{Call, LinuxOps, MockOps};

    fn target_in(dir: &std::path::Path, name: &str, config: &NetnsConfig) -> Target {
        let config = config
            .clone()
            .with_handle_template(format!("{}/{{name}}", dir.display()));
        Target::resolve(Some(name), &config).unwrap()
    }

    #[test]
    fn test_missing_handle_names_provider() {
        let dir = tempfile::tempdir().unwrap();
        let config = NetnsConfig::default();
        let target = target_in(dir.path(), "ghost", &config);

        let err = join_network(&LinuxOps, &target, &config).unwrap_err();
        assert!(err.is_namespace_missing());
        assert!(err.to_string().contains("is proxy-nsd running"));
    }

    #[test]
    fn test_missing_handle_without_distinction() {
        let dir = tempfile::tempdir().unwrap();
        let config = NetnsConfig::default().with_distinguish_missing(false);
        let target = target_in(dir.path(), "ghost", &config);

        let err = join_network(&LinuxOps, &target, &config).unwrap_err();
        assert_eq!(err.operation(), Some(Operation::OpenHandle));
        assert_eq!(
            err.to_string(),
            "Failed to open network namespace fd: No such file or directory"
        );
    }

    #[test]
    fn test_other_open_failure_is_generic() {
        let config = NetnsConfig::default();
        let target = Target::resolve(None, &config).unwrap();
        let ops = MockOps::new().fail(Operation::OpenHandle, Errno::EMFILE);

        let err = join_network(&ops, &target, &config).unwrap_err();
        assert_eq!(err.operation(), Some(Operation::OpenHandle));
        assert!(!err.is_namespace_missing());
    }

    #[test]
    fn test_setns_failure_closes_handle() {
        let config = NetnsConfig::default();
        let target = Target::resolve(None, &config).unwrap();
        let ops = MockOps::new().fail(Operation::JoinNetwork, Errno::EPERM);

        let err = join_network(&ops, &target, &config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to attach to network namespace: Operation not permitted"
        );
        assert_eq!(ops.calls().last(), Some(&Call::CloseHandle));
    }

    #[test]
    fn test_join_rejects_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plain"), b"").unwrap();
        let config = NetnsConfig::default();
        let target = target_in(dir.path(), "plain", &config);

        let err = join_network(&LinuxOps, &target, &config).unwrap_err();
        assert_eq!(err.operation(), Some(Operation::JoinNetwork));
    }
}
