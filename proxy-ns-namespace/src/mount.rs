//! Private mount view and resolver bind mount

use proxy_ns_core::{Error, Operation, Result};
use tracing::{debug, error, info};

use crate::ops::SystemOps;
use crate::target::Target;

/// Give the calling process a private copy of the mount table
///
/// After this, mounts made by the process stay invisible to the rest of the
/// system and host mount events no longer propagate in.
///
/// # Errors
/// Returns error if `unshare(2)` or the recursive private remount fails
pub fn privatize_mounts<O: SystemOps>(ops: &O) -> Result<()> {
    debug!("Unsharing mount namespace");
    ops.unshare_mounts().map_err(|errno| {
        error!(error = %errno, "Failed to unshare mount namespace");
        Error::os(Operation::UnshareMounts, errno)
    })?;

    debug!("Marking / recursively private");
    ops.make_root_private().map_err(|errno| {
        error!(error = %errno, "Failed to make / private");
        Error::os(Operation::MakeRootPrivate, errno)
    })?;

    Ok(())
}

/// Overlay the system resolver file with the namespace's own
///
/// Must run after [`privatize_mounts`].
///
/// # Errors
/// Returns error if the bind mount fails
pub fn bind_resolver<O: SystemOps>(ops: &O, target: &Target) -> Result<()> {
    let source = target.resolver_path();
    let dest = target.resolv_conf();

    ops.bind_mount(source, dest).map_err(|errno| {
        error!(
            source = %source.display(),
            target = %dest.display(),
            error = %errno,
            "Failed to bind resolver file"
        );
        Error::os(Operation::BindResolver, errno)
    })?;

    info!(
        source = %source.display(),
        target = %dest.display(),
        "Bound namespace resolver"
    );
    Ok(())
}
