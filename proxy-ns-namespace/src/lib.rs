//! Run a command inside a provider-managed network namespace
//!
//! The sequence, in order:
//! - Target - namespace name to handle and resolver paths
//! - Join - `setns(2)` into the network namespace only
//! - Mount isolation - private mount namespace, `/` remounted private
//! - Resolver bind - namespace `resolv.conf` over `/etc/resolv.conf`
//! - Exec - `execvp(3)` of the user command
//!
//! Each step modifies the calling thread, so everything here must run on the
//! main thread of a single-threaded process.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod config;
pub mod executor;
pub mod join;
pub mod manager;
pub mod mount;
pub mod ops;
pub mod target;

pub use config::NetnsConfig;
pub use executor::ExecCommand;
pub use manager::{NamespaceInfo, NamespaceManager};
pub use ops::{Call, LinuxOps, MockOps, SystemOps};
pub use target::Target;

// Re-export commonly used types
pub use proxy_ns_core::{Error, NamespaceName, Operation, Result};
