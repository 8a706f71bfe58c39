//! Replacing the process image with the user's command

use std::ffi::{CString, OsString};
use std::os::unix::ffi::OsStrExt;

use proxy_ns_core::{Error, Result};
use tracing::{debug, error};

use crate::ops::SystemOps;

/// Command vector converted for `execvp(3)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCommand {
    argv: Vec<CString>,
}

impl ExecCommand {
    /// Convert the trailing command-line arguments, `argv[0]` first
    ///
    /// # Errors
    /// Returns a usage error if the vector is empty or an argument holds a NUL byte
    pub fn new(command: &[OsString]) -> Result<Self> {
        if command.is_empty() {
            return Err(Error::usage("no command given"));
        }

        let argv = command
            .iter()
            .map(|arg| {
                CString::new(arg.as_bytes()).map_err(|_| {
                    Error::usage(format!(
                        "argument contains a NUL byte: {}",
                        arg.to_string_lossy()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { argv })
    }

    /// Program looked up on `PATH`
    #[must_use]
    pub fn program(&self) -> &CString {
        // `new` refuses empty vectors
        &self.argv[0]
    }

    /// Full argument vector, program included
    #[must_use]
    pub fn argv(&self) -> &[CString] {
        &self.argv
    }

    /// Program name for diagnostics
    #[must_use]
    pub fn display_name(&self) -> String {
        self.program().to_string_lossy().into_owned()
    }
}

/// Become `command`, keeping the PID, namespaces and mounts
///
/// On success no code of this process runs again, so the function only
/// ever hands back the error describing why the exec failed.
#[must_use]
pub fn replace_image<O: SystemOps>(ops: &O, command: &ExecCommand) -> Error {
    debug!(program = %command.display_name(), args = command.argv().len() - 1, "Calling execvp");

    let errno = ops.exec(command.program(), command.argv());

    error!(program = %command.display_name(), error = %errno, "execvp failed");
    Error::Exec {
        command: command.display_name(),
        errno,
    }
}
