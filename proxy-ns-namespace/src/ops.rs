//! System call backend trait for pluggable implementations

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::mount::{MsFlags, mount};
use nix::sched::{CloneFlags, setns, unshare};
use nix::unistd::execvp;
use proxy_ns_core::Operation;

/// The system calls the join sequence is built from
///
/// This allows for different implementations:
/// - [`LinuxOps`] - Real syscalls against the calling process
/// - [`MockOps`] - Recording backend for testing without privilege
///
/// Every method reports the raw errno; mapping to [`proxy_ns_core::Error`]
/// happens in the step functions so both backends share it.
pub trait SystemOps {
    /// Open namespace handle, closed when dropped
    type Handle;

    /// Open a namespace handle read-only and close-on-exec
    fn open_namespace(&self, path: &Path) -> nix::Result<Self::Handle>;

    /// Move the calling process into the handle's network namespace
    ///
    /// The handle is consumed and closed whether or not the join succeeds.
    fn join_network(&self, handle: Self::Handle) -> nix::Result<()>;

    /// Detach the calling process into a new mount namespace
    fn unshare_mounts(&self) -> nix::Result<()>;

    /// Recursively mark `/` as private
    fn make_root_private(&self) -> nix::Result<()>;

    /// Bind-mount `source` onto `target`
    fn bind_mount(&self, source: &Path, target: &Path) -> nix::Result<()>;

    /// Replace the process image, searching `PATH`
    ///
    /// Only returns on failure.
    fn exec(&self, program: &CStr, argv: &[CString]) -> Errno;
}

/// Backend issuing the real system calls
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxOps;

impl SystemOps for LinuxOps {
    type Handle = File;

    fn open_namespace(&self, path: &Path) -> nix::Result<File> {
        OpenOptions::new()
            .read(true)
            .custom_flags(OFlag::O_CLOEXEC.bits())
            .open(path)
            .map_err(|e| e.raw_os_error().map_or(Errno::EIO, Errno::from_raw))
    }

    fn join_network(&self, handle: File) -> nix::Result<()> {
        let result = setns(&handle, CloneFlags::CLONE_NEWNET);
        drop(handle);
        result
    }

    fn unshare_mounts(&self) -> nix::Result<()> {
        unshare(CloneFlags::CLONE_NEWNS)
    }

    fn make_root_private(&self) -> nix::Result<()> {
        mount(
            Some("none"),
            "/",
            None::<&str>,
            MsFlags::MS_SILENT | MsFlags::MS_REC | MsFlags::MS_PRIVATE,
            None::<&str>,
        )
    }

    fn bind_mount(&self, source: &Path, target: &Path) -> nix::Result<()> {
        mount(
            Some(source),
            target,
            None::<&str>,
            MsFlags::MS_SILENT | MsFlags::MS_BIND,
            None::<&str>,
        )
    }

    fn exec(&self, program: &CStr, argv: &[CString]) -> Errno {
        match execvp(program, argv) {
            Ok(never) => match never {},
            Err(errno) => errno,
        }
    }
}

/// A call observed by [`MockOps`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Handle opened
    Open(PathBuf),
    /// Network namespace joined
    JoinNetwork,
    /// Handle dropped
    CloseHandle,
    /// Mount namespace detached
    UnshareMounts,
    /// Root remounted private
    MakeRootPrivate,
    /// Resolver bind-mounted
    BindMount {
        /// Mount source
        source: PathBuf,
        /// Mount target
        target: PathBuf,
    },
    /// Image replacement attempted
    Exec {
        /// Program searched on `PATH`
        program: String,
        /// Full argument vector, `argv[0]` included
        argv: Vec<String>,
    },
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<Call>,
    failures: Vec<(Operation, Errno)>,
    exec_errno: Option<Errno>,
}

impl MockState {
    fn failure(&self, operation: Operation) -> Option<Errno> {
        self.failures
            .iter()
            .find(|(op, _)| *op == operation)
            .map(|(_, errno)| *errno)
    }

    fn record(&mut self, call: Call, operation: Operation) -> nix::Result<()> {
        self.calls.push(call);
        self.failure(operation).map_or(Ok(()), Err)
    }
}

/// Mock backend for testing (doesn't touch the process)
///
/// Records every call in order. A real `exec` never returns on success, so
/// the mock returns [`Errno::UnknownErrno`] unless another errno is set with
/// [`fail_exec`](Self::fail_exec).
///
/// # Example
/// ```
/// use proxy_ns_namespace::{Call, MockOps, SystemOps};
/// use std::path::{Path, PathBuf};
///
/// let ops = MockOps::new();
/// let handle = ops.open_namespace(Path::new("/var/run/netns/main")).unwrap();
/// ops.join_network(handle).unwrap();
///
/// assert_eq!(
///     ops.calls(),
///     vec![
///         Call::Open(PathBuf::from("/var/run/netns/main")),
///         Call::JoinNetwork,
///         Call::CloseHandle,
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockOps {
    state: Rc<RefCell<MockState>>,
}

/// Handle produced by [`MockOps`]; records [`Call::CloseHandle`] on drop
#[derive(Debug)]
pub struct MockHandle {
    state: Rc<RefCell<MockState>>,
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.state.borrow_mut().calls.push(Call::CloseHandle);
    }
}

impl MockOps {
    /// Create a mock where every call succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the given step fail with `errno`
    #[must_use]
    pub fn fail(self, operation: Operation, errno: Errno) -> Self {
        self.state.borrow_mut().failures.push((operation, errno));
        self
    }

    /// Errno returned by `exec`
    #[must_use]
    pub fn fail_exec(self, errno: Errno) -> Self {
        self.state.borrow_mut().exec_errno = Some(errno);
        self
    }

    /// Calls made so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }
}

impl SystemOps for MockOps {
    type Handle = MockHandle;

    fn open_namespace(&self, path: &Path) -> nix::Result<MockHandle> {
        self.state
            .borrow_mut()
            .record(Call::Open(path.to_path_buf()), Operation::OpenHandle)?;

        Ok(MockHandle {
            state: Rc::clone(&self.state),
        })
    }

    fn join_network(&self, handle: MockHandle) -> nix::Result<()> {
        let result = self
            .state
            .borrow_mut()
            .record(Call::JoinNetwork, Operation::JoinNetwork);
        drop(handle);
        result
    }

    fn unshare_mounts(&self) -> nix::Result<()> {
        self.state
            .borrow_mut()
            .record(Call::UnshareMounts, Operation::UnshareMounts)
    }

    fn make_root_private(&self) -> nix::Result<()> {
        self.state
            .borrow_mut()
            .record(Call::MakeRootPrivate, Operation::MakeRootPrivate)
    }

    fn bind_mount(&self, source: &Path, target: &Path) -> nix::Result<()> {
        self.state.borrow_mut().record(
            Call::BindMount {
                source: source.to_path_buf(),
                target: target.to_path_buf(),
            },
            Operation::BindResolver,
        )
    }

    fn exec(&self, program: &CStr, argv: &[CString]) -> Errno {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Exec {
            program: program.to_string_lossy().into_owned(),
            argv: argv
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
        });
        state.exec_errno.unwrap_or(Errno::UnknownErrno)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_in_order() {
        let ops = MockOps::new();

        ops.unshare_mounts().unwrap();
        ops.make_root_private().unwrap();
        ops.bind_mount(Path::new("/a"), Path::new("/b")).unwrap();

        assert_eq!(
            ops.calls(),
            vec![
                Call::UnshareMounts,
                Call::MakeRootPrivate,
                Call::BindMount {
                    source: PathBuf::from("/a"),
                    target: PathBuf::from("/b"),
                },
            ]
        );
    }

    #[test]
    fn test_mock_injected_failure() {
        let ops = MockOps::new().fail(Operation::UnshareMounts, Errno::EPERM);

        assert_eq!(ops.unshare_mounts(), Err(Errno::EPERM));
        assert!(ops.make_root_private().is_ok());
    }

    #[test]
    fn test_mock_handle_closed_on_failed_join() {
        let ops = MockOps::new().fail(Operation::JoinNetwork, Errno::EINVAL);

        let handle = ops.open_namespace(Path::new("/x")).unwrap();
        assert_eq!(ops.join_network(handle), Err(Errno::EINVAL));
        assert_eq!(ops.calls().last(), Some(&Call::CloseHandle));
    }

    #[test]
    fn test_linux_open_missing_handle() {
        let dir = tempfile::tempdir().unwrap();
        let err = LinuxOps.open_namespace(&dir.path().join("ghost")).unwrap_err();
        assert_eq!(err, Errno::ENOENT);
    }

    #[test]
    fn test_linux_handle_is_close_on_exec() {
        use std::os::fd::AsRawFd;

        let file = tempfile::NamedTempFile::new().unwrap();
        let handle = LinuxOps.open_namespace(file.path()).unwrap();

        let fdinfo =
            std::fs::read_to_string(format!("/proc/self/fdinfo/{}", handle.as_raw_fd())).unwrap();
        let flags = fdinfo
            .lines()
            .find_map(|line| line.strip_prefix("flags:"))
            .map(|raw| i32::from_str_radix(raw.trim(), 8).unwrap())
            .unwrap();

        assert_ne!(flags & OFlag::O_CLOEXEC.bits(), 0);
        assert_eq!(flags & OFlag::O_ACCMODE.bits(), OFlag::O_RDONLY.bits());
    }

    #[test]
    fn test_linux_join_rejects_non_namespace_fd() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let handle = LinuxOps.open_namespace(file.path()).unwrap();

        // A regular file is never a namespace handle, with or without privilege.
        assert!(LinuxOps.join_network(handle).is_err());
    }
}
