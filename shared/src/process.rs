use std::{
    fmt, io,
    panic::{self, AssertUnwindSafe},
};

use libc::{c_int, pid_t};

use crate::{CheckOk, StoreError};

/// Exit code of a child whose body panicked.
pub const PANIC_EXIT_CODE: i32 = 101;

/// A forked child process that has not been reaped yet.
#[derive(Debug)]
pub struct Child {
    pid: pid_t,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    Exited(i32),
    Signaled(i32),
}

impl ExitStatus {
    pub fn success(self) -> bool {
        self == ExitStatus::Exited(0)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit code {code}"),
            ExitStatus::Signaled(signal) => write!(f, "signal {signal}"),
        }
    }
}

/// Forks the current process and runs `body` in the child.
///
/// The child exits with `body`'s return value through `_exit`: it never
/// returns into the caller's frames, so destructors living there only run in
/// the parent, and std buffers are not flushed on the way out. The child
/// inherits every `MAP_SHARED` mapping of the parent.
///
/// Forking while other threads run is only sound if `body` sticks to
/// async-signal-safe work (semaphores, atomics, plain memory).
pub fn spawn(body: impl FnOnce() -> i32) -> Result<Child, StoreError> {
    match unsafe { libc::fork() } {
        -1 => Err(StoreError::Spawn(io::Error::last_os_error())),
        0 => {
            let code = panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or(PANIC_EXIT_CODE);
            unsafe { libc::_exit(code) }
        }
        pid => Ok(Child { pid }),
    }
}

impl Child {
    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// Blocks until the child terminates.
    pub fn wait(self) -> Result<ExitStatus, StoreError> {
        let mut status: c_int = 0;
        let reaped = loop {
            if unsafe { libc::waitpid(self.pid, &raw mut status, 0) } != -1 {
                break Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                break Err(err);
            }
        };
        reaped.r("waitpid")?;

        if libc::WIFEXITED(status) {
            Ok(ExitStatus::Exited(libc::WEXITSTATUS(status)))
        } else {
            Ok(ExitStatus::Signaled(libc::WTERMSIG(status)))
        }
    }
}

/// Waits for every child, even when waiting on one of them fails.
pub fn wait_all(children: Vec<Child>) -> Vec<(i32, Result<ExitStatus, StoreError>)> {
    children
        .into_iter()
        .map(|child| (child.pid(), child.wait()))
        .collect()
}
