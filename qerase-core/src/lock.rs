use std::fs::OpenOptions;
use std::path::Path;
use std::time::Duration;

/// A process found holding a file open. Only lives for one termination attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: u32,
    pub name: String,
}

/// Finds and stops processes that hold a file open.
pub trait ProcessInspector: Send {
    /// Processes with `path` in their open-file table. Best effort: processes
    /// that cannot be inspected are left out.
    fn list_holders(&self, path: &Path) -> Vec<ProcessHandle>;

    /// Ask `handle` to exit, wait up to `timeout`, then kill it.
    /// Returns whether the process is confirmed gone.
    fn terminate(&self, handle: &ProcessHandle, timeout: Duration) -> bool;
}

/// Inspector for platforms (or configurations) without process introspection.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInspector;

impl ProcessInspector for NoopInspector {
    fn list_holders(&self, _path: &Path) -> Vec<ProcessHandle> {
        Vec::new()
    }
    fn terminate(&self, _handle: &ProcessHandle, _timeout: Duration) -> bool {
        false
    }
}

/// Try to take an exclusive lock on `path`. Any failure, including failing to
/// open the file at all, counts as locked.
pub fn is_locked(path: &Path) -> bool {
    let f = match OpenOptions::new().read(true).write(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "open for lock probe failed");
            return true;
        }
    };
    match fs2::FileExt::try_lock_exclusive(&f) {
        Ok(()) => {
            let _ = fs2::FileExt::unlock(&f);
            false
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "exclusive lock refused");
            true
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    /// Nothing held the file.
    Free,
    /// The file looked locked but no holder could be identified.
    NoHolders,
    /// Every holder was stopped.
    Released(Vec<ProcessHandle>),
    /// These holders are still running.
    Survivors(Vec<ProcessHandle>),
}

pub struct LockResolver {
    inspector: Box<dyn ProcessInspector>,
    timeout: Duration,
}

impl LockResolver {
    pub fn new(inspector: Box<dyn ProcessInspector>, timeout: Duration) -> Self {
        Self { inspector, timeout }
    }

    pub fn is_locked(&self, path: &Path) -> bool {
        is_locked(path)
    }

    pub fn holders_of(&self, path: &Path) -> Vec<ProcessHandle> {
        self.inspector.list_holders(path)
    }

    pub fn terminate(&self, handle: &ProcessHandle) -> bool {
        self.inspector.terminate(handle, self.timeout)
    }

    /// Stop every process holding an already-locked `path`. Never fails: a file
    /// that stays locked will fail its own overwrite later.
    pub fn release(&self, path: &Path) -> LockOutcome {
        let holders = self.holders_of(path);
        if holders.is_empty() {
            tracing::warn!(path = %path.display(), "file is locked but no holding process was found");
            return LockOutcome::NoHolders;
        }
        let mut released = vec![];
        let mut survivors = vec![];
        for h in holders {
            if self.terminate(&h) {
                tracing::info!(pid = h.pid, name = %h.name, path = %path.display(), "terminated holding process");
                released.push(h);
            } else {
                tracing::warn!(pid = h.pid, name = %h.name, path = %path.display(), "could not terminate holding process");
                survivors.push(h);
            }
        }
        if survivors.is_empty() {
            LockOutcome::Released(released)
        } else {
            LockOutcome::Survivors(survivors)
        }
    }

    /// `release` if `path` is locked, otherwise `Free`.
    pub fn resolve(&self, path: &Path) -> LockOutcome {
        if !self.is_locked(path) {
            return LockOutcome::Free;
        }
        self.release(path)
    }
}
