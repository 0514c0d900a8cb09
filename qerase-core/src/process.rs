use crate::lock::{ProcessHandle, ProcessInspector};
use std::path::Path;
use std::time::Duration;

/// Platform process inspector.
///
/// Linux reads `/proc/<pid>/fd`; Windows asks the Restart Manager; other
/// platforms find no holders. The current process is never reported.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInspector;

impl ProcessInspector for SystemInspector {
    fn list_holders(&self, path: &Path) -> Vec<ProcessHandle> {
        sys::list_holders(path)
    }

    fn terminate(&self, handle: &ProcessHandle, timeout: Duration) -> bool {
        if handle.pid == std::process::id() {
            return false;
        }
        sys::terminate(handle.pid, timeout)
    }
}

#[cfg(unix)]
mod sys {
    use crate::lock::ProcessHandle;
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    use std::path::Path;
    use std::time::{Duration, Instant};

    const POLL: Duration = Duration::from_millis(50);

    #[cfg(target_os = "linux")]
    pub fn list_holders(path: &Path) -> Vec<ProcessHandle> {
        use std::fs;

        let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let target = target.to_string_lossy().to_lowercase();
        let me = std::process::id();

        let Ok(procs) = fs::read_dir("/proc") else {
            return Vec::new();
        };
        let mut out = vec![];
        for ent in procs.flatten() {
            let Some(pid) = ent.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };
            if pid == me {
                continue;
            }
            // Permission denied or the process already exited.
            let Ok(fds) = fs::read_dir(ent.path().join("fd")) else {
                continue;
            };
            let holds = fds.flatten().any(|fd| {
                fs::read_link(fd.path())
                    .map(|l| l.to_string_lossy().to_lowercase() == target)
                    .unwrap_or(false)
            });
            if holds {
                let name = fs::read_to_string(ent.path().join("comm"))
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default();
                out.push(ProcessHandle { pid, name });
            }
        }
        out
    }

    #[cfg(not(target_os = "linux"))]
    pub fn list_holders(_path: &Path) -> Vec<ProcessHandle> {
        Vec::new()
    }

    pub fn terminate(pid: u32, timeout: Duration) -> bool {
        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        let pid = Pid::from_raw(raw);
        if is_gone(pid) {
            return true;
        }
        if let Err(e) = kill(pid, Signal::SIGTERM) {
            tracing::debug!(pid = raw, error = %e, "SIGTERM failed");
        }
        if wait_gone(pid, timeout) {
            return true;
        }
        tracing::warn!(pid = raw, "still running after SIGTERM, sending SIGKILL");
        if let Err(e) = kill(pid, Signal::SIGKILL) {
            tracing::debug!(pid = raw, error = %e, "SIGKILL failed");
        }
        wait_gone(pid, Duration::from_millis(500))
    }

    fn wait_gone(pid: Pid, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            if is_gone(pid) {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            std::thread::sleep(POLL);
        }
    }

    fn is_gone(pid: Pid) -> bool {
        match kill(pid, None) {
            Err(Errno::ESRCH) => true,
            _ => is_zombie(pid),
        }
    }

    // An exited but unreaped child still answers signal 0.
    #[cfg(target_os = "linux")]
    fn is_zombie(pid: Pid) -> bool {
        let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
            return true;
        };
        stat.rsplit_once(')')
            .and_then(|(_, rest)| rest.trim_start().chars().next())
            .map(|state| state == 'Z' || state == 'X')
            .unwrap_or(false)
    }

    #[cfg(not(target_os = "linux"))]
    fn is_zombie(_pid: Pid) -> bool {
        false
    }
}

#[cfg(windows)]
mod sys {
    use crate::lock::ProcessHandle;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use std::ptr;
    use std::time::Duration;
    use winapi::shared::minwindef::{DWORD, FALSE, UINT};
    use winapi::shared::winerror::{ERROR_MORE_DATA, ERROR_SUCCESS};
    use winapi::um::handleapi::CloseHandle;
    use winapi::um::processthreadsapi::{OpenProcess, TerminateProcess};
    use winapi::um::restartmanager::{
        RmEndSession, RmGetList, RmRegisterResources, RmStartSession, RM_PROCESS_INFO,
    };
    use winapi::um::synchapi::WaitForSingleObject;
    use winapi::um::winbase::WAIT_OBJECT_0;
    use winapi::um::winnt::{PROCESS_TERMINATE, SYNCHRONIZE};

    pub fn list_holders(path: &Path) -> Vec<ProcessHandle> {
        let me = std::process::id();
        let wide: Vec<u16> = path.as_os_str().encode_wide().chain(std::iter::once(0)).collect();
        let mut out = vec![];
        unsafe {
            let mut session: DWORD = 0;
            let mut key = [0u16; 64];
            if RmStartSession(&mut session, 0, key.as_mut_ptr()) != ERROR_SUCCESS {
                return out;
            }
            let mut files = [wide.as_ptr()];
            let rc = RmRegisterResources(
                session,
                1,
                files.as_mut_ptr(),
                0,
                ptr::null_mut(),
                0,
                ptr::null_mut(),
            );
            if rc == ERROR_SUCCESS {
                let mut needed: UINT = 0;
                let mut count: UINT = 0;
                let mut reasons: DWORD = 0;
                let rc = RmGetList(session, &mut needed, &mut count, ptr::null_mut(), &mut reasons);
                if rc == ERROR_MORE_DATA && needed > 0 {
                    let mut infos: Vec<RM_PROCESS_INFO> =
                        (0..needed).map(|_| std::mem::zeroed()).collect();
                    count = needed;
                    let rc = RmGetList(
                        session,
                        &mut needed,
                        &mut count,
                        infos.as_mut_ptr(),
                        &mut reasons,
                    );
                    if rc == ERROR_SUCCESS {
                        for info in &infos[..count as usize] {
                            let pid = info.Process.dwProcessId;
                            if pid == me {
                                continue;
                            }
                            let raw = &info.strAppName;
                            let end = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
                            out.push(ProcessHandle { pid, name: String::from_utf16_lossy(&raw[..end]) });
                        }
                    }
                }
            }
            RmEndSession(session);
        }
        out
    }

    // Windows has no graceful request for arbitrary processes; the wait is
    // what the timeout bounds.
    pub fn terminate(pid: u32, timeout: Duration) -> bool {
        unsafe {
            let handle = OpenProcess(PROCESS_TERMINATE | SYNCHRONIZE, FALSE, pid);
            if handle.is_null() {
                return false;
            }
            let ms = timeout.as_millis().min(u32::MAX as u128) as u32;
            let stopped = TerminateProcess(handle, 1) != 0
                && WaitForSingleObject(handle, ms) == WAIT_OBJECT_0;
            CloseHandle(handle);
            stopped
        }
    }
}

#[cfg(not(any(unix, windows)))]
mod sys {
    use crate::lock::ProcessHandle;
    use std::path::Path;
    use std::time::Duration;

    pub fn list_holders(_path: &Path) -> Vec<ProcessHandle> {
        Vec::new()
    }

    pub fn terminate(_pid: u32, _timeout: Duration) -> bool {
        false
    }
}
