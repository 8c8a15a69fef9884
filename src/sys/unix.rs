//! Unix implementation: flock, fcntl record locks, kill(0), per-OS
//! executable lookups.
//!
//! Two native lock families are applied to every lock file. `flock()` binds
//! to the open file description and excludes other descriptors on a local
//! filesystem; `fcntl()` record locks are the only kind most network
//! filesystems propagate to other machines. Taking both covers both worlds.
//!
//! Some platforms (notably macOS) implement `flock()` on top of POSIX record
//! locks, and there the second step would conflict with our own first step.
//! Whether the two families are independent is probed once per process on an
//! anonymous temp file and memoized.

use std::fs::File;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::OnceLock;

use super::Liveness;

pub(crate) fn set_native_locks(file: &File) -> io::Result<()> {
    let fd = file.as_raw_fd();
    flock_exclusive(fd)?;
    if fcntl_works_after_flock() {
        fcntl_write_lock(fd)?;
    }
    Ok(())
}

fn flock_exclusive(fd: RawFd) -> io::Result<()> {
    if unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn fcntl_write_lock(fd: RawFd) -> io::Result<()> {
    // Whole-file write lock: l_len = 0 extends to EOF however far it grows.
    let mut lock: libc::flock = unsafe { std::mem::zeroed() };
    lock.l_type = libc::F_WRLCK as libc::c_short;
    lock.l_whence = libc::SEEK_SET as libc::c_short;
    lock.l_start = 0;
    lock.l_len = 0;
    lock.l_pid = unsafe { libc::getpid() };
    if unsafe { libc::fcntl(fd, libc::F_SETLK, &lock) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

static FCNTL_AFTER_FLOCK: OnceLock<bool> = OnceLock::new();

/// Whether fcntl record locks can be taken on a descriptor that already
/// holds a flock. Probed once per process; a probe that cannot even create
/// its temp file reports false, which merely skips the second lock.
fn fcntl_works_after_flock() -> bool {
    *FCNTL_AFTER_FLOCK.get_or_init(|| {
        let Ok(probe) = tempfile::tempfile() else {
            return false;
        };
        let fd = probe.as_raw_fd();
        flock_exclusive(fd).is_ok() && fcntl_write_lock(fd).is_ok()
    })
}

pub(crate) fn process_liveness(pid: u32) -> Liveness {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        // Too large to be a live process id on this platform.
        return Liveness::NotFound;
    };
    // Signal 0 runs the existence and permission checks without delivering
    // anything.
    if unsafe { libc::kill(pid, 0) } == 0 {
        return Liveness::Alive;
    }
    match io::Error::last_os_error().raw_os_error() {
        Some(libc::ESRCH) => Liveness::NotFound,
        Some(libc::EPERM) => Liveness::PermissionDenied,
        // kill(2) documents no other errno for a null signal.
        _ => Liveness::Alive,
    }
}

#[cfg(target_os = "linux")]
pub(crate) fn executable_name(pid: u32) -> Option<String> {
    // Without a mounted procfs the lookup has no data source.
    if !std::path::Path::new("/proc/version").exists() {
        return None;
    }
    let exe = std::fs::read_link(format!("/proc/{pid}/exe")).ok()?;
    base_name(&exe)
}

#[cfg(target_os = "macos")]
pub(crate) fn executable_name(pid: u32) -> Option<String> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let pid = libc::pid_t::try_from(pid).ok()?;
    let mut buf = [0u8; libc::PROC_PIDPATHINFO_MAXSIZE as usize];
    let len = unsafe { libc::proc_pidpath(pid, buf.as_mut_ptr().cast(), buf.len() as u32) };
    if len <= 0 {
        return None;
    }
    let path = std::path::Path::new(OsStr::from_bytes(&buf[..len as usize]));
    base_name(path)
}

#[cfg(target_os = "freebsd")]
pub(crate) fn executable_name(pid: u32) -> Option<String> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let pid = libc::pid_t::try_from(pid).ok()?;
    let mib = [
        libc::CTL_KERN,
        libc::KERN_PROC,
        libc::KERN_PROC_PATHNAME,
        pid,
    ];
    let mut buf = [0u8; libc::PATH_MAX as usize];
    let mut len = buf.len();
    let rc = unsafe {
        libc::sysctl(
            mib.as_ptr(),
            mib.len() as libc::c_uint,
            buf.as_mut_ptr().cast(),
            &mut len,
            std::ptr::null(),
            0,
        )
    };
    if rc != 0 {
        return None;
    }
    // The reported length counts the terminating NUL.
    let end = buf[..len].iter().position(|b| *b == 0).unwrap_or(len);
    base_name(std::path::Path::new(OsStr::from_bytes(&buf[..end])))
}

#[cfg(all(
    unix,
    not(any(target_os = "linux", target_os = "macos", target_os = "freebsd"))
))]
pub(crate) fn executable_name(_pid: u32) -> Option<String> {
    // No portable lookup here; staleness falls back to liveness and age.
    None
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "freebsd"))]
fn base_name(path: &std::path::Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::process::Command;

    #[test]
    fn test_native_locks_conflict_across_descriptors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("native.lock");

        let first = File::create(&path).unwrap();
        set_native_locks(&first).unwrap();

        // A second descriptor to the same file must be kept out while the
        // first holds the locks, and get in once it lets go.
        let second = OpenOptions::new().write(true).open(&path).unwrap();
        assert!(set_native_locks(&second).is_err());

        drop(first);
        assert!(set_native_locks(&second).is_ok());
    }

    #[test]
    fn test_fcntl_probe_is_stable() {
        let first = fcntl_works_after_flock();
        let second = fcntl_works_after_flock();
        assert_eq!(first, second);
    }

    #[test]
    fn test_liveness_of_current_process() {
        assert_eq!(process_liveness(std::process::id()), Liveness::Alive);
    }

    #[test]
    fn test_liveness_of_reaped_child() {
        let mut child = Command::new("true").spawn().expect("spawn true");
        let pid = child.id();
        child.wait().expect("wait for child");
        assert_eq!(process_liveness(pid), Liveness::NotFound);
    }

    #[test]
    fn test_liveness_of_init_is_never_not_found() {
        // Root may signal pid 1 and everyone else gets EPERM; neither
        // outcome means the process is gone.
        assert_ne!(process_liveness(1), Liveness::NotFound);
    }

    #[test]
    fn test_liveness_of_impossible_pid() {
        assert_eq!(process_liveness(u32::MAX), Liveness::NotFound);
    }

    #[cfg(any(target_os = "linux", target_os = "macos", target_os = "freebsd"))]
    #[test]
    fn test_executable_name_of_current_process() {
        let expected = std::env::current_exe()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert_eq!(executable_name(std::process::id()), Some(expected));
    }

    #[test]
    fn test_executable_name_of_dead_process() {
        let mut child = Command::new("true").spawn().expect("spawn true");
        let pid = child.id();
        child.wait().expect("wait for child");
        assert_eq!(executable_name(pid), None);
    }
}
