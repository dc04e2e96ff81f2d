//! Process-group cleanup for sandboxed commands.
//!
//! Each command is spawned as the leader of its own process group, so a
//! timeout or cancellation can take down the shell together with anything
//! it started in the background.

use std::io;

use tracing::debug;

/// Sends SIGKILL to the process group led by `pgid` (best-effort).
///
/// A group that no longer exists is not an error.
#[cfg(unix)]
pub fn kill_process_group(pgid: u32) -> io::Result<()> {
    // killpg(0) would signal our own group.
    if pgid <= 1 {
        return Ok(());
    }
    let result = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
    if result == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}

/// No-op on non-Unix platforms.
#[cfg(not(unix))]
pub fn kill_process_group(_pgid: u32) -> io::Result<()> {
    Ok(())
}

/// Kills the process group on drop unless disarmed.
///
/// Held across the wait so that dropping the owning future (caller
/// cancellation) still tears down the whole group.
#[derive(Debug)]
pub struct GroupGuard {
    pgid: Option<u32>,
}

impl GroupGuard {
    pub fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    /// Kills the group now and disarms the guard.
    pub fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            if let Err(e) = kill_process_group(pgid) {
                debug!("killpg({pgid}) failed: {e}");
            }
        }
    }

    /// Leaves the group alone on drop.
    pub fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_kill_missing_group_is_ok() {
        // Above any configurable pid_max.
        assert!(kill_process_group(2_147_483_000).is_ok());
    }

    #[test]
    fn test_kill_own_group_is_refused() {
        assert!(kill_process_group(0).is_ok());
    }

    #[test]
    fn test_disarmed_guard_does_nothing() {
        let mut guard = GroupGuard::new(Some(2_147_483_001));
        guard.disarm();
        assert!(guard.pgid.is_none());
    }

    #[tokio::test]
    async fn test_guard_drop_kills_group() {
        let mut child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg("sleep 30")
            .process_group(0)
            .spawn()
            .unwrap();
        let pid = child.id().unwrap();

        drop(GroupGuard::new(Some(pid)));

        let status = tokio::time::timeout(std::time::Duration::from_secs(5), child.wait())
            .await
            .expect("child should die with its group")
            .unwrap();
        assert!(!status.success());
    }
}
