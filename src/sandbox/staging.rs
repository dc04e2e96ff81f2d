//! Staging of profiles into per-execution scratch directories.
//!
//! `sandbox-exec -f` reads its policy from a path, so each execution writes
//! its profile into a freshly created directory with an unpredictable name.
//! The directory is owned by the [`StagedPolicy`] value and is removed when
//! that value is released or dropped, whichever comes first.

use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};
use tracing::{debug, warn};

use super::error::{SandboxError, SandboxResult};
use super::profiles::Profile;

const SCRATCH_PREFIX: &str = "sandbox-profiles-";

/// A profile written to disk for the lifetime of one execution.
#[derive(Debug)]
pub struct StagedPolicy {
    // Dropping the TempDir removes the whole tree.
    dir: TempDir,
    path: PathBuf,
}

impl StagedPolicy {
    /// Creates a scratch directory under `root` (the system temp dir when
    /// `None`) and writes the profile to `<name>.sb` inside it.
    ///
    /// If the write fails the directory is removed before returning.
    pub fn stage(profile: &Profile, root: Option<&Path>) -> SandboxResult<Self> {
        let mut builder = Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(SandboxError::StagingFailure)?;

        let path = dir.path().join(format!("{}.sb", profile.name));
        std::fs::write(&path, profile.policy).map_err(SandboxError::StagingFailure)?;

        Ok(Self { dir, path })
    }

    /// Path of the staged policy file, as handed to `sandbox-exec -f`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The scratch directory holding the policy file.
    pub fn scratch_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Removes the scratch directory, logging instead of failing.
    pub fn release(self) {
        let dir = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Released scratch dir {}", dir.display()),
            Err(e) => warn!("Failed to remove scratch dir {}: {e}", dir.display()),
        }
    }
}
