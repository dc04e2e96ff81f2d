//! Sandboxed command execution on macOS (Seatbelt via `sandbox-exec`).
//!
//! A request flows through the modules in order:
//!
//! 1. [`profiles`]: resolve the profile name to an embedded SBPL document
//! 2. [`staging`]: write it into a private scratch directory
//! 3. [`executor`]: run `sandbox-exec -f <policy> sh -c <command>` with a deadline
//! 4. [`outcome`]: fold the raw result into `{stdout, stderr, exit_code}`
//!
//! [`runner::SandboxRunner`] ties the steps together and guarantees the
//! scratch directory is removed whatever happens to the process.
//!
//! Only unsupported hosts, unknown profiles, invalid timeouts and staging
//! failures are errors ([`error::SandboxError`]). Launch failures, timeouts and
//! signals end up in the [`outcome::ExecutionOutcome`] with a non-zero exit code and
//! a description in `stderr`.

pub mod error;
pub mod executor;
pub mod outcome;
pub mod process_group;
pub mod profiles;
pub mod runner;
pub mod staging;

pub use executor::{Executor, SandboxExec};
pub use profiles::DEFAULT_PROFILE;
pub use runner::{ExecutionRequest, SandboxRunner};
