//! Embedded Seatbelt profiles, addressable by name.
//!
//! The set is closed and fixed at build time: every document under
//! `profiles/` is compiled into the binary, so resolving a profile never
//! touches the filesystem.

use super::error::{SandboxError, SandboxResult};

/// Profile used when a request does not name one.
pub const DEFAULT_PROFILE: &str = "default";

/// A named sandbox policy document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub name: &'static str,
    /// SBPL source, passed to `sandbox-exec -f` untouched.
    pub policy: &'static str,
}

static PROFILES: &[Profile] = &[
    Profile {
        name: "default",
        policy: include_str!("../../profiles/default.sb"),
    },
    Profile {
        name: "no-network",
        policy: include_str!("../../profiles/no-network.sb"),
    },
    Profile {
        name: "readonly",
        policy: include_str!("../../profiles/readonly.sb"),
    },
    Profile {
        name: "isolated",
        policy: include_str!("../../profiles/isolated.sb"),
    },
    Profile {
        name: "network",
        policy: include_str!("../../profiles/network.sb"),
    },
];

/// Looks up a profile by exact name.
///
/// Unknown names are an error: there is no fallback to [`DEFAULT_PROFILE`].
pub fn resolve(name: &str) -> SandboxResult<&'static Profile> {
    PROFILES
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| SandboxError::ProfileNotFound(name.to_string()))
}

/// Names of all embedded profiles, in declaration order.
pub fn names() -> impl Iterator<Item = &'static str> {
    PROFILES.iter().map(|p| p.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_names_resolve_to_non_empty_policy() {
        for name in names() {
            let profile = resolve(name).unwrap();
            assert_eq!(profile.name, name);
            assert!(!profile.policy.trim().is_empty(), "{name} is empty");
            assert!(profile.policy.contains("(version 1)"), "{name} has no version");
        }
    }

    #[test]
    fn test_closed_set_of_names() {
        let all: Vec<&str> = names().collect();
        assert_eq!(
            all,
            vec!["default", "no-network", "readonly", "isolated", "network"]
        );
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let a = resolve("readonly").unwrap();
        let b = resolve("readonly").unwrap();
        assert_eq!(a.policy, b.policy);
    }

    #[test]
    fn test_default_profile_is_known() {
        assert!(resolve(DEFAULT_PROFILE).is_ok());
    }

    #[test]
    fn test_unknown_profile_fails() {
        for name in ["nonexistent", "", "Default", "default.sb", "../default", " default"] {
            match resolve(name) {
                Err(SandboxError::ProfileNotFound(n)) => assert_eq!(n, name),
                other => panic!("expected ProfileNotFound for {name:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_profile_not_found_message() {
        let err = resolve("nonexistent").unwrap_err();
        assert_eq!(err.to_string(), "profile 'nonexistent' not found");
    }
}
