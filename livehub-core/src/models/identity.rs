use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::id::UserId;

/// Longest display name accepted for a guest
pub const GUEST_NAME_MAX_CHARS: usize = 30;

/// Display name used when a guest does not pick one
pub const DEFAULT_GUEST_NAME: &str = "Guest";

/// Platform role carried in the bearer credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Viewer,
    Streamer,
    Moderator,
    Admin,
}

impl UserRole {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Streamer => "streamer",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(Self::Viewer),
            "streamer" => Ok(Self::Streamer),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verified subject attached to a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub role: UserRole,
}

impl Identity {
    #[must_use]
    pub const fn new(user_id: UserId, username: String, role: UserRole) -> Self {
        Self {
            user_id,
            username,
            role,
        }
    }

    /// Synthesize a throwaway guest identity.
    ///
    /// The requested name is trimmed and capped; blank names fall back to "Guest".
    #[must_use]
    pub fn guest(requested_name: Option<&str>) -> Self {
        let username = requested_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(
                || DEFAULT_GUEST_NAME.to_string(),
                |name| name.chars().take(GUEST_NAME_MAX_CHARS).collect(),
            );

        Self {
            user_id: UserId::guest(),
            username,
            role: UserRole::Viewer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_str() {
        for role in [
            UserRole::Viewer,
            UserRole::Streamer,
            UserRole::Moderator,
            UserRole::Admin,
        ] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_guest_name_defaults() {
        assert_eq!(Identity::guest(None).username, "Guest");
        assert_eq!(Identity::guest(Some("   ")).username, "Guest");
        assert_eq!(Identity::guest(Some("  mia ")).username, "mia");
    }

    #[test]
    fn test_guest_name_is_capped() {
        let long = "x".repeat(45);
        let guest = Identity::guest(Some(&long));
        assert_eq!(guest.username.chars().count(), GUEST_NAME_MAX_CHARS);
        assert!(guest.user_id.is_guest());
    }
}
