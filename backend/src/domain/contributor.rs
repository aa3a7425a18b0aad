//! Contributor profile as seen by the trust engine.
//!
//! Identity data (credentials, contact details) belongs to the account
//! subsystem. The engine only reads the role and creation time and owns the
//! cached `trust_score`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::trust::ContributorActivity;
use crate::domain::{BoundedScore, UserId};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Default role for new accounts.
    #[default]
    Farmer,
    /// Agronomist or plant pathologist.
    Expert,
    /// Government or NGO field officer.
    ExtensionWorker,
    /// Platform administrator.
    Admin,
}

impl UserRole {
    /// Stable storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Farmer => "farmer",
            Self::Expert => "expert",
            Self::ExtensionWorker => "extension_worker",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown user role: {0}")]
pub struct ParseUserRoleError(String);

impl FromStr for UserRole {
    type Err = ParseUserRoleError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "farmer" => Ok(Self::Farmer),
            "expert" => Ok(Self::Expert),
            "extension_worker" => Ok(Self::ExtensionWorker),
            "admin" => Ok(Self::Admin),
            other => Err(ParseUserRoleError(other.to_owned())),
        }
    }
}

/// Validation failures for contributor display names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisplayNameError {
    /// Blank after trimming.
    #[error("display name must not be empty")]
    Empty,
    /// Longer than [`Contributor::DISPLAY_NAME_MAX`] characters.
    #[error("display name must be at most {max} characters")]
    TooLong { max: usize },
}

/// A user with a cached trust score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    #[schema(value_type = String, format = Uuid)]
    pub id: UserId,
    pub display_name: String,
    pub role: UserRole,
    /// Cached value; rebuildable from response flags and received feedback.
    #[schema(value_type = f64, minimum = 0.0, maximum = 100.0)]
    pub trust_score: BoundedScore,
    pub is_verified: bool,
    /// Optimistic concurrency counter for `trust_score` writes.
    pub score_revision: u32,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Contributor {
    /// Upper bound on display name length, in characters.
    pub const DISPLAY_NAME_MAX: usize = 64;

    /// Build a fresh profile at the baseline trust score.
    pub fn register(
        id: UserId,
        display_name: &str,
        role: UserRole,
        now: DateTime<Utc>,
    ) -> Result<Self, DisplayNameError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(DisplayNameError::Empty);
        }
        if display_name.chars().count() > Self::DISPLAY_NAME_MAX {
            return Err(DisplayNameError::TooLong {
                max: Self::DISPLAY_NAME_MAX,
            });
        }
        Ok(Self {
            id,
            display_name: display_name.to_owned(),
            role,
            trust_score: BoundedScore::baseline(),
            is_verified: false,
            score_revision: 0,
            created_at: now,
            last_active_at: now,
        })
    }
}

/// A contributor together with the accepted-response count used as the
/// secondary leaderboard key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContributorStanding {
    #[serde(flatten)]
    pub contributor: Contributor,
    pub accepted_response_count: u32,
}

/// Everything the trust recompute reads for one user.
///
/// `contributor.score_revision` must be read before `activity`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributorLedger {
    pub contributor: Contributor,
    pub activity: ContributorActivity,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(UserRole::Farmer)]
    #[case(UserRole::Expert)]
    #[case(UserRole::ExtensionWorker)]
    #[case(UserRole::Admin)]
    fn role_string_form_parses_back(#[case] role: UserRole) {
        assert_eq!(role.as_str().parse::<UserRole>(), Ok(role));
    }

    #[rstest]
    fn unknown_role_is_rejected() {
        let err = "moderator".parse::<UserRole>().expect_err("unknown role");
        assert_eq!(err.to_string(), "unknown user role: moderator");
    }

    #[rstest]
    fn register_starts_at_baseline() {
        let contributor =
            Contributor::register(UserId::random(), "  Asha  ", UserRole::Farmer, Utc::now())
                .expect("valid profile");
        assert_eq!(contributor.display_name, "Asha");
        assert_eq!(contributor.trust_score, BoundedScore::baseline());
        assert_eq!(contributor.score_revision, 0);
    }

    #[rstest]
    #[case("   ".to_owned(), DisplayNameError::Empty)]
    #[case("x".repeat(65), DisplayNameError::TooLong { max: 64 })]
    fn register_validates_display_name(#[case] name: String, #[case] expected: DisplayNameError) {
        let err = Contributor::register(UserId::random(), &name, UserRole::Expert, Utc::now())
            .expect_err("invalid name");
        assert_eq!(err, expected);
    }
}
