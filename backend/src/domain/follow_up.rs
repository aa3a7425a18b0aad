//! Deferred "did the advice work?" prompts.
//!
//! After a user rates a suggestion they tried, the notification subsystem
//! asks them again some days later. The engine only decides *when* and
//! *for what*; delivery belongs elsewhere.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{SuggestionId, UserId};

/// Identity of a scheduled prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpKey {
    #[schema(value_type = String, format = Uuid)]
    pub user_id: UserId,
    #[schema(value_type = String, format = Uuid)]
    pub suggestion_id: SuggestionId,
    pub scheduled_for: DateTime<Utc>,
}

/// A stored prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpPrompt {
    #[serde(flatten)]
    pub key: FollowUpKey,
    /// Scan the original feedback referred to.
    pub context_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Delay configuration rejected by [`FollowUpPolicy::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("follow-up delay must be between {min} and {max} days, got {days}")]
pub struct FollowUpDelayError {
    pub days: u32,
    pub min: u32,
    pub max: u32,
}

/// When to ask for follow-up feedback.
///
/// # Examples
/// ```
/// use krishilok::domain::FollowUpPolicy;
///
/// assert_eq!(FollowUpPolicy::default().delay_days(), 12);
/// assert!(FollowUpPolicy::new(9).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowUpPolicy {
    delay_days: u32,
}

impl FollowUpPolicy {
    pub const MIN_DAYS: u32 = 10;
    pub const MAX_DAYS: u32 = 15;
    pub const DEFAULT_DAYS: u32 = 12;

    /// Validate a delay in whole days.
    pub fn new(delay_days: u32) -> Result<Self, FollowUpDelayError> {
        if (Self::MIN_DAYS..=Self::MAX_DAYS).contains(&delay_days) {
            Ok(Self { delay_days })
        } else {
            Err(FollowUpDelayError {
                days: delay_days,
                min: Self::MIN_DAYS,
                max: Self::MAX_DAYS,
            })
        }
    }

    #[must_use]
    pub const fn delay_days(self) -> u32 {
        self.delay_days
    }

    /// Build the prompt for feedback recorded at `now`.
    #[must_use]
    pub fn prompt_for(
        self,
        user_id: UserId,
        suggestion_id: SuggestionId,
        context_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> FollowUpPrompt {
        FollowUpPrompt {
            key: FollowUpKey {
                user_id,
                suggestion_id,
                scheduled_for: now + TimeDelta::days(i64::from(self.delay_days)),
            },
            context_id,
            created_at: now,
        }
    }
}

impl Default for FollowUpPolicy {
    fn default() -> Self {
        Self {
            delay_days: Self::DEFAULT_DAYS,
        }
    }
}
