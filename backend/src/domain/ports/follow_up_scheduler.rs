//! Port for deferred follow-up prompts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{FollowUpKey, FollowUpPrompt};

use super::define_port_error;

define_port_error! {
    /// Errors raised by follow-up scheduler adapters.
    pub enum FollowUpSchedulerError {
        /// Backing store unreachable.
        Connection { message: String } =>
            "follow-up store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "follow-up store query failed: {message}",
    }
}

/// Port for storing prompts the notification subsystem later delivers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FollowUpScheduler: Send + Sync {
    /// Store a prompt. Scheduling the same key twice keeps one prompt.
    async fn schedule(&self, prompt: &FollowUpPrompt) -> Result<(), FollowUpSchedulerError>;

    /// Cancel a pending prompt; `false` when none was pending.
    async fn cancel(&self, key: &FollowUpKey) -> Result<bool, FollowUpSchedulerError>;

    /// Pending prompts scheduled at or before `as_of`, earliest first.
    async fn due(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<FollowUpPrompt>, FollowUpSchedulerError>;
}
