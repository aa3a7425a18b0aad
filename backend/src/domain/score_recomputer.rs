//! Optimistic read-compute-write cycle for cached scores.
//!
//! Each cycle reads an entity's revision and history, folds the history with
//! the pure functions in [`crate::domain::trust`], and writes the result only
//! if the revision is unchanged. A concurrent writer makes the write fail
//! with a revision mismatch; the whole cycle then reruns after a jittered
//! backoff, up to [`RetryPolicy::max_attempts`] times.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{info, warn};

use crate::domain::ports::{
    ContributorRepository, ContributorRepositoryError, SuggestionRepository,
    SuggestionRepositoryError,
};
use crate::domain::trust::{self, SuggestionScores};
use crate::domain::{
    BoundedScore, Contributor, ScoredEntity, Suggestion, SuggestionId, TrustEngineError, UserId,
};

/// Async sleep used between retries.
#[async_trait]
pub trait RetrySleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl RetrySleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Spreads retry delays so colliding writers do not retry in lockstep.
pub trait BackoffJitter: Send + Sync {
    /// Return a delay in `base..=base * 1.5`.
    fn jittered_delay(&self, base: Duration) -> Duration;
}

/// Uniform random jitter from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl BackoffJitter for RandomJitter {
    fn jittered_delay(&self, base: Duration) -> Duration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let max_extra = (base_ms / 2).max(1);
        let extra = rand::thread_rng().gen_range(0..=max_extra);
        Duration::from_millis(base_ms.saturating_add(extra))
    }
}

/// Invalid retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("retry attempts must be between 1 and {max}, got {attempts}")]
pub struct RetryPolicyError {
    pub attempts: u32,
    pub max: u32,
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 5;
    pub const MAX_ATTEMPTS: u32 = 20;
    const BASE_DELAY: Duration = Duration::from_millis(10);
    const MAX_DELAY: Duration = Duration::from_millis(500);

    /// Validate the attempt budget.
    pub fn new(max_attempts: u32) -> Result<Self, RetryPolicyError> {
        if max_attempts == 0 || max_attempts > Self::MAX_ATTEMPTS {
            return Err(RetryPolicyError {
                attempts: max_attempts,
                max: Self::MAX_ATTEMPTS,
            });
        }
        Ok(Self {
            max_attempts,
            base_delay: Self::BASE_DELAY,
            max_delay: Self::MAX_DELAY,
        })
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Un-jittered delay after the `attempt`-th failure (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_ATTEMPTS,
            base_delay: Self::BASE_DELAY,
            max_delay: Self::MAX_DELAY,
        }
    }
}

/// Sleep and jitter strategies used between retries.
#[derive(Clone)]
pub struct RetryRuntime {
    pub sleeper: Arc<dyn RetrySleeper>,
    pub jitter: Arc<dyn BackoffJitter>,
}

impl Default for RetryRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(RandomJitter),
        }
    }
}

/// A suggestion after its aggregate was brought in line with history.
#[derive(Debug, Clone, PartialEq)]
pub struct RecomputedSuggestion {
    pub previous: SuggestionScores,
    pub suggestion: Suggestion,
}

/// A contributor after its trust score was brought in line with history.
#[derive(Debug, Clone, PartialEq)]
pub struct RecomputedContributor {
    pub previous: BoundedScore,
    pub contributor: Contributor,
}

enum WriteOutcome<T> {
    Stored(T),
    Stale,
}

/// Shared recompute step for suggestions and contributors.
#[derive(Clone)]
pub struct ScoreRecomputer {
    suggestions: Arc<dyn SuggestionRepository>,
    contributors: Arc<dyn ContributorRepository>,
    policy: RetryPolicy,
    runtime: RetryRuntime,
}

impl ScoreRecomputer {
    pub fn new(
        suggestions: Arc<dyn SuggestionRepository>,
        contributors: Arc<dyn ContributorRepository>,
        policy: RetryPolicy,
        runtime: RetryRuntime,
    ) -> Self {
        Self {
            suggestions,
            contributors,
            policy,
            runtime,
        }
    }

    async fn back_off(&self, entity: ScoredEntity, id: impl std::fmt::Display, attempt: u32) {
        let delay = self.runtime.jitter.jittered_delay(self.policy.delay_for(attempt));
        warn!(
            entity = entity.as_str(),
            %id,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "score revision changed during recompute; retrying"
        );
        self.runtime.sleeper.sleep(delay).await;
    }

    /// Bring a suggestion's cached aggregate in line with its feedback.
    pub async fn recompute_suggestion(
        &self,
        id: &SuggestionId,
    ) -> Result<RecomputedSuggestion, TrustEngineError> {
        for attempt in 1..=self.policy.max_attempts() {
            let ledger = self
                .suggestions
                .load_ledger(id)
                .await?
                .ok_or(TrustEngineError::SuggestionNotFound { suggestion_id: *id })?;
            let previous = ledger.suggestion.cached_scores();
            let rebuilt = trust::suggestion_scores(&ledger.samples);
            if rebuilt == previous {
                return Ok(RecomputedSuggestion {
                    previous,
                    suggestion: ledger.suggestion,
                });
            }

            match self
                .store_suggestion(id, &rebuilt, ledger.suggestion.score_revision)
                .await?
            {
                WriteOutcome::Stored(suggestion) => {
                    info!(
                        suggestion_id = %id,
                        usefulness = suggestion.usefulness_score.value(),
                        previous = previous.usefulness_score.value(),
                        revision = suggestion.score_revision,
                        "usefulness score updated"
                    );
                    return Ok(RecomputedSuggestion {
                        previous,
                        suggestion,
                    });
                }
                WriteOutcome::Stale if attempt < self.policy.max_attempts() => {
                    self.back_off(ScoredEntity::Suggestion, id, attempt).await;
                }
                WriteOutcome::Stale => {}
            }
        }
        Err(TrustEngineError::ConcurrentUpdateConflict {
            entity: ScoredEntity::Suggestion,
            id: *id.as_uuid(),
            attempts: self.policy.max_attempts(),
        })
    }

    async fn store_suggestion(
        &self,
        id: &SuggestionId,
        scores: &SuggestionScores,
        expected_revision: u32,
    ) -> Result<WriteOutcome<Suggestion>, TrustEngineError> {
        match self
            .suggestions
            .store_scores(id, scores, expected_revision)
            .await
        {
            Ok(suggestion) => Ok(WriteOutcome::Stored(suggestion)),
            Err(SuggestionRepositoryError::RevisionMismatch { .. }) => Ok(WriteOutcome::Stale),
            Err(err) => Err(err.into()),
        }
    }

    /// Bring a contributor's cached trust score in line with current
    /// response flags and received feedback.
    pub async fn recompute_contributor(
        &self,
        id: &UserId,
    ) -> Result<RecomputedContributor, TrustEngineError> {
        for attempt in 1..=self.policy.max_attempts() {
            let ledger = self
                .contributors
                .load_ledger(id)
                .await?
                .ok_or(TrustEngineError::UserNotFound { user_id: *id })?;
            let previous = ledger.contributor.trust_score;
            let rebuilt = trust::trust_score(&ledger.activity);
            if rebuilt == previous {
                return Ok(RecomputedContributor {
                    previous,
                    contributor: ledger.contributor,
                });
            }

            match self
                .store_contributor(id, rebuilt, ledger.contributor.score_revision)
                .await?
            {
                WriteOutcome::Stored(contributor) => {
                    info!(
                        user_id = %id,
                        trust = contributor.trust_score.value(),
                        previous = previous.value(),
                        revision = contributor.score_revision,
                        "trust score updated"
                    );
                    return Ok(RecomputedContributor {
                        previous,
                        contributor,
                    });
                }
                WriteOutcome::Stale if attempt < self.policy.max_attempts() => {
                    self.back_off(ScoredEntity::Contributor, id, attempt).await;
                }
                WriteOutcome::Stale => {}
            }
        }
        Err(TrustEngineError::ConcurrentUpdateConflict {
            entity: ScoredEntity::Contributor,
            id: *id.as_uuid(),
            attempts: self.policy.max_attempts(),
        })
    }

    async fn store_contributor(
        &self,
        id: &UserId,
        trust_score: BoundedScore,
        expected_revision: u32,
    ) -> Result<WriteOutcome<Contributor>, TrustEngineError> {
        match self
            .contributors
            .store_trust_score(id, trust_score, expected_revision)
            .await
        {
            Ok(contributor) => Ok(WriteOutcome::Stored(contributor)),
            Err(ContributorRepositoryError::RevisionMismatch { .. }) => Ok(WriteOutcome::Stale),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
#[path = "score_recomputer_tests.rs"]
mod tests;
