//! Port for suggestion persistence and the usefulness ledger.
//!
//! Adapters store suggestions together with their cached aggregate and expose
//! the feedback history the aggregate is recomputed from. Score writes are
//! guarded by `score_revision` so concurrent recomputes cannot overwrite each
//! other.

use async_trait::async_trait;

use crate::domain::trust::SuggestionScores;
use crate::domain::{RankedSuggestion, Suggestion, SuggestionId, SuggestionLedger};

use super::define_port_error;

define_port_error! {
    /// Errors raised by suggestion repository adapters.
    pub enum SuggestionRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "suggestion repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "suggestion repository query failed: {message}",
        /// The stored revision moved since the ledger was read.
        RevisionMismatch { expected: u32 } =>
            "suggestion score revision changed since {expected} was read",
    }
}

/// Port for suggestion storage.
///
/// # Revision semantics
///
/// - New suggestions are stored at revision 0.
/// - [`SuggestionRepository::store_scores`] succeeds only while the stored
///   revision equals `expected_revision` and bumps it by one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SuggestionRepository: Send + Sync {
    /// Persist a new suggestion.
    async fn insert(&self, suggestion: &Suggestion) -> Result<(), SuggestionRepositoryError>;

    /// Fetch a suggestion by id.
    async fn find_by_id(
        &self,
        id: &SuggestionId,
    ) -> Result<Option<Suggestion>, SuggestionRepositoryError>;

    /// Read the suggestion (revision first) and then its full feedback
    /// history.
    async fn load_ledger(
        &self,
        id: &SuggestionId,
    ) -> Result<Option<SuggestionLedger>, SuggestionRepositoryError>;

    /// Overwrite the cached aggregate when the revision still matches.
    ///
    /// Returns the stored suggestion with its new revision.
    async fn store_scores(
        &self,
        id: &SuggestionId,
        scores: &SuggestionScores,
        expected_revision: u32,
    ) -> Result<Suggestion, SuggestionRepositoryError>;

    /// Every suggestion for an exact disease name, with the author's current
    /// trust score. Order is unspecified.
    async fn list_for_disease(
        &self,
        disease_name: &str,
    ) -> Result<Vec<RankedSuggestion>, SuggestionRepositoryError>;

    /// Ids of every stored suggestion, for bulk rebuilds.
    async fn list_ids(&self) -> Result<Vec<SuggestionId>, SuggestionRepositoryError>;
}
