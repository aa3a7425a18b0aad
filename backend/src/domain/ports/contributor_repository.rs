//! Port for contributor profiles and the trust ledger.

use async_trait::async_trait;

use crate::domain::{
    BoundedScore, Contributor, ContributorLedger, ContributorStanding, UserId, UserRole,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by contributor repository adapters.
    pub enum ContributorRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "contributor repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "contributor repository query failed: {message}",
        /// The stored revision moved since the ledger was read.
        RevisionMismatch { expected: u32 } =>
            "trust score revision changed since {expected} was read",
    }
}

/// Port for contributor storage.
///
/// `trust_score` writes follow the same revision contract as
/// [`super::SuggestionRepository::store_scores`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContributorRepository: Send + Sync {
    /// Persist a new profile.
    async fn insert(&self, contributor: &Contributor) -> Result<(), ContributorRepositoryError>;

    /// Fetch a profile by id.
    async fn find_by_id(
        &self,
        id: &UserId,
    ) -> Result<Option<Contributor>, ContributorRepositoryError>;

    /// Read the profile (revision first), then the accepted and verified
    /// response counts and every rating received as a suggestion author.
    async fn load_ledger(
        &self,
        id: &UserId,
    ) -> Result<Option<ContributorLedger>, ContributorRepositoryError>;

    /// Overwrite the cached trust score when the revision still matches.
    async fn store_trust_score(
        &self,
        id: &UserId,
        trust_score: BoundedScore,
        expected_revision: u32,
    ) -> Result<Contributor, ContributorRepositoryError>;

    /// Every contributor with `role`, with accepted-response counts. Order is
    /// unspecified.
    async fn list_standings(
        &self,
        role: UserRole,
    ) -> Result<Vec<ContributorStanding>, ContributorRepositoryError>;

    /// Ids of every stored contributor, for bulk rebuilds.
    async fn list_ids(&self) -> Result<Vec<UserId>, ContributorRepositoryError>;
}
