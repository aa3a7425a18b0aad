//! Domain ports for the hexagonal boundary.
//!
//! Driven ports (`*Repository`, [`FollowUpScheduler`]) are implemented by
//! outbound adapters. Driving ports ([`TrustCommand`], [`TrustQuery`],
//! [`CommunityCommand`]) are implemented by domain services and called by
//! inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod community_command;
mod community_repository;
mod contributor_repository;
mod feedback_repository;
mod follow_up_scheduler;
mod suggestion_repository;
mod trust_command;
mod trust_query;

#[cfg(test)]
pub use community_command::MockCommunityCommand;
pub use community_command::{
    AcceptedResponse, AddResponseRequest, CommunityCommand, CreatePostRequest, PostDetail,
    ReconciliationSummary, RecordVerificationRequest,
};
#[cfg(test)]
pub use community_repository::MockCommunityRepository;
pub use community_repository::{
    AcceptanceChange, CommunityRepository, CommunityRepositoryError, ResponseRemoval,
};
#[cfg(test)]
pub use contributor_repository::MockContributorRepository;
pub use contributor_repository::{ContributorRepository, ContributorRepositoryError};
#[cfg(test)]
pub use feedback_repository::MockFeedbackRepository;
pub use feedback_repository::{FeedbackRepository, FeedbackRepositoryError};
#[cfg(test)]
pub use follow_up_scheduler::MockFollowUpScheduler;
pub use follow_up_scheduler::{FollowUpScheduler, FollowUpSchedulerError};
#[cfg(test)]
pub use suggestion_repository::MockSuggestionRepository;
pub use suggestion_repository::{SuggestionRepository, SuggestionRepositoryError};
#[cfg(test)]
pub use trust_command::MockTrustCommand;
pub use trust_command::{
    ContributorRebuild, RebuildSummary, RecordFeedbackRequest, RegisterContributorRequest,
    SubmitSuggestionRequest, SuggestionRebuild, TrustCommand, UpdatedScores,
};
#[cfg(test)]
pub use trust_query::MockTrustQuery;
pub use trust_query::TrustQuery;
