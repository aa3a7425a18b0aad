//! Builders wiring driven adapters into the trust engine services.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use krishilok::domain::ports::{
    CommunityRepository, ContributorRepository, FeedbackRepository, FollowUpScheduler,
    SuggestionRepository,
};
use krishilok::domain::{
    CommunityPorts, CommunityService, RetryRuntime, ScoreRecomputer, TrustEnginePorts,
    TrustEngineService,
};
use krishilok::inbound::http::health::StorageBackend;
use krishilok::inbound::http::state::HttpState;
use krishilok::outbound::memory::InMemoryTrustStore;
use krishilok::outbound::persistence::{
    DbPool, DieselCommunityRepository, DieselContributorRepository, DieselFeedbackRepository,
    DieselFollowUpScheduler, DieselSuggestionRepository,
};

use super::ServerConfig;

/// Driven ports shared by both services.
struct DrivenPorts {
    suggestions: Arc<dyn SuggestionRepository>,
    feedback: Arc<dyn FeedbackRepository>,
    contributors: Arc<dyn ContributorRepository>,
    community: Arc<dyn CommunityRepository>,
    follow_ups: Arc<dyn FollowUpScheduler>,
}

impl DrivenPorts {
    fn diesel(pool: &DbPool) -> Self {
        Self {
            suggestions: Arc::new(DieselSuggestionRepository::new(pool.clone())),
            feedback: Arc::new(DieselFeedbackRepository::new(pool.clone())),
            contributors: Arc::new(DieselContributorRepository::new(pool.clone())),
            community: Arc::new(DieselCommunityRepository::new(pool.clone())),
            follow_ups: Arc::new(DieselFollowUpScheduler::new(pool.clone())),
        }
    }

    fn memory() -> Self {
        let store = Arc::new(InMemoryTrustStore::new());
        Self {
            suggestions: store.clone(),
            feedback: store.clone(),
            contributors: store.clone(),
            community: store.clone(),
            follow_ups: store,
        }
    }
}

/// Which backend [`build_http_state`] will wire for `config`.
pub(crate) fn storage_backend(config: &ServerConfig) -> StorageBackend {
    if config.db_pool.is_some() {
        StorageBackend::Postgres
    } else {
        StorageBackend::Memory
    }
}

/// Build the HTTP state over Diesel adapters when a pool is configured,
/// otherwise over a fresh in-memory store.
pub(crate) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    let ports = match &config.db_pool {
        Some(pool) => DrivenPorts::diesel(pool),
        None => DrivenPorts::memory(),
    };
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let recomputer = ScoreRecomputer::new(
        ports.suggestions.clone(),
        ports.contributors.clone(),
        config.retry_policy,
        RetryRuntime::default(),
    );

    let trust = Arc::new(TrustEngineService::new(
        TrustEnginePorts {
            suggestions: ports.suggestions,
            feedback: ports.feedback,
            contributors: ports.contributors.clone(),
            community: ports.community.clone(),
            follow_ups: ports.follow_ups,
        },
        recomputer.clone(),
        config.follow_up_policy,
        clock.clone(),
    ));
    let community = Arc::new(CommunityService::new(
        CommunityPorts {
            community: ports.community,
            contributors: ports.contributors,
        },
        recomputer,
        clock,
    ));

    web::Data::new(HttpState::new(trust.clone(), trust, community))
}
