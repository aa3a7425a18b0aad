//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only depend
//! on driving ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{CommunityCommand, TrustCommand, TrustQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub trust: Arc<dyn TrustCommand>,
    pub trust_query: Arc<dyn TrustQuery>,
    pub community: Arc<dyn CommunityCommand>,
}

impl HttpState {
    /// Construct state from the three driving ports.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use krishilok::domain::{
    ///     CommunityPorts, CommunityService, FollowUpPolicy, RetryPolicy, RetryRuntime,
    ///     ScoreRecomputer, TrustEnginePorts, TrustEngineService,
    /// };
    /// use krishilok::inbound::http::state::HttpState;
    /// use krishilok::outbound::memory::InMemoryTrustStore;
    /// use mockable::DefaultClock;
    ///
    /// let store = Arc::new(InMemoryTrustStore::new());
    /// let clock = Arc::new(DefaultClock);
    /// let recomputer = ScoreRecomputer::new(
    ///     store.clone(),
    ///     store.clone(),
    ///     RetryPolicy::default(),
    ///     RetryRuntime::default(),
    /// );
    /// let trust = Arc::new(TrustEngineService::new(
    ///     TrustEnginePorts {
    ///         suggestions: store.clone(),
    ///         contributors: store.clone(),
    ///         feedback: store.clone(),
    ///         community: store.clone(),
    ///         follow_ups: store.clone(),
    ///     },
    ///     recomputer.clone(),
    ///     FollowUpPolicy::default(),
    ///     clock.clone(),
    /// ));
    /// let community = Arc::new(CommunityService::new(
    ///     CommunityPorts { community: store.clone(), contributors: store },
    ///     recomputer,
    ///     clock,
    /// ));
    /// let state = HttpState::new(trust.clone(), trust, community);
    /// let _query = state.trust_query.clone();
    /// ```
    pub fn new(
        trust: Arc<dyn TrustCommand>,
        trust_query: Arc<dyn TrustQuery>,
        community: Arc<dyn CommunityCommand>,
    ) -> Self {
        Self {
            trust,
            trust_query,
            community,
        }
    }
}
