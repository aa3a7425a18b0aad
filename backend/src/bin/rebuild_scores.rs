//! Replay stored feedback and community history to rebuild every cached
//! usefulness and trust score, then repair drifted response counters.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::io::{self, Write};
use std::sync::Arc;

use clap::Parser;
use mockable::{Clock, DefaultClock};
use serde::Serialize;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use krishilok::domain::ports::{
    CommunityCommand, CommunityRepository, ContributorRepository, RebuildSummary,
    ReconciliationSummary, SuggestionRepository, TrustCommand,
};
use krishilok::domain::{
    CommunityPorts, CommunityService, FollowUpPolicy, RetryPolicy, RetryRuntime, ScoreRecomputer,
    TrustEnginePorts, TrustEngineService,
};
use krishilok::outbound::persistence::{
    DbPool, DieselCommunityRepository, DieselContributorRepository, DieselFeedbackRepository,
    DieselFollowUpScheduler, DieselSuggestionRepository, PoolConfig, run_pending_migrations,
};

const DATABASE_URL_ENV: &str = "KRISHILOK_DATABASE_URL";

/// `rebuild-scores` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rebuild-scores",
    about = "Recompute cached scores from history and report drift",
    version
)]
struct CliArgs {
    /// Database connection URL. Falls back to `KRISHILOK_DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
    /// Attempts per entity before a concurrent update aborts the run.
    #[arg(long = "max-attempts", value_name = "n", default_value_t = 5)]
    max_attempts: u32,
    /// Leave post response counters untouched.
    #[arg(long = "skip-response-counts")]
    skip_response_counts: bool,
    /// Exit with an error when any cached value had drifted.
    #[arg(long = "fail-on-drift")]
    fail_on_drift: bool,
}

impl CliArgs {
    fn database_url(&self) -> io::Result<String> {
        self.database_url
            .clone()
            .or_else(|| env::var(DATABASE_URL_ENV).ok())
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("--database-url or {DATABASE_URL_ENV} is required"),
                )
            })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport {
    scores: RebuildSummary,
    response_counts: Option<ReconciliationSummary>,
}

impl RunReport {
    fn drifted(&self) -> bool {
        self.scores.suggestions_drifted > 0
            || self.scores.contributors_drifted > 0
            || self
                .response_counts
                .as_ref()
                .is_some_and(|summary| !summary.repaired.is_empty())
    }
}

fn main() -> io::Result<()> {
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    if let Err(e) = fmt().with_env_filter(EnvFilter::from_default_env()).try_init() {
        warn!(error = %e, "tracing init failed");
    }
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let database_url = args.database_url()?;

    run_pending_migrations(&database_url)
        .await
        .map_err(io::Error::other)?;
    let pool = DbPool::new(PoolConfig::new(database_url))
        .await
        .map_err(io::Error::other)?;
    let policy = RetryPolicy::new(args.max_attempts).map_err(io::Error::other)?;
    let (trust, community) = build_services(&pool, policy);

    let scores = trust.rebuild_all().await.map_err(io::Error::other)?;
    info!(
        suggestions = scores.suggestions,
        suggestions_drifted = scores.suggestions_drifted,
        contributors = scores.contributors,
        contributors_drifted = scores.contributors_drifted,
        "score rebuild complete"
    );

    let response_counts = if args.skip_response_counts {
        None
    } else {
        let summary = community
            .reconcile_all_response_counts()
            .await
            .map_err(io::Error::other)?;
        info!(
            checked = summary.checked,
            repaired = summary.repaired.len(),
            "response counter reconciliation complete"
        );
        Some(summary)
    };

    let report = RunReport {
        scores,
        response_counts,
    };
    let rendered = serde_json::to_string_pretty(&report).map_err(io::Error::other)?;
    writeln!(io::stdout().lock(), "{rendered}")?;

    if args.fail_on_drift && report.drifted() {
        return Err(io::Error::other("cached values drifted from history"));
    }
    Ok(())
}

fn build_services(pool: &DbPool, policy: RetryPolicy) -> (TrustEngineService, CommunityService) {
    let suggestions: Arc<dyn SuggestionRepository> =
        Arc::new(DieselSuggestionRepository::new(pool.clone()));
    let contributors: Arc<dyn ContributorRepository> =
        Arc::new(DieselContributorRepository::new(pool.clone()));
    let community: Arc<dyn CommunityRepository> =
        Arc::new(DieselCommunityRepository::new(pool.clone()));
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let recomputer = ScoreRecomputer::new(
        suggestions.clone(),
        contributors.clone(),
        policy,
        RetryRuntime::default(),
    );

    let trust = TrustEngineService::new(
        TrustEnginePorts {
            suggestions,
            feedback: Arc::new(DieselFeedbackRepository::new(pool.clone())),
            contributors: contributors.clone(),
            community: community.clone(),
            follow_ups: Arc::new(DieselFollowUpScheduler::new(pool.clone())),
        },
        recomputer.clone(),
        FollowUpPolicy::default(),
        clock.clone(),
    );
    let community = CommunityService::new(
        CommunityPorts {
            community,
            contributors,
        },
        recomputer,
        clock,
    );
    (trust, community)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_rebuild_everything() {
        let args = CliArgs::try_parse_from(["rebuild-scores", "--database-url", "postgres://db"])
            .expect("arguments parse");
        assert_eq!(args.max_attempts, 5);
        assert!(!args.skip_response_counts);
        assert_eq!(args.database_url().expect("url"), "postgres://db");
    }

    #[rstest]
    fn drift_is_detected_in_either_report() {
        let clean = RunReport {
            scores: RebuildSummary::default(),
            response_counts: Some(ReconciliationSummary::default()),
        };
        assert!(!clean.drifted());

        let drifted = RunReport {
            scores: RebuildSummary {
                contributors: 2,
                contributors_drifted: 1,
                ..RebuildSummary::default()
            },
            response_counts: None,
        };
        assert!(drifted.drifted());
    }
}
