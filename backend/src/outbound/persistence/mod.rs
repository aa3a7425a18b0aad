//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the domain's driven ports backed by
//! PostgreSQL via `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain types. Scoring and ranking live in the domain.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Revision-guarded writes**: cached scores are written with an
//!   `UPDATE ... WHERE score_revision = $expected`; zero affected rows surface
//!   as the port's `RevisionMismatch`.
//!
//! # Example
//!
//! ```ignore
//! use krishilok::outbound::persistence::{DbPool, DieselSuggestionRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/krishilok")).await?;
//! let suggestions = DieselSuggestionRepository::new(pool);
//! ```

mod diesel_basic_error_mapping;
mod diesel_community_repository;
mod diesel_contributor_repository;
mod diesel_feedback_repository;
mod diesel_follow_up_scheduler;
mod diesel_suggestion_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_community_repository::DieselCommunityRepository;
pub use diesel_contributor_repository::DieselContributorRepository;
pub use diesel_feedback_repository::DieselFeedbackRepository;
pub use diesel_follow_up_scheduler::DieselFollowUpScheduler;
pub use diesel_suggestion_repository::DieselSuggestionRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
