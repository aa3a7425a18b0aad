//! Outbound adapters implementing the domain's driven ports.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **memory**: a process-local store used when no database is configured
//!   and by integration tests
//!
//! Adapters translate between domain types and storage representations.
//! They contain no scoring logic.

pub mod memory;
pub mod persistence;
