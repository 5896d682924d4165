//! PostgreSQL repository implementations.
//!
//! Queries are built at runtime with bound parameters, so the crate builds
//! without a live database.
//!
//! # Repositories
//!
//! - [`PgEventRepository`] - Event log and analytics queries
//! - [`PgUserRepository`] - User profiles

pub mod pg_event_repository;
pub mod pg_user_repository;

pub use pg_event_repository::PgEventRepository;
pub use pg_user_repository::PgUserRepository;
