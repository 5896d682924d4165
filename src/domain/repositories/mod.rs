//! Repository trait definitions for the domain layer.
//!
//! These traits abstract the durable store. Implementations live in
//! `crate::infrastructure::persistence`; `mockall` mocks are generated for
//! unit tests and hand-written in-memory versions back the HTTP tests.
//!
//! # Available Repositories
//!
//! - [`EventRepository`] - Append-only event log and analytics reads
//! - [`UserRepository`] - User profiles

pub mod event_repository;
pub mod user_repository;

pub use event_repository::EventRepository;
pub use user_repository::UserRepository;

#[cfg(test)]
pub use event_repository::MockEventRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;
