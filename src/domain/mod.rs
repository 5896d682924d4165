//! Domain layer containing the event model and the contracts around it.
//!
//! It defines entities, ingest rules and the queue and repository interfaces,
//! independent of infrastructure concerns.
//!
//! # Architecture
//!
//! - [`entities`] - Events, user profiles and analytics shapes
//! - [`validation`] - Structural validation and the freshness gate
//! - [`queue`] - Producer and consumer sides of the partitioned event queue
//! - [`repositories`] - Durable store trait definitions
//!
//! # Event Flow
//!
//! 1. HTTP handler receives a batch of events
//! 2. Each event passes [`validation::EventValidator`] and [`validation::FreshnessGate`]
//! 3. Accepted events are published through [`queue::EventQueue`]
//! 4. Partition workers hand them to the processor, which persists through
//!    [`repositories::EventRepository`] and [`repositories::UserRepository`]

pub mod entities;
pub mod queue;
pub mod repositories;
pub mod validation;
