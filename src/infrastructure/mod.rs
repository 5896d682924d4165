//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer.
//!
//! # Modules
//!
//! - [`store`] - Real-time store (Redis and in-process implementations)
//! - [`cache`] - Cache-aside reads on top of the real-time store
//! - [`queue`] - Event queue (Kafka and in-process implementations)
//! - [`persistence`] - PostgreSQL repository implementations

pub mod cache;
pub mod persistence;
pub mod queue;
pub mod store;
