//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed learning store and lookups (Diesel)
//! - **certificates**: HTML certificate rendering into a capability directory
//! - **notifications**: log-only and webhook notification dispatchers
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no progression rules.

pub mod certificates;
pub mod notifications;
pub mod persistence;
