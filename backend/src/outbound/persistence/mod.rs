//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the learning store and lookup ports, backed
//! by PostgreSQL through `diesel-async` and a `bb8` pool.
//!
//! - **Thin adapters**: only translate between Diesel rows and domain
//!   entities. Progression rules live in the domain.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **One transaction per unit of work**: `DieselLearningStore` opens a
//!   transaction per `in_unit_of_work` call and commits only on success.
//!
//! # Example
//!
//! ```ignore
//! use lms_backend::outbound::persistence::{DbPool, DieselLearningStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/lms")).await?;
//! let store = DieselLearningStore::new(pool);
//! ```

mod diesel_identity_lookup;
mod diesel_learning_store;
mod error_mapping;
mod models;
mod pool;
mod schema;

pub use diesel_identity_lookup::{DieselIdentityLookup, DieselSubscriptionLookup};
pub use diesel_learning_store::DieselLearningStore;
pub use pool::{DbPool, PoolConfig, PoolError};
