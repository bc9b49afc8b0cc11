//! Redis cache layer for huddle.
//!
//! Cache-aside with explicit invalidation: reads go through [`Cache`],
//! writes go through the services, and every successful mutation runs the
//! [`Invalidator`] so no write path can forget a key. Cache failures are
//! never promoted to request failures on the read path; the caller falls
//! through to the database.

pub mod client;
pub mod invalidation;
pub mod keys;

pub use client::{Cache, CacheError};
pub use invalidation::{Invalidator, Mutation};
