//! Database driver integrations.
//!
//! Each backend is gated behind a feature flag and provides an
//! [`Executor`](crate::Executor) implementation for its driver.
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | PostgreSQL | `postgres` | tokio-postgres with deadpool-postgres pooling |

#[cfg(feature = "postgres")]
pub mod postgres;
