//! Shared utilities for the Chanoma chat coordinator.
//!
//! Small, dependency-light helpers used by both the server and any
//! future client-side tooling: timestamp generation behind a `Clock`
//! abstraction and tracing setup.

pub mod logger;
pub mod time;
