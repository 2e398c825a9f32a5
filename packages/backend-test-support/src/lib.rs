//! Backend test support utilities
//!
//! Shared between the backend and db-infra test binaries.

pub mod logging;
