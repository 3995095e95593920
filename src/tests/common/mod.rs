//! Common Test Utilities
//!
//! Shared fixtures used across test modules: database creation, sample
//! words and service entries, and a fully wired repository with a
//! toggleable connectivity flag.

pub mod fixtures;

pub use fixtures::*;
