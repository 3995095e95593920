//! Test Suite
//!
//! Unit and integration tests for the fetch-and-cache pipeline, organized
//! by subsystem. Shared fixtures live in `common`.

mod common;

mod fetch;
