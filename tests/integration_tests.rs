//! Integration tests for rust-sqladvisor
//!
//! This file serves as the entry point for all integration tests.

#[path = "common/mod.rs"]
mod common;

#[path = "integration/analyze_tests.rs"]
mod analyze_tests;

#[path = "integration/cli_tests.rs"]
mod cli_tests;
