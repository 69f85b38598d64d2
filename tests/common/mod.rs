//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Element and identity fixtures
//! - Database test fixtures

pub mod database;

// Re-export commonly used utilities
pub use database::*;
pub use fixtures::*;
