//! Test utilities.
//!
//! This module provides:
//! - Test data factories for creating valid fixtures
//! - In-memory repository implementations for mocking persistence
//! - A scripted billing provider
//! - `TestAppStateBuilder` for route tests

mod app_state_builder;
mod billing_mocks;
mod factories;
mod repo_mocks;

pub use app_state_builder::*;
pub use billing_mocks::*;
pub use factories::*;
pub use repo_mocks::*;
