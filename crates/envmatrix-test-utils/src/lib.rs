//! Testing utilities for the envmatrix workspace
//!
//! Shared fixtures and a scripted CLI runner.

#![allow(missing_docs)]

pub mod fixtures;
pub mod runner;

pub use fixtures::{matrix, record, snapshot};
pub use runner::ScriptedRunner;
