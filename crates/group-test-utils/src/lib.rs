//! Shared test utilities for the group-operator workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`directory`]: [`MemoryDirectory`], an in-process directory with fault injection
//! - [`fixtures`]: configs, desired groups and a wired-up [`TestOperator`]

pub mod directory;
pub mod fixtures;

pub use directory::{MemoryDirectory, Operation};
pub use fixtures::{
    BASE_DN, TestOperator, client, desired_group, directory_config, init_test_logging, members,
};
