//! Storage infrastructure: reading the coordinator's TOML configuration file.
//!
//! The `config` sub-module turns an optional file on disk into a
//! [`crate::domain::CoordinatorConfig`].  A missing file is not an error;
//! every field has a default and command-line flags fill in the rest.

pub mod config;
