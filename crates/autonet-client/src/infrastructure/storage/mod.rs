//! Storage infrastructure: reading the broadcaster's TOML configuration file.

pub mod config;
