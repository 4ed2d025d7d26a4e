//! Command-line driver for travel-survey harmonization runs.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod summary;
pub mod types;
