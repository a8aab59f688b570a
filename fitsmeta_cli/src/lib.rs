//! Library side of the `fitsmeta` command line tool
//!
//! Configuration loading, error reporting, FITS discovery and the
//! orchestrator that turns a command into a pipeline run.

pub mod config;
pub mod error;
pub mod file_discovery;
pub mod orchestrators;
pub mod paths;
pub mod terminal;
