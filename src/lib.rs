//! Library to back up an ad manager installation.
//!
//! A run takes a hot snapshot of the SQLite datastore, collects the schema and
//! brand configuration files into a timestamped staging directory and copies
//! that directory to cloud storage with [rclone](https://rclone.org). The
//! collection modules are located in the [`backends`] module, the run itself
//! in [`orchestrator`].

#![forbid(unsafe_code)]

pub mod backends;
pub mod cli;
pub mod config;
pub mod orchestrator;
pub mod project;
pub mod schema;
pub mod staging;
pub mod sync;
