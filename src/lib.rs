//! # syncr - selective two-way directory synchronizer
//!
//! syncr keeps a disk-limited local directory in sync with a larger remote
//! one, selecting which remote content is actually materialized locally by
//! priority and available storage, while everything else is reachable
//! through a symlink overlay.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use syncr::commands;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let root = commands::profiles_root()?;
//!     commands::sync(&root, "work").await?;
//!     Ok(())
//! }
//! ```

#![warn(dead_code)]

pub mod commands;
pub mod conflict_resolve;
pub mod deletion;
pub mod error;
pub mod exclude;
pub mod lock;
pub mod logging;
pub mod metadata_doc;
pub mod orchestrator;
pub mod priority;
pub mod profile;
pub mod profile_config;
pub mod profile_db;
pub mod relpath;
pub mod remote_db;
pub mod transfer;
pub mod tree;

pub use error::SyncrError;

// vim: ts=4
