//! # TutorGrid CLI
//!
//! Operator tooling for the TutorGrid admin console.
//!
//! This library crate holds the pieces the `tutorgrid` binary is built from:
//!
//! - [`identity`]: the admin the CLI acts as
//! - [`offline`]: a seeded in-memory authority for `--offline` runs
//!
//! ## Usage
//!
//! ```ignore
//! use tutorgrid_cli::offline;
//!
//! let remote = offline::seed(offline::demo_hierarchy()).await;
//! ```

pub mod identity;
pub mod offline;
