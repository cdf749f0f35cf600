//! # TutorGrid Core
//!
//! Core types, errors, and utilities for the TutorGrid admin console.
//!
//! This crate provides foundational types used throughout the workspace:
//!
//! - [`errors`]: The console error taxonomy shared by every lifecycle operation
//! - [`pagination`]: Pagination parameters sent to list endpoints
//! - [`permissions`]: Permission code constants
//!
//! # Example
//!
//! ```ignore
//! use tutorgrid_core::errors::ConsoleError;
//! use tutorgrid_core::permissions;
//!
//! let error = ConsoleError::not_found("allocation", "ALC-42");
//! assert!(!error.is_retryable());
//!
//! let required = permissions::ALLOCATIONS_APPROVE;
//! ```

pub mod errors;
pub mod pagination;
pub mod permissions;

// Re-export commonly used types at crate root
pub use errors::{ConsoleError, ConsoleResult};
pub use pagination::{PaginationMeta, PaginationParams};
