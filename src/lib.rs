//! # TutorGrid Console Core
//!
//! Scope authorization and allocation lifecycle for the TutorGrid admin
//! console. Administrators are scoped to a node of a geographic hierarchy
//! (State → District → Division → Constituency → Mandal) and manage the
//! allocations binding students to trainers, plus the sessions and
//! reschedule requests hanging off them.
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── hierarchy.rs     # Immutable region forest + id index
//! ├── scope.rs         # Scope, route and action authorization
//! ├── context.rs       # AuthContext { admin, hierarchy }
//! ├── allocations.rs   # Allocation state machine
//! ├── sessions.rs      # Sessions, reschedules, calendar conflicts
//! ├── ledger.rs        # Local projection of remote records
//! ├── audit.rs         # Audit trail + transient notifications
//! ├── remote/          # RemoteApi seam: HTTP and in-memory authorities
//! ├── console.rs       # Authorized, audited operations over a RemoteApi
//! └── metrics.rs       # Console counters
//! ```
//!
//! The pure modules (`hierarchy`, `scope`, `allocations`, `sessions`) carry
//! every rule. [`console::Console`] composes them: it checks permission and
//! scope, previews the transition locally, performs one remote request and
//! replaces its local copy with what the authority returned.
//!
//! ## Role Hierarchy
//!
//! | Role | Scope | Description |
//! |------|-------|-------------|
//! | Super Admin | `ALL` | Every region, every permission |
//! | State Admin | State | Districts and below |
//! | District Admin | District | Divisions and below |
//! | Division Admin | Division | Constituencies and below |
//! | Constituency Admin | Constituency | Mandals |
//! | Mandal Admin | Mandal | Own mandal only |
//!
//! ## Quick Start
//!
//! ```bash
//! TUTORGRID_API_URL=https://console.example.org/api
//! TUTORGRID_API_TOKEN=...
//! cargo run --bin tutorgrid -- allocations list
//! ```

pub mod allocations;
pub mod audit;
pub mod console;
pub mod context;
pub mod hierarchy;
pub mod ledger;
pub mod metrics;
pub mod remote;
pub mod scope;
pub mod sessions;

pub use console::{Console, TeardownHandle};
pub use context::AuthContext;
pub use hierarchy::Hierarchy;
pub use remote::{HttpRemote, InMemoryRemote, RemoteApi};

// Re-export workspace crates for convenience
pub use tutorgrid_config;
pub use tutorgrid_core;
pub use tutorgrid_models;
