//! Strongly-typed ID newtypes for domain entities.
//!
//! The remote API hands out opaque string identifiers (region codes such as
//! `MAN-01`, backend UUIDs for allocations). Each entity gets its own newtype so
//! a `TrainerId` can never be passed where a `StudentId` is expected.
//!
//! ```ignore
//! use tutorgrid_models::ids::{StudentId, TrainerId};
//!
//! fn assign(student: &StudentId, trainer: &TrainerId) { /* ... */ }
//!
//! let student = StudentId::from("STU-1");
//! let trainer = TrainerId::from("TRN-7");
//! assign(&student, &trainer);    // OK
//! // assign(&trainer, &student); // Compile error! Type mismatch.
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to define a strongly-typed string ID newtype.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            #[inline]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Create a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[inline]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            #[inline]
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Identifier of a node in the region hierarchy.
    RegionId
);

define_id!(
    /// Identifier of a console administrator.
    AdminId
);

define_id!(
    /// Identifier of a student.
    StudentId
);

define_id!(
    /// Identifier of a trainer.
    TrainerId
);

define_id!(
    /// Identifier of a course.
    CourseId
);

define_id!(
    /// Identifier of a student-trainer allocation.
    AllocationId
);

define_id!(
    /// Identifier of a tutoring session.
    SessionId
);

define_id!(
    /// Identifier of a reschedule request.
    RescheduleRequestId
);

define_id!(
    /// Identifier of an auto-assignment attempt.
    AttemptId
);
