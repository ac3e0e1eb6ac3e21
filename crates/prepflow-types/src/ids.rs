//! Entity identifier newtypes.
//!
//! Every aggregate gets its own UUID v7 wrapper so ids cannot be mixed up
//! across entities at compile time. UUID v7 is time-sortable, which keeps
//! insertion order and id order aligned in listings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new id using UUID v7 (time-sortable).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

entity_id!(
    /// An enrolled learner. Identity only -- the participant owns
    /// zero-or-more of every other entity.
    ParticipantId
);
entity_id!(
    /// A staff member (instructor or admin) acting on submissions.
    StaffId
);
entity_id!(ScoreSubmissionId);
entity_id!(StudyPlanId);
entity_id!(FeedbackId);
entity_id!(PackageId);
entity_id!(TransactionId);
