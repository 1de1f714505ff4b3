//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table. The serialized form
//! is the snake_case name, which is also what the API returns.

use serde::{Deserialize, Serialize};

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Every variant in seed order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Resolve a database status ID. Unknown IDs yield `None`.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// The lowercase name used in the API and the lookup table.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }

            /// Parse the lowercase name back into a status.
            pub fn parse(name: &str) -> Option<Self> {
                match name {
                    $( $label => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_status_enum! {
    /// Background job lifecycle status, shared by all job kinds.
    JobStatus {
        Pending = 1 => "pending",
        Processing = 2 => "processing",
        Completed = 3 => "completed",
        Failed = 4 => "failed",
        Cancelled = 5 => "cancelled",
    }
}

define_status_enum! {
    /// Training-plan recommendation lifecycle status.
    RecommendationStatus {
        Draft = 1 => "draft",
        Approved = 2 => "approved",
        Active = 3 => "active",
        Completed = 4 => "completed",
    }
}

define_status_enum! {
    /// Individual workout session status.
    WorkoutStatus {
        Scheduled = 1 => "scheduled",
        InProgress = 2 => "in_progress",
        Completed = 3 => "completed",
        Skipped = 4 => "skipped",
        Cancelled = 5 => "cancelled",
    }
}

define_status_enum! {
    /// InBody scan extraction status.
    ScanExtractionStatus {
        Pending = 1 => "pending",
        Completed = 2 => "completed",
        Failed = 3 => "failed",
        Verified = 4 => "verified",
    }
}

impl JobStatus {
    /// Completed, failed and cancelled jobs never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Pending and processing jobs count toward the one-active-job-per-owner rule.
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }
}

impl WorkoutStatus {
    /// Completed or skipped sessions close out a week; cancelled ones do not.
    pub fn counts_toward_completion(self) -> bool {
        matches!(self, WorkoutStatus::Completed | WorkoutStatus::Skipped)
    }
}
