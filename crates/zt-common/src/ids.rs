//! Opaque, newtype-wrapped identifiers.
//!
//! Entities reference each other by ID rather than by value (see the
//! "arena-style storage" note for cyclic references): a `Session` knows its
//! `PrincipalId`, not its `Principal`. Wrapping each ID family in its own
//! type catches accidental cross-wiring (passing a `DeviceId` where a
//! `SessionId` is expected) at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
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

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

id_type!(PrincipalId);
id_type!(PolicyId);
id_type!(SegmentId);
id_type!(RequestId);
id_type!(DeviceId);
id_type!(SessionId);
id_type!(GrantId);
id_type!(EmergencyRequestId);
id_type!(PredictionId);
id_type!(AlertId);
id_type!(EventId);
