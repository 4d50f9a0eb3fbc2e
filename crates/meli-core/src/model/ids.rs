// ── Identity types ──
//
// Opaque string identifiers for sites, branches and releases. Each is a
// distinct type so a release id can never be passed where a branch id
// is expected.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Identifier of a [`Site`](super::Site), the aggregate root.
    SiteId
}

string_id! {
    /// Identifier of a [`Branch`](super::Branch), unique within its site.
    BranchId
}

string_id! {
    /// Identifier of a deployed build belonging to a site.
    ReleaseId
}

impl BranchId {
    /// Fresh random id for a newly created branch.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}
