//! Integer identifiers for persisted personnel records.
//!
//! Every table keys its rows with a serial `integer` column. The wrappers
//! below keep those keys from being mixed up across tables while staying
//! `Copy` and serialising as bare numbers.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw database key.
            pub const fn new(raw: i32) -> Self {
                Self(raw)
            }

            /// Raw database key.
            pub const fn get(self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(raw: i32) -> Self {
                Self(raw)
            }
        }
    };
}

define_id!(
    /// Primary key of an employee record.
    EmployeeId
);
define_id!(
    /// Primary key of a role.
    RoleId
);
define_id!(
    /// Primary key of a single permission rule.
    PermissionRuleId
);
define_id!(
    /// Primary key of an attribute definition.
    DefinitionId
);
define_id!(
    /// Primary key of an attribute value row.
    ValueId
);
