// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes.

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>` implementations.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
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

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

crate::define_id! {
    /// Unique identifier for a phone, derived deterministically from MAC +
    /// hardware type (`"{mac}_{hardware}"`). Primary key of the fleet.
    pub struct PhoneId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_id_display_roundtrip() {
        let id = PhoneId::new("aa_bb_01_nexus4");
        assert_eq!(id.as_str(), "aa_bb_01_nexus4");
        assert_eq!(id.to_string(), "aa_bb_01_nexus4");
        assert_eq!(id, "aa_bb_01_nexus4");
    }

    #[test]
    fn phone_id_from_string_and_str() {
        let a: PhoneId = "x".to_string().into();
        let b: PhoneId = "x".into();
        assert_eq!(a, b);
    }
}
