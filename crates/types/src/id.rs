//! Canonical identifiers for queue entries and counters.

use crate::{IdError, IdResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Returns true if `input` is 32 lowercase hex characters.
fn is_canonical(input: &str) -> bool {
    input.len() == 32
        && input
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

macro_rules! canonical_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Uuid);

        impl $name {
            /// Allocates a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parses an identifier that must already be in canonical form.
            ///
            /// # Errors
            ///
            /// Returns [`IdError::InvalidInput`] for uppercase, hyphenated, short or non-hex
            /// input.
            pub fn parse(input: &str) -> IdResult<Self> {
                if !is_canonical(input) {
                    return Err(IdError::InvalidInput(format!(
                        "{} must be 32 lowercase hex characters without hyphens, got: '{}'",
                        $label, input
                    )));
                }
                Uuid::parse_str(input)
                    .map(Self)
                    .map_err(|e| IdError::InvalidInput(format!("{}: {}", $label, e)))
            }

            pub fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.simple())
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        #[cfg(feature = "serde")]
        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_str(self)
            }
        }

        #[cfg(feature = "serde")]
        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

canonical_id!(
    /// Identifier of a single queue entry (one patient ticket).
    EntryId,
    "entry id"
);

canonical_id!(
    /// Identifier of a service counter such as "Vitals" or "Pharmacy".
    CounterId,
    "counter id"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_display_in_canonical_form() {
        let id = EntryId::new();
        let rendered = id.to_string();
        assert_eq!(rendered.len(), 32);
        assert!(is_canonical(&rendered));
        assert_eq!(EntryId::parse(&rendered).expect("reparse"), id);
    }

    #[test]
    fn parse_rejects_hyphenated_input() {
        let err = CounterId::parse("550e8400-e29b-41d4-a716-446655440000")
            .expect_err("hyphenated ids are not canonical");
        match err {
            IdError::InvalidInput(msg) => {
                assert!(msg.contains("counter id"));
                assert!(msg.contains("32 lowercase hex characters"));
            }
        }
    }

    #[test]
    fn parse_rejects_uppercase_input() {
        assert!(EntryId::parse("550E8400E29B41D4A716446655440000").is_err());
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(EntryId::parse("550e8400").is_err());
        assert!(EntryId::parse("").is_err());
    }

    #[test]
    fn serde_uses_canonical_string() {
        let id = CounterId::parse("550e8400e29b41d4a716446655440000").expect("canonical");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let back: CounterId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);

        let bad = serde_json::from_str::<CounterId>("\"not-an-id\"");
        assert!(bad.is_err());
    }
}
