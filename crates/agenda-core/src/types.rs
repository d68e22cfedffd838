//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The value is not one of the known labels for an enumeration.
    #[error("unknown {field}: {value}")]
    UnknownLabel { field: &'static str, value: String },

    /// The value contains a character reserved for building keys.
    #[error("{field} cannot contain '{ch}'")]
    ReservedChar { field: &'static str, ch: char },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated catalog event identifier.
    ///
    /// The catalog conventionally uses `<day-prefix>-<NN>` (e.g. `th-03`),
    /// but the ID is treated as an opaque key.
    EventId, "event ID"
);

define_string_id!(
    /// The key that scopes a selection to one attendee across sessions.
    AttendeeId, "attendee ID"
);

/// Separates name and age group in an [`Attendee`] key.
const KEY_SEPARATOR: char = '#';

/// A person building a schedule, identified by name and age group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attendee {
    name: String,
    age_group: String,
}

impl Attendee {
    /// Creates an attendee, trimming both fields.
    ///
    /// Neither field may contain `#`, which separates them in the key.
    pub fn new(name: &str, age_group: &str) -> Result<Self, ValidationError> {
        let name = key_part(name, "name")?;
        let age_group = key_part(age_group, "age group")?;
        Ok(Self {
            name: name.to_string(),
            age_group: age_group.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn age_group(&self) -> &str {
        &self.age_group
    }

    /// The storage key for this attendee's selection.
    pub fn id(&self) -> AttendeeId {
        // Both parts are non-empty and separator-free, so the key is
        // never empty and splits back into exactly these two parts.
        AttendeeId(format!("{}{KEY_SEPARATOR}{}", self.name, self.age_group))
    }
}

fn key_part<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(ValidationError::ReservedChar {
            field,
            ch: KEY_SEPARATOR,
        });
    }
    Ok(value)
}

impl fmt::Display for Attendee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.age_group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_rejects_empty() {
        assert!(EventId::new("").is_err());
        assert!(EventId::new("   ").is_err());
        assert!(EventId::new("th-01").is_ok());
    }

    #[test]
    fn event_id_serde_roundtrip() {
        let id = EventId::new("fr-12").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"fr-12\"");
        let parsed: EventId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn event_id_serde_rejects_empty() {
        let result: Result<EventId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn attendee_trims_fields() {
        let attendee = Attendee::new("  Mary Thomas ", " 15-18").unwrap();
        assert_eq!(attendee.name(), "Mary Thomas");
        assert_eq!(attendee.age_group(), "15-18");
        assert_eq!(attendee.id().as_str(), "Mary Thomas#15-18");
        assert_eq!(attendee.to_string(), "Mary Thomas (15-18)");
    }

    #[test]
    fn attendee_requires_name_and_age_group() {
        assert_eq!(
            Attendee::new(" ", "30").unwrap_err(),
            ValidationError::Empty { field: "name" }
        );
        assert_eq!(
            Attendee::new("Joseph", "").unwrap_err(),
            ValidationError::Empty { field: "age group" }
        );
    }

    #[test]
    fn attendee_fields_cannot_contain_key_separator() {
        // Both would otherwise share the key `Anna#13#17`.
        assert_eq!(
            Attendee::new("Anna#13", "17").unwrap_err(),
            ValidationError::ReservedChar {
                field: "name",
                ch: '#'
            }
        );
        assert_eq!(
            Attendee::new("Anna", "13#17").unwrap_err(),
            ValidationError::ReservedChar {
                field: "age group",
                ch: '#'
            }
        );
        assert_eq!(
            Attendee::new("Anna", "13#17").unwrap_err().to_string(),
            "age group cannot contain '#'"
        );
    }

    #[test]
    fn attendees_with_different_age_groups_have_distinct_keys() {
        let a = Attendee::new("Anna", "13-17").unwrap();
        let b = Attendee::new("Anna", "18-25").unwrap();
        assert_ne!(a.id(), b.id());
    }
}
