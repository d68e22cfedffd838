//! Catalog events and their classification enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::time::{MalformedTimeError, TimeRange};
use crate::types::{EventId, ValidationError};

/// Generates a closed enumeration whose wire form is a display label.
///
/// Parsing accepts the exact label and, for command-line convenience, any
/// spelling that differs only in case, spaces, hyphens or underscores.
macro_rules! define_label_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The label used in the catalog.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if let Some(exact) = Self::ALL.iter().find(|v| v.as_str() == s) {
                    return Ok(*exact);
                }
                let wanted = loose_label(s);
                Self::ALL
                    .iter()
                    .find(|v| loose_label(v.as_str()) == wanted)
                    .copied()
                    .ok_or_else(|| ValidationError::UnknownLabel {
                        field: $field_name,
                        value: s.to_string(),
                    })
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

fn loose_label(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

define_label_enum!(
    /// Convention day. Conflicts only exist between events on the same day.
    Day, "day" {
        Thursday => "Thursday",
        Friday => "Friday",
        Saturday => "Saturday",
        Sunday => "Sunday",
    }
);

define_label_enum!(
    /// Audience segment an event is aimed at.
    FocusGroup, "focus group" {
        All => "All",
        Youth => "Youth",
        YoungAdults => "Young Adults",
        Families => "Families",
        Clergy => "Clergy",
    }
);

define_label_enum!(
    /// Kind of session.
    Category, "category" {
        Keynote => "Keynote",
        Workshop => "Workshop",
        Liturgy => "Liturgy",
        Social => "Social",
        Panel => "Panel",
    }
);

impl FocusGroup {
    /// Whether an event aimed at `self` should be shown to `audience`.
    ///
    /// `All` on either side matches everything.
    pub fn includes(self, audience: Self) -> bool {
        self == Self::All || audience == Self::All || self == audience
    }
}

/// A single convention event. Immutable once loaded into a catalog.
///
/// Field names follow the catalog's JSON (`startTime`, `focusGroup`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub day: Day,
    /// Start time as written in the catalog, e.g. `"9:00 AM"`.
    pub start_time: String,
    /// End time as written in the catalog.
    pub end_time: String,
    #[serde(default)]
    pub venue: String,
    pub focus_group: FocusGroup,
    pub category: Category,
    #[serde(default)]
    pub description: String,
}

impl Event {
    /// Parses the event's start and end times.
    pub fn time_range(&self) -> Result<TimeRange, MalformedTimeError> {
        TimeRange::parse(&self.start_time, &self.end_time)
    }

    /// Case-insensitive substring match against title or description.
    ///
    /// `needle` must already be lowercase.
    pub(crate) fn mentions(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}
