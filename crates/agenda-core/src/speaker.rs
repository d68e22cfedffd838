//! Speakers featured in the catalog.

use serde::{Deserialize, Serialize};

use crate::event::Day;
use crate::types::EventId;

/// A featured speaker or performer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Speaker {
    pub name: String,
    /// Role or affiliation, e.g. `"Bishop of the Diocese of Columbus"`.
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub bio: String,
    /// The day the speaker is featured on.
    pub day: Day,
    /// Events the speaker appears in.
    #[serde(default)]
    pub events: Vec<EventId>,
}

impl Speaker {
    /// Loose name match for lookups typed by hand.
    ///
    /// Matches when the speaker's name contains `query`, or when `query`
    /// contains the speaker's last name. Case is ignored.
    pub fn matches_name(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return false;
        }
        let name = self.name.to_lowercase();
        if name.contains(&query) {
            return true;
        }
        name.split_whitespace()
            .next_back()
            .is_some_and(|last| query.contains(last))
    }
}
