//! Catalog filtering for the browse view.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::event::{Category, Day, Event, FocusGroup};

/// Predicates applied to the catalog. Unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    pub day: Option<Day>,
    /// `Some(FocusGroup::All)` behaves like `None`.
    pub focus_group: Option<FocusGroup>,
    pub category: Option<Category>,
    /// Case-insensitive substring over title and description.
    pub search: Option<String>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_day(mut self, day: Day) -> Self {
        self.day = Some(day);
        self
    }

    #[must_use]
    pub const fn with_focus_group(mut self, focus_group: FocusGroup) -> Self {
        self.focus_group = Some(focus_group);
        self
    }

    #[must_use]
    pub const fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// True when no predicate would exclude any event.
    pub fn is_unconstrained(&self) -> bool {
        self.day.is_none()
            && self.focus_group.is_none_or(|group| group == FocusGroup::All)
            && self.category.is_none()
            && self.search_needle().is_none()
    }

    /// Whether `event` satisfies every set predicate.
    pub fn matches(&self, event: &Event) -> bool {
        self.matches_with(event, self.search_needle().as_deref())
    }

    fn matches_with(&self, event: &Event, needle: Option<&str>) -> bool {
        self.day.is_none_or(|day| event.day == day)
            && self
                .focus_group
                .is_none_or(|group| event.focus_group.includes(group))
            && self.category.is_none_or(|category| event.category == category)
            && needle.is_none_or(|needle| event.mentions(needle))
    }

    fn search_needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase)
    }
}

/// Returns the catalog events matching `filter`, in catalog order.
pub fn filter_catalog<'a>(catalog: &'a Catalog, filter: &EventFilter) -> Vec<&'a Event> {
    let needle = filter.search_needle();
    catalog
        .iter()
        .filter(|event| filter.matches_with(event, needle.as_deref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::event;

    fn sample_catalog() -> Catalog {
        let mut keynote = event("th-01", Day::Thursday, "7:00 PM", "8:00 PM");
        keynote.title = "Opening Keynote".to_string();
        keynote.category = Category::Keynote;

        let mut youth = event("fr-01", Day::Friday, "9:00 AM", "10:00 AM");
        youth.title = "Faith and Friendship".to_string();
        youth.focus_group = FocusGroup::Youth;

        let mut clergy = event("fr-02", Day::Friday, "9:00 AM", "10:00 AM");
        clergy.title = "Pastoral Care Roundtable".to_string();
        clergy.focus_group = FocusGroup::Clergy;
        clergy.category = Category::Panel;
        clergy.description = "Open discussion on ministry to YOUTH".to_string();

        let mut liturgy = event("fr-03", Day::Friday, "6:00 PM", "7:30 PM");
        liturgy.title = "Evening Prayer".to_string();
        liturgy.category = Category::Liturgy;

        let mut families = event("sa-01", Day::Saturday, "10:00 AM", "11:00 AM");
        families.title = "Raising Kids in Faith".to_string();
        families.focus_group = FocusGroup::Families;

        Catalog::new(vec![keynote, youth, clergy, liturgy, families]).unwrap()
    }

    fn ids(events: &[&Event]) -> Vec<String> {
        events.iter().map(|e| e.id.to_string()).collect()
    }

    #[test]
    fn empty_filter_returns_full_catalog_in_order() {
        let catalog = sample_catalog();
        let filter = EventFilter::new();
        assert!(filter.is_unconstrained());
        assert_eq!(
            ids(&filter_catalog(&catalog, &filter)),
            ["th-01", "fr-01", "fr-02", "fr-03", "sa-01"]
        );
    }

    #[test]
    fn all_sentinel_and_empty_search_do_not_constrain() {
        let catalog = sample_catalog();
        let filter = EventFilter::new()
            .with_focus_group(FocusGroup::All)
            .with_search("");
        assert!(filter.is_unconstrained());
        assert_eq!(filter_catalog(&catalog, &filter).len(), catalog.len());
    }

    #[test]
    fn predicates_are_conjunctive() {
        let catalog = sample_catalog();
        let friday_workshops = EventFilter::new()
            .with_day(Day::Friday)
            .with_category(Category::Workshop);
        assert_eq!(ids(&filter_catalog(&catalog, &friday_workshops)), ["fr-01"]);

        let sunday_panels = EventFilter::new()
            .with_day(Day::Sunday)
            .with_category(Category::Panel);
        assert!(filter_catalog(&catalog, &sunday_panels).is_empty());
    }

    #[test]
    fn audience_filter_includes_events_for_everyone() {
        let catalog = sample_catalog();
        let youth = EventFilter::new().with_focus_group(FocusGroup::Youth);
        assert_eq!(
            ids(&filter_catalog(&catalog, &youth)),
            ["th-01", "fr-01", "fr-03"]
        );
    }

    #[test]
    fn search_matches_title_or_description_case_insensitively() {
        let catalog = sample_catalog();
        let search = EventFilter::new().with_search("youth");
        assert_eq!(ids(&filter_catalog(&catalog, &search)), ["fr-02"]);

        let search = EventFilter::new().with_search("FAITH");
        assert_eq!(ids(&filter_catalog(&catalog, &search)), ["fr-01", "sa-01"]);
    }

    #[test]
    fn search_combines_with_other_predicates() {
        let catalog = sample_catalog();
        let filter = EventFilter::new()
            .with_search("faith")
            .with_day(Day::Saturday);
        assert_eq!(ids(&filter_catalog(&catalog, &filter)), ["sa-01"]);
        assert!(filter.matches(catalog.events().last().unwrap()));
    }
}
