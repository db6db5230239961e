use tracing::debug;

use crate::{
    aggregate::{SearchOutcome, SearchStatus},
    model::{CityView, SearchResult},
    recent::RecentSearches,
};

/// Owner of the displayed search result, the selected city and the recent
/// searches. All mutation goes through `&mut self`.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    current: SearchResult,
    selected: Option<String>,
    recent: RecentSearches,
}

impl Dashboard {
    pub fn new(recent: RecentSearches) -> Self {
        Self {
            recent,
            ..Self::default()
        }
    }

    pub fn current(&self) -> &SearchResult {
        &self.current
    }

    pub fn recent(&self) -> &RecentSearches {
        &self.recent
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Replaces the displayed result when the search found at least one city.
    ///
    /// Empty input and all-failed searches leave every piece of state as it
    /// was. Returns whether anything changed.
    pub fn apply(&mut self, outcome: SearchOutcome) -> bool {
        match outcome.status() {
            SearchStatus::EmptyInput | SearchStatus::NoResults => {
                debug!(status = ?outcome.status(), "keeping previous result");
                false
            }
            SearchStatus::Success => {
                self.recent.merge_front(&outcome.matched_names());
                self.selected = outcome.selected().map(str::to_string);
                self.current = outcome.result;
                true
            }
        }
    }

    /// Switches the selected city; unknown names are ignored.
    pub fn select(&mut self, name: &str) -> bool {
        match self
            .current
            .snapshots
            .iter()
            .find(|s| s.name.to_lowercase() == name.trim().to_lowercase())
        {
            Some(s) => {
                self.selected = Some(s.name.clone());
                true
            }
            None => false,
        }
    }

    pub fn selected_view(&self) -> Option<CityView<'_>> {
        self.selected.as_deref().and_then(|n| self.current.city(n))
    }

    pub fn forget_recent(&mut self, name: &str) -> bool {
        self.recent.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Condition;
    use crate::model::fixtures::snapshot;
    use crate::model::{CityFailure, Stage};

    fn outcome(requested: &[&str], resolved: &[&str]) -> SearchOutcome {
        let mut result = SearchResult::default();
        for name in resolved {
            result.snapshots.push(snapshot(name, 1.0, 2.0));
            result.aqi.insert(name.to_string(), Some(20));
            result.uv.insert(name.to_string(), None);
        }
        SearchOutcome {
            requested: requested.iter().map(|s| s.to_string()).collect(),
            result,
            failures: vec![],
        }
    }

    #[test]
    fn success_replaces_result_and_selects_first() {
        let mut dash = Dashboard::default();
        assert!(dash.apply(outcome(&["london", "paris"], &["London", "Paris"])));

        assert_eq!(dash.selected(), Some("London"));
        assert_eq!(dash.current().snapshots.len(), 2);
        assert_eq!(dash.recent().names(), &["London", "Paris"]);

        assert!(dash.apply(outcome(&["tokyo"], &["Tokyo"])));
        assert_eq!(dash.current().snapshots.len(), 1);
        assert!(!dash.current().contains("London"));
        assert_eq!(dash.recent().names(), &["Tokyo", "London", "Paris"]);
    }

    #[test]
    fn failed_search_keeps_previous_state() {
        let mut dash = Dashboard::default();
        dash.apply(outcome(&["London"], &["London"]));

        let mut failed = outcome(&["Atlantis"], &[]);
        failed.failures.push(CityFailure {
            city: "Atlantis".into(),
            stage: Stage::Current,
            condition: Condition::NotFound("404".into()),
        });
        assert!(!dash.apply(failed));
        assert!(!dash.apply(outcome(&[], &[])));

        assert_eq!(dash.selected(), Some("London"));
        assert!(dash.current().contains("London"));
        assert_eq!(dash.recent().names(), &["London"]);
    }

    #[test]
    fn only_names_matching_input_enter_history() {
        let mut dash = Dashboard::default();
        // "NYC" resolves to "New York": shown, but not remembered
        dash.apply(outcome(&["NYC", "paris"], &["New York", "Paris"]));
        assert_eq!(dash.recent().names(), &["Paris"]);
        assert_eq!(dash.selected(), Some("New York"));
    }

    #[test]
    fn select_and_view() {
        let mut dash = Dashboard::default();
        dash.apply(outcome(&["London", "Paris"], &["London", "Paris"]));

        assert!(dash.select("paris"));
        assert_eq!(dash.selected(), Some("Paris"));
        assert_eq!(dash.selected_view().map(|v| v.aqi), Some(Some(20)));

        assert!(!dash.select("Rome"));
        assert_eq!(dash.selected(), Some("Paris"));
    }

    #[test]
    fn forget_recent_removes_entry() {
        let mut dash = Dashboard::new(RecentSearches::from_names(["London", "Paris"]));
        assert!(dash.forget_recent("London"));
        assert_eq!(dash.recent().names(), &["Paris"]);
    }
}
