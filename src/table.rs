use crate::entity::STATUS_ALL;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

/// Paging, sorting and selection for one list view.
///
/// `selected` is not pruned here when rows go away; whoever replaces the rows
/// reconciles it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableState {
    pub page: usize,
    pub rows_per_page: usize,
    pub order: Order,
    pub order_by: String,
    pub selected: Vec<String>,
    pub dense: bool,
}

impl TableState {
    pub fn new(rows_per_page: NonZeroUsize, order_by: &str) -> Self {
        Self {
            page: 0,
            rows_per_page: rows_per_page.get(),
            order: Order::Asc,
            order_by: order_by.to_string(),
            selected: Vec::new(),
            dense: false,
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Always lands on the first page.
    pub fn set_rows_per_page(&mut self, rows_per_page: NonZeroUsize) {
        self.rows_per_page = rows_per_page.get();
        self.page = 0;
    }

    pub fn on_sort(&mut self, column: &str) {
        if self.order_by == column {
            self.order = match self.order {
                Order::Asc => Order::Desc,
                Order::Desc => Order::Asc,
            };
        } else {
            self.order_by = column.to_string();
            self.order = Order::Asc;
        }
    }

    pub fn on_select_row(&mut self, id: &str) {
        if let Some(pos) = self.selected.iter().position(|s| s == id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(id.to_string());
        }
    }

    /// Replaces the selection wholesale; never unions with what was there.
    pub fn on_select_all_rows(&mut self, checked: bool, ids: Vec<String>) {
        self.selected = if checked { ids } else { Vec::new() };
    }

    pub fn on_reset_page(&mut self) {
        self.page = 0;
    }

    pub fn on_change_dense(&mut self, dense: bool) {
        self.dense = dense;
    }

    #[cfg(test)]
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    /// Filler rows needed to keep the last page the same height as the others.
    /// Never more than one page.
    pub fn empty_rows(&self, total: usize) -> usize {
        if self.page == 0 {
            return 0;
        }
        self.page
            .saturating_add(1)
            .saturating_mul(self.rows_per_page)
            .saturating_sub(total)
            .min(self.rows_per_page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub name: String,
    pub status: String,
    pub role: Vec<String>,
    pub scope: BTreeMap<String, String>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            name: String::new(),
            status: STATUS_ALL.to_string(),
            role: Vec::new(),
            scope: BTreeMap::new(),
        }
    }
}

impl FilterState {
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn set_role(&mut self, role: Vec<String>) {
        self.role = role;
    }

    /// `None` or a blank value removes the key.
    pub fn set_scope(&mut self, key: &str, value: Option<String>) {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(v) => {
                self.scope.insert(key.to_string(), v);
            }
            None => {
                self.scope.remove(key);
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn can_reset(&self) -> bool {
        *self != Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).expect("non-zero")
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn changing_rows_per_page_returns_to_first_page() {
        let mut t = TableState::new(nz(10), "name");
        for start in [0, 1, 7, 300] {
            t.set_page(start);
            t.set_rows_per_page(nz(25));
            assert_eq!(t.page, 0);
            assert_eq!(t.rows_per_page, 25);
        }
    }

    #[test]
    fn sort_toggles_same_column_and_resets_on_new_column() {
        let mut t = TableState::new(nz(10), "name");
        t.on_sort("name");
        assert_eq!(t.order, Order::Desc);
        t.on_sort("name");
        assert_eq!(t.order, Order::Asc);
        t.on_sort("name");
        t.on_sort("email");
        assert_eq!((t.order_by.as_str(), t.order), ("email", Order::Asc));
    }

    #[test]
    fn select_all_replaces_instead_of_union() {
        let mut t = TableState::new(nz(10), "name");
        t.on_select_all_rows(true, ids(&["a", "b", "c"]));
        t.on_select_all_rows(true, ids(&["b"]));
        assert_eq!(t.selected, ids(&["b"]));
        t.on_select_all_rows(false, ids(&["b"]));
        assert!(t.selected.is_empty());
    }

    #[test]
    fn select_row_toggles_membership() {
        let mut t = TableState::new(nz(10), "name");
        t.on_select_row("a");
        t.on_select_row("b");
        t.on_select_row("a");
        assert_eq!(t.selected, ids(&["b"]));
        assert!(t.is_selected("b"));
        assert!(!t.is_selected("a"));
    }

    #[test]
    fn empty_rows_pads_only_past_first_page() {
        let mut t = TableState::new(nz(5), "name");
        assert_eq!(t.empty_rows(2), 0);
        t.set_page(1);
        assert_eq!(t.empty_rows(7), 3);
        assert_eq!(t.empty_rows(40), 0);
    }

    #[test]
    fn empty_rows_saturates_for_pages_far_past_the_end() {
        let mut t = TableState::new(nz(25), "name");
        t.set_page(usize::MAX);
        assert_eq!(t.empty_rows(3), 25);
        t.set_page(usize::MAX / 2);
        assert_eq!(t.empty_rows(usize::MAX), 0);
    }

    #[test]
    fn filter_scope_blank_values_remove_key() {
        let mut f = FilterState::default();
        assert!(!f.can_reset());
        f.set_scope("countryCode", Some("AU".into()));
        assert!(f.can_reset());
        f.set_scope("countryCode", Some("  ".into()));
        assert!(f.scope.is_empty());
        f.set_status("inactive");
        f.reset();
        assert_eq!(f, FilterState::default());
    }
}
