//! One list view: the loaded page, its table/filter state, and the fetch
//! lifecycle that ties them together.
//!
//! Changes to page, page size, status or scope go back to the server; the name
//! and role filters only narrow the rows already loaded.

use crate::actions::{Notice, NoticeLevel};
use crate::api::{self, ApiError, ErrorKind, FetchedPage, PageQuery, Transport};
use crate::entity::{Entity, EntityFamily};
use crate::pipeline::{apply_filter, comparator, status_counts};
use crate::table::{FilterState, TableState};
use serde::Serialize;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewState {
    Loading,
    Ready,
}

/// Handed out by `begin_fetch`; only the newest ticket may land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    pub query: PageQuery,
}

#[derive(Debug, Clone)]
pub struct ListView<E: Entity> {
    pub(crate) table: TableState,
    pub(crate) filters: FilterState,
    pub(crate) rows: Vec<E>,
    pub(crate) total: usize,
    pub(crate) state: ViewState,
    generation: u64,
    pub(crate) notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot<E> {
    pub family: EntityFamily,
    pub state: ViewState,
    pub generation: u64,
    pub rows: Vec<E>,
    pub loaded_count: usize,
    pub total: usize,
    pub is_empty: bool,
    pub empty_rows: usize,
    pub table: TableState,
    pub filters: FilterState,
    pub can_reset: bool,
    pub status_counts: BTreeMap<&'static str, usize>,
    pub pending_notices: usize,
}

impl<E: Entity> ListView<E> {
    /// A freshly mounted view; it stays `Loading` until its first fetch lands.
    pub fn new(rows_per_page: NonZeroUsize) -> Self {
        Self {
            table: TableState::new(rows_per_page, E::FAMILY.default_order_by()),
            filters: FilterState::default(),
            rows: Vec::new(),
            total: 0,
            state: ViewState::Loading,
            generation: 0,
            notices: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> ViewState {
        self.state
    }

    #[cfg(test)]
    pub fn table(&self) -> &TableState {
        &self.table
    }

    #[cfg(test)]
    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[E] {
        &self.rows
    }

    #[cfg(test)]
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn query(&self) -> PageQuery {
        PageQuery {
            status: self.filters.status.clone(),
            page: self.table.page,
            page_size: self.table.rows_per_page,
            scope: self.filters.scope.clone(),
        }
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.state = ViewState::Loading;
        FetchTicket {
            generation: self.generation,
            query: self.query(),
        }
    }

    /// Lands a fetch result. Returns `Ok(false)` when a newer fetch has been
    /// issued since `ticket`; an authorization failure is handed back to the
    /// caller, any other failure becomes a notice and keeps the old rows.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<FetchedPage<E>, ApiError>,
    ) -> Result<bool, ApiError> {
        if ticket.generation != self.generation {
            log::debug!(
                "dropping stale {} page (generation {} < {})",
                E::FAMILY.path(),
                ticket.generation,
                self.generation
            );
            return Ok(false);
        }
        self.state = ViewState::Ready;
        match result {
            Ok(page) => {
                self.rows = page.rows;
                self.total = page.total;
                let present: Vec<String> = self.rows.iter().map(|r| r.id().to_string()).collect();
                self.table.selected.retain(|id| present.contains(id));
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::Authorization => Err(e),
            Err(e) => {
                log::warn!("loading {} failed: {}", E::FAMILY.path(), e);
                self.notify(NoticeLevel::Error, format!("Failed to load {}: {}", E::FAMILY.path(), e));
                Ok(true)
            }
        }
    }

    /// Fetches the page the current state describes.
    pub fn load(&mut self, transport: &dyn Transport) -> Result<(), ApiError> {
        let ticket = self.begin_fetch();
        let result = api::fetch_page::<E>(transport, &ticket.query);
        self.complete_fetch(ticket, result).map(|_| ())
    }

    // The mutators below report whether the server needs to be asked again.

    pub fn set_page(&mut self, page: usize) -> bool {
        let changed = self.table.page != page;
        self.table.set_page(page);
        changed
    }

    pub fn set_rows_per_page(&mut self, rows_per_page: NonZeroUsize) -> bool {
        let changed = self.table.rows_per_page != rows_per_page.get() || self.table.page != 0;
        self.table.set_rows_per_page(rows_per_page);
        changed
    }

    pub fn set_status_filter(&mut self, status: &str) -> bool {
        if self.filters.status == status {
            return false;
        }
        self.filters.set_status(status);
        self.table.on_reset_page();
        true
    }

    pub fn set_scope(&mut self, key: &str, value: Option<String>) -> bool {
        let before = self.filters.scope.get(key).cloned();
        self.filters.set_scope(key, value);
        if self.filters.scope.get(key) == before.as_ref() {
            return false;
        }
        self.table.on_reset_page();
        true
    }

    /// Back to page 0; only a move off a later page needs the server.
    fn reset_page(&mut self) -> bool {
        let was = self.table.page;
        self.table.on_reset_page();
        was != 0
    }

    /// Client-side only; refetches just when it moved the view off a later page.
    pub fn set_name(&mut self, name: &str) -> bool {
        if self.filters.name == name {
            return false;
        }
        self.filters.set_name(name);
        self.reset_page()
    }

    /// Same paging rule as `set_name`.
    pub fn set_role(&mut self, role: Vec<String>) -> bool {
        if self.filters.role == role {
            return false;
        }
        self.filters.set_role(role);
        self.reset_page()
    }

    pub fn reset_filters(&mut self) -> bool {
        let server_side_changed = self.filters.status != FilterState::default().status
            || !self.filters.scope.is_empty()
            || self.table.page != 0;
        self.filters.reset();
        self.table.on_reset_page();
        server_side_changed
    }

    pub fn sort(&mut self, column: &str) {
        self.table.on_sort(column);
    }

    pub fn set_dense(&mut self, dense: bool) {
        self.table.on_change_dense(dense);
    }

    /// Only ids on the loaded page can be selected; returns false for others.
    pub fn select_row(&mut self, id: &str) -> bool {
        if !self.rows.iter().any(|r| r.id() == id) {
            return false;
        }
        self.table.on_select_row(id);
        true
    }

    /// Select-all acts on the rows currently visible.
    pub fn select_all(&mut self, checked: bool) {
        let ids = self.visible_rows().iter().map(|r| r.id().to_string()).collect();
        self.table.on_select_all_rows(checked, ids);
    }

    pub fn visible_rows(&self) -> Vec<E> {
        apply_filter(
            &self.rows,
            &self.filters,
            comparator::<E>(self.table.order, &self.table.order_by),
        )
    }

    pub(crate) fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn snapshot(&self) -> ViewSnapshot<E> {
        let rows = self.visible_rows();
        ViewSnapshot {
            family: E::FAMILY,
            state: self.state,
            generation: self.generation,
            loaded_count: self.rows.len(),
            total: self.total,
            is_empty: self.state == ViewState::Ready && rows.is_empty(),
            empty_rows: self.table.empty_rows(self.total),
            table: self.table.clone(),
            filters: self.filters.clone(),
            can_reset: self.filters.can_reset(),
            status_counts: status_counts(&self.rows).into_iter().collect(),
            pending_notices: self.notices.len(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{Call, FakeTransport};
    use crate::entity::Agent;
    use serde_json::json;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).expect("non-zero")
    }

    fn page(rows: serde_json::Value, total: usize) -> serde_json::Value {
        json!({ "agents": rows, "total": total })
    }

    fn query_value(call: &Call, key: &str) -> Option<String> {
        match call {
            Call::Get(_, q) => q.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    #[test]
    fn mount_loads_and_becomes_ready() {
        let t = FakeTransport::default();
        t.reply(page(json!([{ "id": "a", "name": "Zed" }, { "id": "b", "name": "amy" }]), 2));

        let mut v: ListView<Agent> = ListView::new(nz(10));
        assert_eq!(v.state(), ViewState::Loading);
        v.load(&t).expect("load");

        assert_eq!(v.state(), ViewState::Ready);
        let snap = v.snapshot();
        assert_eq!(snap.total, 2);
        assert_eq!(
            snap.rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["b", "a"]
        );
        assert!(!snap.is_empty);
    }

    #[test]
    fn status_tab_change_resets_page_and_refetches_with_status() {
        let t = FakeTransport::default();
        t.reply(page(json!([]), 0)).reply(page(json!([]), 0));

        let mut v: ListView<Agent> = ListView::new(nz(10));
        v.load(&t).expect("load");
        v.set_page(3);

        assert!(v.set_status_filter("inactive"));
        assert_eq!(v.table().page, 0);
        let ticket = v.begin_fetch();
        assert_eq!(v.state(), ViewState::Loading);
        assert_eq!(ticket.query.status, "inactive");
        assert_eq!(ticket.query.page, 0);

        let res = api::fetch_page::<Agent>(&t, &ticket.query);
        v.complete_fetch(ticket, res).expect("complete");
        assert_eq!(query_value(&t.calls.borrow()[1], "status").as_deref(), Some("inactive"));
        assert_eq!(query_value(&t.calls.borrow()[1], "page").as_deref(), Some("0"));
        assert!(v.snapshot().is_empty);
    }

    #[test]
    fn name_change_does_not_refetch_on_first_page() {
        let mut v: ListView<Agent> = ListView::new(nz(10));
        assert!(!v.set_name("am"));
        v.set_page(2);
        assert!(v.set_name("amy"));
        assert_eq!(v.table().page, 0);
        assert!(!v.set_role(vec!["master".into()]));
    }

    #[test]
    fn role_change_resets_page_like_name() {
        let mut v: ListView<Agent> = ListView::new(nz(10));
        v.set_page(3);
        assert!(v.set_role(vec!["master".into()]));
        assert_eq!(v.table().page, 0);
        assert!(!v.set_role(vec!["master".into()]));
        assert!(!v.set_role(Vec::new()));
        assert_eq!(v.table().page, 0);
    }

    #[test]
    fn select_row_ignores_ids_off_the_loaded_page() {
        let t = FakeTransport::default();
        t.reply(page(json!([{ "id": "a" }]), 1));
        let mut v: ListView<Agent> = ListView::new(nz(10));
        v.load(&t).expect("load");

        assert!(!v.select_row("ghost"));
        assert!(v.table().selected.is_empty());
        assert!(v.select_row("a"));
        assert_eq!(v.table().selected, vec!["a".to_string()]);
    }

    #[test]
    fn snapshot_survives_a_page_far_past_the_end() {
        let t = FakeTransport::default();
        t.reply(page(json!([]), 3));
        let mut v: ListView<Agent> = ListView::new(nz(10));
        assert!(v.set_page(usize::MAX));
        v.load(&t).expect("load");

        let snap = v.snapshot();
        assert_eq!(snap.empty_rows, 10);
        assert_eq!(snap.table.page, usize::MAX);
    }

    #[test]
    fn stale_fetch_results_are_ignored() {
        let mut v: ListView<Agent> = ListView::new(nz(10));
        let old = v.begin_fetch();
        v.set_status_filter("inactive");
        let new = v.begin_fetch();

        let fresh: Vec<Agent> =
            serde_json::from_value(json!([{ "id": "new", "status": "inactive" }])).expect("rows");
        assert!(v
            .complete_fetch(new, Ok(FetchedPage { rows: fresh, total: 1 }))
            .expect("new lands"));

        let stale: Vec<Agent> = serde_json::from_value(json!([{ "id": "old" }])).expect("rows");
        assert!(!v
            .complete_fetch(old, Ok(FetchedPage { rows: stale, total: 1 }))
            .expect("old dropped"));

        assert_eq!(v.rows()[0].id, "new");
        assert_eq!(v.state(), ViewState::Ready);
    }

    #[test]
    fn failed_fetch_keeps_previous_rows_and_notices_once() {
        let t = FakeTransport::default();
        t.reply(page(json!([{ "id": "a" }]), 1)).fail(ApiError::Server {
            status: 500,
            message: "boom".into(),
        });

        let mut v: ListView<Agent> = ListView::new(nz(10));
        v.load(&t).expect("first load");
        v.load(&t).expect("transport errors stay local");

        assert_eq!(v.rows().len(), 1);
        assert_eq!(v.state(), ViewState::Ready);
        let notices = v.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(v.take_notices().is_empty());
    }

    #[test]
    fn unauthorized_fetch_escalates() {
        let t = FakeTransport::default();
        t.fail(ApiError::Unauthorized);
        let mut v: ListView<Agent> = ListView::new(nz(10));
        let err = v.load(&t).expect_err("401 escalates");
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(v.take_notices().is_empty());
    }

    #[test]
    fn refetch_drops_selection_for_rows_no_longer_present() {
        let t = FakeTransport::default();
        t.reply(page(json!([{ "id": "a" }, { "id": "b" }]), 2))
            .reply(page(json!([{ "id": "b" }, { "id": "c" }]), 2));

        let mut v: ListView<Agent> = ListView::new(nz(10));
        v.load(&t).expect("load");
        v.select_all(true);
        assert_eq!(v.table().selected.len(), 2);
        v.load(&t).expect("reload");
        assert_eq!(v.table().selected, vec!["b".to_string()]);
    }

    #[test]
    fn select_all_takes_only_visible_rows() {
        let t = FakeTransport::default();
        t.reply(page(
            json!([{ "id": "a", "name": "Zed" }, { "id": "b", "name": "amy" }]),
            2,
        ));
        let mut v: ListView<Agent> = ListView::new(nz(10));
        v.load(&t).expect("load");
        v.set_name("am");
        v.select_all(true);
        assert_eq!(v.table().selected, vec!["b".to_string()]);
    }
}
