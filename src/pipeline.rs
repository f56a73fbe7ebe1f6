use crate::entity::{Entity, StatusValue, STATUS_ALL};
use crate::table::{FilterState, Order};
use std::cmp::Ordering;

/// Column comparator for `order_by`, reversed for `Order::Desc`.
pub fn comparator<E: Entity>(order: Order, order_by: &str) -> impl Fn(&E, &E) -> Ordering + '_ {
    move |a, b| {
        let ord = a.sort_key(order_by).compare(&b.sort_key(order_by));
        match order {
            Order::Asc => ord,
            Order::Desc => ord.reverse(),
        }
    }
}

/// Sorts then filters one loaded page. Ties keep their input order and
/// `input` is left untouched.
pub fn apply_filter<E, C>(input: &[E], filters: &FilterState, comparator: C) -> Vec<E>
where
    E: Entity,
    C: Fn(&E, &E) -> Ordering,
{
    let mut indexed: Vec<(usize, &E)> = input.iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| comparator(*a, *b).then_with(|| ia.cmp(ib)));

    let needle = filters.name.trim().to_lowercase();

    indexed
        .into_iter()
        .map(|(_, row)| row)
        .filter(|row| {
            needle.is_empty()
                || row
                    .search_fields()
                    .iter()
                    .any(|f| f.to_lowercase().contains(&needle))
        })
        .filter(|row| filters.status == STATUS_ALL || row.status().as_str() == filters.status)
        .filter(|row| {
            filters.role.is_empty()
                || row
                    .role()
                    .is_some_and(|r| filters.role.iter().any(|want| want == r))
        })
        .cloned()
        .collect()
}

/// Row counts per status tab (`all` first) for the loaded page.
pub fn status_counts<E: Entity>(rows: &[E]) -> Vec<(&'static str, usize)> {
    let mut out = vec![(STATUS_ALL, rows.len())];
    for status in E::Status::VALUES {
        let n = rows.iter().filter(|r| r.status() == *status).count();
        out.push((status.as_str(), n));
    }
    out
}
