//! Set reconciliation between the two sides.
//!
//! Both operations are sorted merges over already ordered, deduplicated
//! inputs (`BTreeSet` iteration order), linear in the combined size.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use evs_core::EventId;

use crate::collector::SideEvents;

/// Number of datasets being compared.
pub const N_SIDES: usize = 2;

/// Elements present in both sorted inputs, in order.
pub fn intersect<'a, T, A, B>(a: A, b: B) -> Vec<T>
where
    T: Ord + Copy + 'a,
    A: IntoIterator<Item = &'a T>,
    B: IntoIterator<Item = &'a T>,
{
    let mut a = a.into_iter().peekable();
    let mut b = b.into_iter().peekable();
    let mut out = Vec::new();
    while let (Some(x), Some(y)) = (a.peek(), b.peek()) {
        match x.cmp(y) {
            Ordering::Less => {
                a.next();
            }
            Ordering::Greater => {
                b.next();
            }
            Ordering::Equal => {
                out.push(**x);
                a.next();
                b.next();
            }
        }
    }
    out
}

/// Elements of sorted `a` that are absent from sorted `b`, in order.
pub fn difference<'a, T, A, B>(a: A, b: B) -> Vec<T>
where
    T: Ord + Copy + 'a,
    A: IntoIterator<Item = &'a T>,
    B: IntoIterator<Item = &'a T>,
{
    let mut b = b.into_iter().peekable();
    let mut out = Vec::new();
    for x in a {
        while b.next_if(|y| *y < x).is_some() {}
        if b.peek() != Some(&x) {
            out.push(*x);
        }
    }
    out
}

/// Row lookups for common and one-sided events. Built once, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct EventMatching {
    /// Identifier to `(row in A, row in B)` for events present in both.
    pub common: BTreeMap<EventId, (usize, usize)>,
    /// Per side: identifier to row for events absent from the other side.
    pub only: [BTreeMap<EventId, usize>; N_SIDES],
}

impl EventMatching {
    /// Reconcile both sides.
    pub fn build(sides: &[SideEvents; N_SIDES]) -> Self {
        let [a, b] = sides;
        let common = intersect(&a.unique, &b.unique)
            .into_iter()
            .filter_map(|id| Some((id, (*a.entry_map.get(&id)?, *b.entry_map.get(&id)?))))
            .collect();

        let only = std::array::from_fn(|n| {
            let other = &sides[N_SIDES - 1 - n];
            difference(&sides[n].unique, &other.unique)
                .into_iter()
                .filter_map(|id| Some((id, *sides[n].entry_map.get(&id)?)))
                .collect()
        });

        Self { common, only }
    }

    /// Number of events present on both sides.
    pub fn common_count(&self) -> usize {
        self.common.len()
    }
}
