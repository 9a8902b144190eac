//! Sibling order allocation.
//!
//! Positive requested orders are taken as given. A non-positive request
//! means "append": past the current maximum in ascending mode, before the
//! current minimum in descending mode. The first sibling of an empty
//! ascending group keeps order 0.
//!
//! In descending mode a manual reorder moves the siblings into a block
//! starting at [`DESCENDING_REORDER_BASE`], listed ascending ahead of the
//! naturally ordered ones, which list descending. Reordering back to the
//! newest-first sequence dissolves the block.

use serde::{Deserialize, Serialize};

/// First order value of a manual reorder in descending mode.
pub const DESCENDING_REORDER_BASE: i32 = 200_000;

/// Container-level sort setting of sibling lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    /// Youngest first
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderPolicy {
    pub direction: SortDirection,
}

impl OrderPolicy {
    pub fn new(direction: SortDirection) -> Self {
        Self { direction }
    }

    /// Order for a new or moved sibling, given the group's `(min, max)`.
    pub fn allocate(&self, requested: i32, bounds: Option<(i32, i32)>) -> i32 {
        if requested > 0 {
            return requested;
        }
        match (self.direction, bounds) {
            (SortDirection::Ascending, Some((_, max))) => max.saturating_add(1),
            (SortDirection::Ascending, None) => requested.max(0),
            (SortDirection::Descending, Some((min, _))) => min.saturating_sub(1).max(1),
            (SortDirection::Descending, None) => DESCENDING_REORDER_BASE - 1,
        }
    }

    /// Orders for `count` siblings reordered in the requested sequence.
    ///
    /// `newest_first` tells whether that sequence is the youngest-first one.
    pub fn reorder_values(&self, count: usize, newest_first: bool) -> Vec<i32> {
        let count = i32::try_from(count).unwrap_or(i32::MAX);
        match self.direction {
            SortDirection::Ascending => (1..=count).collect(),
            SortDirection::Descending if newest_first => (1..=count).rev().collect(),
            SortDirection::Descending => {
                (0..count).map(|i| DESCENDING_REORDER_BASE + i).collect()
            }
        }
    }

    /// Listing sort key for a sibling. `seq` breaks ties between equal orders.
    pub fn sort_key(&self, order: i32, seq: i64) -> (bool, i64, i64) {
        match self.direction {
            SortDirection::Ascending => (false, i64::from(order), seq),
            SortDirection::Descending if order >= DESCENDING_REORDER_BASE => {
                (false, i64::from(order), seq)
            }
            SortDirection::Descending => (true, -i64::from(order), -seq),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(policy: OrderPolicy, requests: &[i32]) -> Vec<i32> {
        let mut orders: Vec<i32> = Vec::new();
        for &requested in requests {
            let bounds = orders
                .iter()
                .copied()
                .fold(None, |acc: Option<(i32, i32)>, o| match acc {
                    None => Some((o, o)),
                    Some((min, max)) => Some((min.min(o), max.max(o))),
                });
            orders.push(policy.allocate(requested, bounds));
        }
        orders
    }

    #[test]
    fn test_ascending_allocation_sequence() {
        let orders = fill(
            OrderPolicy::default(),
            &[10, 5, 0, -6, 30, 40, 10_000_000, -3_890_000, 78, 1, 10],
        );
        assert_eq!(orders[2], 11);
        assert_eq!(orders[3], 12);
        assert_eq!(orders[7], 10_000_001);
        assert_eq!(*orders.iter().min().unwrap(), 1);
        assert_eq!(*orders.iter().max().unwrap(), 10_000_001);
    }

    #[test]
    fn test_ascending_empty_group_keeps_zero() {
        let policy = OrderPolicy::default();
        assert_eq!(policy.allocate(0, None), 0);
        assert_eq!(policy.allocate(-4, None), 0);
        assert_eq!(policy.allocate(0, Some((0, 0))), 1);
        assert_eq!(policy.allocate(3, None), 3);
    }

    #[test]
    fn test_descending_allocation_goes_before_min() {
        let policy = OrderPolicy::new(SortDirection::Descending);
        assert_eq!(policy.allocate(0, Some((200_000, 200_002))), 199_999);
        assert_eq!(policy.allocate(0, None), 199_999);
        assert_eq!(policy.allocate(0, Some((1, 4))), 1);
        assert_eq!(policy.allocate(7, Some((1, 4))), 7);
    }

    #[test]
    fn test_reorder_values() {
        assert_eq!(OrderPolicy::default().reorder_values(3, false), vec![1, 2, 3]);
        assert_eq!(OrderPolicy::default().reorder_values(3, true), vec![1, 2, 3]);

        let policy = OrderPolicy::new(SortDirection::Descending);
        assert_eq!(policy.reorder_values(3, false), vec![200_000, 200_001, 200_002]);
        assert_eq!(policy.reorder_values(4, true), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_descending_sort_key() {
        let policy = OrderPolicy::new(SortDirection::Descending);
        let mut items = vec![(5, 1), (50, 2), (100, 3)];
        items.sort_by_key(|&(order, seq)| policy.sort_key(order, seq));
        assert_eq!(items, vec![(100, 3), (50, 2), (5, 1)]);

        let mut items = vec![(199_999, 5), (200_001, 1), (200_000, 3), (200_002, 2)];
        items.sort_by_key(|&(order, seq)| policy.sort_key(order, seq));
        assert_eq!(items, vec![(200_000, 3), (200_001, 1), (200_002, 2), (199_999, 5)]);
    }
}
