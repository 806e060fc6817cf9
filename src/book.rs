//! Order book: three insertion-ordered sub-books (Market, Limit, Stop) of
//! pending order references.
//!
//! Each sub-book keeps a `Vec<OrderRef>` plus a reference → position index so
//! removal is O(1) swap-with-last-and-pop (the moved last element is
//! re-indexed). Removal is idempotent; `remove_everywhere` purges a reference
//! from all three sub-books so no terminal path can leave a ghost entry.

use std::collections::HashMap;

use crate::types::{OrderKind, OrderRef};

/// One insertion-ordered sequence of order references with an O(1) removal
/// index.
#[derive(Debug, Default)]
pub struct SubBook {
    refs: Vec<OrderRef>,
    index: HashMap<OrderRef, usize>,
}

impl SubBook {
    /// Appends a reference. No-op if already present.
    pub fn push(&mut self, reference: OrderRef) {
        if self.index.contains_key(&reference) {
            return;
        }
        self.index.insert(reference, self.refs.len());
        self.refs.push(reference);
    }

    /// Swap-removes a reference. Returns false (no-op) if absent.
    pub fn remove(&mut self, reference: OrderRef) -> bool {
        let Some(pos) = self.index.remove(&reference) else {
            return false;
        };
        self.refs.swap_remove(pos);
        // The element swapped into `pos` (if any) must be re-indexed.
        if pos < self.refs.len() {
            self.index.insert(self.refs[pos], pos);
        }
        true
    }

    pub fn contains(&self, reference: OrderRef) -> bool {
        self.index.contains_key(&reference)
    }

    /// Current contents in insertion order (callers snapshot before mutating).
    pub fn refs(&self) -> &[OrderRef] {
        &self.refs
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

/// The three sub-books for one trading pair. Each holds both buy and sell
/// references of its kind; matching filters by side when scanning.
#[derive(Debug, Default)]
pub struct OrderBook {
    market: SubBook,
    limit: SubBook,
    stop: SubBook,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sub_book(&self, kind: OrderKind) -> &SubBook {
        match kind {
            OrderKind::Market => &self.market,
            OrderKind::Limit => &self.limit,
            OrderKind::Stop => &self.stop,
        }
    }

    fn sub_book_mut(&mut self, kind: OrderKind) -> &mut SubBook {
        match kind {
            OrderKind::Market => &mut self.market,
            OrderKind::Limit => &mut self.limit,
            OrderKind::Stop => &mut self.stop,
        }
    }

    /// Indexes a reference under the given sub-book.
    pub fn push(&mut self, kind: OrderKind, reference: OrderRef) {
        self.sub_book_mut(kind).push(reference);
    }

    /// Removes a reference from one sub-book. Idempotent.
    pub fn remove(&mut self, kind: OrderKind, reference: OrderRef) -> bool {
        self.sub_book_mut(kind).remove(reference)
    }

    /// Removes a reference from every sub-book it might still be indexed
    /// under. Terminal order paths (fill, cancel, settlement confirm) use
    /// this so a forgotten sibling index cannot leave a ghost order.
    pub fn remove_everywhere(&mut self, reference: OrderRef) -> bool {
        let a = self.market.remove(reference);
        let b = self.limit.remove(reference);
        let c = self.stop.remove(reference);
        a || b || c
    }

    /// Moves a reference from its current sub-book into the Market sub-book
    /// (trigger promotion).
    pub fn promote_to_market(&mut self, reference: OrderRef) {
        self.limit.remove(reference);
        self.stop.remove(reference);
        self.market.push(reference);
    }

    /// True if no sub-book indexes the reference.
    pub fn is_unindexed(&self, reference: OrderRef) -> bool {
        !self.market.contains(reference)
            && !self.limit.contains(reference)
            && !self.stop.contains(reference)
    }
}
