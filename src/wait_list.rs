// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// FIFO of waiter records: tail insert, head removal, and O(1) unlink of an
// arbitrary entry by key. Nodes live in a `slab::Slab` and are linked by
// slab key.

use std::sync::Arc;

use slab::Slab;

use crate::waiter::Waiter;

/// Position of a queued waiter, valid until that entry is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WaiterKey(usize);

struct Node {
    waiter: Arc<Waiter>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Ordered wait list. Not synchronized; callers hold the rwsem spin lock.
pub(crate) struct WaitList {
    nodes: Slab<Node>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl WaitList {
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Slab::new(),
            head: None,
            tail: None,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Exactly one entry queued.
    pub(crate) fn is_singular(&self) -> bool {
        self.head.is_some() && self.head == self.tail
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Append to the tail.
    pub(crate) fn push_back(&mut self, waiter: Arc<Waiter>) -> WaiterKey {
        let key = self.nodes.insert(Node {
            waiter,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);
        WaiterKey(key)
    }

    pub(crate) fn front(&self) -> Option<&Arc<Waiter>> {
        self.head.map(|key| &self.nodes[key].waiter)
    }

    pub(crate) fn pop_front(&mut self) -> Option<Arc<Waiter>> {
        let head = self.head?;
        Some(self.unlink(head))
    }

    /// Unlink the entry at `key`.
    pub(crate) fn remove(&mut self, key: WaiterKey) -> Arc<Waiter> {
        self.unlink(key.0)
    }

    /// Count consecutive readers from the head. The flag tells whether the
    /// walk ran off the end of the list instead of stopping at a writer.
    pub(crate) fn leading_readers(&self) -> (usize, bool) {
        let mut woken = 0;
        let mut cursor = self.head;
        while let Some(key) = cursor {
            let node = &self.nodes[key];
            if !node.waiter.is_reader() {
                return (woken, false);
            }
            woken += 1;
            cursor = node.next;
        }
        (woken, true)
    }

    /// Iterate waiters from head to tail.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn unlink(&mut self, key: usize) -> Arc<Waiter> {
        let node = self.nodes.remove(key);
        match node.prev {
            Some(prev) => self.nodes[prev].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.nodes[next].prev = node.prev,
            None => self.tail = node.prev,
        }
        node.waiter
    }
}

impl Default for WaitList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) struct Iter<'a> {
    list: &'a WaitList,
    cursor: Option<usize>,
}

#[cfg(test)]
impl<'a> Iterator for Iter<'a> {
    type Item = &'a Arc<Waiter>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.cursor?;
        let node = &self.list.nodes[key];
        self.cursor = node.next;
        Some(&node.waiter)
    }
}
