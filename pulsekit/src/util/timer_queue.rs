//! Deadline-ordered queue of cancellable actions.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use slab::Slab;

use crate::time::MonotonicTime;

/// Once the heap holds this many more entries than there are live actions, it
/// is rebuilt from the live actions only.
const COMPACTION_SLACK: usize = 64;

/// A queue of actions ordered by deadline.
///
/// Actions sharing the same deadline are pulled in insertion order. An action
/// can be cancelled in *O*(1) time with the key returned at insertion; its
/// heap entry is then left behind and discarded lazily the next time it
/// reaches the top of the heap.
pub(crate) struct TimerQueue<A> {
    heap: BinaryHeap<Reverse<Entry>>,
    actions: Slab<Slot<A>>,
    next_epoch: u64,
}

impl<A> TimerQueue<A> {
    /// Creates an empty queue.
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            actions: Slab::new(),
            next_epoch: 0,
        }
    }

    /// Inserts an action and returns a unique key that can be used to cancel
    /// it.
    pub(crate) fn insert(&mut self, deadline: MonotonicTime, action: A) -> TimerKey {
        let epoch = self.next_epoch;
        self.next_epoch += 1;

        let slot = self.actions.insert(Slot { epoch, action });
        self.heap.push(Reverse(Entry {
            deadline,
            epoch,
            slot,
        }));

        TimerKey { slot, epoch }
    }

    /// Cancels the action associated to the key if it is still queued.
    ///
    /// Returns `true` if the action was indeed removed.
    pub(crate) fn cancel(&mut self, key: TimerKey) -> bool {
        match self.actions.get(key.slot) {
            Some(slot) if slot.epoch == key.epoch => {
                self.actions.remove(key.slot);
                self.maybe_compact();

                true
            }
            _ => false,
        }
    }

    /// Returns the earliest deadline of a live action, if any.
    pub(crate) fn next_deadline(&mut self) -> Option<MonotonicTime> {
        self.discard_stale();

        self.heap.peek().map(|Reverse(entry)| entry.deadline)
    }

    /// Pulls the earliest live action if its deadline is no later than
    /// `upper_bound`.
    pub(crate) fn pull_due(&mut self, upper_bound: MonotonicTime) -> Option<(MonotonicTime, A)> {
        self.discard_stale();

        match self.heap.peek() {
            Some(Reverse(entry)) if entry.deadline <= upper_bound => {}
            _ => return None,
        }
        let Reverse(entry) = self.heap.pop()?;
        let slot = self.actions.remove(entry.slot);

        Some((entry.deadline, slot.action))
    }

    /// Removes all actions, returning them in unspecified order.
    pub(crate) fn drain(&mut self) -> Vec<A> {
        self.heap.clear();

        self.actions.drain().map(|slot| slot.action).collect()
    }

    /// Pops heap entries whose action was cancelled.
    fn discard_stale(&mut self) {
        while let Some(Reverse(entry)) = self.heap.peek() {
            if self.is_live(entry) {
                break;
            }
            self.heap.pop();
        }
    }

    fn is_live(&self, entry: &Entry) -> bool {
        self.actions
            .get(entry.slot)
            .is_some_and(|slot| slot.epoch == entry.epoch)
    }

    /// Rebuilds the heap when cancelled entries dominate it.
    fn maybe_compact(&mut self) {
        if self.heap.len() <= self.actions.len() * 2 + COMPACTION_SLACK {
            return;
        }
        let heap = std::mem::take(&mut self.heap);
        let live: BinaryHeap<_> = heap
            .into_iter()
            .filter(|Reverse(entry)| self.is_live(entry))
            .collect();
        self.heap = live;
    }
}

/// A unique insertion key that can be used to cancel an action.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub(crate) struct TimerKey {
    slot: usize,
    epoch: u64,
}

/// A heap entry.
///
/// The derived ordering is lexicographic, so entries are sorted by deadline
/// first and by insertion epoch second.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    deadline: MonotonicTime,
    epoch: u64,
    slot: usize,
}

struct Slot<A> {
    epoch: u64,
    action: A,
}
