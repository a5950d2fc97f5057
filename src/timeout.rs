//! Deadline index for an event loop: timers keyed by absolute expiry.
//!
//! Each timer record embeds a tree node via the `tempo_tree` arena; the
//! queue performs its own search-and-splice over deadlines (the tree has no
//! comparison hook), asks the tree for the minimum to find the next wakeup,
//! and erases nodes when timers fire or are canceled. One queue instance
//! expects a single writer; `&mut self` throughout enforces that.

use tempo_tree::{NodeId, RBIndex};

use crate::error::{TimerError, TimerResult};

#[derive(Debug)]
struct Entry<T> {
    deadline: u64,
    seq: u64,
    data: T,
}

/// Handle to a scheduled timer.
///
/// Carries a sequence number so a handle that outlives its timer (the
/// arena slot got reused) is detected instead of erasing someone else's
/// timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    id: NodeId,
    seq: u64,
}

/// Timer queue ordered by absolute expiry time (in caller-defined ticks).
///
/// Timers with equal deadlines fire in scheduling order.
#[derive(Debug)]
pub struct TimerQueue<T> {
    tree: RBIndex<Entry<T>>,
    next_seq: u64,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            tree: RBIndex::new(),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Schedule `data` to fire at `deadline`.
    pub fn schedule(&mut self, deadline: u64, data: T) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;

        let id = self.tree.alloc(Entry {
            deadline,
            seq,
            data,
        });
        // Equal deadlines descend right: scheduling order among equals
        let point = self
            .tree
            .find_insertion_point(|probe| deadline < probe.deadline);
        self.tree.insert_at(point, id);

        TimerHandle { id, seq }
    }

    /// Cancel a pending timer and recover its payload.
    pub fn cancel(&mut self, handle: TimerHandle) -> TimerResult<T> {
        let live = match self.tree.try_get(handle.id) {
            Some(entry) => entry.seq == handle.seq,
            None => false,
        };
        if !live {
            return Err(TimerError::StaleHandle);
        }

        self.tree.erase(handle.id);
        Ok(self.tree.free(handle.id).data)
    }

    /// Nearest pending deadline, or None when nothing is scheduled.
    pub fn next_deadline(&self) -> Option<u64> {
        self.tree.first().map(|id| self.tree.get(id).deadline)
    }

    /// Detach and return every timer with `deadline <= now`, in firing
    /// order.
    pub fn pop_expired(&mut self, now: u64) -> Vec<(u64, T)> {
        let mut fired = Vec::new();
        while let Some(id) = self.tree.first() {
            let deadline = self.tree.get(id).deadline;
            if deadline > now {
                break;
            }
            self.tree.erase(id);
            let entry = self.tree.free(id);
            fired.push((entry.deadline, entry.data));
        }
        fired
    }

    /// Drop every pending timer.
    pub fn clear(&mut self) {
        self.tree.clear();
    }
}
