//! Future-dated state transitions.

use super::DiseaseState;
use crate::NodeId;
use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScheduledTransition {
    pub day: u32,
    pub node: NodeId,
    pub target: DiseaseState,
}

// Ordered by day, then by insertion so that same-day transitions run first-scheduled-first.
#[derive(Debug, PartialEq, Eq)]
struct Entry {
    sequence: u64,
    transition: ScheduledTransition,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.transition.day, self.sequence).cmp(&(other.transition.day, other.sequence))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A min-heap of [`ScheduledTransition`]s keyed by `(day, insertion sequence)`.
#[derive(Debug, Default)]
pub struct TransitionQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    next_sequence: u64,
}

impl TransitionQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, day: u32, node: NodeId, target: DiseaseState) {
        let entry = Entry {
            sequence: self.next_sequence,
            transition: ScheduledTransition { day, node, target },
        };
        self.next_sequence += 1;
        self.heap.push(Reverse(entry));
    }

    /// Removes and returns the earliest transition if it is due on or before `day`.
    pub fn pop_due(&mut self, day: u32) -> Option<ScheduledTransition> {
        match self.heap.peek() {
            Some(Reverse(entry)) if entry.transition.day <= day => {
                self.heap.pop().map(|Reverse(entry)| entry.transition)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn next_day(&self) -> Option<u32> {
        self.heap.peek().map(|Reverse(entry)| entry.transition.day)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
