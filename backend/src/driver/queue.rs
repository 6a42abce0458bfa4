//! Time-ordered event queue

use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum EventKind {
    TaskArrival,
    ActivityCheck { worker: usize },
    ActivitySwitch { worker: usize, to: String },
}

/// Field order gives the heap ordering: time first, then insertion order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Scheduled {
    pub at_ms: u64,
    pub seq: u64,
    pub kind: EventKind,
}

/// Min-heap of events; ties at the same instant pop in insertion order
#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    heap: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, at_ms: u64, kind: EventKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Scheduled { at_ms, seq, kind }));
    }

    pub fn pop(&mut self) -> Option<Scheduled> {
        self.heap.pop().map(|Reverse(event)| event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_by_time_then_insertion() {
        let mut queue = EventQueue::new();
        queue.push(50, EventKind::TaskArrival);
        queue.push(10, EventKind::ActivityCheck { worker: 1 });
        queue.push(10, EventKind::ActivityCheck { worker: 0 });

        let order: Vec<(u64, EventKind)> =
            std::iter::from_fn(|| queue.pop().map(|e| (e.at_ms, e.kind))).collect();
        assert_eq!(
            order,
            vec![
                (10, EventKind::ActivityCheck { worker: 1 }),
                (10, EventKind::ActivityCheck { worker: 0 }),
                (50, EventKind::TaskArrival),
            ]
        );
    }
}
