//! Queues driving a settle: the FIFO search queue and the priority-ordered
//! update queue.

use core::cmp::Ordering;
use std::collections::BTreeSet;

use hashbrown::hash_map::Entry;
use hashbrown::HashMap;

use crate::wire::node::{NodeArena, NodeId};

/// FIFO queue of wire nodes awaiting search, threaded through the nodes
/// themselves (`WireState::next_search`) so that offer, poll, and clear are
/// all constant-time and allocation-free.
///
/// The search phase iterates the queue from the front *while appending*;
/// [`SearchQueue::head()`] plus the intrusive links make that a plain
/// cursor walk.
#[derive(Debug)]
pub(crate) struct SearchQueue {
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl SearchQueue {
    pub fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    /// Appends a wire node. The caller guarantees (via the `searched` flag)
    /// that a node is never queued twice.
    pub fn offer(&mut self, nodes: &mut NodeArena, id: NodeId) {
        debug_assert!(nodes[id].wire().next_search.is_none());
        match self.tail {
            None => self.head = Some(id),
            Some(tail) => nodes[tail].wire_mut().next_search = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
    }

    pub fn poll(&mut self, nodes: &mut NodeArena) -> Option<NodeId> {
        let id = self.head?;
        let next = nodes[id].wire_mut().next_search.take();
        self.head = next;
        if next.is_none() {
            self.tail = None;
        }
        self.len -= 1;
        Some(id)
    }
}

/// Priority of an [`UpdateQueue`] entry.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) enum Priority {
    /// Anything that is not a root: wires reached by spreading power, and
    /// neighboring blocks queued for block updates.
    Normal = 0,
    /// Roots update before everything else.
    Root = 1,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct UpdateRequest {
    priority: Priority,
    seq: u64,
    node: NodeId,
}

impl Ord for UpdateRequest {
    fn cmp(&self, other: &Self) -> Ordering {
        // Maximum (popped first) = highest priority, then earliest insertion.
        // NodeId is a tiebreaker for Ord's contract only; seq is unique.
        self.priority
            .cmp(&other.priority)
            .then(other.seq.cmp(&self.seq))
            .then(other.node.0.cmp(&self.node.0))
    }
}

impl PartialOrd for UpdateRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue of nodes awaiting phase-3 processing, containing each node
/// at most once.
///
/// Ordering is by `(priority, insertion sequence)` and nothing else; in
/// particular it never keys on cell coordinates, so dequeue order is a pure
/// function of the insertion sequence.
#[derive(Debug)]
pub(crate) struct UpdateQueue {
    /// Sorted storage; a `BTreeSet` rather than a `BinaryHeap` so that
    /// entries can be replaced when a node's priority rises.
    queue: BTreeSet<UpdateRequest>,
    /// The queued entry per node, for deduplication.
    table: HashMap<NodeId, UpdateRequest>,
    next_seq: u64,
}

impl UpdateQueue {
    pub fn new() -> Self {
        Self {
            queue: BTreeSet::new(),
            table: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Inserts a queue entry or raises the priority of an existing one.
    /// A raised entry keeps its original position within its new class.
    pub fn insert(&mut self, node: NodeId, priority: Priority) {
        match self.table.entry(node) {
            Entry::Occupied(mut e) => {
                let existing = *e.get();
                if priority > existing.priority {
                    let removed = self.queue.remove(&existing);
                    debug_assert!(removed);
                    let raised = UpdateRequest {
                        priority,
                        ..existing
                    };
                    e.insert(raised);
                    self.queue.insert(raised);
                }
            }
            Entry::Vacant(e) => {
                let request = UpdateRequest {
                    priority,
                    seq: self.next_seq,
                    node,
                };
                self.next_seq += 1;
                e.insert(request);
                self.queue.insert(request);
            }
        }
    }

    pub fn pop(&mut self) -> Option<NodeId> {
        let request = self.queue.pop_last()?;
        let removed = self.table.remove(&request.node);
        debug_assert!(removed.is_some());
        Some(request.node)
    }
}
