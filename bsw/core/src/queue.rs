//! Intrusive FIFO queue over `'static` nodes
//!
//! Every node embeds a [`Link`] holding a non-owning reference to its
//! successor. The queue itself only stores head and tail references, so no
//! storage is ever allocated. Nodes must be `'static`: a queue can never
//! outlive the nodes it links.
//!
//! All operations take a [`CriticalSection`] token. Whoever drives the queue
//! decides which lock protects it; the scheduling layer uses the interrupt
//! lock of the running target.

use core::cell::Cell;
use core::fmt;
use core::ptr;

use critical_section::{CriticalSection, Mutex};

/// Per-node link embedded in every queueable object.
pub struct Link<T: ?Sized + 'static> {
    next: Mutex<Cell<Option<&'static T>>>,
    enqueued: Mutex<Cell<bool>>,
}

impl<T: ?Sized + 'static> Link<T> {
    /// Create an unlinked node link
    pub const fn new() -> Self {
        Self {
            next: Mutex::new(Cell::new(None)),
            enqueued: Mutex::new(Cell::new(false)),
        }
    }

    /// True while the owning node is a member of some queue
    pub fn is_enqueued(&self, cs: CriticalSection<'_>) -> bool {
        self.enqueued.borrow(cs).get()
    }

    /// Successor of the owning node, `None` at the tail or when unlinked
    pub fn next(&self, cs: CriticalSection<'_>) -> Option<&'static T> {
        self.next.borrow(cs).get()
    }

    fn set_next(&self, cs: CriticalSection<'_>, next: Option<&'static T>) {
        self.next.borrow(cs).set(next);
    }

    fn attach(&self, cs: CriticalSection<'_>, next: Option<&'static T>) {
        self.next.borrow(cs).set(next);
        self.enqueued.borrow(cs).set(true);
    }

    fn detach(&self, cs: CriticalSection<'_>) {
        self.next.borrow(cs).set(None);
        self.enqueued.borrow(cs).set(false);
    }
}

impl<T: ?Sized + 'static> Default for Link<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + 'static> fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let enqueued = critical_section::with(|cs| self.is_enqueued(cs));
        f.debug_struct("Link").field("enqueued", &enqueued).finish()
    }
}

/// Access to the embedded [`Link`] of a queueable node.
pub trait Linked: 'static {
    fn link(&self) -> &Link<Self>;
}

fn same<T: ?Sized>(a: &T, b: &T) -> bool {
    ptr::addr_eq(a as *const T, b as *const T)
}

/// Intrusive singly linked FIFO.
pub struct Queue<T: ?Sized + Linked> {
    head: Mutex<Cell<Option<&'static T>>>,
    tail: Mutex<Cell<Option<&'static T>>>,
}

impl<T: ?Sized + Linked> Queue<T> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            head: Mutex::new(Cell::new(None)),
            tail: Mutex::new(Cell::new(None)),
        }
    }

    pub fn is_empty(&self, cs: CriticalSection<'_>) -> bool {
        self.head.borrow(cs).get().is_none()
    }

    /// Oldest node, without removing it
    pub fn front(&self, cs: CriticalSection<'_>) -> Option<&'static T> {
        self.head.borrow(cs).get()
    }

    /// Number of queued nodes. O(n).
    pub fn len(&self, cs: CriticalSection<'_>) -> usize {
        self.iter(cs).count()
    }

    /// Append `node` at the tail.
    ///
    /// Returns `false` and leaves the queue untouched if the node is already
    /// enqueued.
    pub fn enqueue(&self, cs: CriticalSection<'_>, node: &'static T) -> bool {
        if node.link().is_enqueued(cs) {
            return false;
        }
        node.link().attach(cs, None);
        match self.tail.borrow(cs).get() {
            Some(tail) => tail.link().set_next(cs, Some(node)),
            None => self.head.borrow(cs).set(Some(node)),
        }
        self.tail.borrow(cs).set(Some(node));
        true
    }

    /// Pop the head node
    pub fn dequeue(&self, cs: CriticalSection<'_>) -> Option<&'static T> {
        let head = self.head.borrow(cs).get()?;
        let next = head.link().next(cs);
        self.head.borrow(cs).set(next);
        if next.is_none() {
            self.tail.borrow(cs).set(None);
        }
        head.link().detach(cs);
        Some(head)
    }

    /// Insert `node` directly behind `after`, or at the head for `None`.
    ///
    /// `after` must be a member of this queue and `node` must not be enqueued
    /// anywhere.
    pub fn insert_after(
        &self,
        cs: CriticalSection<'_>,
        after: Option<&'static T>,
        node: &'static T,
    ) {
        assert!(!node.link().is_enqueued(cs), "node is already enqueued");
        match after {
            None => {
                node.link().attach(cs, self.head.borrow(cs).get());
                self.head.borrow(cs).set(Some(node));
                if self.tail.borrow(cs).get().is_none() {
                    self.tail.borrow(cs).set(Some(node));
                }
            }
            Some(prev) => {
                node.link().attach(cs, prev.link().next(cs));
                prev.link().set_next(cs, Some(node));
                if self.tail.borrow(cs).get().is_some_and(|tail| same(tail, prev)) {
                    self.tail.borrow(cs).set(Some(node));
                }
            }
        }
    }

    /// Unlink `node` wherever it sits in the queue. O(n).
    ///
    /// Returns `false` if the node is not a member of this queue.
    pub fn remove(&self, cs: CriticalSection<'_>, node: &T) -> bool {
        if !node.link().is_enqueued(cs) {
            return false;
        }
        let mut prev: Option<&'static T> = None;
        let mut current = self.head.borrow(cs).get();
        while let Some(candidate) = current {
            let next = candidate.link().next(cs);
            if same(candidate, node) {
                match prev {
                    None => self.head.borrow(cs).set(next),
                    Some(p) => p.link().set_next(cs, next),
                }
                if next.is_none() {
                    self.tail.borrow(cs).set(prev);
                }
                candidate.link().detach(cs);
                return true;
            }
            prev = Some(candidate);
            current = next;
        }
        false
    }

    /// True if `node` is a member of this queue. O(n).
    pub fn contains(&self, cs: CriticalSection<'_>, node: &T) -> bool {
        node.link().is_enqueued(cs) && self.iter(cs).any(|n| same(n, node))
    }

    /// Unlink every node without touching it otherwise
    pub fn clear(&self, cs: CriticalSection<'_>) {
        while self.dequeue(cs).is_some() {}
    }

    /// Walk the queue front to back
    pub fn iter<'cs>(&self, cs: CriticalSection<'cs>) -> Iter<'cs, T> {
        Iter {
            cs,
            current: self.head.borrow(cs).get(),
        }
    }
}

impl<T: ?Sized + Linked> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over queued nodes
pub struct Iter<'cs, T: ?Sized + Linked> {
    cs: CriticalSection<'cs>,
    current: Option<&'static T>,
}

impl<T: ?Sized + Linked> Iterator for Iter<'_, T> {
    type Item = &'static T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        self.current = node.link().next(self.cs);
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node {
        id: u32,
        link: Link<Node>,
    }

    impl Linked for Node {
        fn link(&self) -> &Link<Self> {
            &self.link
        }
    }

    fn node(id: u32) -> &'static Node {
        Box::leak(Box::new(Node { id, link: Link::new() }))
    }

    fn ids(queue: &Queue<Node>) -> Vec<u32> {
        critical_section::with(|cs| queue.iter(cs).map(|n| n.id).collect())
    }

    #[test]
    fn test_enqueue_dequeue_fifo() {
        let queue = Queue::new();
        let (a, b, c) = (node(1), node(2), node(3));
        critical_section::with(|cs| {
            assert!(queue.is_empty(cs));
            assert!(queue.enqueue(cs, a));
            assert!(queue.enqueue(cs, b));
            assert!(queue.enqueue(cs, c));
            assert_eq!(queue.len(cs), 3);
            assert_eq!(queue.dequeue(cs).map(|n| n.id), Some(1));
            assert_eq!(queue.dequeue(cs).map(|n| n.id), Some(2));
            assert_eq!(queue.dequeue(cs).map(|n| n.id), Some(3));
            assert!(queue.dequeue(cs).is_none());
            assert!(!a.link.is_enqueued(cs));
        });
    }

    #[test]
    fn test_enqueue_twice_is_ignored() {
        let queue = Queue::new();
        let a = node(1);
        critical_section::with(|cs| {
            assert!(queue.enqueue(cs, a));
            assert!(!queue.enqueue(cs, a));
            assert_eq!(queue.len(cs), 1);
        });
    }

    #[test]
    fn test_remove_first_last_inner() {
        let queue = Queue::new();
        let nodes = [node(1), node(2), node(3), node(4)];
        critical_section::with(|cs| {
            for n in nodes {
                queue.enqueue(cs, n);
            }
            assert!(queue.remove(cs, nodes[1]));
            assert!(queue.remove(cs, nodes[0]));
            assert!(queue.remove(cs, nodes[3]));
        });
        assert_eq!(ids(&queue), vec![3]);

        // the tail must have moved back so appends still land behind node 3
        let e = node(5);
        critical_section::with(|cs| queue.enqueue(cs, e));
        assert_eq!(ids(&queue), vec![3, 5]);
    }

    #[test]
    fn test_remove_not_enqueued() {
        let queue = Queue::new();
        let other = Queue::new();
        let (a, b) = (node(1), node(2));
        critical_section::with(|cs| {
            assert!(!queue.remove(cs, a));
            other.enqueue(cs, b);
            assert!(!queue.remove(cs, b));
            assert!(other.contains(cs, b));
            assert!(!queue.contains(cs, b));
        });
    }

    #[test]
    fn test_insert_after() {
        let queue = Queue::new();
        let (a, b, c, d) = (node(1), node(2), node(3), node(4));
        critical_section::with(|cs| {
            queue.insert_after(cs, None, b);
            queue.insert_after(cs, None, a);
            queue.insert_after(cs, Some(b), d);
            queue.insert_after(cs, Some(b), c);
        });
        assert_eq!(ids(&queue), vec![1, 2, 3, 4]);
        let e = node(5);
        critical_section::with(|cs| queue.enqueue(cs, e));
        assert_eq!(ids(&queue), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_clear_allows_reuse() {
        let queue = Queue::new();
        let (a, b) = (node(1), node(2));
        critical_section::with(|cs| {
            queue.enqueue(cs, a);
            queue.enqueue(cs, b);
            queue.clear(cs);
            assert!(queue.is_empty(cs));
            assert!(!a.link.is_enqueued(cs));
            assert!(queue.enqueue(cs, b));
            assert!(queue.enqueue(cs, a));
        });
        assert_eq!(ids(&queue), vec![2, 1]);
    }
}
