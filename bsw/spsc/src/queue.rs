//! Single-producer single-consumer ring
//!
//! # Counters
//!
//! `sent` and `received` count modulo `2 * N` instead of `N`. Both point at
//! the same slot in two distinct situations:
//!
//! ```text
//! sent == received            empty
//! sent == received + N        full  (mod 2N)
//! ```
//!
//! so all `N` slots are usable without a spare element and without a shared
//! length field. Each counter has exactly one writer: the producer owns
//! `sent` (and `acked`), the consumer owns `received`.
//!
//! # Ordering
//!
//! ```text
//! producer writes slot, Release-stores sent     -> consumer Acquire-loads sent, reads slot
//! consumer releases slot, Release-stores received -> producer Acquire-loads received, reuses slot
//! ```
//!
//! # Consumption tracking
//!
//! With `TRACK_CONSUMED = true` the consumer does not drop what it
//! advances past. The element stays in its slot until the producer collects
//! it with [`Sender::check_consumed`], and the slot counts as occupied until
//! then. Producers use this to recycle buffers they handed out.

use core::cell::UnsafeCell;
use core::convert::Infallible;
use core::fmt;
use core::mem::MaybeUninit;
use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free queue of at most `N` elements.
///
/// Call [`split`](Queue::split) to obtain the two endpoints. The borrow
/// checker guarantees there is only one of each.
pub struct Queue<T, const N: usize, const TRACK_CONSUMED: bool = false> {
    buffer: [UnsafeCell<MaybeUninit<T>>; N],
    sent: AtomicUsize,
    received: AtomicUsize,
    acked: AtomicUsize,
}

// SAFETY: The producer only writes slots in [released, sent + 1) and the
// consumer only touches slots in [received, sent). The two ranges never
// overlap, and ownership of a slot moves between the two sides through
// Release stores and Acquire loads of the counters. Elements are moved
// across threads, so `T: Send` is required.
unsafe impl<T: Send, const N: usize, const TRACK_CONSUMED: bool> Sync
    for Queue<T, N, TRACK_CONSUMED>
{
}

impl<T, const N: usize, const TRACK_CONSUMED: bool> Queue<T, N, TRACK_CONSUMED> {
    const CAPACITY_CHECK: () = assert!(
        N > 0 && N <= u16::MAX as usize,
        "SPSC capacity must be in 1..=65535"
    );

    const INIT: UnsafeCell<MaybeUninit<T>> = UnsafeCell::new(MaybeUninit::uninit());

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_CHECK;
        Self {
            buffer: [Self::INIT; N],
            sent: AtomicUsize::new(0),
            received: AtomicUsize::new(0),
            acked: AtomicUsize::new(0),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Split the queue into its producer and consumer endpoints
    pub fn split(&mut self) -> (Sender<'_, T, N, TRACK_CONSUMED>, Receiver<'_, T, N, TRACK_CONSUMED>) {
        let queue: &Self = self;
        (Sender { queue }, Receiver { queue })
    }

    /// Drop every element still held and return to the initial state
    pub fn reset(&mut self) {
        self.drop_held();
        *self.sent.get_mut() = 0;
        *self.received.get_mut() = 0;
        *self.acked.get_mut() = 0;
    }

    const fn next(counter: usize) -> usize {
        if counter + 1 == 2 * N {
            0
        } else {
            counter + 1
        }
    }

    const fn distance(from: usize, to: usize) -> usize {
        (to + 2 * N - from) % (2 * N)
    }

    fn slot(&self, counter: usize) -> *mut T {
        self.buffer[counter % N].get().cast::<T>()
    }

    /// Counter up to which the producer may not reuse slots
    fn released(&self) -> usize {
        if TRACK_CONSUMED {
            self.acked.load(Ordering::Relaxed)
        } else {
            self.received.load(Ordering::Acquire)
        }
    }

    fn drop_held(&mut self) {
        let sent = *self.sent.get_mut();
        let mut counter = if TRACK_CONSUMED {
            *self.acked.get_mut()
        } else {
            *self.received.get_mut()
        };
        while counter != sent {
            // SAFETY: slots in [released, sent) hold initialized elements
            // and `&mut self` excludes both endpoints.
            unsafe { ptr::drop_in_place(self.slot(counter)) };
            counter = Self::next(counter);
        }
    }
}

impl<T, const N: usize, const TRACK_CONSUMED: bool> Default for Queue<T, N, TRACK_CONSUMED> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize, const TRACK_CONSUMED: bool> Drop for Queue<T, N, TRACK_CONSUMED> {
    fn drop(&mut self) {
        self.drop_held();
    }
}

impl<T, const N: usize, const TRACK_CONSUMED: bool> fmt::Debug for Queue<T, N, TRACK_CONSUMED> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("capacity", &N)
            .field("sent", &self.sent.load(Ordering::Relaxed))
            .field("received", &self.received.load(Ordering::Relaxed))
            .field("acked", &self.acked.load(Ordering::Relaxed))
            .finish()
    }
}

/// Producer endpoint
pub struct Sender<'a, T, const N: usize, const TRACK_CONSUMED: bool = false> {
    queue: &'a Queue<T, N, TRACK_CONSUMED>,
}

impl<T, const N: usize, const TRACK_CONSUMED: bool> Sender<'_, T, N, TRACK_CONSUMED> {
    /// True if the next write would overflow
    pub fn full(&self) -> bool {
        let sent = self.queue.sent.load(Ordering::Relaxed);
        sent == (self.queue.released() + N) % (2 * N)
    }

    /// Number of elements the consumer has not yet advanced past
    pub fn size(&self) -> usize {
        let received = self.queue.received.load(Ordering::Acquire);
        Queue::<T, N, TRACK_CONSUMED>::distance(received, self.queue.sent.load(Ordering::Relaxed))
    }

    /// Append `value`, handing it back if the queue is full
    pub fn try_write(&mut self, value: T) -> Result<(), T> {
        match self.reserve() {
            Some(slot) => {
                slot.commit(value);
                Ok(())
            }
            None => Err(value),
        }
    }

    /// Append `value`.
    ///
    /// # Panics
    ///
    /// If the queue is full. Check [`full`](Self::full) first.
    pub fn write(&mut self, value: T) {
        if self.try_write(value).is_err() {
            panic!("write to a full SPSC queue");
        }
    }
}

impl<'a, T, const N: usize, const TRACK_CONSUMED: bool> Sender<'a, T, N, TRACK_CONSUMED> {
    /// Claim the next free slot so the element can be built in place.
    ///
    /// Nothing reaches the consumer until [`WriteSlot::commit`]; dropping
    /// the slot uncommitted gives it back. Returns `None` if the queue is
    /// full.
    pub fn reserve(&mut self) -> Option<WriteSlot<'_, 'a, T, N, TRACK_CONSUMED>> {
        if self.full() {
            None
        } else {
            Some(WriteSlot { sender: self })
        }
    }
}

impl<T, const N: usize> Sender<'_, T, N, true> {
    /// Hand every element the consumer has advanced past since the last
    /// call back to the producer, oldest first. Their slots become free.
    pub fn check_consumed<F: FnMut(T)>(&mut self, mut on_consumed: F) {
        let received = self.queue.received.load(Ordering::Acquire);
        let mut acked = self.queue.acked.load(Ordering::Relaxed);
        while acked != received {
            // SAFETY: slots in [acked, received) were initialized by this
            // endpoint and the consumer has released them. Advancing `acked`
            // before running the callback keeps the slot from being read
            // twice if the callback panics.
            let value = unsafe { self.queue.slot(acked).read() };
            acked = Queue::<T, N, true>::next(acked);
            self.queue.acked.store(acked, Ordering::Relaxed);
            on_consumed(value);
        }
    }
}

impl<T, const N: usize, const TRACK_CONSUMED: bool> fmt::Debug for Sender<'_, T, N, TRACK_CONSUMED> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender").field("size", &self.size()).finish()
    }
}

/// Free slot claimed by [`Sender::reserve`]
pub struct WriteSlot<'s, 'a, T, const N: usize, const TRACK_CONSUMED: bool> {
    sender: &'s mut Sender<'a, T, N, TRACK_CONSUMED>,
}

impl<T, const N: usize, const TRACK_CONSUMED: bool> WriteSlot<'_, '_, T, N, TRACK_CONSUMED> {
    /// Storage of the slot, for building the element in place
    pub fn as_uninit(&mut self) -> &mut MaybeUninit<T> {
        let queue = self.sender.queue;
        let sent = queue.sent.load(Ordering::Relaxed);
        // SAFETY: `reserve` found the slot at `sent` outside [released,
        // sent), so the consumer does not access it, and the exclusive
        // borrow of the sender keeps any other write away until the slot is
        // published.
        unsafe { &mut *queue.buffer[sent % N].get() }
    }

    /// Store `value` and hand it to the consumer
    pub fn commit(mut self, value: T) {
        self.as_uninit().write(value);
        self.publish();
    }

    /// Hand the element built through [`as_uninit`](Self::as_uninit) to the
    /// consumer.
    ///
    /// # Safety
    ///
    /// The slot must hold a fully initialized `T`.
    pub unsafe fn commit_initialized(self) {
        self.publish();
    }

    fn publish(self) {
        let queue = self.sender.queue;
        let sent = queue.sent.load(Ordering::Relaxed);
        queue
            .sent
            .store(Queue::<T, N, TRACK_CONSUMED>::next(sent), Ordering::Release);
    }
}

impl<T, const N: usize, const TRACK_CONSUMED: bool> fmt::Debug for WriteSlot<'_, '_, T, N, TRACK_CONSUMED> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSlot")
            .field("index", &(self.sender.queue.sent.load(Ordering::Relaxed) % N))
            .finish()
    }
}

/// Consumer endpoint
pub struct Receiver<'a, T, const N: usize, const TRACK_CONSUMED: bool = false> {
    queue: &'a Queue<T, N, TRACK_CONSUMED>,
}

impl<T, const N: usize, const TRACK_CONSUMED: bool> Receiver<'_, T, N, TRACK_CONSUMED> {
    pub fn empty(&self) -> bool {
        let received = self.queue.received.load(Ordering::Relaxed);
        self.queue.sent.load(Ordering::Acquire) == received
    }

    pub fn size(&self) -> usize {
        let sent = self.queue.sent.load(Ordering::Acquire);
        Queue::<T, N, TRACK_CONSUMED>::distance(self.queue.received.load(Ordering::Relaxed), sent)
    }

    /// Oldest element.
    ///
    /// # Panics
    ///
    /// If the queue is empty.
    pub fn peek(&self) -> &T {
        assert!(!self.empty(), "peek into an empty SPSC queue");
        let received = self.queue.received.load(Ordering::Relaxed);
        // SAFETY: the slot at `received` lies in [received, sent) and was
        // published by the producer's Release store of `sent`. The producer
        // does not touch it until `received` moves past it, which requires
        // `&mut self`.
        unsafe { &*self.queue.slot(received) }
    }

    /// Release the oldest element.
    ///
    /// # Panics
    ///
    /// If the queue is empty.
    pub fn advance(&mut self) {
        assert!(!self.empty(), "advance on an empty SPSC queue");
        let received = self.queue.received.load(Ordering::Relaxed);
        if !TRACK_CONSUMED {
            // SAFETY: as in `peek`; the element is dropped before its slot
            // is handed back to the producer.
            unsafe { ptr::drop_in_place(self.queue.slot(received)) };
        }
        self.queue.received.store(
            Queue::<T, N, TRACK_CONSUMED>::next(received),
            Ordering::Release,
        );
    }

    /// Release everything currently in the queue
    pub fn clear(&mut self) {
        while !self.empty() {
            self.advance();
        }
    }
}

impl<T, const N: usize> Receiver<'_, T, N, false> {
    /// Move the oldest element out, if any
    pub fn try_read(&mut self) -> nb::Result<T, Infallible> {
        let received = self.queue.received.load(Ordering::Relaxed);
        if self.queue.sent.load(Ordering::Acquire) == received {
            return Err(nb::Error::WouldBlock);
        }
        // SAFETY: as in `peek`; the value is moved out and the slot is
        // released right after without dropping it again.
        let value = unsafe { self.queue.slot(received).read() };
        self.queue
            .received
            .store(Queue::<T, N, false>::next(received), Ordering::Release);
        Ok(value)
    }

    /// Move the oldest element out.
    ///
    /// # Panics
    ///
    /// If the queue is empty.
    pub fn read(&mut self) -> T {
        match self.try_read() {
            Ok(value) => value,
            Err(_) => panic!("read from an empty SPSC queue"),
        }
    }
}

impl<T, const N: usize, const TRACK_CONSUMED: bool> fmt::Debug for Receiver<'_, T, N, TRACK_CONSUMED> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver").field("size", &self.size()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_fill_to_capacity() {
        let mut queue: Queue<u8, 3> = Queue::new();
        assert_eq!(queue.capacity(), 3);
        let (mut tx, rx) = queue.split();
        for value in 0..3 {
            assert!(!tx.full());
            tx.write(value);
        }
        assert!(tx.full());
        assert_eq!(tx.try_write(9), Err(9));
        assert_eq!(rx.size(), 3);
        assert_eq!(*rx.peek(), 0);
    }

    #[test]
    fn test_counters_wrap_at_twice_capacity() {
        let mut queue: Queue<u32, 2> = Queue::new();
        let (mut tx, mut rx) = queue.split();
        for round in 0..5 {
            tx.write(round);
            assert_eq!(rx.read(), round);
        }
        assert!(rx.empty());
        assert_eq!(queue.sent.load(Ordering::Relaxed), 1);
        assert_eq!(queue.received.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_advance_drops_untracked_elements() {
        let marker = Rc::new(());
        let mut queue: Queue<Rc<()>, 4> = Queue::new();
        let (mut tx, mut rx) = queue.split();
        tx.write(marker.clone());
        tx.write(marker.clone());
        assert_eq!(Rc::strong_count(&marker), 3);
        rx.advance();
        assert_eq!(Rc::strong_count(&marker), 2);
        rx.clear();
        assert_eq!(Rc::strong_count(&marker), 1);
    }

    #[test]
    fn test_drop_and_reset_release_held_elements() {
        let marker = Rc::new(());
        {
            let mut queue: Queue<Rc<()>, 4, true> = Queue::new();
            let (mut tx, mut rx) = queue.split();
            tx.write(marker.clone());
            tx.write(marker.clone());
            rx.advance();
            assert_eq!(Rc::strong_count(&marker), 3);

            queue.reset();
            assert_eq!(Rc::strong_count(&marker), 1);

            let (mut tx, _rx) = queue.split();
            tx.write(marker.clone());
            assert_eq!(Rc::strong_count(&marker), 2);
        }
        assert_eq!(Rc::strong_count(&marker), 1);
    }

    #[test]
    fn test_uncommitted_slot_publishes_nothing() {
        let mut queue: Queue<u16, 2> = Queue::new();
        let (mut tx, mut rx) = queue.split();
        let mut slot = tx.reserve().expect("free slot");
        slot.as_uninit().write(5);
        drop(slot);
        assert!(rx.empty());

        tx.reserve().expect("slot given back").commit(6);
        assert_eq!(rx.read(), 6);
    }

    #[test]
    #[should_panic(expected = "empty SPSC queue")]
    fn test_peek_empty() {
        let mut queue: Queue<u8, 1> = Queue::new();
        let (_tx, rx) = queue.split();
        rx.peek();
    }

    #[test]
    #[should_panic(expected = "full SPSC queue")]
    fn test_write_full() {
        let mut queue: Queue<u8, 1> = Queue::new();
        let (mut tx, _rx) = queue.split();
        tx.write(1);
        tx.write(2);
    }
}
